use std::path::{Path, PathBuf};

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// CSV 导出文件相关错误
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
    /// 模板相关错误
    #[error("模板错误: {0}")]
    Template(#[from] TemplateError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// LaTeX 编译错误
    #[error("编译错误: {0}")]
    Compile(#[from] CompileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// Canvas 导出文件错误
#[derive(Debug, Error)]
pub enum InputError {
    /// CSV 文件不存在
    #[error("CSV 文件不存在: {}", path.display())]
    CsvNotFound { path: PathBuf },
    /// 读取 CSV 失败
    #[error("读取 CSV 失败 ({}): {source}", path.display())]
    CsvReadFailed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    /// 缺少必需的列
    #[error("CSV 缺少必需的列: {column}")]
    MissingColumn { column: String },
    /// 行格式错误（字段数量不一致等）
    #[error("CSV 第 {line} 行格式错误: {source}")]
    MalformedRow {
        line: u64,
        #[source]
        source: csv::Error,
    },
}

/// 模板错误
#[derive(Debug, Error)]
pub enum TemplateError {
    /// 模板文件不存在
    #[error("模板文件不存在: {}", path.display())]
    NotFound { path: PathBuf },
    /// 读取模板失败
    #[error("读取模板失败 ({}): {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 创建目录失败
    #[error("创建目录失败 ({}): {source}", path.display())]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({}): {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// LaTeX 编译错误
#[derive(Debug, Error)]
pub enum CompileError {
    /// 找不到编译器程序
    #[error("找不到编译器 {program}，请安装 LaTeX（如 TeX Live 或 MiKTeX）")]
    ProgramNotFound { program: String },
    /// 启动编译器失败
    #[error("启动编译器 {program} 失败: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// 编译超时
    #[error("编译超时 ({} 秒): {}", secs, path.display())]
    Timeout { path: PathBuf, secs: u64 },
    /// 无法删除上次留下的 PDF
    #[error("无法删除旧的 PDF ({}): {source}", path.display())]
    StalePdf {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 编译失败（没有生成 PDF）
    #[error("编译失败 ({}), 退出状态 {status}: {detail}", path.display())]
    Failed {
        path: PathBuf,
        status: String,
        detail: String,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 没有指定 CSV 文件
    #[error("未指定 CSV 文件，请使用 --csv 或在配置文件中设置 csv_path")]
    MissingCsv,
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({}): {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({}): {source}", path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件写入错误
    pub fn write_failed(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }

    /// 创建目录创建错误
    pub fn create_dir_failed(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::File(FileError::CreateDirFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }

    /// 创建缺列错误
    pub fn missing_column(column: impl Into<String>) -> Self {
        AppError::Input(InputError::MissingColumn {
            column: column.into(),
        })
    }

    /// 创建环境变量解析错误
    pub fn env_var_parse_failed(
        var_name: impl Into<String>,
        value: impl Into<String>,
        expected_type: impl Into<String>,
    ) -> Self {
        AppError::Config(ConfigError::EnvVarParseFailed {
            var_name: var_name.into(),
            value: value.into(),
            expected_type: expected_type.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_error_display() {
        let err = AppError::missing_column("Name");
        assert_eq!(err.to_string(), "输入错误: CSV 缺少必需的列: Name");
    }

    #[test]
    fn test_compile_error_display() {
        let err = AppError::from(CompileError::ProgramNotFound {
            program: "pdflatex".to_string(),
        });
        assert!(err.to_string().contains("pdflatex"));
    }
}
