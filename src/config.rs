use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError};

/// 环境变量前缀
const ENV_PREFIX: &str = "CANVAS_TO_LATEX_";

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// Canvas 导出的 CSV 文件
    pub csv_path: PathBuf,
    /// 输出目录
    pub output_dir: PathBuf,
    /// LaTeX 模板文件
    pub template_path: PathBuf,
    /// 只处理前 N 行（测试用）
    pub limit: Option<usize>,
    /// 是否编译 PDF
    pub compile_pdf: bool,
    // --- 编译器配置 ---
    pub compiler: String,
    pub compile_passes: u32,
    pub compile_timeout_secs: u64,
    /// 编译成功后删除 .aux/.log/.out
    pub clean_aux: bool,
    /// 超过该长度（字符数）且为单行的答案会按句子断行
    pub long_answer_threshold: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 只打印 CSV 结构，不生成文件
    pub inspect: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::new(),
            output_dir: PathBuf::from("./output"),
            template_path: PathBuf::from("template.tex"),
            limit: None,
            compile_pdf: true,
            compiler: "pdflatex".to_string(),
            compile_passes: 2,
            compile_timeout_secs: 30,
            clean_aux: true,
            long_answer_threshold: 200,
            verbose_logging: false,
            inspect: false,
        }
    }
}

/// TOML 配置文件，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub csv_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub template_path: Option<PathBuf>,
    pub limit: Option<usize>,
    pub compile_pdf: Option<bool>,
    pub compiler: Option<String>,
    pub compile_passes: Option<u32>,
    pub compile_timeout_secs: Option<u64>,
    pub clean_aux: Option<bool>,
    pub long_answer_threshold: Option<usize>,
    pub verbose_logging: Option<bool>,
    pub inspect: Option<bool>,
}

impl Config {
    /// 读取 TOML 配置文件并覆盖当前配置
    pub fn with_file(self, path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile =
            toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(self.merge_file(file))
    }

    fn merge_file(self, file: ConfigFile) -> Self {
        Self {
            csv_path: file.csv_path.unwrap_or(self.csv_path),
            output_dir: file.output_dir.unwrap_or(self.output_dir),
            template_path: file.template_path.unwrap_or(self.template_path),
            limit: file.limit.or(self.limit),
            compile_pdf: file.compile_pdf.unwrap_or(self.compile_pdf),
            compiler: file.compiler.unwrap_or(self.compiler),
            compile_passes: file.compile_passes.unwrap_or(self.compile_passes),
            compile_timeout_secs: file
                .compile_timeout_secs
                .unwrap_or(self.compile_timeout_secs),
            clean_aux: file.clean_aux.unwrap_or(self.clean_aux),
            long_answer_threshold: file
                .long_answer_threshold
                .unwrap_or(self.long_answer_threshold),
            verbose_logging: file.verbose_logging.unwrap_or(self.verbose_logging),
            inspect: file.inspect.unwrap_or(self.inspect),
        }
    }

    /// 检查合并后的配置是否可用
    pub fn validate(&self) -> AppResult<()> {
        if self.csv_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingCsv.into());
        }
        Ok(())
    }

    /// 用环境变量覆盖当前配置
    pub fn with_env(self) -> AppResult<Self> {
        self.with_vars(|name| std::env::var(name).ok())
    }

    /// 从任意变量来源覆盖配置（便于测试）
    pub fn with_vars<F>(self, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(&format!("{ENV_PREFIX}{key}"));
        Ok(Self {
            output_dir: get("OUTPUT_DIR").map(PathBuf::from).unwrap_or(self.output_dir),
            template_path: get("TEMPLATE")
                .map(PathBuf::from)
                .unwrap_or(self.template_path),
            compiler: get("COMPILER").unwrap_or(self.compiler),
            compile_passes: parse_var("COMPILE_PASSES", get("COMPILE_PASSES"), "u32")?
                .unwrap_or(self.compile_passes),
            compile_timeout_secs: parse_var(
                "COMPILE_TIMEOUT_SECS",
                get("COMPILE_TIMEOUT_SECS"),
                "u64",
            )?
            .unwrap_or(self.compile_timeout_secs),
            verbose_logging: parse_var("VERBOSE", get("VERBOSE"), "bool")?
                .unwrap_or(self.verbose_logging),
            ..self
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    key: &str,
    value: Option<String>,
    expected_type: &str,
) -> AppResult<Option<T>> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::env_var_parse_failed(format!("{ENV_PREFIX}{key}"), raw, expected_type)),
    }
}
