//! 文档写入服务 - 业务能力层
//!
//! 只负责"把一个学生的 .tex 写到输出目录"，不关心编译

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::StudentRecord;

static FILENAME_FORBIDDEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("FILENAME_FORBIDDEN"));

/// 文档写入服务
///
/// 职责：
/// - 创建输出目录
/// - 由学生姓名生成文件名，同名时追加学号
/// - 写入 .tex 文件
#[derive(Debug)]
pub struct DocumentWriter {
    output_dir: PathBuf,
    used_names: HashSet<String>,
}

impl DocumentWriter {
    /// 创建写入服务，输出目录不存在时递归创建
    pub fn new(output_dir: impl Into<PathBuf>) -> AppResult<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)
            .map_err(|e| AppError::create_dir_failed(&output_dir, e))?;

        Ok(Self {
            output_dir,
            used_names: HashSet::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 写入学生的 .tex 文件
    ///
    /// # 参数
    /// - `student`: 学生信息（用于文件名）
    /// - `content`: 完整的 LaTeX 文档
    ///
    /// # 返回
    /// 写入的文件路径
    pub fn write(&mut self, student: &StudentRecord, content: &str) -> AppResult<PathBuf> {
        let stem = self.unique_stem(student);
        let path = self.output_dir.join(format!("{stem}.tex"));

        debug!("写入文件: {} ({} 字节)", path.display(), content.len());
        fs::write(&path, content).map_err(|e| AppError::write_failed(&path, e))?;

        Ok(path)
    }

    fn unique_stem(&mut self, student: &StudentRecord) -> String {
        let mut stem = sanitize_filename(&student.name);
        if stem.is_empty() {
            stem = sanitize_filename(&student.id);
        }
        if stem.is_empty() {
            stem = "student".to_string();
        }

        if self.used_names.contains(&stem) {
            let base = format!("{}_{}", stem, sanitize_filename(&student.id));
            stem = base.clone();
            let mut n = 2;
            while self.used_names.contains(&stem) {
                stem = format!("{base}_{n}");
                n += 1;
            }
        }

        self.used_names.insert(stem.clone());
        stem
    }
}

/// 去掉文件名中不允许的字符
pub fn sanitize_filename(name: &str) -> String {
    FILENAME_FORBIDDEN.replace_all(name, "").trim().to_string()
}
