//! 失败记录服务 - 业务能力层
//!
//! 只负责"写 failures.txt"能力，不关心流程

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// 失败记录文件名
pub const FAILURE_FILE_NAME: &str = "failures.txt";

/// 处理失败的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// 生成/写入 .tex
    Write,
    /// 编译 PDF
    Compile,
}

impl FailureStage {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureStage::Write => "tex",
            FailureStage::Compile => "pdf",
        }
    }
}

/// 失败记录服务
///
/// 职责：
/// - 将处理失败的学生追加写入 failures.txt
/// - 只在真正失败时才创建文件
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    /// 在输出目录下创建
    pub fn in_dir(output_dir: &Path) -> Self {
        Self {
            path: output_dir.join(FAILURE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条失败记录
    ///
    /// # 参数
    /// - `name`: 学生姓名
    /// - `id`: 学号
    /// - `stage`: 失败阶段
    /// - `reason`: 失败原因（多行会被合并为一行）
    pub fn record(&self, name: &str, id: &str, stage: FailureStage, reason: &str) -> Result<()> {
        debug!("记录失败: {} ({}) | {}", name, id, stage.as_str());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("无法打开失败记录文件: {}", self.path.display()))?;

        let reason = reason.split_whitespace().collect::<Vec<_>>().join(" ");
        writeln!(file, "{} | {} | {} | {}", name, id, stage.as_str(), reason)
            .with_context(|| format!("无法写入失败记录文件: {}", self.path.display()))?;

        Ok(())
    }
}
