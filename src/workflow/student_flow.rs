//! 学生处理流程 - 流程层
//!
//! 核心职责：定义"一个学生"的完整处理流程
//!
//! 流程顺序：
//! 1. 生成题目区块 → 填充模板 → 写入 .tex
//! 2. 编译 PDF（可选）
//! 3. failures.txt（失败时记录）

use std::path::PathBuf;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::infrastructure::LatexCompiler;
use crate::models::StudentRecord;
use crate::services::{DocumentTemplate, DocumentWriter, FailureLog, FailureStage, SectionBuilder};
use crate::workflow::student_ctx::StudentCtx;

/// PDF 编译结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfStatus {
    /// 未启用编译
    Skipped,
    /// 编译成功
    Compiled(PathBuf),
    /// 编译失败（原因已记录）
    Failed,
}

/// 单个学生的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentOutcome {
    pub tex_path: PathBuf,
    pub pdf: PdfStatus,
}

/// 学生处理流程
///
/// - 编排单个学生的处理流程
/// - 写入失败返回错误，编译失败只记录
/// - 只依赖业务能力（services）和编译器
pub struct StudentFlow {
    section_builder: SectionBuilder,
    template: DocumentTemplate,
    writer: DocumentWriter,
    compiler: Option<LatexCompiler>,
    failure_log: FailureLog,
}

impl StudentFlow {
    /// 创建新的学生处理流程
    ///
    /// `compiler` 为 None 时只生成 .tex
    pub fn new(
        section_builder: SectionBuilder,
        template: DocumentTemplate,
        writer: DocumentWriter,
        compiler: Option<LatexCompiler>,
    ) -> Self {
        let failure_log = FailureLog::in_dir(writer.output_dir());
        Self {
            section_builder,
            template,
            writer,
            compiler,
            failure_log,
        }
    }

    pub fn failure_log(&self) -> &FailureLog {
        &self.failure_log
    }

    pub async fn run(&mut self, student: &StudentRecord, ctx: &StudentCtx) -> Result<StudentOutcome> {
        info!(
            "{} 📝 {} ({} 道问答题)",
            ctx,
            student.name,
            student.answers.len()
        );

        // ========== 流程 1: 生成 .tex ==========
        let section = self.section_builder.build(&student.answers);
        let document = self.template.render(student, &section);

        let tex_path = match self.writer.write(student, &document) {
            Ok(path) => path,
            Err(e) => {
                error!("{} ❌ 写入失败: {}", ctx, e);
                self.record(student, FailureStage::Write, &e.to_string());
                return Err(e.into());
            }
        };
        info!("{} ✓ 已生成: {}", ctx, tex_path.display());

        // ========== 流程 2: 编译 PDF ==========
        let Some(compiler) = &self.compiler else {
            return Ok(StudentOutcome {
                tex_path,
                pdf: PdfStatus::Skipped,
            });
        };

        let pdf = match compiler.compile(&tex_path).await {
            Ok(pdf_path) => PdfStatus::Compiled(pdf_path),
            Err(e) => {
                warn!("{} ⚠️ PDF 编译失败: {}", ctx, e);
                self.record(student, FailureStage::Compile, &e.to_string());
                PdfStatus::Failed
            }
        };

        Ok(StudentOutcome { tex_path, pdf })
    }

    /// 兜底：写 failures.txt，写不进去也不影响后续学生
    fn record(&self, student: &StudentRecord, stage: FailureStage, reason: &str) {
        if let Err(e) = self
            .failure_log
            .record(&student.name, &student.id, stage, reason)
        {
            error!("写入失败记录失败: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EssayAnswer;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn student() -> StudentRecord {
        StudentRecord {
            name: "Alice Smith".to_string(),
            id: "101".to_string(),
            answers: vec![EssayAnswer {
                item_id: "11".to_string(),
                prompt: "Explain merge sort.".to_string(),
                answer: "<p>It <strong>splits</strong> the array.</p>".to_string(),
                earned_points: Some(4.0),
            }],
        }
    }

    fn template() -> DocumentTemplate {
        DocumentTemplate::from_string("t.tex", "% STUDENT_NAME (STUDENT_ID)\nQUESTIONS_SECTION")
    }

    #[test]
    fn test_run_without_compiler() {
        let dir = tempdir().unwrap();
        let writer = DocumentWriter::new(dir.path()).unwrap();
        let mut flow = StudentFlow::new(SectionBuilder::new(200), template(), writer, None);

        let ctx = StudentCtx::new(1, 1, "101".to_string());
        let outcome = tokio_test::block_on(flow.run(&student(), &ctx)).unwrap();

        assert_eq!(outcome.pdf, PdfStatus::Skipped);
        let content = fs::read_to_string(&outcome.tex_path).unwrap();
        assert!(content.starts_with("% Alice Smith (101)\n\\section*{Question 1}"));
        assert!(content.contains(r"It \textbf{splits} the array."));
        assert!(!flow.failure_log().path().exists());
    }

    #[tokio::test]
    async fn test_compile_failure_is_recorded_not_fatal() {
        let dir = tempdir().unwrap();
        let writer = DocumentWriter::new(dir.path()).unwrap();
        let compiler = LatexCompiler::new(
            "definitely-not-a-latex-compiler",
            1,
            Duration::from_secs(5),
            dir.path(),
            true,
        );
        let mut flow = StudentFlow::new(SectionBuilder::new(200), template(), writer, Some(compiler));

        let ctx = StudentCtx::new(1, 1, "101".to_string());
        let outcome = flow.run(&student(), &ctx).await.unwrap();

        assert_eq!(outcome.pdf, PdfStatus::Failed);
        assert!(outcome.tex_path.exists());
        let failures = fs::read_to_string(flow.failure_log().path()).unwrap();
        assert!(failures.starts_with("Alice Smith | 101 | pdf | "));
    }

    #[test]
    fn test_ctx_display() {
        let ctx = StudentCtx::new(3, 40, "77".to_string());
        assert_eq!(ctx.to_string(), "[学生 3/40 ID#77]");
    }
}
