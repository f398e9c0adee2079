//! 批量学生处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责整份导出的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：读取 CSV、加载模板、创建输出目录、检查编译器
//! 2. **学生筛选**：按行数限制提取作答了问答题的学生
//! 3. **逐个处理**：委托 StudentFlow 处理单个学生，单个失败不影响其他学生
//! 4. **全局统计**：汇总 .tex 与 PDF 的生成结果

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, CompileError};
use crate::infrastructure::LatexCompiler;
use crate::models::{load_quiz_export, QuizExport};
use crate::models::loaders::describe_layout;
use crate::services::{DocumentTemplate, DocumentWriter, SectionBuilder};
use crate::utils::logging::{log_startup, log_students_loaded, print_final_stats};
use crate::workflow::{PdfStatus, StudentCtx, StudentFlow};

/// 应用主结构
pub struct App {
    config: Config,
    export: QuizExport,
    flow: StudentFlow,
    compile_enabled: bool,
}

/// 运行结果统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// 有问答题的学生数
    pub total: usize,
    /// 成功生成的 .tex 数
    pub tex_success: usize,
    /// 成功编译的 PDF 数（未编译时为 None）
    pub pdf_success: Option<usize>,
    /// 写入或编译失败的学生数
    pub failed: usize,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        // 读取 CSV
        let export = load_quiz_export(&config.csv_path)
            .with_context(|| format!("无法加载 CSV: {}", config.csv_path.display()))?;

        // 加载模板
        let template = DocumentTemplate::load(&config.template_path)?;

        // 创建输出目录
        let writer = DocumentWriter::new(&config.output_dir)?;

        // 检查编译器
        let compiler = if config.compile_pdf {
            probe_compiler(LatexCompiler::from_config(&config)).await
        } else {
            None
        };
        let compile_enabled = compiler.is_some();

        let flow = StudentFlow::new(
            SectionBuilder::new(config.long_answer_threshold),
            template,
            writer,
            compiler,
        );

        Ok(Self {
            config,
            export,
            flow,
            compile_enabled,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(mut self) -> Result<RunSummary> {
        let limit = self.config.limit.filter(|&n| n > 0);
        let students = self.export.students(limit);
        log_students_loaded(students.len(), limit);

        if students.is_empty() {
            info!("没有找到已批改的问答题，程序结束");
            return Ok(RunSummary::default());
        }

        let mut summary = RunSummary {
            total: students.len(),
            pdf_success: self.compile_enabled.then_some(0),
            ..Default::default()
        };

        for (idx, student) in students.iter().enumerate() {
            let ctx = StudentCtx::new(idx + 1, students.len(), student.id.clone());

            match self.flow.run(student, &ctx).await {
                Ok(outcome) => {
                    summary.tex_success += 1;
                    match outcome.pdf {
                        PdfStatus::Compiled(_) => {
                            if let Some(n) = summary.pdf_success.as_mut() {
                                *n += 1;
                            }
                        }
                        PdfStatus::Failed => summary.failed += 1,
                        PdfStatus::Skipped => {}
                    }
                }
                Err(e) => {
                    error!("{} ❌ 处理 {} 失败: {:#}", ctx, student.name, e);
                    summary.failed += 1;
                }
            }
        }

        print_final_stats(
            summary.tex_success,
            summary.pdf_success,
            summary.total,
            &self.config.output_dir,
        );
        if summary.failed > 0 {
            warn!(
                "⚠️ {} 个学生处理失败，详见 {}",
                summary.failed,
                self.flow.failure_log().path().display()
            );
        }

        Ok(summary)
    }

    /// 只打印 CSV 结构（`--inspect`），不写任何文件
    pub fn inspect(config: &Config) -> Result<String> {
        let export = load_quiz_export(&config.csv_path)?;
        Ok(describe_layout(&export))
    }
}

/// 编译器不可用时整次运行跳过 PDF，而不是每个学生都失败一次
async fn probe_compiler(compiler: LatexCompiler) -> Option<LatexCompiler> {
    match compiler.probe().await {
        Ok(version) => {
            info!("✓ 编译器可用: {}", version);
            Some(compiler)
        }
        Err(e @ CompileError::ProgramNotFound { .. }) => {
            warn!("⚠️ {}，本次只生成 .tex 文件", AppError::from(e));
            None
        }
        Err(e) => {
            warn!("⚠️ 编译器 {} 检查失败: {}，本次只生成 .tex 文件", compiler.program(), e);
            None
        }
    }
}
