//! # Canvas To LaTeX
//!
//! 把 Canvas 测验的"学生分析"CSV 导出转换为每个学生一份 LaTeX 文档，并可选编译为 PDF
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部进程，只暴露能力
//! - `LatexCompiler` - 调用 pdflatex，带超时和辅助文件清理
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `MarkupConverter` - Canvas HTML / 纯文本 → LaTeX
//! - `SectionBuilder` - 生成题目区块
//! - `DocumentTemplate` - 填充模板占位符
//! - `DocumentWriter` - 写 .tex 文件
//! - `FailureLog` - 写 failures.txt
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个学生"的完整处理流程
//! - `StudentCtx` - 上下文封装（序号 + 学号）
//! - `StudentFlow` - 流程编排（区块 → 模板 → 写入 → 编译）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 读取导出、逐个处理学生、汇总统计
//!
//! ## 模块结构

pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::LatexCompiler;
pub use models::{EssayAnswer, QuizExport, StudentRecord};
pub use orchestrator::{App, RunSummary};
pub use workflow::{StudentCtx, StudentFlow};
