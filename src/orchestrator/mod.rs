//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整份导出的调度和统计，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<StudentRecord>)
//!     ↓
//! workflow::StudentFlow (处理单个学生)
//!     ↓
//! services (能力层：markup / section / template / writer / failure_log)
//!     ↓
//! infrastructure (基础设施：LatexCompiler)
//! ```
//!
//! ## 设计原则
//!
//! 1. **顺序处理**：学生之间没有共享状态，逐个处理
//! 2. **资源隔离**：只有编排层决定是否启用编译器
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure

pub mod batch_processor;

pub use batch_processor::{App, RunSummary};
