/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；否则默认 info，`verbose` 时为 debug。
/// 重复调用不会报错（测试中会多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 Canvas 测验导出 → LaTeX");
    info!("📄 CSV: {}", config.csv_path.display());
    info!("📝 模板: {}", config.template_path.display());
    info!("📁 输出目录: {}", config.output_dir.display());
    if config.compile_pdf {
        info!(
            "🔧 编译器: {} ({} 遍, 超时 {} 秒)",
            config.compiler, config.compile_passes, config.compile_timeout_secs
        );
    } else {
        info!("🔧 跳过 PDF 编译");
    }
    info!("{}", "=".repeat(60));
}

/// 记录学生加载信息
///
/// # 参数
/// - `total`: 有问答题的学生数
/// - `limit`: 行数限制
pub fn log_students_loaded(total: usize, limit: Option<usize>) {
    match limit {
        Some(limit) => info!("✓ 找到 {} 个作答了问答题的学生 (只读取前 {} 行)", total, limit),
        None => info!("✓ 找到 {} 个作答了问答题的学生", total),
    }
}

/// 打印最终统计信息
///
/// # 参数
/// - `tex_success`: 成功生成的 .tex 数量
/// - `pdf_success`: 成功编译的 PDF 数量（未编译时为 None）
/// - `total`: 学生总数
/// - `output_dir`: 输出目录
pub fn print_final_stats(
    tex_success: usize,
    pdf_success: Option<usize>,
    total: usize,
    output_dir: &Path,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("  LaTeX files generated: {}/{}", tex_success, total);
    if let Some(pdf_success) = pdf_success {
        info!("  PDFs compiled: {}/{}", pdf_success, total);
    }
    info!("  Output directory: {}", output_dir.display());
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
