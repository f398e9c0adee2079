//! 命令行参数
//!
//! 命令行是配置的最后一层，覆盖默认值、配置文件和环境变量

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "canvas-to-latex")]
#[command(about = "Convert a Canvas quiz CSV export into per-student LaTeX documents", long_about = None)]
pub struct Args {
    /// Canvas quiz student analysis CSV (falls back to `csv_path` in the config file)
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Output directory for .tex/.pdf files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// LaTeX template file
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Only read the first N rows
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Generate .tex files only
    #[arg(long)]
    pub no_pdf: bool,

    /// LaTeX compiler program
    #[arg(long)]
    pub compiler: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the detected CSV layout and exit
    #[arg(long)]
    pub inspect: bool,
}

impl Args {
    /// 把命令行参数叠加到配置上
    pub fn apply(&self, config: Config) -> Config {
        Config {
            csv_path: self.csv.clone().unwrap_or(config.csv_path),
            output_dir: self.output.clone().unwrap_or(config.output_dir),
            template_path: self.template.clone().unwrap_or(config.template_path),
            limit: self.limit.or(config.limit),
            compile_pdf: config.compile_pdf && !self.no_pdf,
            compiler: self.compiler.clone().unwrap_or(config.compiler),
            verbose_logging: config.verbose_logging || self.verbose,
            inspect: config.inspect || self.inspect,
            ..config
        }
    }
}
