use anyhow::Result;
use clap::Parser;
use tracing::error;

use canvas_to_latex::cli::Args;
use canvas_to_latex::utils::logging;
use canvas_to_latex::{App, Config};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let verbose = args.verbose;

    if let Err(e) = run(args).await {
        // 配置加载失败时日志可能还没初始化
        logging::init(verbose);
        error!("❌ {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    // 加载配置：默认值 → 配置文件 → 环境变量 → 命令行
    let mut config = Config::default();
    if let Some(path) = &args.config {
        config = config.with_file(path)?;
    }
    let config = args.apply(config.with_env()?);
    config.validate()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    if config.inspect {
        println!("{}", App::inspect(&config)?);
        return Ok(());
    }

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
