//! # chaser-probe 入口
//!
//! 通过 Chrome DevTools Protocol 驱动浏览器，按场景目录执行市场站点的搜索与浏览校验。
//!
//! ## 主要功能
//! - 加载配置（TOML 文件、`CHASER_*` 环境变量、命令行参数，后者优先）
//! - 初始化 tracing 日志（文本或 JSON 格式）
//! - 按标签与名称筛选场景，`--list` 只列出不执行
//! - 并行执行场景并写出 `report.json`，存在失败场景时退出码为 1
//!
//! ## 架构
//! - **CDP 层**: 与 Chrome/Chromium 的 WebSocket 通信
//! - **会话层**: 每个场景一个隔离的页面目标
//! - **页面对象层**: 场景只通过页面对象与组件操作页面
//! - **运行器**: 受限并发执行、汇总与报告
//!
//! ## 环境变量
//! - `CHASER_BASE_URL`: 站点地址（默认: https://www.trademe.co.nz）
//! - `CHASER_CDP_ENDPOINT`: 浏览器调试端点（默认: http://localhost:9222）
//! - `CHASER_WORKERS`: 并行场景数（默认: 2）
//! - `RUST_LOG`: 日志过滤，未设置时使用配置中的 `log_level`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use chaser_probe::{
    cdp::{CdpBrowser, CdpBrowserImpl},
    config::{Config, LogFormat},
    data::FixtureData,
    fixture::Provisioner,
    runner::{RunFilter, Runner},
    scenarios,
    session::{BrowserContext, BrowserContextImpl},
};

#[derive(Debug, Parser)]
#[command(name = "chaser-probe", version, about = "Marketplace UI verification over CDP")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site origin every scenario navigates relative to
    #[arg(long)]
    base_url: Option<String>,

    /// Chrome remote debugging endpoint
    #[arg(long)]
    cdp_endpoint: Option<String>,

    /// Only run scenarios carrying this tag (repeatable)
    #[arg(short, long = "tag")]
    tags: Vec<String>,

    /// Only run scenarios whose name contains this text
    #[arg(short, long)]
    grep: Option<String>,

    /// Scenarios running at once
    #[arg(short, long)]
    workers: Option<usize>,

    /// Print matching scenarios without running them
    #[arg(long)]
    list: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            let mut config = Config::from_file(&path).with_context(|| format!("loading {}", path))?;
            config.apply_env()?;
            config
        }
        None => Config::from_env()?,
    };

    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(endpoint) = &cli.cdp_endpoint {
        config.cdp_endpoint = endpoint.clone();
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = FmtSubscriber::builder().with_env_filter(filter);

    match config.log_format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish()),
    }
    .context("setting default subscriber failed")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config)?;

    info!("chaser-probe v{}", chaser_probe::VERSION);
    info!("Target {} via {}", config.base_url, config.cdp_endpoint);

    let data = FixtureData::load(&config.data_dir)?;
    let filter = RunFilter {
        tags: cli.tags.clone(),
        grep: cli.grep.clone(),
    };
    let selected = filter.select(scenarios::catalogue(&data));

    if cli.list {
        for scenario in &selected {
            println!("{}  {}", scenario.name(), scenario.info.tags.join(" "));
        }
        return Ok(());
    }
    if selected.is_empty() {
        anyhow::bail!("no scenarios match the given tags and name filter");
    }

    let cdp_browser: Arc<dyn CdpBrowser> = Arc::new(CdpBrowserImpl::new(config.cdp_endpoint.clone()));
    let browser: Arc<dyn BrowserContext> = Arc::new(BrowserContextImpl::new(
        cdp_browser,
        config.timeouts.poll_interval(),
    ));

    let runner = Runner::new(Provisioner::new(Arc::clone(&browser), Arc::new(config)));
    let report = runner.run(selected).await;
    runner.write_report(&report).await?;

    if let Err(e) = browser.close().await {
        error!("Failed to close browser contexts: {}", e);
    }

    if !report.success() {
        error!("{} scenario(s) failed", report.summary.failed);
        std::process::exit(1);
    }
    Ok(())
}
