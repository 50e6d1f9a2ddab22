use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use std::sync::Arc;

use arxiv_digest::config::{AppConfig, CONFIG_PATH};
use arxiv_digest::digest::{self, DigestSink, FileSink};
use arxiv_digest::fetcher::UnifiedFetcher;
use arxiv_digest::translator::TranslationPipeline;
use arxiv_digest::utils::{logger, scheduler::TaskScheduler};

#[derive(Parser)]
#[command(name = "arxiv-digest")]
#[command(about = "arXiv 每日论文摘要与翻译推送系统", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 初始化配置和数据目录
    Init,
    /// 抓取并列出匹配的论文
    Fetch {
        /// 回溯天数
        #[arg(short, long)]
        days_back: Option<u32>,
    },
    /// 运行一次完整的日报流程
    Run {
        /// 回溯天数
        #[arg(short, long)]
        days_back: Option<u32>,
    },
    /// 启动定时任务
    Schedule,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logger();
    info!("arxiv-digest 启动");

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_command().await?;
        }
        Commands::Fetch { days_back } => {
            fetch_command(days_back).await?;
        }
        Commands::Run { days_back } => {
            let config = AppConfig::load()?;
            run_once(&config, days_back).await?;
        }
        Commands::Schedule => {
            schedule_command().await?;
        }
    }

    Ok(())
}

async fn init_command() -> Result<()> {
    info!("初始化系统...");

    tokio::fs::create_dir_all("config").await?;
    tokio::fs::create_dir_all("data/reports").await?;

    let config = AppConfig::default();
    config.save(CONFIG_PATH)?;
    info!("已生成配置文件: {}", CONFIG_PATH);

    info!("✅ 系统初始化完成！");
    info!("下一步:");
    info!("  1. 编辑 {} 配置 API 密钥与关键词", CONFIG_PATH);
    info!("  2. 运行 'arxiv-digest run' 生成日报");

    Ok(())
}

async fn fetch_command(days_back: Option<u32>) -> Result<()> {
    let config = AppConfig::load()?;
    let days_back = days_back.unwrap_or(config.fetcher.days_back);

    let fetcher = UnifiedFetcher::new(&config.fetcher);
    let papers = fetcher.fetch_all(days_back).await;

    if papers.is_empty() {
        info!("未找到匹配的论文");
        return Ok(());
    }

    for paper in &papers {
        println!("{}", digest::build_summary(paper));
    }
    info!("共 {} 篇论文", papers.len());

    Ok(())
}

/// 完整流程：抓取 -> 英文原文版日报 -> 翻译 -> 中文翻译版日报
async fn run_once(config: &AppConfig, days_back: Option<u32>) -> Result<()> {
    let days_back = days_back.unwrap_or(config.fetcher.days_back);
    let sink = FileSink::new(config.digest.output_dir.clone());
    let date_str = chrono::Local::now().format("%Y-%m-%d");

    let fetcher = UnifiedFetcher::new(&config.fetcher);
    let papers = fetcher.fetch_all(days_back).await;

    if papers.is_empty() {
        info!("今日没有找到论文");
        let notice = digest::build_no_papers_notice(&config.fetcher.keywords, days_back);
        sink.deliver(&format!("今日无新论文 ({})", date_str), &notice)?;
        return Ok(());
    }

    // 英文原文版日报每次都写，不依赖翻译是否可用
    let summary_sink = FileSink::with_stem(config.digest.output_dir.clone(), "summary");
    let summary_body = papers
        .iter()
        .map(digest::build_summary)
        .collect::<Vec<_>>()
        .join("\n");
    summary_sink.deliver(&format!("arXiv Daily Digest ({})", date_str), &summary_body)?;

    if !config.translator.is_configured() {
        info!("⚠️ API key 未配置，跳过翻译，仅输出英文原文版日报");
        return Ok(());
    }

    let pipeline = TranslationPipeline::from_config(&config.translator);
    let translated = pipeline.process(&papers).await;

    let body = digest::build_translated_digest(&translated);
    let subject = format!("{} ({})", config.digest.subject_prefix, date_str);
    sink.deliver(&subject, &body)?;

    info!("✅ 日报流程完成，共 {} 篇论文", translated.len());
    Ok(())
}

async fn schedule_command() -> Result<()> {
    info!("启动定时任务调度器...");

    let config = Arc::new(AppConfig::load()?);
    let cron = config.schedule.cron.clone();

    let scheduler = TaskScheduler::new().await?;

    let job_config = Arc::clone(&config);
    scheduler
        .add_daily_job(&cron, move || {
            let config = Arc::clone(&job_config);
            async move {
                if let Err(e) = run_once(&config, None).await {
                    error!("定时任务执行失败: {}", e);
                }
            }
        })
        .await?;

    scheduler.start().await?;
    info!("调度器运行中 (cron: {})，按 Ctrl+C 停止", cron);

    tokio::signal::ctrl_c().await?;
    info!("收到停止信号");

    scheduler.shutdown().await?;
    Ok(())
}
