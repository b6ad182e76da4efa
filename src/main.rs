use clap::{Parser, Subcommand};
use modsync_lib::commands::config::ConfigUpdate;
use modsync_lib::commands::sync::SyncOverrides;
use modsync_lib::commands;
use modsync_lib::logging::{LogConfig, SizeRotatingWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "modsync")]
#[command(about = "Keep a local mods folder identical to a cloud storage folder")]
struct Cli {
    /// 配置目录（默认为系统配置目录下的 modsync）
    #[arg(long, global = true, env = "MODSYNC_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 下载缺失的文件并删除多余的本地文件
    Sync(SyncOverrides),
    /// 只显示差异，不修改文件
    Diff(SyncOverrides),
    /// 检查本地目录和远程目录是否可访问
    Check(SyncOverrides),
    /// 查看或修改配置
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// 修改日志配置
    Log {
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        max_size_mb: Option<u32>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show {
        /// 显示完整令牌
        #[arg(long)]
        reveal: bool,
    },
    Set(ConfigUpdate),
}

/// 初始化日志系统
fn init_logging(config_dir: &Path) {
    let config = LogConfig::load(config_dir);

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(config.tracing_level().into())
        .from_env_lossy()
        .add_directive("hyper=warn".parse().expect("static directive"))
        .add_directive("reqwest=warn".parse().expect("static directive"));

    // 控制台只输出警告以上，避免打乱进度条
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(tracing_subscriber::filter::LevelFilter::WARN);

    let file_layer = if config.enabled {
        match SizeRotatingWriter::new(config_dir, config.max_size_mb) {
            Ok(writer) => Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false),
            ),
            Err(e) => {
                eprintln!("无法创建日志文件: {}", e);
                None
            }
        }
    } else {
        None
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer);

    let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config_dir = cli.config_dir.unwrap_or_else(modsync_lib::default_config_dir);
    std::fs::create_dir_all(&config_dir)?;
    init_logging(&config_dir);

    match cli.command {
        Commands::Sync(overrides) => commands::sync::start_sync(&config_dir, &overrides).await,
        Commands::Diff(overrides) => {
            commands::sync::analyze(&config_dir, &overrides).await?;
            Ok(true)
        }
        Commands::Check(overrides) => {
            let result = commands::test::test_connection(&config_dir, &overrides).await?;
            println!("{}", result.message);
            if let Some(details) = &result.details {
                println!("  {}", details);
            }
            Ok(result.success)
        }
        Commands::Config { action } => {
            match action {
                ConfigAction::Show { reveal } => {
                    println!("{}", commands::config::show_config(&config_dir, reveal)?);
                }
                ConfigAction::Set(update) => {
                    commands::config::update_config(&config_dir, &update)?;
                    println!("配置已保存");
                }
            }
            Ok(true)
        }
        Commands::Log {
            enabled,
            level,
            max_size_mb,
        } => {
            let config = commands::log::set_log_config(
                &config_dir,
                enabled,
                max_size_mb,
                level.as_deref(),
            )?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("错误: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
