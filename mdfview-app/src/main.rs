use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use mdfview_config::{AppConfig, ConfigError};
use mdfview_frontend::{FrontendError, RenderOptions, cli};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "mdfview", about = "MDF 裁切图 DXF 查看器")]
#[command(version)]
struct Cli {
    /// 配置文件路径
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 从本地目录读取图纸（覆盖配置）
    #[arg(long, global = true)]
    source_dir: Option<PathBuf>,

    /// 从后端地址读取图纸（覆盖配置）
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 渲染为 SVG
    Render(RenderArgs),
    /// 打印实体、统计与诊断信息
    Inspect(InspectArgs),
    /// 原样保存 DXF 文件
    Download(DownloadArgs),
}

#[derive(Args)]
struct RenderArgs {
    id: String,
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// 视图命令，例如 `zoom_in`、`pan 10 -5`，可重复
    #[arg(long = "view")]
    view: Vec<String>,
}

#[derive(Args)]
struct InspectArgs {
    id: String,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DownloadArgs {
    id: String,
    #[arg(long)]
    to: Option<PathBuf>,
    #[arg(long)]
    filename: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (mut config, fallback) = match load_configuration(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(err) => {
            init_logging(&AppConfig::default());
            if let Some(path) = &cli.config {
                error!(path = %path.display(), error = %err, "加载指定配置失败");
            }
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config);
    if let Some(err) = fallback {
        warn!(error = %err, "加载默认配置失败，使用内建默认值");
    }
    if let Some(dir) = cli.source_dir.clone() {
        config.source.directory = Some(dir);
    }
    if let Some(url) = cli.base_url.clone() {
        config.source.directory = None;
        config.source.base_url = Some(url);
    }
    info!("启动 MDF 裁切图查看器");

    let result = match cli.command {
        Commands::Render(args) => cli::render(
            &config,
            &RenderOptions {
                id: args.id,
                out: args.out,
                width: args.width,
                height: args.height,
                view_commands: args.view,
            },
        )
        .map(|_| ()),
        Commands::Inspect(args) => cli::inspect(&config, &args.id, args.json).map(|_| ()),
        Commands::Download(args) => cli::download(
            &config,
            &args.id,
            args.to.as_deref(),
            args.filename.as_deref(),
        )
        .map(|_| ()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err);
            ExitCode::FAILURE
        }
    }
}

fn report_failure(err: &FrontendError) {
    match err {
        FrontendError::LoadFailed {
            retryable: true, ..
        } => error!(error = %err, "加载失败，可稍后重试"),
        _ => error!(error = %err, "执行失败"),
    }
}

/// 显式指定的配置文件必须可用；自动发现的配置出错时退回内建默认值，
/// 错误随默认配置一起返回，待日志初始化后再输出。
fn load_configuration(
    override_path: Option<&Path>,
) -> Result<(AppConfig, Option<ConfigError>), ConfigError> {
    match override_path {
        Some(path) => AppConfig::from_file(path).map(|config| (config, None)),
        None => match AppConfig::discover() {
            Ok(config) => Ok((config, None)),
            Err(err) => Ok((AppConfig::default(), Some(err))),
        },
    }
}

/// `RUST_LOG` 优先，其次为配置中的等级，都无效时使用 `info`。
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
