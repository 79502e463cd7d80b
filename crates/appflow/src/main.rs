mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "appflow")]
#[command(about = "ポートに紐づくアプリ群を、起動から復旧まで。", long_about = None)]
struct Cli {
    /// 設定ファイルのパス（省略時は apps.kdl を自動発見）
    #[arg(short, long, global = true, env = "APPFLOW_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// プロセスを起動（キー省略時は全プロセスを起動してフォアグラウンドで監視）
    Start {
        /// プロセスキー (organization.app)
        key: Option<String>,
    },
    /// プロセスを停止
    Stop {
        /// プロセスキー (organization.app)。省略時は全プロセス
        key: Option<String>,
    },
    /// プロセスを再起動
    Restart {
        /// プロセスキー (organization.app)
        key: String,
    },
    /// フリートの状態を表示
    Status {
        /// JSON形式で出力
        #[arg(long)]
        json: bool,
    },
    /// 設定を検証
    Validate,
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrに出力（RUST_LOGでフィルタ）
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("appflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // 設定ファイルをロード（ConfigErrorのみが起動を中断できる）
    let fleet = match &cli.config {
        Some(path) => appflow_core::load_fleet_from_path(path)?,
        None => appflow_core::load_fleet()?,
    };

    match cli.command {
        Commands::Start { key } => commands::start::handle(&fleet, key).await,
        Commands::Stop { key } => commands::stop::handle(&fleet, key).await,
        Commands::Restart { key } => commands::restart::handle(&fleet, key).await,
        Commands::Status { json } => commands::status::handle(&fleet, json).await,
        Commands::Validate => commands::validate::handle(&fleet),
        Commands::Version => unreachable!(),
    }
}
