use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use roster_manager_lib::{
    config::AppConfig,
    domain::{models::Roster, recurrence::{occurrences_for_month, BUILTIN_EVENT_TYPES}},
    infrastructure::naming::{sanitize_name, unsanitize_name},
    telemetry::init_tracing,
    AppServices,
};

// 引数を構造体として定義します
#[derive(Parser)]
#[command(name = "roster_tools")]
#[command(version = "0.1.0")]
#[command(about = "roster-managerに関わるデータの操作をします", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 旧形式のロスター (ministry / sundays / 文字列の担当) を現在の形式に書き直します
    MigrateRoster {
        /// ロスターのファイル
        file: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// 文書名をリモート上の別名に変換します
    Sanitize { name: String },
    /// リモート上の別名を文書名に戻します
    Unsanitize { alias: String },
    /// 指定した月のイベント開催日を表示します
    Occurrences {
        /// 例: "October 2025"
        #[arg(short, long)]
        month: String,

        /// 例: "Sunday Service - 9:30 AM" (省略時は組み込みの全種別)
        #[arg(short, long)]
        event: Option<String>,
    },
    /// リモートの内容でローカルを作り直します
    Sync {
        /// 設定ファイル (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn migrate_roster(file: &Path, out: Option<&Path>) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("ファイル '{}' を読めませんでした", file.display()))?;
    let roster: Roster = serde_json::from_str(&text).context("ファイルがロスターの形式に沿っていません")?;
    let json = serde_json::to_string_pretty(&roster)?;

    match out {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("ファイル '{}' の書き込みに失敗しました", path.display()))?;
            info!(out = %path.display(), "roster migrated");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_occurrences(month: &str, event: Option<&str>) -> Result<()> {
    let events: Vec<&str> = match event {
        Some(event) => vec![event],
        None => BUILTIN_EVENT_TYPES.to_vec(),
    };

    for event in events {
        let occurrences = occurrences_for_month(month, event);
        if occurrences.is_empty() {
            bail!("'{month}' の {event} には開催日がありません");
        }
        println!("# {event}");
        for occurrence in occurrences {
            println!("{}\t{}", occurrence.date, occurrence.label());
        }
    }
    Ok(())
}

async fn sync(config: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config)?;
    init_tracing(&config.log_filter);

    let services = AppServices::connect(&config).await?;
    let count = services.store.force_sync_from_remote().await?;
    println!("{count} 件の文書を同期しました");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // パターンマッチで分岐処理
    match args.command {
        Commands::MigrateRoster { file, out } => {
            init_tracing("info");
            migrate_roster(&file, out.as_deref())
        }
        Commands::Sanitize { name } => {
            println!("{}", sanitize_name(&name));
            Ok(())
        }
        Commands::Unsanitize { alias } => {
            println!("{}", unsanitize_name(&alias));
            Ok(())
        }
        Commands::Occurrences { month, event } => print_occurrences(&month, event.as_deref()),
        Commands::Sync { config } => sync(config.as_deref()).await,
    }
}
