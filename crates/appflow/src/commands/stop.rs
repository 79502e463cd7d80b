use appflow_core::{Fleet, ProcessKey};
use appflow_supervisor::{Supervisor, is_port_in_use};
use colored::Colorize;
use std::time::Duration;

pub async fn handle(fleet: &Fleet, key: Option<String>) -> anyhow::Result<()> {
    let supervisor = Supervisor::new(fleet)?;

    match key {
        Some(key) => {
            let key: ProcessKey = key.parse()?;
            println!("{}", format!("プロセス '{}' を停止中...", key).yellow());

            supervisor.stop_one(&key).await?;
            warn_if_port_still_occupied(fleet, &key).await;

            println!();
            println!("{}", format!("✓ '{}' を停止しました", key).green().bold());
            Ok(())
        }
        None => {
            println!("{}", "全プロセスを停止中...".yellow());

            let results = supervisor.stop_all().await;
            let mut failed = 0;
            for (key, result) in &results {
                match result {
                    Ok(()) => {
                        println!("  {} {}", "✓".green(), key);
                        warn_if_port_still_occupied(fleet, key).await;
                    }
                    Err(e) => {
                        failed += 1;
                        println!("  {} {}: {}", "✗".red(), key, e);
                    }
                }
            }

            println!();
            if failed == 0 {
                println!("{}", "✓ 全プロセスを停止しました".green().bold());
            } else {
                println!(
                    "{}",
                    format!("{} 個のプロセスの停止に失敗しました", failed).red()
                );
            }
            Ok(())
        }
    }
}

/// このスーパーバイザの管理外プロセスがポートを占有している場合に知らせる
async fn warn_if_port_still_occupied(fleet: &Fleet, key: &ProcessKey) {
    let Some(definition) = fleet.definition(key) else {
        return;
    };
    if is_port_in_use(definition.port, Duration::from_millis(500)).await {
        println!(
            "  {}",
            format!(
                "ℹ ポート {} は管理外のプロセスが占有しています（停止されません）",
                definition.port
            )
            .dimmed()
        );
    }
}
