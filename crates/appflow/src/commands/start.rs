use appflow_core::{Fleet, ProcessKey};
use appflow_supervisor::Supervisor;
use colored::Colorize;

pub async fn handle(fleet: &Fleet, key: Option<String>) -> anyhow::Result<()> {
    let supervisor = Supervisor::new(fleet)?;

    match key {
        Some(key) => {
            let key: ProcessKey = key.parse()?;
            println!("{}", format!("プロセス '{}' を起動中...", key).green());

            supervisor.start_one(&key).await?;

            println!();
            println!("{}", format!("✓ '{}' を起動しました", key).green().bold());
            Ok(())
        }
        None => run_foreground(fleet, &supervisor).await,
    }
}

/// 全プロセスを起動し、Ctrl-Cまでヘルスチェックループを回す
async fn run_foreground(fleet: &Fleet, supervisor: &Supervisor) -> anyhow::Result<()> {
    println!(
        "{}",
        format!("アプリ一覧 ({} 個):", fleet.app_count()).bold()
    );
    for definition in fleet.definitions() {
        println!(
            "  • {} (port {})",
            definition.key().to_string().cyan(),
            definition.port
        );
    }
    println!();

    let results = supervisor.start_all().await;
    let mut started = 0;
    for (key, result) in &results {
        match result {
            Ok(()) => {
                started += 1;
                println!("  {} {}", "✓".green(), key);
            }
            Err(e) => println!("  {} {}: {}", "✗".red(), key, e),
        }
    }

    println!();
    println!(
        "{}",
        format!("✓ {}/{} プロセスを起動しました", started, results.len())
            .green()
            .bold()
    );
    println!(
        "{}",
        "ヘルスチェックループ稼働中。Ctrl-Cで全プロセスを停止して終了します".dimmed()
    );

    tokio::signal::ctrl_c().await?;

    println!();
    println!("{}", "停止シグナルを受信しました。シャットダウン中...".yellow());

    let results = supervisor.stop_all().await;
    for (key, result) in &results {
        match result {
            Ok(()) => println!("  {} {}", "✓".green(), key),
            Err(e) => println!("  {} {}: {}", "✗".red(), key, e),
        }
    }

    println!();
    println!("{}", "✓ シャットダウン完了".green().bold());
    Ok(())
}
