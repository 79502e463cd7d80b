use appflow_core::{Fleet, ProcessKey};
use appflow_supervisor::Supervisor;
use colored::Colorize;

pub async fn handle(fleet: &Fleet, key: String) -> anyhow::Result<()> {
    let key: ProcessKey = key.parse()?;
    println!("{}", format!("プロセス '{}' を再起動中...", key).yellow());

    let supervisor = Supervisor::new(fleet)?;
    supervisor.restart_one(&key).await?;

    println!();
    println!(
        "{}",
        format!("✓ '{}' を再起動しました", key).green().bold()
    );
    Ok(())
}
