use appflow_core::{Fleet, ProcessStatus};
use appflow_supervisor::{AppSnapshot, Supervisor};
use colored::Colorize;

pub async fn handle(fleet: &Fleet, json: bool) -> anyhow::Result<()> {
    let supervisor = Supervisor::new(fleet)?;

    // 1回分のスイープで現在のヘルス状態を取得してからスナップショット
    // （自動再起動はしない）
    supervisor.health_checker().sweep_once(false).await;
    let snapshot = supervisor.status();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!();
    for (organization, apps) in &snapshot.groups {
        println!("{}", organization.bold());
        for app in apps {
            print_app_row(app);
        }
        println!();
    }

    if snapshot.groups.is_empty() {
        println!("{}", "登録されているプロセスはありません".dimmed());
        println!();
    }

    let summary = &snapshot.summary;
    println!(
        "合計: {}  実行中: {}  正常: {}  停止: {}",
        summary.total,
        summary.running.to_string().green(),
        summary.healthy.to_string().green(),
        summary.stopped.to_string().dimmed()
    );
    Ok(())
}

fn print_app_row(app: &AppSnapshot) {
    let marker = match app.status {
        ProcessStatus::Running => "●".green(),
        ProcessStatus::Starting => "●".cyan(),
        ProcessStatus::Unhealthy => "●".yellow(),
        ProcessStatus::Stopping => "●".yellow(),
        ProcessStatus::Failed => "●".red(),
        ProcessStatus::Stopped => "●".dimmed(),
    };

    let pid = app
        .pid
        .map(|p| format!("pid {}", p))
        .unwrap_or_else(|| "-".to_string());

    println!(
        "  {} {} (port {}) [{}] {}",
        marker,
        app.name.cyan(),
        app.port,
        app.lifecycle,
        pid.dimmed()
    );

    let detail = if app.health_detail.is_empty() {
        "unknown".to_string()
    } else {
        app.health_detail.clone()
    };
    let mut info = format!("health: {}", detail);
    if app.restart_count > 0 {
        info.push_str(&format!("  restarts: {}", app.restart_count));
    }
    if let Some(checked) = app.last_health_check {
        info.push_str(&format!("  checked: {}", checked.format("%H:%M:%S")));
    }
    println!("      {}", info.dimmed());
}
