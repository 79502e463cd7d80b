use appflow_core::Fleet;
use colored::Colorize;

pub fn handle(fleet: &Fleet) -> anyhow::Result<()> {
    // ロードが通った時点で必須フィールドの検証は済んでいる
    println!("{}", "✓ 設定は有効です".green().bold());
    println!();
    println!("プロジェクト: {}", fleet.name.cyan());
    println!(
        "組織: {} 個 / アプリ: {} 個",
        fleet.organizations.len(),
        fleet.app_count()
    );
    println!();

    for (org_id, organization) in &fleet.organizations {
        println!("{}", org_id.bold());
        for (app_id, app) in &organization.apps {
            println!(
                "  • {} (port {}) → {}",
                app_id.cyan(),
                app.port,
                app.command.join(" ").dimmed()
            );
        }
    }

    println!();
    println!(
        "ヘルスチェック間隔: {}秒 / 自動再起動: {}",
        fleet.settings.health_check_interval,
        if fleet.settings.auto_restart {
            "有効".green()
        } else {
            "無効".dimmed()
        }
    );
    Ok(())
}
