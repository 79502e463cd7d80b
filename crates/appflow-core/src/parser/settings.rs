//! 設定ノードのパース

use crate::model::{GlobalSettings, LifecycleConfig};
use kdl::KdlNode;

/// settings ノードをパース
pub fn parse_settings(node: &KdlNode) -> GlobalSettings {
    let mut settings = GlobalSettings::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "health_check_interval" => {
                    if let Some(entry) = child.entries().first()
                        && let Some(value) = entry.value().as_integer()
                    {
                        settings.health_check_interval = value as u64;
                    }
                }
                "auto_restart" => {
                    if let Some(value) = child.entries().first().and_then(|e| e.value().as_bool()) {
                        settings.auto_restart = value;
                    }
                }
                "lifecycle" => {
                    settings.lifecycle = parse_lifecycle(child);
                }
                _ => {}
            }
        }
    }

    settings
}

/// lifecycle ノードをパース（名前付き引数形式）
fn parse_lifecycle(node: &KdlNode) -> LifecycleConfig {
    let mut config = LifecycleConfig::default();

    if let Some(value) = node.get("settle_ms").and_then(|e| e.as_integer()) {
        config.settle_ms = value as u64;
    }
    if let Some(value) = node.get("stop_timeout_secs").and_then(|e| e.as_integer()) {
        config.stop_timeout_secs = value as u64;
    }
    if let Some(value) = node.get("stop_poll_ms").and_then(|e| e.as_integer()) {
        config.stop_poll_ms = value as u64;
    }
    if let Some(value) = node.get("probe_timeout_secs").and_then(|e| e.as_integer()) {
        config.probe_timeout_secs = value as u64;
    }
    if let Some(value) = node.get("port_probe_timeout_ms").and_then(|e| e.as_integer()) {
        config.port_probe_timeout_ms = value as u64;
    }
    if let Some(value) = node
        .get("loop_join_timeout_secs")
        .and_then(|e| e.as_integer())
    {
        config.loop_join_timeout_secs = value as u64;
    }

    config
}
