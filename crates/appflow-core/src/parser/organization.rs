//! 組織ノードのパース

use super::app::{AppDraft, parse_app};
use crate::error::{ConfigError, Result};
use kdl::KdlNode;
use std::collections::BTreeMap;

/// organization ノードをパース
///
/// 組織内のアプリ定義を ID → ドラフト のマップで返します。
/// 同名アプリが複数回宣言された場合はマージされます。
pub fn parse_organization(node: &KdlNode) -> Result<(String, BTreeMap<String, AppDraft>)> {
    let id = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| ConfigError::InvalidConfig("organization requires an id".to_string()))?
        .to_string();

    let mut apps: BTreeMap<String, AppDraft> = BTreeMap::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == "app" {
                let (app_id, draft) = parse_app(child)?;
                if let Some(existing) = apps.get_mut(&app_id) {
                    existing.merge(draft);
                } else {
                    apps.insert(app_id, draft);
                }
            }
        }
    }

    Ok((id, apps))
}
