//! KDLパーサー
//!
//! AppFlowのKDL設定ファイルをパースします。
//! 各ノードタイプのパース処理はモジュールに分離されています。

mod app;
mod organization;
mod settings;


use app::AppDraft;
use organization::parse_organization;
use settings::parse_settings;

use crate::error::Result;
use crate::model::{Fleet, Organization};
use kdl::KdlDocument;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// KDLファイルをパースしてFleetを生成
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<Fleet> {
    let content = fs::read_to_string(path.as_ref())?;
    let name = path
        .as_ref()
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    parse_kdl_string(&content, name)
}

/// KDL文字列をパース
pub fn parse_kdl_string(content: &str, default_name: String) -> Result<Fleet> {
    let doc: KdlDocument = content.parse()?;

    let mut name = default_name;
    let mut fleet_settings = None;
    let mut org_drafts: BTreeMap<String, BTreeMap<String, AppDraft>> = BTreeMap::new();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                // projectノードから名前を取得
                if let Some(project_name) =
                    node.entries().first().and_then(|e| e.value().as_string())
                {
                    name = project_name.to_string();
                }
            }
            "settings" => {
                fleet_settings = Some(parse_settings(node));
            }
            "organization" => {
                let (org_id, apps) = parse_organization(node)?;
                let existing = org_drafts.entry(org_id).or_default();
                for (app_id, draft) in apps {
                    if let Some(prev) = existing.get_mut(&app_id) {
                        prev.merge(draft);
                    } else {
                        existing.insert(app_id, draft);
                    }
                }
            }
            _ => {}
        }
    }

    // ドラフトを検証してFleetに組み立てる（必須フィールド欠落はここで弾く）
    let mut organizations = BTreeMap::new();
    for (org_id, drafts) in org_drafts {
        let mut apps = BTreeMap::new();
        for (app_id, draft) in drafts {
            let definition = draft.validate(&org_id, &app_id)?;
            apps.insert(app_id, definition);
        }
        organizations.insert(
            org_id.clone(),
            Organization {
                id: org_id,
                apps,
            },
        );
    }

    Ok(Fleet {
        name,
        organizations,
        settings: fleet_settings.unwrap_or_default(),
    })
}
