//! フリート定義

use super::app::AppDefinition;
use super::key::ProcessKey;
use super::settings::GlobalSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fleet - 管理対象アプリ群の設計図
///
/// 複数の組織と、それぞれに属するアプリ定義、およびグローバル設定を
/// まとめたもの。設定ファイル全体のパース結果に対応します。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fleet {
    /// フリート名（プロジェクト名）
    pub name: String,
    /// 組織ID → 組織定義
    pub organizations: BTreeMap<String, Organization>,
    /// グローバル設定
    #[serde(default)]
    pub settings: GlobalSettings,
}

/// 組織定義
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Organization {
    /// 組織ID
    pub id: String,
    /// アプリID → アプリ定義
    pub apps: BTreeMap<String, AppDefinition>,
}

impl Fleet {
    /// 全アプリ定義をキー順で返す
    pub fn definitions(&self) -> Vec<AppDefinition> {
        self.organizations
            .values()
            .flat_map(|org| org.apps.values().cloned())
            .collect()
    }

    /// キーでアプリ定義を引く
    pub fn definition(&self, key: &ProcessKey) -> Option<&AppDefinition> {
        self.organizations
            .get(&key.organization)
            .and_then(|org| org.apps.get(&key.app))
    }

    /// アプリ総数
    pub fn app_count(&self) -> usize {
        self.organizations.values().map(|org| org.apps.len()).sum()
    }
}
