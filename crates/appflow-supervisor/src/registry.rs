//! プロセスレジストリ
//!
//! 全管理対象プロセスの静的定義と実行時状態を、単一の同期境界の内側で
//! 保持します。状態へのアクセスはすべてこのモジュールを経由します。

use crate::error::{Result, SupervisorError};
use appflow_core::{AppDefinition, ProcessKey, ProcessRuntimeState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::process::Child;

/// レジストリエントリ
///
/// 定義1つにつき1エントリ。エントリは削除されず、停止時に
/// 実行時フィールドがリセットされるだけです。
struct ProcessEntry {
    definition: AppDefinition,
    state: ProcessRuntimeState,
    /// 管理下で起動したOSプロセスのハンドル（キーあたり同時に最大1つ）
    child: Option<Child>,
    /// キー単位の操作ロック。start/stop/restartと自動再起動を
    /// 同一キーに対して直列化する
    op_lock: Arc<tokio::sync::Mutex<()>>,
}

/// プロセスレジストリ
///
/// マップ全体は std::sync::Mutex で保護します。ガードを await を跨いで
/// 保持してはいけません。複数フィールドの更新は mutate のクロージャ内で
/// 行うことで、部分更新が観測されないことを保証します。
pub struct ProcessRegistry {
    entries: Mutex<HashMap<ProcessKey, ProcessEntry>>,
}

impl ProcessRegistry {
    /// 定義一覧からレジストリを構築（全エントリStopped、restart_count 0）
    pub fn load(definitions: Vec<AppDefinition>) -> Result<Self> {
        let mut entries = HashMap::new();
        for definition in definitions {
            let key = definition.key();
            if entries.contains_key(&key) {
                return Err(SupervisorError::Config(format!(
                    "プロセスキー '{}' が重複しています",
                    key
                )));
            }
            entries.insert(
                key,
                ProcessEntry {
                    definition,
                    state: ProcessRuntimeState::default(),
                    child: None,
                    op_lock: Arc::new(tokio::sync::Mutex::new(())),
                },
            );
        }
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ProcessKey, ProcessEntry>> {
        // poisonは無視して続行する（パニックしたスレッドの状態は上書きされる）
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 登録済みキーをソート順で返す
    pub fn list_keys(&self) -> Vec<ProcessKey> {
        let entries = self.lock();
        let mut keys: Vec<ProcessKey> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// アプリ定義を引く
    pub fn definition(&self, key: &ProcessKey) -> Result<AppDefinition> {
        let entries = self.lock();
        entries
            .get(key)
            .map(|e| e.definition.clone())
            .ok_or_else(|| SupervisorError::ProcessNotFound(key.to_string()))
    }

    /// 定義と実行時状態のスナップショットを取得
    pub fn get(&self, key: &ProcessKey) -> Result<(AppDefinition, ProcessRuntimeState)> {
        let entries = self.lock();
        entries
            .get(key)
            .map(|e| (e.definition.clone(), e.state.clone()))
            .ok_or_else(|| SupervisorError::ProcessNotFound(key.to_string()))
    }

    /// 実行時状態を更新する
    ///
    /// 複数フィールドの更新はこのクロージャ内で完結させること。
    pub fn mutate<F>(&self, key: &ProcessKey, f: F) -> Result<()>
    where
        F: FnOnce(&mut ProcessRuntimeState),
    {
        let mut entries = self.lock();
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| SupervisorError::ProcessNotFound(key.to_string()))?;
        f(&mut entry.state);
        Ok(())
    }

    /// キー単位の操作ロックを取得する
    pub fn op_lock(&self, key: &ProcessKey) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let entries = self.lock();
        entries
            .get(key)
            .map(|e| e.op_lock.clone())
            .ok_or_else(|| SupervisorError::ProcessNotFound(key.to_string()))
    }

    /// 起動したプロセスハンドルを登録する
    pub fn put_child(&self, key: &ProcessKey, child: Child) -> Result<()> {
        let mut entries = self.lock();
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| SupervisorError::ProcessNotFound(key.to_string()))?;
        entry.child = Some(child);
        Ok(())
    }

    /// プロセスハンドルを取り出す（以後このキーは未所有になる）
    pub fn take_child(&self, key: &ProcessKey) -> Result<Option<Child>> {
        let mut entries = self.lock();
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| SupervisorError::ProcessNotFound(key.to_string()))?;
        Ok(entry.child.take())
    }

    /// 管理ハンドルが生存しているか
    ///
    /// try_waitは終了済みプロセスをここで回収する。終了後の呼び出しは
    /// キャッシュされたexit statusを返すため冪等。
    pub fn alive(&self, key: &ProcessKey) -> bool {
        let mut entries = self.lock();
        match entries.get_mut(key).and_then(|e| e.child.as_mut()) {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// 全エントリのスナップショット（ステータス出力用）
    pub fn snapshot(&self) -> Vec<(ProcessKey, AppDefinition, ProcessRuntimeState)> {
        let entries = self.lock();
        let mut rows: Vec<_> = entries
            .iter()
            .map(|(key, e)| (key.clone(), e.definition.clone(), e.state.clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appflow_core::ProcessStatus;
    use std::path::PathBuf;

    fn definition(org: &str, id: &str, port: u16) -> AppDefinition {
        AppDefinition {
            organization: org.to_string(),
            id: id.to_string(),
            name: id.to_string(),
            port,
            workdir: PathBuf::from("/tmp"),
            command: vec!["sleep".to_string(), "30".to_string()],
            environment: HashMap::new(),
            health_path: "/".to_string(),
            max_restarts: 3,
            auth: "none".to_string(),
            lifecycle: "active".to_string(),
            description: String::new(),
            entrypoint: None,
        }
    }

    #[test]
    fn test_load_initializes_stopped() {
        let registry = ProcessRegistry::load(vec![
            definition("kb", "a", 9001),
            definition("kb", "b", 9002),
        ])
        .unwrap();

        assert_eq!(registry.list_keys().len(), 2);
        let key = ProcessKey::new("kb", "a");
        let (_, state) = registry.get(&key).unwrap();
        assert_eq!(state.status, ProcessStatus::Stopped);
        assert_eq!(state.restart_count, 0);
        assert!(state.pid.is_none());
        assert!(!registry.alive(&key));
    }

    #[test]
    fn test_load_rejects_duplicate_key() {
        let result = ProcessRegistry::load(vec![
            definition("kb", "a", 9001),
            definition("kb", "a", 9002),
        ]);
        assert!(matches!(result, Err(SupervisorError::Config(_))));
    }

    #[test]
    fn test_unknown_key() {
        let registry = ProcessRegistry::load(vec![definition("kb", "a", 9001)]).unwrap();
        let key = ProcessKey::new("kb", "missing");

        assert!(matches!(
            registry.get(&key),
            Err(SupervisorError::ProcessNotFound(_))
        ));
        assert!(matches!(
            registry.mutate(&key, |_| {}),
            Err(SupervisorError::ProcessNotFound(_))
        ));
    }

    #[test]
    fn test_mutate_multi_field() {
        let registry = ProcessRegistry::load(vec![definition("kb", "a", 9001)]).unwrap();
        let key = ProcessKey::new("kb", "a");

        registry
            .mutate(&key, |state| {
                state.pid = Some(1234);
                state.status = ProcessStatus::Running;
                state.restart_count += 1;
            })
            .unwrap();

        let (_, state) = registry.get(&key).unwrap();
        assert_eq!(state.pid, Some(1234));
        assert_eq!(state.status, ProcessStatus::Running);
        assert_eq!(state.restart_count, 1);
    }
}
