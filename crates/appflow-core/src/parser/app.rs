//! アプリノードのパース

use crate::error::{ConfigError, Result};
use crate::model::{AppDefinition, default_health_path, default_max_restarts};
use kdl::KdlNode;
use std::collections::HashMap;
use std::path::PathBuf;

/// パース途中のアプリ定義
///
/// 必須フィールドの検証前の形。同名アプリが複数回宣言された場合は
/// merge で後勝ちマージされ、最後に validate で AppDefinition になります。
#[derive(Debug, Clone, Default)]
pub struct AppDraft {
    pub name: Option<String>,
    pub port: Option<u16>,
    pub workdir: Option<PathBuf>,
    pub command: Vec<String>,
    pub environment: HashMap<String, String>,
    pub health_path: Option<String>,
    pub max_restarts: Option<u32>,
    pub auth: Option<String>,
    pub lifecycle: Option<String>,
    pub description: Option<String>,
    pub entrypoint: Option<String>,
}

impl AppDraft {
    /// 他のドラフトをマージする（otherで定義されたフィールドが優先）
    pub fn merge(&mut self, other: AppDraft) {
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.workdir.is_some() {
            self.workdir = other.workdir;
        }
        if other.health_path.is_some() {
            self.health_path = other.health_path;
        }
        if other.max_restarts.is_some() {
            self.max_restarts = other.max_restarts;
        }
        if other.auth.is_some() {
            self.auth = other.auth;
        }
        if other.lifecycle.is_some() {
            self.lifecycle = other.lifecycle;
        }
        if other.description.is_some() {
            self.description = other.description;
        }
        if other.entrypoint.is_some() {
            self.entrypoint = other.entrypoint;
        }

        if !other.command.is_empty() {
            self.command = other.command;
        }

        for (key, value) in other.environment {
            self.environment.insert(key, value);
        }
    }

    /// 必須フィールドを検証して AppDefinition に変換
    pub fn validate(self, organization: &str, id: &str) -> Result<AppDefinition> {
        let missing = |field: &str| ConfigError::MissingField {
            app: format!("{}.{}", organization, id),
            field: field.to_string(),
        };

        let port = self.port.ok_or_else(|| missing("port"))?;
        let workdir = self.workdir.ok_or_else(|| missing("workdir"))?;
        if self.command.is_empty() {
            return Err(missing("command"));
        }

        Ok(AppDefinition {
            organization: organization.to_string(),
            id: id.to_string(),
            name: self.name.unwrap_or_else(|| id.to_string()),
            port,
            workdir,
            command: self.command,
            environment: self.environment,
            health_path: self.health_path.unwrap_or_else(default_health_path),
            max_restarts: self.max_restarts.unwrap_or_else(default_max_restarts),
            auth: self.auth.unwrap_or_else(|| "none".to_string()),
            lifecycle: self.lifecycle.unwrap_or_else(|| "active".to_string()),
            description: self.description.unwrap_or_default(),
            entrypoint: self.entrypoint,
        })
    }
}

/// app ノードをパース
pub fn parse_app(node: &KdlNode) -> Result<(String, AppDraft)> {
    let id = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| ConfigError::InvalidConfig("app requires an id".to_string()))?
        .to_string();

    let mut draft = AppDraft::default();

    // 名前付き引数: port= name=
    if let Some(port) = node.get("port").and_then(|e| e.as_integer()) {
        draft.port = Some(parse_port_value(port, &id)?);
    }
    if let Some(name) = node.get("name").and_then(|e| e.as_string()) {
        draft.name = Some(name.to_string());
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "name" => {
                    draft.name = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(|s| s.to_string());
                }
                "port" => {
                    if let Some(entry) = child.entries().first()
                        && let Some(value) = entry.value().as_integer()
                    {
                        draft.port = Some(parse_port_value(value, &id)?);
                    }
                }
                "workdir" => {
                    draft.workdir = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(PathBuf::from);
                }
                "command" => {
                    draft.command = child
                        .entries()
                        .iter()
                        .filter_map(|e| e.value().as_string().map(|s| s.to_string()))
                        .collect();
                }
                // env と environment 両方をサポート
                "environment" | "env" => {
                    if let Some(envs) = child.children() {
                        for env_node in envs.nodes() {
                            let key = env_node.name().value().to_string();
                            let value = env_node
                                .entries()
                                .first()
                                .and_then(|e| e.value().as_string())
                                .unwrap_or("")
                                .to_string();
                            draft.environment.insert(key, value);
                        }
                    } else if let Some(val) =
                        child.entries().first().and_then(|e| e.value().as_string())
                    {
                        // 子ノードがない場合は、フラットな env "KEY=VALUE" 形式をサポート
                        if let Some((k, v)) = val.split_once('=') {
                            draft
                                .environment
                                .insert(k.trim().to_string(), v.trim().to_string());
                        }
                    }
                }
                "health_path" => {
                    draft.health_path = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(|s| s.to_string());
                }
                "max_restarts" => {
                    if let Some(entry) = child.entries().first()
                        && let Some(value) = entry.value().as_integer()
                    {
                        draft.max_restarts = Some(value.clamp(0, u32::MAX as i128) as u32);
                    }
                }
                "auth" => {
                    draft.auth = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(|s| s.to_string());
                }
                "status" => {
                    draft.lifecycle = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(|s| s.to_string());
                }
                "description" => {
                    draft.description = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(|s| s.to_string());
                }
                "entrypoint" => {
                    draft.entrypoint = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(|s| s.to_string());
                }
                _ => {}
            }
        }
    }

    Ok((id, draft))
}

fn parse_port_value(value: i128, app: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| {
        ConfigError::InvalidConfig(format!("app '{}' の port '{}' が不正です", app, value))
    })
}
