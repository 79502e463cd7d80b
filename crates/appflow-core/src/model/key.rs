//! プロセスキー

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ProcessKey - 管理対象プロセスの一意な識別子
///
/// `organization_id.app_id` 形式の複合キー。
/// CLIやステータス出力ではドット区切りの文字列として扱われます。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ProcessKey {
    pub organization: String,
    pub app: String,
}

impl ProcessKey {
    pub fn new(organization: impl Into<String>, app: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            app: app.into(),
        }
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.organization, self.app)
    }
}

impl FromStr for ProcessKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((org, app)) if !org.is_empty() && !app.is_empty() && !app.contains('.') => {
                Ok(Self::new(org, app))
            }
            _ => Err(ConfigError::InvalidKey(s.to_string())),
        }
    }
}

impl From<ProcessKey> for String {
    fn from(key: ProcessKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for ProcessKey {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_key() {
        let key: ProcessKey = "chronista.api".parse().unwrap();
        assert_eq!(key.organization, "chronista");
        assert_eq!(key.app, "api");
        assert_eq!(key.to_string(), "chronista.api");
    }

    #[test]
    fn test_parse_invalid_keys() {
        assert!("chronista".parse::<ProcessKey>().is_err());
        assert!(".api".parse::<ProcessKey>().is_err());
        assert!("chronista.".parse::<ProcessKey>().is_err());
        assert!("a.b.c".parse::<ProcessKey>().is_err());
        assert!("".parse::<ProcessKey>().is_err());
    }
}
