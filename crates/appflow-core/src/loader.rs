//! 統合ローダー
//!
//! ファイル発見とパースを統合します。

use crate::discovery::find_config_file;
use crate::error::Result;
use crate::model::Fleet;
use crate::parser::parse_kdl_file;
use std::path::Path;
use tracing::{info, instrument};

/// 設定ファイルを発見してFleetをロード
#[instrument]
pub fn load_fleet() -> Result<Fleet> {
    let path = find_config_file()?;
    load_fleet_from_path(&path)
}

/// 指定されたパスからFleetをロード
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn load_fleet_from_path<P: AsRef<Path>>(path: P) -> Result<Fleet> {
    let fleet = parse_kdl_file(path)?;
    info!(
        organizations = fleet.organizations.len(),
        apps = fleet.app_count(),
        "Fleet loaded successfully"
    );
    Ok(fleet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_fleet_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.kdl");
        fs::write(
            &path,
            r#"
project "demo"

organization "kb" {
    app "tracker" port=9001 {
        workdir "/tmp"
        command "sleep" "30"
    }
}
"#,
        )
        .unwrap();

        let fleet = load_fleet_from_path(&path).unwrap();
        assert_eq!(fleet.name, "demo");
        assert_eq!(fleet.app_count(), 1);
    }

    #[test]
    fn test_load_fleet_invalid_kdl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.kdl");
        fs::write(&path, "organization \"kb\" {").unwrap();

        assert!(load_fleet_from_path(&path).is_err());
    }
}
