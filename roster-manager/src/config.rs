// =====================
// 設定
// =====================
//
// 既定値 -> YAML ファイル (任意) -> 環境変数 ROSTER_* の順に上書きする。

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_PREFIX: &str = "ROSTER_";

#[derive(Debug, Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(#[from] Box<figment::Error>);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct AppConfig {
    /// ファイル版ローカルストアのルート
    pub data_dir: PathBuf,
    /// リモート文書ストアの接続文字列
    pub remote_url: String,
    pub remote_max_connections: u32,
    /// アクティビティログに残す件数
    pub activity_log_limit: usize,
    /// 変更申請できる日程の範囲 (日)
    pub request_window_days: i64,
    /// reviewedBy に記録する名前
    pub reviewer_name: String,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./roster-data"),
            remote_url: "sqlite://roster-remote.db?mode=rwc".to_string(),
            remote_max_connections: 5,
            activity_log_limit: 10,
            request_window_days: 30,
            reviewer_name: "Admin".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// file が None なら既定値と環境変数だけを使う
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = file {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| ConfigError(Box::new(e)))
    }
}
