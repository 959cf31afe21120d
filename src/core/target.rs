// ターゲット設定の値オブジェクト
//
// 1つの (インスタンス, スキーマ) に対する解決済みの設定値を表現します。
// 接続ハンドルを含む実行コンテキストは services::target_context を参照してください。

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// サーバーのフレーバー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    #[default]
    #[serde(rename = "mysql")]
    MySQL,
    #[serde(rename = "mariadb")]
    MariaDB,
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flavor::MySQL => write!(f, "mysql"),
            Flavor::MariaDB => write!(f, "mariadb"),
        }
    }
}

/// サーバーバージョン
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerVersion {
    pub flavor: Flavor,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    /// 新しいサーバーバージョンを作成
    pub fn new(flavor: Flavor, major: u32, minor: u32, patch: u32) -> Self {
        Self {
            flavor,
            major,
            minor,
            patch,
        }
    }

    /// "8.0.32" や "10.6" 形式の文字列からパース
    ///
    /// "5.7.44-log" のような接尾辞は無視します。
    pub fn parse(flavor: Flavor, version: &str) -> Result<Self> {
        let numeric = version
            .trim()
            .split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .next()
            .unwrap_or_default();

        let mut parts = numeric.split('.').filter(|p| !p.is_empty());
        let major = parts
            .next()
            .ok_or_else(|| anyhow!("Invalid server version '{}'", version))?
            .parse::<u32>()
            .with_context(|| format!("Invalid server version '{}'", version))?;
        let minor = parts.next().map(str::parse::<u32>).transpose()?.unwrap_or(0);
        let patch = parts.next().map(str::parse::<u32>).transpose()?.unwrap_or(0);

        Ok(Self::new(flavor, major, minor, patch))
    }

    /// ALTER TABLE の ALGORITHM / LOCK 句をサポートしているか
    ///
    /// MySQL 5.6 以降、MariaDB 10.0 以降でサポートされます。
    pub fn supports_online_ddl_clauses(&self) -> bool {
        match self.flavor {
            Flavor::MySQL => (self.major, self.minor) >= (5, 6),
            Flavor::MariaDB => self.major >= 10,
        }
    }
}

impl Default for ServerVersion {
    fn default() -> Self {
        Self::new(Flavor::MySQL, 8, 0, 0)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}.{}", self.flavor, self.major, self.minor, self.patch)
    }
}

/// ラッパー設定
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrapperSettings {
    /// すべてのDDLに使用する外部コマンドテンプレート（空は未設定）
    pub ddl_wrapper: String,
    /// 大きなテーブルのALTERに使用する外部コマンドテンプレート（空は未設定）
    pub alter_wrapper: String,
    /// alter-wrapper を使用する最小推定行数
    pub alter_wrapper_min_size: u64,
}

impl WrapperSettings {
    /// ddl-wrapper が設定されているか
    pub fn has_ddl_wrapper(&self) -> bool {
        !self.ddl_wrapper.trim().is_empty()
    }

    /// alter-wrapper が設定されているか
    pub fn has_alter_wrapper(&self) -> bool {
        !self.alter_wrapper.trim().is_empty()
    }
}

/// 接続パラメータ
///
/// 直接実行の接続と、ラッパーテンプレートのプレースホルダーの両方に使用されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub socket: Option<String>,
    pub user: String,
    pub password: Option<String>,
    /// セッション変数（例: "sql_mode='STRICT_ALL_TABLES',innodb_lock_wait_timeout=60"）
    pub connect_options: String,
    /// 環境名（例: production）
    pub environment: String,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3306,
            socket: None,
            user: "root".to_string(),
            password: None,
            connect_options: String::new(),
            environment: String::new(),
        }
    }
}
