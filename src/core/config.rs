// 設定ファイル管理
//
// 設定ファイル（YAML形式）の読み込みと検証、
// 環境別の接続設定・ラッパー設定の管理を行います。

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::core::statement_modifiers::StatementModifiers;
use crate::core::target::{ConnectionParams, Flavor, ServerVersion, WrapperSettings};

/// プロジェクト設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 設定ファイルのバージョン
    pub version: String,

    /// 環境別の設定
    pub environments: HashMap<String, EnvironmentConfig>,
}

impl Config {
    /// デフォルトの設定ファイルパス
    pub const DEFAULT_CONFIG_PATH: &'static str = ".strata-applier.yaml";

    /// ファイルから設定を読み込む
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    /// 指定された環境の設定を取得
    pub fn get_environment(&self, environment: &str) -> Result<&EnvironmentConfig> {
        self.environments.get(environment).ok_or_else(|| {
            let mut available: Vec<_> = self.environments.keys().collect();
            available.sort();
            anyhow!(
                "Environment '{}' not found. Available environments: {:?}",
                environment,
                available
            )
        })
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> Result<()> {
        if self.version.is_empty() {
            return Err(anyhow!("Config file version is not specified"));
        }

        if self.environments.is_empty() {
            return Err(anyhow!(
                "At least one environment configuration is required"
            ));
        }

        for (env_name, env_config) in &self.environments {
            env_config
                .validate()
                .with_context(|| format!("Invalid config for environment '{}'", env_name))?;
        }

        Ok(())
    }
}

/// std::str::FromStrトレイトの実装
impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(yaml: &str) -> Result<Self, Self::Err> {
        serde_saphyr::from_str(yaml).with_context(|| "Failed to parse config file")
    }
}

/// 環境ごとの設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EnvironmentConfig {
    /// ホスト名
    #[serde(default = "default_host")]
    pub host: String,

    /// ポート番号
    #[serde(default = "default_port")]
    pub port: u16,

    /// UNIXソケットのパス
    #[serde(default)]
    pub socket: Option<String>,

    /// ユーザー名
    #[serde(default = "default_user")]
    pub user: String,

    /// パスワード
    #[serde(default)]
    pub password: Option<String>,

    /// セッション変数（カンマ区切りの name=value）
    #[serde(default)]
    pub connect_options: String,

    /// サーバーのフレーバー
    #[serde(default)]
    pub flavor: Flavor,

    /// サーバーバージョン（例: "8.0.32"）
    #[serde(default = "default_server_version")]
    pub server_version: String,

    /// 対象スキーマ
    pub schemas: Vec<String>,

    /// すべてのDDLに使用する外部コマンドテンプレート
    #[serde(default)]
    pub ddl_wrapper: String,

    /// 大きなテーブルのALTERに使用する外部コマンドテンプレート
    #[serde(default)]
    pub alter_wrapper: String,

    /// alter-wrapper を使用する最小推定行数
    #[serde(default)]
    pub alter_wrapper_min_size: u64,

    /// この推定行数未満のテーブルは危険な変更も許可する
    #[serde(default)]
    pub safe_below_size: u64,

    /// 危険な変更を許可するか
    #[serde(default)]
    pub allow_unsafe: bool,

    /// ALTER TABLE の ALGORITHM 句（例: inplace）
    #[serde(default)]
    pub alter_algorithm: String,

    /// ALTER TABLE の LOCK 句（例: none）
    #[serde(default)]
    pub alter_lock: String,

    /// foreign_key_checks を有効のまま実行するか
    #[serde(default = "default_foreign_key_checks")]
    pub foreign_key_checks: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3306 // MySQLのデフォルトポート
}

fn default_user() -> String {
    "root".to_string()
}

fn default_server_version() -> String {
    "8.0".to_string()
}

fn default_foreign_key_checks() -> bool {
    true
}

impl EnvironmentConfig {
    /// 環境設定を検証
    pub fn validate(&self) -> Result<()> {
        if self.schemas.is_empty() {
            return Err(anyhow!("At least one schema must be specified"));
        }
        if self.schemas.iter().any(|s| s.trim().is_empty()) {
            return Err(anyhow!("Schema names must not be empty"));
        }
        self.server()?;
        Ok(())
    }

    /// サーバーバージョンを解決
    pub fn server(&self) -> Result<ServerVersion> {
        ServerVersion::parse(self.flavor, &self.server_version)
    }

    /// ラッパー設定を取得
    pub fn wrapper_settings(&self) -> WrapperSettings {
        WrapperSettings {
            ddl_wrapper: self.ddl_wrapper.clone(),
            alter_wrapper: self.alter_wrapper.clone(),
            alter_wrapper_min_size: self.alter_wrapper_min_size,
        }
    }

    /// 接続パラメータを取得
    pub fn connection_params(&self, environment: &str) -> ConnectionParams {
        ConnectionParams {
            host: self.host.clone(),
            port: self.port,
            socket: self.socket.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            connect_options: self.connect_options.clone(),
            environment: environment.to_string(),
        }
    }

    /// 既定のステートメント修飾子を作成
    ///
    /// `allow_unsafe_override` が true の場合は設定に関わらず危険な変更を許可します。
    pub fn statement_modifiers(&self, allow_unsafe_override: bool) -> StatementModifiers {
        StatementModifiers::new()
            .with_permit_unsafe(self.allow_unsafe || allow_unsafe_override)
            .with_algorithm_clause(self.alter_algorithm.clone())
            .with_lock_clause(self.alter_lock.clone())
            .with_suppress_fk_checks(!self.foreign_key_checks)
    }
}
