// ターゲット実行コンテキスト
//
// 1つの (インスタンス, スキーマ) に対する解決済みの実行環境。
// 呼び出し側が所有し、ステートメント構築は読み取りのみ行います。

use anyhow::Result;
use std::fmt;
use std::sync::Arc;

use crate::adapters::database::{MySqlSchemaConnector, SchemaConnector};
use crate::adapters::shell::{ShellRunner, SystemShellRunner};
use crate::core::config::EnvironmentConfig;
use crate::core::target::{ConnectionParams, ServerVersion, WrapperSettings};

/// ターゲット実行コンテキスト
#[derive(Clone)]
pub struct TargetContext {
    /// 対象スキーマ名
    pub schema_name: String,
    /// サーバーバージョン
    pub server: ServerVersion,
    /// ラッパー設定
    pub wrappers: WrapperSettings,
    /// この推定行数未満のテーブルは危険な変更も許可する（0は無効）
    pub safe_below_size: u64,
    /// 接続パラメータ
    pub connection: ConnectionParams,
    /// 直接実行に使用する接続ハンドル
    pub connector: Arc<dyn SchemaConnector>,
    /// シェル実行に使用するランナー
    pub shell: Arc<dyn ShellRunner>,
}

impl TargetContext {
    /// 既定の接続・シェル実装でコンテキストを作成
    pub fn new(schema_name: impl Into<String>, connection: ConnectionParams) -> Self {
        let connector = Arc::new(MySqlSchemaConnector::new(connection.clone()));
        Self {
            schema_name: schema_name.into(),
            server: ServerVersion::default(),
            wrappers: WrapperSettings::default(),
            safe_below_size: 0,
            connection,
            connector,
            shell: Arc::new(SystemShellRunner::new()),
        }
    }

    /// 環境設定から1スキーマ分のコンテキストを解決
    pub fn from_environment(
        env_name: &str,
        env: &EnvironmentConfig,
        schema_name: &str,
    ) -> Result<Self> {
        Ok(Self::new(schema_name, env.connection_params(env_name))
            .with_server(env.server()?)
            .with_wrappers(env.wrapper_settings())
            .with_safe_below_size(env.safe_below_size))
    }

    /// サーバーバージョンを設定
    pub fn with_server(mut self, server: ServerVersion) -> Self {
        self.server = server;
        self
    }

    /// ラッパー設定を設定
    pub fn with_wrappers(mut self, wrappers: WrapperSettings) -> Self {
        self.wrappers = wrappers;
        self
    }

    /// safe-below-size を設定
    pub fn with_safe_below_size(mut self, safe_below_size: u64) -> Self {
        self.safe_below_size = safe_below_size;
        self
    }

    /// 接続ハンドルを差し替え
    pub fn with_connector(mut self, connector: Arc<dyn SchemaConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// シェルランナーを差し替え
    pub fn with_shell(mut self, shell: Arc<dyn ShellRunner>) -> Self {
        self.shell = shell;
        self
    }
}

impl fmt::Debug for TargetContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetContext")
            .field("schema_name", &self.schema_name)
            .field("server", &self.server)
            .field("wrappers", &self.wrappers)
            .field("safe_below_size", &self.safe_below_size)
            .field("host", &self.connection.host)
            .field("port", &self.connection.port)
            .field("environment", &self.connection.environment)
            .finish_non_exhaustive()
    }
}
