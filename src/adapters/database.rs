// データベース接続アダプター
//
// SQLxを使用したスキーマ単位の接続と、DDL文の直接実行を行います。

use async_trait::async_trait;
use regex::Regex;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection, Executor};
use tracing::debug;

use crate::core::error::DatabaseError;
use crate::core::target::ConnectionParams;

/// 直接実行時のセッション設定
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// foreign_key_checks を無効化する
    pub suppress_fk_checks: bool,
}

/// スキーマ単位でSQLを実行する接続ハンドル
///
/// テスト時はフェイク実装に差し替えます。
#[async_trait]
pub trait SchemaConnector: Send + Sync {
    /// スキーマに接続してSQLを1文実行
    ///
    /// # Arguments
    ///
    /// * `schema` - 接続先スキーマ（空の場合はスキーマを選択しない）
    /// * `sql` - 実行するSQL
    /// * `session` - セッション設定
    ///
    /// # Returns
    ///
    /// 影響を受けた行数、またはサーバーのエラー
    async fn execute(
        &self,
        schema: &str,
        sql: &str,
        session: SessionOptions,
    ) -> Result<u64, DatabaseError>;
}

/// MySQL接続サービス
#[derive(Debug, Clone)]
pub struct MySqlSchemaConnector {
    params: ConnectionParams,
}

impl MySqlSchemaConnector {
    /// 新しいMySqlSchemaConnectorを作成
    pub fn new(params: ConnectionParams) -> Self {
        Self { params }
    }

    /// 接続オプションを構築
    pub fn connect_options(&self, schema: &str) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(&self.params.host)
            .port(self.params.port)
            .username(&self.params.user);

        if let Some(password) = self.params.password.as_deref() {
            options = options.password(password);
        }
        if let Some(socket) = self.params.socket.as_deref() {
            options = options.socket(socket);
        }
        if !schema.is_empty() {
            options = options.database(schema);
        }

        options
    }

    /// 接続直後に実行するセッション変数の設定文を生成
    pub fn session_statements(
        &self,
        session: SessionOptions,
    ) -> Result<Vec<String>, DatabaseError> {
        let mut statements = parse_connect_options(&self.params.connect_options)?
            .into_iter()
            .map(|(name, value)| format!("SET SESSION {}={}", name, value))
            .collect::<Vec<_>>();

        if session.suppress_fk_checks {
            statements.push("SET SESSION foreign_key_checks=0".to_string());
        }

        Ok(statements)
    }

    async fn run(
        &self,
        conn: &mut MySqlConnection,
        sql: &str,
    ) -> Result<u64, DatabaseError> {
        conn.execute(sql)
            .await
            .map(|result| result.rows_affected())
            .map_err(|e| DatabaseError::Query {
                message: e.to_string(),
                sql: Some(sql.to_string()),
            })
    }
}

#[async_trait]
impl SchemaConnector for MySqlSchemaConnector {
    async fn execute(
        &self,
        schema: &str,
        sql: &str,
        session: SessionOptions,
    ) -> Result<u64, DatabaseError> {
        let session_statements = self.session_statements(session)?;

        debug!(
            host = %self.params.host,
            port = self.params.port,
            schema = schema,
            "Opening schema-scoped connection"
        );
        let mut conn = self
            .connect_options(schema)
            .connect()
            .await
            .map_err(|e| DatabaseError::Connection {
                message: format!(
                    "Failed to connect to {}:{}",
                    self.params.host, self.params.port
                ),
                cause: e.to_string(),
            })?;

        for statement in &session_statements {
            self.run(&mut conn, statement).await?;
        }
        let result = self.run(&mut conn, sql).await;

        // クローズ失敗は実行結果に影響させない
        if let Err(e) = conn.close().await {
            debug!(error = %e, "Failed to close connection cleanly");
        }

        result
    }
}

/// connect-options をパース
///
/// `name=value` をカンマ区切りで指定します。シングルクォートで囲まれた値の中のカンマは区切りとみなしません。
///
/// # Examples
/// ```
/// use strata_applier::adapters::database::parse_connect_options;
/// let opts = parse_connect_options("sql_mode='A,B',wait_timeout=60").unwrap();
/// assert_eq!(opts[0], ("sql_mode".to_string(), "'A,B'".to_string()));
/// assert_eq!(opts[1], ("wait_timeout".to_string(), "60".to_string()));
/// ```
pub fn parse_connect_options(options: &str) -> Result<Vec<(String, String)>, DatabaseError> {
    let name_pattern = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").map_err(|e| {
        DatabaseError::InvalidConnectOption {
            option: options.to_string(),
            reason: e.to_string(),
        }
    })?;

    let mut entries = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    for c in options.chars() {
        match c {
            '\'' => {
                in_quote = !in_quote;
                current.push(c);
            }
            ',' if !in_quote => entries.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if in_quote {
        return Err(DatabaseError::InvalidConnectOption {
            option: options.to_string(),
            reason: "unterminated quote".to_string(),
        });
    }
    entries.push(current);

    let mut parsed = Vec::new();
    for entry in entries.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        let (name, value) =
            entry
                .split_once('=')
                .ok_or_else(|| DatabaseError::InvalidConnectOption {
                    option: entry.to_string(),
                    reason: "expected name=value".to_string(),
                })?;
        let (name, value) = (name.trim(), value.trim());

        if !name_pattern.is_match(name) {
            return Err(DatabaseError::InvalidConnectOption {
                option: entry.to_string(),
                reason: "invalid variable name".to_string(),
            });
        }
        if value.is_empty() {
            return Err(DatabaseError::InvalidConnectOption {
                option: entry.to_string(),
                reason: "value is empty".to_string(),
            });
        }
        if value.contains(';') {
            return Err(DatabaseError::InvalidConnectOption {
                option: entry.to_string(),
                reason: "value must not contain ';'".to_string(),
            });
        }

        parsed.push((name.to_string(), value.to_string()));
    }

    Ok(parsed)
}
