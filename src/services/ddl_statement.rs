// DDLステートメント
//
// 1つの差分に対する実行可能な単位。直接実行するSQLか、
// ラッパーテンプレートから生成したシェルコマンドのどちらかを保持します。

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::adapters::database::{SchemaConnector, SessionOptions};
use crate::adapters::shell::ShellRunner;
use crate::core::error::ApplierError;
use crate::core::schema_diff::{DiffKind, ObjectKey};
use crate::services::wrapper_selector::WrapperChoice;

/// 実行方法
#[derive(Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    /// データベースセッションでSQLを実行
    Direct,
    /// 外部コマンドに委譲
    ShellOut {
        /// 使用したラッパー
        wrapper: WrapperChoice,
        /// レンダリング済みのコマンドライン（実行専用）
        command: String,
        /// パスワードを伏せたコマンドライン（表示・ログ・エラー用）
        printable: String,
    },
}

impl fmt::Debug for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("Direct"),
            Self::ShellOut {
                wrapper, printable, ..
            } => f
                .debug_struct("ShellOut")
                .field("wrapper", wrapper)
                .field("command", printable)
                .finish(),
        }
    }
}

/// 実行結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// 直接実行の結果
    Direct { rows_affected: u64 },
    /// シェル実行の結果（キャプチャした出力）
    ShellOut { output: String },
}

/// DDLステートメント
///
/// 構築後は不変で、`execute` で消費されます。
pub struct DdlStatement {
    schema_name: String,
    sql: String,
    object_key: ObjectKey,
    kind: DiffKind,
    mode: ExecutionMode,
    session: SessionOptions,
    connector: Arc<dyn SchemaConnector>,
    shell: Arc<dyn ShellRunner>,
}

impl DdlStatement {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        schema_name: String,
        sql: String,
        object_key: ObjectKey,
        kind: DiffKind,
        mode: ExecutionMode,
        session: SessionOptions,
        connector: Arc<dyn SchemaConnector>,
        shell: Arc<dyn ShellRunner>,
    ) -> Self {
        Self {
            schema_name,
            sql,
            object_key,
            kind,
            mode,
            session,
            connector,
            shell,
        }
    }

    /// 外部コマンドに委譲するか
    pub fn is_shell_out(&self) -> bool {
        matches!(self.mode, ExecutionMode::ShellOut { .. })
    }

    /// 対象スキーマ名（データベースレベルの差分では空）
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// 生成されたSQL
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// 表示用のシェルコマンド（直接実行の場合は None）
    ///
    /// `{PASSWORD}` は伏せ字で展開されています。
    pub fn shell_command(&self) -> Option<&str> {
        match &self.mode {
            ExecutionMode::Direct => None,
            ExecutionMode::ShellOut { printable, .. } => Some(printable),
        }
    }

    /// 実行方法
    pub fn mode(&self) -> &ExecutionMode {
        &self.mode
    }

    /// 対象オブジェクトのキー
    pub fn object_key(&self) -> &ObjectKey {
        &self.object_key
    }

    /// 差分の種別
    pub fn diff_kind(&self) -> DiffKind {
        self.kind
    }

    /// スキーマ修飾したオブジェクト名
    pub fn qualified_object(&self) -> String {
        self.object_key.qualified(&self.schema_name)
    }

    /// 人間が読むための表示
    ///
    /// 直接実行は `SQL;`、シェル実行は `\! コマンド` の形式で、必ず改行で終わります。
    /// 本体に `;` を含むルーチンの作成は DELIMITER で囲みます。
    pub fn display(&self) -> String {
        match &self.mode {
            ExecutionMode::ShellOut { printable, .. } => format!("\\! {}\n", printable),
            ExecutionMode::Direct
                if self.kind == DiffKind::RoutineCreate && self.sql.contains(';') =>
            {
                format!("DELIMITER //\n{}//\nDELIMITER ;\n", self.sql)
            }
            ExecutionMode::Direct => format!("{};\n", self.sql),
        }
    }

    /// ステートメントを実行
    ///
    /// # Returns
    ///
    /// 実行結果。失敗時は対象オブジェクト・ステートメント・キャプチャ出力を含む
    /// `ApplierError::Execution`
    pub async fn execute(self) -> Result<ExecutionOutcome, ApplierError> {
        let object = self.qualified_object();

        match &self.mode {
            ExecutionMode::Direct => {
                debug!(object = %object, sql = %self.sql, "Executing statement directly");
                let rows_affected = self
                    .connector
                    .execute(&self.schema_name, &self.sql, self.session)
                    .await
                    .map_err(|e| ApplierError::Execution {
                        object: object.clone(),
                        statement: self.sql.clone(),
                        message: e.to_string(),
                        output: None,
                    })?;

                info!(object = %object, rows_affected = rows_affected, "Statement executed");
                Ok(ExecutionOutcome::Direct { rows_affected })
            }
            ExecutionMode::ShellOut {
                wrapper,
                command,
                printable,
            } => {
                debug!(object = %object, wrapper = %wrapper, command = %printable, "Shelling out");
                let output =
                    self.shell
                        .run(command)
                        .await
                        .map_err(|e| ApplierError::Execution {
                            object: object.clone(),
                            statement: printable.clone(),
                            message: format!("failed to start command: {}", e),
                            output: None,
                        })?;

                if !output.success() {
                    let message = match output.status {
                        Some(code) => format!("command exited with status {}", code),
                        None => "command terminated by signal".to_string(),
                    };
                    warn!(object = %object, wrapper = %wrapper, status = ?output.status, "Wrapper command failed");
                    return Err(ApplierError::Execution {
                        object,
                        statement: printable.clone(),
                        message,
                        output: Some(output.combined()),
                    });
                }

                info!(object = %object, wrapper = %wrapper, "Wrapper command completed");
                Ok(ExecutionOutcome::ShellOut {
                    output: output.combined(),
                })
            }
        }
    }
}

impl fmt::Display for DdlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl fmt::Debug for DdlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DdlStatement")
            .field("schema_name", &self.schema_name)
            .field("object_key", &self.object_key)
            .field("kind", &self.kind)
            .field("sql", &self.sql)
            .field("mode", &self.mode)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::shell::ShellOutput;
    use crate::core::error::DatabaseError;
    use crate::core::schema_diff::ObjectClass;
    use async_trait::async_trait;
    use std::io;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingConnector {
        calls: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl SchemaConnector for RecordingConnector {
        async fn execute(
            &self,
            schema: &str,
            sql: &str,
            _session: SessionOptions,
        ) -> Result<u64, DatabaseError> {
            self.calls
                .lock()
                .unwrap()
                .push((schema.to_string(), sql.to_string()));
            if self.fail {
                return Err(DatabaseError::Query {
                    message: "Duplicate column name 'x'".to_string(),
                    sql: Some(sql.to_string()),
                });
            }
            Ok(0)
        }
    }

    struct FixedShell(ShellOutput);

    #[async_trait]
    impl ShellRunner for FixedShell {
        async fn run(&self, _command: &str) -> io::Result<ShellOutput> {
            Ok(self.0.clone())
        }
    }

    fn statement(
        kind: DiffKind,
        sql: &str,
        mode: ExecutionMode,
        connector: Arc<dyn SchemaConnector>,
        shell: Arc<dyn ShellRunner>,
    ) -> DdlStatement {
        DdlStatement::new(
            "analytics".to_string(),
            sql.to_string(),
            ObjectKey::new(ObjectClass::Table, "pageviews"),
            kind,
            mode,
            SessionOptions::default(),
            connector,
            shell,
        )
    }

    fn direct(kind: DiffKind, sql: &str) -> DdlStatement {
        statement(
            kind,
            sql,
            ExecutionMode::Direct,
            Arc::new(RecordingConnector::default()),
            Arc::new(FixedShell(ShellOutput::default())),
        )
    }

    #[test]
    fn test_display_direct() {
        let stmt = direct(DiffKind::TableDrop, "DROP TABLE `pageviews`");

        assert!(!stmt.is_shell_out());
        assert_eq!(stmt.display(), "DROP TABLE `pageviews`;\n");
        assert_eq!(stmt.to_string(), stmt.display());
        assert_eq!(stmt.shell_command(), None);
    }

    #[test]
    fn test_display_shell_out() {
        let stmt = statement(
            DiffKind::TableAlter,
            "ALTER TABLE `pageviews` ADD COLUMN `x` int",
            ExecutionMode::ShellOut {
                wrapper: WrapperChoice::AlterWrapper,
                command: "osc pageviews".to_string(),
                printable: "osc pageviews".to_string(),
            },
            Arc::new(RecordingConnector::default()),
            Arc::new(FixedShell(ShellOutput::default())),
        );

        assert!(stmt.is_shell_out());
        assert_eq!(stmt.display(), "\\! osc pageviews\n");
        assert_eq!(stmt.shell_command(), Some("osc pageviews"));
    }

    #[test]
    fn test_display_routine_body_uses_delimiter() {
        let stmt = direct(
            DiffKind::RoutineCreate,
            "CREATE PROCEDURE `p`() BEGIN SELECT 1; END",
        );

        assert_eq!(
            stmt.display(),
            "DELIMITER //\nCREATE PROCEDURE `p`() BEGIN SELECT 1; END//\nDELIMITER ;\n"
        );
    }

    #[tokio::test]
    async fn test_execute_direct_passes_schema_and_sql() {
        let connector = Arc::new(RecordingConnector::default());
        let stmt = statement(
            DiffKind::TableDrop,
            "DROP TABLE `pageviews`",
            ExecutionMode::Direct,
            connector.clone(),
            Arc::new(FixedShell(ShellOutput::default())),
        );

        let outcome = stmt.execute().await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::Direct { rows_affected: 0 });
        assert_eq!(
            connector.calls.lock().unwrap().as_slice(),
            &[("analytics".to_string(), "DROP TABLE `pageviews`".to_string())]
        );
    }

    #[tokio::test]
    async fn test_execute_direct_failure() {
        let connector = Arc::new(RecordingConnector {
            fail: true,
            ..Default::default()
        });
        let stmt = statement(
            DiffKind::TableAlter,
            "ALTER TABLE `pageviews` ADD COLUMN `x` int",
            ExecutionMode::Direct,
            connector,
            Arc::new(FixedShell(ShellOutput::default())),
        );

        let err = stmt.execute().await.unwrap_err();

        assert!(err.is_execution());
        assert!(err.to_string().contains("TABLE `analytics`.`pageviews`"));
        assert!(err.to_string().contains("Duplicate column name"));
        assert_eq!(err.output(), None);
    }

    #[tokio::test]
    async fn test_execute_shell_out_nonzero_exit() {
        let shell = FixedShell(ShellOutput {
            status: Some(2),
            stdout: String::new(),
            stderr: "no such table\n".to_string(),
        });
        let stmt = statement(
            DiffKind::TableAlter,
            "ALTER TABLE `pageviews` ADD COLUMN `x` int",
            ExecutionMode::ShellOut {
                wrapper: WrapperChoice::DdlWrapper,
                command: "ddl pageviews".to_string(),
                printable: "ddl pageviews".to_string(),
            },
            Arc::new(RecordingConnector::default()),
            Arc::new(shell),
        );

        let err = stmt.execute().await.unwrap_err();

        assert!(err.is_execution());
        assert!(err.to_string().contains("command exited with status 2"));
        assert_eq!(err.output(), Some("no such table\n"));
    }

    #[tokio::test]
    async fn test_shell_out_hides_secret_command() {
        let shell = FixedShell(ShellOutput {
            status: Some(3),
            stdout: String::new(),
            stderr: String::new(),
        });
        let stmt = statement(
            DiffKind::TableAlter,
            "ALTER TABLE `pageviews` ADD COLUMN `x` int",
            ExecutionMode::ShellOut {
                wrapper: WrapperChoice::DdlWrapper,
                command: "osc --password=s3cr3t pageviews".to_string(),
                printable: "osc --password=***** pageviews".to_string(),
            },
            Arc::new(RecordingConnector::default()),
            Arc::new(shell),
        );

        assert_eq!(stmt.display(), "\\! osc --password=***** pageviews\n");
        assert!(!format!("{:?}", stmt).contains("s3cr3t"));

        let err = stmt.execute().await.unwrap_err();
        assert!(!err.to_string().contains("s3cr3t"));
        assert!(err.to_string().contains("statement: osc --password=***** pageviews"));
    }
}
