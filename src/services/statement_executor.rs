// ステートメント実行サービス
//
// 1つのターゲットに対するステートメント列を、与えられた順序で逐次実行します。

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};

use crate::core::error::ApplierError;
use crate::services::ddl_statement::{DdlStatement, ExecutionOutcome};

/// 1ステートメントの実行結果
#[derive(Debug)]
pub struct StatementResult {
    /// スキーマ修飾されたオブジェクト名
    pub object: String,
    /// 実行したステートメントの表示形式
    pub statement: String,
    /// 実行結果
    pub outcome: Result<ExecutionOutcome, ApplierError>,
    /// 実行開始時刻
    pub started_at: DateTime<Utc>,
    /// 所要時間
    pub duration: Duration,
}

impl StatementResult {
    /// 成功したか
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// バッチの実行レポート
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// 実行したステートメントの結果（実行順）
    pub results: Vec<StatementResult>,
    /// 先行する失敗により実行されなかったステートメント数
    pub not_attempted: usize,
}

impl ExecutionReport {
    /// 成功したステートメント数
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// 失敗したステートメント数
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// すべてのステートメントが実行され成功したか
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.not_attempted == 0
    }

    /// 合計所要時間
    pub fn total_duration(&self) -> Duration {
        self.results
            .iter()
            .fold(Duration::zero(), |acc, r| acc + r.duration)
    }
}

/// ステートメント実行サービス
#[derive(Debug, Clone, Default)]
pub struct StatementExecutor {
    continue_on_error: bool,
}

impl StatementExecutor {
    /// 最初の失敗で停止するStatementExecutorを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 失敗後も後続のステートメントを実行するか設定
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// ステートメントを順に実行
    ///
    /// # Arguments
    ///
    /// * `statements` - 実行するステートメント（この順序で実行）
    ///
    /// # Returns
    ///
    /// 各ステートメントの結果を含む実行レポート
    pub async fn execute_all(&self, statements: Vec<DdlStatement>) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let total = statements.len();

        for (index, statement) in statements.into_iter().enumerate() {
            let object = statement.qualified_object();
            let display = statement.display();
            let started_at = Utc::now();

            let outcome = statement.execute().await;
            let duration = Utc::now() - started_at;

            let failed = outcome.is_err();
            if let Err(e) = &outcome {
                error!(object = %object, error = %e, "Statement failed");
            }

            report.results.push(StatementResult {
                object,
                statement: display,
                outcome,
                started_at,
                duration,
            });

            if failed && !self.continue_on_error {
                report.not_attempted = total - index - 1;
                break;
            }
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            not_attempted = report.not_attempted,
            "Batch execution finished"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::database::{SchemaConnector, SessionOptions};
    use crate::adapters::shell::{ShellOutput, ShellRunner};
    use crate::core::error::DatabaseError;
    use crate::core::schema_diff::{AlterClause, SchemaObjectDiff, TableRef};
    use crate::core::statement_modifiers::StatementModifiers;
    use crate::core::target::ConnectionParams;
    use crate::services::statement_builder::StatementBuilder;
    use crate::services::target_context::TargetContext;
    use async_trait::async_trait;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// 指定したテーブルへのSQLだけ失敗する接続
    #[derive(Default)]
    struct FlakyConnector {
        fail_on: Option<String>,
        executed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SchemaConnector for FlakyConnector {
        async fn execute(
            &self,
            _schema: &str,
            sql: &str,
            _session: SessionOptions,
        ) -> Result<u64, DatabaseError> {
            self.executed.lock().unwrap().push(sql.to_string());
            match &self.fail_on {
                Some(name) if sql.contains(name.as_str()) => Err(DatabaseError::Query {
                    message: "Lock wait timeout exceeded".to_string(),
                    sql: Some(sql.to_string()),
                }),
                _ => Ok(0),
            }
        }
    }

    struct NoShell;

    #[async_trait]
    impl ShellRunner for NoShell {
        async fn run(&self, _command: &str) -> io::Result<ShellOutput> {
            Err(io::Error::other("shell must not be used"))
        }
    }

    fn statements(connector: Arc<FlakyConnector>) -> Vec<DdlStatement> {
        let target = TargetContext::new("app", ConnectionParams::default())
            .with_connector(connector)
            .with_shell(Arc::new(NoShell));
        let diffs: Vec<SchemaObjectDiff> = ["a", "b", "c"]
            .iter()
            .map(|name| {
                SchemaObjectDiff::alter_table(
                    TableRef::new(*name, 1),
                    vec![AlterClause::new("ADD COLUMN `x` int")],
                )
            })
            .collect();

        StatementBuilder::new()
            .build_all(&diffs, &StatementModifiers::new(), &target)
            .unwrap()
            .statements
    }

    #[tokio::test]
    async fn test_execute_all_in_order() {
        let connector = Arc::new(FlakyConnector::default());

        let report = StatementExecutor::new()
            .execute_all(statements(connector.clone()))
            .await;

        assert!(report.is_success());
        assert_eq!(report.succeeded(), 3);
        let executed = connector.executed.lock().unwrap();
        assert!(executed[0].contains("`a`"));
        assert!(executed[1].contains("`b`"));
        assert!(executed[2].contains("`c`"));
    }

    #[tokio::test]
    async fn test_execute_all_stops_at_first_failure() {
        let connector = Arc::new(FlakyConnector {
            fail_on: Some("`b`".to_string()),
            ..Default::default()
        });

        let report = StatementExecutor::new()
            .execute_all(statements(connector.clone()))
            .await;

        assert!(!report.is_success());
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.not_attempted, 1);
        assert_eq!(connector.executed.lock().unwrap().len(), 2);
        assert_eq!(report.results[1].object, "TABLE `app`.`b`");
    }

    #[tokio::test]
    async fn test_execute_all_continue_on_error() {
        let connector = Arc::new(FlakyConnector {
            fail_on: Some("`b`".to_string()),
            ..Default::default()
        });

        let report = StatementExecutor::new()
            .with_continue_on_error(true)
            .execute_all(statements(connector.clone()))
            .await;

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.not_attempted, 0);
        assert_eq!(connector.executed.lock().unwrap().len(), 3);
    }
}
