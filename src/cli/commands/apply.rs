// applyコマンドハンドラー
//
// 差分からステートメントを構築して実行します。
// - すべてのスキーマのステートメントを先に構築（テンプレート不備はここで中断）
// - 危険な変更がスキップされたスキーマは実行しない
// - スキーマ単位で並行実行、スキーマ内は差分の順序で逐次実行
// - 実行結果と所要時間の表示

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::services::ddl_statement::ExecutionOutcome;
use crate::services::statement_builder::{BatchPlan, SkippedDiff, StatementBuilder};
use crate::services::statement_executor::{ExecutionReport, StatementExecutor};

/// applyコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutput {
    /// 対象環境
    pub environment: String,
    /// スキーマごとの結果
    pub schemas: Vec<SchemaApplyResult>,
    /// 成功したステートメント数
    pub succeeded: usize,
    /// 失敗したステートメント数
    pub failed: usize,
    /// 合計実行時間（ミリ秒）
    pub total_duration_ms: i64,
    /// テキスト表示
    #[serde(skip)]
    pub text: String,
}

/// 1スキーマ分の実行結果
#[derive(Debug, Clone, Serialize)]
pub struct SchemaApplyResult {
    pub schema: String,
    pub statements: Vec<StatementApplyResult>,
    pub skipped: Vec<SkippedDiff>,
    /// 危険な変更のためスキーマ全体を実行しなかったか
    pub blocked: bool,
    pub not_attempted: usize,
    /// スキーマ内の合計実行時間（ミリ秒）
    pub duration_ms: i64,
}

/// 個別ステートメントの結果
#[derive(Debug, Clone, Serialize)]
pub struct StatementApplyResult {
    pub object: String,
    pub statement: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 失敗またはブロックされたスキーマがあったapplyの結果
///
/// `rendered` は標準出力に出すための出力で、エラーメッセージ自体は短い要約のみです。
#[derive(Debug, Error)]
#[error("Apply incomplete: {failed} statement(s) failed, {blocked} schema(s) skipped due to unsafe changes")]
pub struct ApplyIncomplete {
    /// レンダリング済みの出力
    pub rendered: String,
    /// 失敗したステートメント数
    pub failed: usize,
    /// 実行しなかったスキーマ数
    pub blocked: usize,
}

impl CommandOutput for ApplyOutput {
    fn to_text(&self) -> String {
        self.text.clone()
    }
}

/// applyコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct ApplyCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 対象環境
    pub env: String,
    /// 差分ファイル
    pub diffs: PathBuf,
    /// 危険な変更を許可
    pub allow_unsafe: bool,
    /// 失敗後も続行
    pub continue_on_error: bool,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// applyコマンドハンドラー
#[derive(Debug, Default)]
pub struct ApplyCommandHandler {}

impl ApplyCommandHandler {
    /// 新しいApplyCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// applyコマンドを実行
    ///
    /// # Arguments
    ///
    /// * `command` - applyコマンドのパラメータ
    ///
    /// # Returns
    ///
    /// すべて成功した場合は実行結果の概要、失敗があった場合は概要を保持する `ApplyIncomplete`
    pub async fn execute(&self, command: &ApplyCommand) -> Result<String> {
        let context = CommandContext::load_with_config(
            command.project_path.clone(),
            command.config_path.clone(),
        )?;
        let mods = context.statement_modifiers(&command.env, command.allow_unsafe)?;
        let targets = context.schema_targets(&command.env, &command.diffs)?;

        let builder = StatementBuilder::new();
        let mut plans: Vec<(String, BatchPlan)> = Vec::new();
        for schema_target in &targets {
            let plan = builder.build_all(&schema_target.diffs, &mods, &schema_target.target)?;
            plans.push((schema_target.target.schema_name.clone(), plan));
        }
        debug!(schemas = plans.len(), "Built statements for all schemas");

        let executor = StatementExecutor::new().with_continue_on_error(command.continue_on_error);
        let mut tasks = JoinSet::new();
        let mut results: Vec<SchemaApplyResult> = Vec::new();

        for (index, (schema, plan)) in plans.into_iter().enumerate() {
            let blocked = plan.has_unsafe_skips();
            results.push(SchemaApplyResult {
                schema: schema.clone(),
                statements: Vec::new(),
                skipped: plan.skipped,
                blocked,
                not_attempted: 0,
                duration_ms: 0,
            });

            if blocked {
                warn!(schema = %schema, "Skipping schema due to unsafe changes");
                results[index].not_attempted = plan.statements.len();
                continue;
            }

            info!(schema = %schema, statements = plan.statements.len(), "Applying schema");
            let executor = executor.clone();
            let statements = plan.statements;
            tasks.spawn(async move { (index, executor.execute_all(statements).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, report) = joined.map_err(|e| anyhow!("Schema task panicked: {}", e))?;
            apply_report(&mut results[index], report);
        }

        let output = self.summarize(&command.env, results);
        let rendered = render_output(&output, &command.format)?;

        let blocked = output.schemas.iter().filter(|s| s.blocked).count();
        if output.failed > 0 || blocked > 0 {
            return Err(ApplyIncomplete {
                rendered,
                failed: output.failed,
                blocked,
            }
            .into());
        }

        Ok(rendered)
    }

    fn summarize(&self, env: &str, schemas: Vec<SchemaApplyResult>) -> ApplyOutput {
        let mut text = String::new();
        let mut succeeded = 0;
        let mut failed = 0;
        let mut total_duration_ms = 0;

        for schema in &schemas {
            total_duration_ms += schema.duration_ms;
            text.push_str(&format!(
                "{}\n",
                format!("-- {} {}", env, schema.schema).bold()
            ));

            for result in &schema.statements {
                if result.success {
                    succeeded += 1;
                    text.push_str(&format!(
                        "{} {} ({}ms)\n",
                        "✓".green(),
                        result.object,
                        result.duration_ms
                    ));
                } else {
                    failed += 1;
                    text.push_str(&format!(
                        "{} {} ({}ms)\n",
                        "✗".red(),
                        result.object,
                        result.duration_ms
                    ));
                    if let Some(error) = &result.error {
                        text.push_str(&format!("  {}\n", error.red()));
                    }
                }
            }

            for skipped in &schema.skipped {
                text.push_str(&format!(
                    "{}\n",
                    format!("- Skipped {}: {}", skipped.object, skipped.reason).yellow()
                ));
            }
            if schema.blocked {
                text.push_str(&format!(
                    "{}\n",
                    "Schema not applied because of unsafe changes. Re-run with --allow-unsafe."
                        .yellow()
                ));
            } else if schema.not_attempted > 0 {
                text.push_str(&format!(
                    "{}\n",
                    format!("{} statement(s) not attempted", schema.not_attempted).yellow()
                ));
            }
            text.push('\n');
        }

        if schemas.is_empty() {
            text.push_str("No differences to apply.");
        } else {
            text.push_str(&format!(
                "{} succeeded, {} failed ({}ms)",
                succeeded, failed, total_duration_ms
            ));
        }

        ApplyOutput {
            environment: env.to_string(),
            schemas,
            succeeded,
            failed,
            total_duration_ms,
            text,
        }
    }
}

fn apply_report(result: &mut SchemaApplyResult, report: ExecutionReport) {
    result.not_attempted = report.not_attempted;
    result.duration_ms = report.total_duration().num_milliseconds();
    result.statements = report
        .results
        .into_iter()
        .map(|r| {
            let (output, error) = match &r.outcome {
                Ok(ExecutionOutcome::ShellOut { output }) if !output.is_empty() => {
                    (Some(output.clone()), None)
                }
                Ok(_) => (None, None),
                Err(e) => (e.output().map(str::to_string), Some(e.to_string())),
            };
            StatementApplyResult {
                object: r.object,
                statement: r.statement,
                success: r.outcome.is_ok(),
                started_at: r.started_at,
                duration_ms: r.duration.num_milliseconds(),
                output,
                error,
            }
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use std::fs;
    use tempfile::TempDir;

    fn setup(config: &str, diffs: &str) -> TempDir {
        colored::control::set_override(false);
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(Config::DEFAULT_CONFIG_PATH), config).unwrap();
        fs::write(dir.path().join("diffs.yaml"), diffs).unwrap();
        dir
    }

    fn command(dir: &TempDir, format: OutputFormat) -> ApplyCommand {
        ApplyCommand {
            project_path: dir.path().to_path_buf(),
            config_path: None,
            env: "production".to_string(),
            diffs: PathBuf::from("diffs.yaml"),
            allow_unsafe: false,
            continue_on_error: false,
            format,
        }
    }

    const DIFFS: &str = r#"
schemas:
  analytics:
    - kind: table_alter
      table: { name: rollups }
      clauses:
        - sql: "ADD COLUMN `value` bigint(20) DEFAULT NULL"
"#;

    #[tokio::test]
    async fn test_apply_through_ddl_wrapper() {
        let dir = setup(
            r#"
version: "1.0"
environments:
  production:
    schemas: [analytics]
    ddl-wrapper: "echo ddl-wrapper {SCHEMA}.{NAME} {TYPE} {CLASS}"
"#,
            DIFFS,
        );

        let output = ApplyCommandHandler::new()
            .execute(&command(&dir, OutputFormat::Json))
            .await
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["succeeded"], 1);
        assert_eq!(json["failed"], 0);
        assert_eq!(
            json["schemas"][0]["statements"][0]["output"],
            "ddl-wrapper analytics.rollups ALTER TABLE\n"
        );
    }

    #[tokio::test]
    async fn test_apply_failing_wrapper_returns_error() {
        let dir = setup(
            r#"
version: "1.0"
environments:
  production:
    schemas: [analytics]
    ddl-wrapper: "echo refused {NAME} >&2; exit 7"
"#,
            DIFFS,
        );

        let err = ApplyCommandHandler::new()
            .execute(&command(&dir, OutputFormat::Text))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Apply incomplete: 1 statement(s) failed, 0 schema(s) skipped due to unsafe changes"
        );
        let incomplete = err.downcast_ref::<ApplyIncomplete>().unwrap();
        assert!(incomplete.rendered.contains("command exited with status 7"));
        assert!(incomplete.rendered.contains("refused rollups"));
    }

    /// 失敗時もJSON出力はエラーメッセージと分離されパース可能であることを確認
    #[tokio::test]
    async fn test_apply_failure_keeps_json_output_parseable() {
        let dir = setup(
            r#"
version: "1.0"
environments:
  production:
    schemas: [analytics]
    ddl-wrapper: "exit 2"
"#,
            DIFFS,
        );

        let err = ApplyCommandHandler::new()
            .execute(&command(&dir, OutputFormat::Json))
            .await
            .unwrap_err();

        let incomplete = err.downcast_ref::<ApplyIncomplete>().unwrap();
        let json: serde_json::Value = serde_json::from_str(&incomplete.rendered).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["schemas"][0]["statements"][0]["success"], false);
        assert!(json["schemas"][0]["statements"][0]["started_at"].is_string());
    }

    #[tokio::test]
    async fn test_apply_blocks_schema_with_unsafe_changes() {
        let dir = setup(
            r#"
version: "1.0"
environments:
  production:
    schemas: [analytics]
    ddl-wrapper: "exit 1"
"#,
            r#"
schemas:
  analytics:
    - kind: table_drop
      table: { name: legacy, row_estimate: 5 }
"#,
        );

        let err = ApplyCommandHandler::new()
            .execute(&command(&dir, OutputFormat::Text))
            .await
            .unwrap_err();

        assert!(err
            .to_string()
            .contains("1 schema(s) skipped due to unsafe changes"));
        let incomplete = err.downcast_ref::<ApplyIncomplete>().unwrap();
        assert!(incomplete
            .rendered
            .contains("Skipped TABLE `analytics`.`legacy`"));
    }

    #[tokio::test]
    async fn test_apply_unknown_placeholder_aborts_before_execution() {
        let dir = setup(
            r#"
version: "1.0"
environments:
  production:
    schemas: [analytics]
    ddl-wrapper: "echo {DIRPATH}"
"#,
            DIFFS,
        );

        let err = ApplyCommandHandler::new()
            .execute(&command(&dir, OutputFormat::Text))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Unknown placeholder {DIRPATH}"));
    }
}
