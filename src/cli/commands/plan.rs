// planコマンドハンドラー
//
// 差分からステートメントを構築し、実行せずに表示します。

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_output, CommandOutput, StatementSummary};
use crate::cli::OutputFormat;
use crate::services::statement_builder::{SkippedDiff, StatementBuilder};

/// planコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutput {
    /// 対象環境
    pub environment: String,
    /// スキーマごとの計画
    pub schemas: Vec<SchemaPlan>,
    /// テキスト表示
    #[serde(skip)]
    pub text: String,
}

/// 1スキーマ分の計画
#[derive(Debug, Clone, Serialize)]
pub struct SchemaPlan {
    pub schema: String,
    pub statements: Vec<StatementSummary>,
    pub skipped: Vec<SkippedDiff>,
}

impl CommandOutput for PlanOutput {
    fn to_text(&self) -> String {
        self.text.clone()
    }
}

/// planコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct PlanCommand {
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
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// planコマンドハンドラー
#[derive(Debug, Default)]
pub struct PlanCommandHandler {}

impl PlanCommandHandler {
    /// 新しいPlanCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// planコマンドを実行
    ///
    /// # Returns
    ///
    /// 成功時は表示用の文字列、テンプレート不備などの場合はエラー
    pub fn execute(&self, command: &PlanCommand) -> Result<String> {
        let context = CommandContext::load_with_config(
            command.project_path.clone(),
            command.config_path.clone(),
        )?;
        let mods = context.statement_modifiers(&command.env, command.allow_unsafe)?;
        let targets = context.schema_targets(&command.env, &command.diffs)?;
        debug!(env = %command.env, schemas = targets.len(), "Resolved schema targets");

        let builder = StatementBuilder::new();
        let mut text = String::new();
        let mut schemas = Vec::new();

        for schema_target in &targets {
            let target = &schema_target.target;
            let plan = builder.build_all(&schema_target.diffs, &mods, target)?;
            info!(
                schema = %target.schema_name,
                statements = plan.statements.len(),
                skipped = plan.skipped.len(),
                "Planned schema"
            );

            text.push_str(&format!(
                "{}\n",
                format!("-- {} {}", command.env, target.schema_name).bold()
            ));
            for statement in &plan.statements {
                text.push_str(&statement.display());
            }
            for skipped in &plan.skipped {
                text.push_str(&format!(
                    "{}\n",
                    format!("-- Skipped {}: {}", skipped.object, skipped.reason).yellow()
                ));
            }
            text.push('\n');

            schemas.push(SchemaPlan {
                schema: target.schema_name.clone(),
                statements: plan
                    .statements
                    .iter()
                    .map(StatementSummary::from_statement)
                    .collect(),
                skipped: plan.skipped,
            });
        }

        if schemas.is_empty() {
            text.push_str("No differences to apply.\n");
        } else if schemas.iter().any(|s| s.skipped.iter().any(|d| d.unsafe_change)) {
            text.push_str(&format!(
                "{}\n",
                "Unsafe changes were skipped. Re-run with --allow-unsafe to include them.".yellow()
            ));
        }

        let output = PlanOutput {
            environment: command.env.clone(),
            schemas,
            text: text.trim_end().to_string(),
        };
        render_output(&output, &command.format)
    }
}
