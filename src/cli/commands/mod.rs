// コマンドハンドラー層
// 各CLIコマンドの実装

pub mod apply;
pub mod plan;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::services::ddl_statement::{DdlStatement, ExecutionMode};

/// コマンド出力の共通インターフェース
pub trait CommandOutput: Serialize {
    /// テキスト形式の出力
    fn to_text(&self) -> String;
}

/// 出力フォーマットに従ってコマンド出力をレンダリング
pub fn render_output<T: CommandOutput>(output: &T, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(output.to_text()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(output).with_context(|| "Failed to serialize output")
        }
    }
}

/// ステートメントの概要（JSON出力用）
#[derive(Debug, Clone, Serialize)]
pub struct StatementSummary {
    /// スキーマ修飾されたオブジェクト名
    pub object: String,
    /// 実行方法（direct / ddl-wrapper / alter-wrapper）
    pub mode: String,
    /// 生成されたSQL
    pub sql: String,
    /// シェルコマンド
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl StatementSummary {
    /// ステートメントから概要を作成
    pub fn from_statement(statement: &DdlStatement) -> Self {
        let mode = match statement.mode() {
            ExecutionMode::Direct => "direct".to_string(),
            ExecutionMode::ShellOut { wrapper, .. } => wrapper.config_name().to_string(),
        };
        Self {
            object: statement.qualified_object(),
            mode,
            sql: statement.sql().to_string(),
            command: statement.shell_command().map(str::to_string),
        }
    }
}
