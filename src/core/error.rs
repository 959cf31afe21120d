// エラー型定義
//
// ステートメント構築と実行で使用されるカスタムエラー型を提供します。
// thiserrorを使用して、TemplateError, RenderError, DatabaseError, ApplierError を定義します。

use thiserror::Error;

/// ラッパーテンプレートのエラー
///
/// 設定不備を表すため、バッチ全体を中断すべきエラーです。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Unknown placeholder
    #[error("Unknown placeholder {{{name}}} in wrapper template: {template}")]
    UnknownPlaceholder {
        /// プレースホルダー名（大文字）
        name: String,
        /// 問題のテンプレート
        template: String,
    },

    /// Malformed template
    #[error("Malformed wrapper template: {message} (template: {template:?})")]
    Malformed {
        /// エラーメッセージ
        message: String,
        /// 問題のテンプレート
        template: String,
    },
}

impl TemplateError {
    /// 未知のプレースホルダーエラーかどうか
    pub fn is_unknown_placeholder(&self) -> bool {
        matches!(self, TemplateError::UnknownPlaceholder { .. })
    }

    /// 不正なテンプレートエラーかどうか
    pub fn is_malformed(&self) -> bool {
        matches!(self, TemplateError::Malformed { .. })
    }
}

/// 差分のSQLレンダリングエラー
///
/// 差分エンジン側の理由でSQLを生成できなかったことを表します。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unable to render SQL for {object}: {message}")]
pub struct RenderError {
    /// 対象オブジェクト（例: TABLE `users`）
    pub object: String,
    /// エラーメッセージ
    pub message: String,
}

impl RenderError {
    /// 新しいレンダリングエラーを作成
    pub fn new(object: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            message: message.into(),
        }
    }
}

/// データベースエラー
///
/// 直接実行時のデータベース操作で発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection error
    #[error("Database connection error: {message} (cause: {cause})")]
    Connection {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Query execution error
    #[error("Query execution error: {message}")]
    Query {
        /// エラーメッセージ
        message: String,
        /// 失敗したSQL
        sql: Option<String>,
    },

    /// Invalid connect-options entry
    #[error("Invalid connect-options entry '{option}': {reason}")]
    InvalidConnectOption {
        /// 問題のオプション
        option: String,
        /// 不正な理由
        reason: String,
    },
}

impl DatabaseError {
    /// 接続エラーかどうか
    pub fn is_connection(&self) -> bool {
        matches!(self, DatabaseError::Connection { .. })
    }

    /// クエリエラーかどうか
    pub fn is_query(&self) -> bool {
        matches!(self, DatabaseError::Query { .. })
    }

    /// connect-options不正エラーかどうか
    pub fn is_invalid_connect_option(&self) -> bool {
        matches!(self, DatabaseError::InvalidConnectOption { .. })
    }
}

/// ステートメントの構築・実行エラー
#[derive(Debug, Error)]
pub enum ApplierError {
    /// Unsafe change not permitted
    #[error("Unsafe change for {object} is not permitted: {reason}")]
    UnsafeChange {
        /// 対象オブジェクト
        object: String,
        /// 危険と判断された理由
        reason: String,
    },

    /// Render error from the diff engine
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Wrapper template error
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Execution error
    #[error("Execution failed for {object}: {message}\n  statement: {statement}{}", format_output_opt(.output))]
    Execution {
        /// スキーマ修飾されたオブジェクト名
        object: String,
        /// 実行したSQLまたはコマンド
        statement: String,
        /// エラーメッセージ
        message: String,
        /// キャプチャされた出力
        output: Option<String>,
    },
}

impl ApplierError {
    /// 危険な変更エラーかどうか
    pub fn is_unsafe_change(&self) -> bool {
        matches!(self, ApplierError::UnsafeChange { .. })
    }

    /// レンダリングエラーかどうか
    pub fn is_render(&self) -> bool {
        matches!(self, ApplierError::Render(_))
    }

    /// テンプレートエラーかどうか
    pub fn is_template(&self) -> bool {
        matches!(self, ApplierError::Template(_))
    }

    /// 実行エラーかどうか
    pub fn is_execution(&self) -> bool {
        matches!(self, ApplierError::Execution { .. })
    }

    /// バッチ全体を中断すべきエラーかどうか
    ///
    /// テンプレートエラーは運用者の設定ミスであり、以降の差分にも影響します。
    pub fn is_fatal_to_batch(&self) -> bool {
        self.is_template()
    }

    /// キャプチャされた出力を取得
    pub fn output(&self) -> Option<&str> {
        match self {
            ApplierError::Execution { output, .. } => output.as_deref(),
            _ => None,
        }
    }
}

/// キャプチャ出力をフォーマットするヘルパー関数
fn format_output_opt(output: &Option<String>) -> String {
    match output.as_deref().map(str::trim_end) {
        Some(text) if !text.is_empty() => format!("\n  output: {}", text),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_display() {
        let error = TemplateError::UnknownPlaceholder {
            name: "FOO".to_string(),
            template: "echo {FOO}".to_string(),
        };

        assert!(error.is_unknown_placeholder());
        assert_eq!(
            error.to_string(),
            "Unknown placeholder {FOO} in wrapper template: echo {FOO}"
        );
    }

    #[test]
    fn test_applier_error_from_template_error_is_fatal() {
        let error: ApplierError = TemplateError::Malformed {
            message: "template is blank".to_string(),
            template: " ".to_string(),
        }
        .into();

        assert!(error.is_template());
        assert!(error.is_fatal_to_batch());
    }

    #[test]
    fn test_render_error_is_not_fatal() {
        let error: ApplierError = RenderError::new("TABLE `users`", "no clauses").into();

        assert!(error.is_render());
        assert!(!error.is_fatal_to_batch());
        assert_eq!(
            error.to_string(),
            "Unable to render SQL for TABLE `users`: no clauses"
        );
    }

    #[test]
    fn test_execution_error_includes_statement_and_output() {
        let error = ApplierError::Execution {
            object: "TABLE `analytics`.`pageviews`".to_string(),
            statement: "/bin/false".to_string(),
            message: "command exited with status 1".to_string(),
            output: Some("boom\n".to_string()),
        };

        let message = error.to_string();
        assert!(message.contains("`analytics`.`pageviews`"));
        assert!(message.contains("statement: /bin/false"));
        assert!(message.contains("output: boom"));
        assert_eq!(error.output(), Some("boom\n"));
    }

    #[test]
    fn test_execution_error_without_output() {
        let error = ApplierError::Execution {
            object: "TABLE `app`.`users`".to_string(),
            statement: "DROP TABLE `users`".to_string(),
            message: "lock wait timeout".to_string(),
            output: None,
        };

        assert!(!error.to_string().contains("output:"));
    }

    #[test]
    fn test_database_error_variants() {
        let conn_error = DatabaseError::Connection {
            message: "Connection failed".to_string(),
            cause: "Timeout".to_string(),
        };
        assert!(conn_error.is_connection());

        let query_error = DatabaseError::Query {
            message: "Query failed".to_string(),
            sql: None,
        };
        assert!(query_error.is_query());

        let option_error = DatabaseError::InvalidConnectOption {
            option: "1bad=2".to_string(),
            reason: "invalid variable name".to_string(),
        };
        assert!(option_error.is_invalid_connect_option());
    }
}
