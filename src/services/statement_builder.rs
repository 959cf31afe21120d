// ステートメント構築サービス
//
// 差分・修飾子・ターゲットから DdlStatement を組み立てます。
// データベースやOSには触れない純粋な処理です。

use serde::Serialize;
use tracing::{debug, warn};

use crate::adapters::database::SessionOptions;
use crate::core::error::{ApplierError, RenderError};
use crate::core::schema_diff::{DiffType, ObjectClass, ObjectDiff};
use crate::core::statement_modifiers::StatementModifiers;
use crate::services::ddl_statement::{DdlStatement, ExecutionMode};
use crate::services::safety_policy::SafetyPolicy;
use crate::services::shell_command_builder::{ShellCommandBuilder, TemplateVars};
use crate::services::target_context::TargetContext;
use crate::services::wrapper_selector::{WrapperChoice, WrapperSelector};

/// 表示用コマンドでパスワードの代わりに展開する文字列
const PASSWORD_MASK: &str = "*****";

/// スキップされた差分
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDiff {
    /// スキーマ修飾されたオブジェクト名
    pub object: String,
    /// スキップ理由
    pub reason: String,
    /// 危険な変更として拒否されたか
    pub unsafe_change: bool,
}

/// バッチの構築結果
#[derive(Debug, Default)]
pub struct BatchPlan {
    /// 実行可能なステートメント（差分の順序を保持）
    pub statements: Vec<DdlStatement>,
    /// 構築できなかった差分
    pub skipped: Vec<SkippedDiff>,
}

impl BatchPlan {
    /// 実行するステートメントがないか
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// 危険な変更としてスキップされた差分があるか
    pub fn has_unsafe_skips(&self) -> bool {
        self.skipped.iter().any(|s| s.unsafe_change)
    }
}

/// ステートメント構築サービス
///
/// 構築は以下の順で行われます:
/// 1. safety - 危険な変更の検証
/// 2. version gate - 古いサーバーでは LOCK/ALGORITHM 句を除去
/// 3. render - 差分からSQLを生成
/// 4. wrapper - 実行方法の選択（alter-wrapper では LOCK/ALGORITHM なしで再生成）
/// 5. command - テンプレートからシェルコマンドを生成
#[derive(Debug, Clone, Default)]
pub struct StatementBuilder {
    command_builder: ShellCommandBuilder,
}

impl StatementBuilder {
    /// 新しいStatementBuilderを作成
    pub fn new() -> Self {
        Self {
            command_builder: ShellCommandBuilder::new(),
        }
    }

    /// 1つの差分からステートメントを構築
    ///
    /// # Arguments
    ///
    /// * `diff` - オブジェクト差分
    /// * `mods` - ステートメント修飾子
    /// * `target` - ターゲット実行コンテキスト
    ///
    /// # Returns
    ///
    /// 構築されたステートメント、または UnsafeChange / Render / Template エラー
    pub fn build(
        &self,
        diff: &dyn ObjectDiff,
        mods: &StatementModifiers,
        target: &TargetContext,
    ) -> Result<DdlStatement, ApplierError> {
        let kind = diff.kind();
        let object_key = diff.object_key();
        let schema_name = if kind.is_database_level() {
            String::new()
        } else {
            target.schema_name.clone()
        };

        let policy = SafetyPolicy::new(target.safe_below_size);
        policy.validate(diff, mods)?;
        let mut mods = policy.effective_modifiers(diff, mods);

        if mods.has_online_ddl_clauses() && !target.server.supports_online_ddl_clauses() {
            debug!(
                object = %object_key,
                server = %target.server,
                "Server does not support LOCK/ALGORITHM clauses, omitting them"
            );
            mods = mods.without_online_ddl_clauses();
        }

        let mut sql = render_non_empty(diff, &mods, &schema_name)?;

        let choice = WrapperSelector::new(&target.wrappers).select(diff);
        let mode = match choice.template(&target.wrappers) {
            None => ExecutionMode::Direct,
            Some(template) => {
                if choice == WrapperChoice::AlterWrapper && mods.has_online_ddl_clauses() {
                    sql = render_non_empty(diff, &mods.without_online_ddl_clauses(), &schema_name)?;
                }
                let vars = template_vars(diff, &schema_name, &sql, target);
                let command = self.command_builder.render(template, &vars)?;
                let printable = match vars.get("PASSWORD") {
                    Some(password) if !password.is_empty() => {
                        let mut masked = vars.clone();
                        masked.set_raw("PASSWORD", PASSWORD_MASK);
                        self.command_builder.render(template, &masked)?
                    }
                    _ => command.clone(),
                };
                ExecutionMode::ShellOut {
                    wrapper: choice,
                    command,
                    printable,
                }
            }
        };

        debug!(
            object = %object_key.qualified(&schema_name),
            kind = ?kind,
            wrapper = %choice,
            "Built DDL statement"
        );

        Ok(DdlStatement::new(
            schema_name,
            sql,
            object_key,
            kind,
            mode,
            SessionOptions {
                suppress_fk_checks: mods.suppress_fk_checks,
            },
            target.connector.clone(),
            target.shell.clone(),
        ))
    }

    /// 差分の並びからバッチを構築
    ///
    /// 危険な変更やレンダリングエラーの差分はスキップとして記録し、
    /// テンプレートエラーはバッチ全体を中断します。
    pub fn build_all<D: ObjectDiff>(
        &self,
        diffs: &[D],
        mods: &StatementModifiers,
        target: &TargetContext,
    ) -> Result<BatchPlan, ApplierError> {
        let mut plan = BatchPlan::default();

        for diff in diffs {
            let schema_name = if diff.kind().is_database_level() {
                ""
            } else {
                target.schema_name.as_str()
            };
            match self.build(diff, mods, target) {
                Ok(statement) => plan.statements.push(statement),
                Err(e) if e.is_fatal_to_batch() => return Err(e),
                Err(e) => {
                    let object = diff.object_key().qualified(schema_name);
                    warn!(object = %object, error = %e, "Skipping difference");
                    plan.skipped.push(SkippedDiff {
                        object,
                        reason: e.to_string(),
                        unsafe_change: e.is_unsafe_change(),
                    });
                }
            }
        }

        Ok(plan)
    }
}

/// 1つの差分からステートメントを構築
pub fn new_ddl_statement(
    diff: &dyn ObjectDiff,
    mods: &StatementModifiers,
    target: &TargetContext,
) -> Result<DdlStatement, ApplierError> {
    StatementBuilder::new().build(diff, mods, target)
}

fn render_non_empty(
    diff: &dyn ObjectDiff,
    mods: &StatementModifiers,
    schema_name: &str,
) -> Result<String, ApplierError> {
    let sql = diff.render(mods)?;
    if sql.trim().is_empty() {
        return Err(RenderError::new(
            diff.object_key().qualified(schema_name),
            "difference rendered an empty statement",
        )
        .into());
    }
    Ok(sql)
}

fn template_vars(
    diff: &dyn ObjectDiff,
    schema_name: &str,
    sql: &str,
    target: &TargetContext,
) -> TemplateVars {
    let key = diff.object_key();
    let diff_type = diff.kind().diff_type();
    let clauses = match diff_type {
        DiffType::Alter => alter_clauses(sql, key.class),
        DiffType::Create | DiffType::Drop => String::new(),
    };
    let table = diff.table();
    let conn = &target.connection;

    let mut vars = TemplateVars::new();
    vars.set_quoted("SCHEMA", schema_name)
        .set_quoted("NAME", key.name.as_str())
        .set_quoted("TABLE", table.map_or("", |t| t.name.as_str()))
        .set_raw("TYPE", diff_type.as_str())
        .set_raw("CLASS", key.class.caps())
        .set_quoted("CLAUSES", clauses)
        .set_quoted("DDL", sql)
        .set_raw("SIZE", table.map_or(0, |t| t.row_estimate).to_string())
        .set_quoted("HOST", conn.host.as_str())
        .set_raw("PORT", conn.port.to_string())
        .set_quoted("SOCKET", conn.socket.clone().unwrap_or_default())
        .set_quoted("USER", conn.user.as_str())
        .set_quoted("PASSWORD", conn.password.clone().unwrap_or_default())
        .set_quoted("ENVIRONMENT", conn.environment.as_str())
        .set_quoted("CONNOPTS", conn.connect_options.as_str());
    vars
}

/// `ALTER <CLASS> <識別子>` 以降の句を取り出す
///
/// 形式が一致しない場合は空文字列を返します。
fn alter_clauses(sql: &str, class: ObjectClass) -> String {
    let prefix = format!("ALTER {} ", class.caps());
    let matches_prefix = sql
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(&prefix));
    if !matches_prefix {
        return String::new();
    }

    let rest = sql[prefix.len()..].trim_start();
    let after_ident = match rest.strip_prefix('`') {
        Some(quoted) => {
            let mut pos = 0;
            loop {
                match quoted[pos..].find('`') {
                    None => return String::new(),
                    Some(i) if quoted[pos + i + 1..].starts_with('`') => pos += i + 2,
                    Some(i) => break &quoted[pos + i + 1..],
                }
            }
        }
        None => rest.find(char::is_whitespace).map_or("", |i| &rest[i..]),
    };

    after_ident.trim().to_string()
}
