// スキーマ差分ドメインモデル
//
// 1つのスキーマオブジェクトに対する差分（データベース、テーブル、ルーチン）を表現する型システム。
// 差分エンジンとの境界は ObjectDiff トレイトで、SchemaObjectDiff はその参照実装です。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::RenderError;
use crate::core::statement_modifiers::StatementModifiers;

/// 差分の種類（CREATE / DROP / ALTER）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiffType {
    Create,
    Drop,
    Alter,
}

impl DiffType {
    /// ラッパーの {TYPE} に渡すラベル
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffType::Create => "CREATE",
            DiffType::Drop => "DROP",
            DiffType::Alter => "ALTER",
        }
    }
}

impl fmt::Display for DiffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// オブジェクトの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    Database,
    Table,
    Procedure,
    Function,
}

impl ObjectClass {
    /// ラッパーの {CLASS} に渡す大文字ラベル
    pub fn caps(&self) -> &'static str {
        match self {
            ObjectClass::Database => "DATABASE",
            ObjectClass::Table => "TABLE",
            ObjectClass::Procedure => "PROCEDURE",
            ObjectClass::Function => "FUNCTION",
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.caps())
    }
}

/// 差分の種別タグ
///
/// ラッパー選択と表示ラベルはこのタグで分岐するため、
/// 新しい種別を追加するとコンパイラが網羅性を検査します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    DatabaseAlter,
    TableCreate,
    TableDrop,
    TableAlter,
    RoutineCreate,
    RoutineDrop,
    RoutineAlter,
}

impl DiffKind {
    /// CREATE / DROP / ALTER への対応
    pub fn diff_type(&self) -> DiffType {
        match self {
            DiffKind::TableCreate | DiffKind::RoutineCreate => DiffType::Create,
            DiffKind::TableDrop | DiffKind::RoutineDrop => DiffType::Drop,
            DiffKind::DatabaseAlter | DiffKind::TableAlter | DiffKind::RoutineAlter => {
                DiffType::Alter
            }
        }
    }

    /// データベースレベルの差分かどうか
    pub fn is_database_level(&self) -> bool {
        matches!(self, DiffKind::DatabaseAlter)
    }

    /// テーブルの差分かどうか
    pub fn is_table(&self) -> bool {
        matches!(
            self,
            DiffKind::TableCreate | DiffKind::TableDrop | DiffKind::TableAlter
        )
    }

    /// ルーチンの差分かどうか
    pub fn is_routine(&self) -> bool {
        matches!(
            self,
            DiffKind::RoutineCreate | DiffKind::RoutineDrop | DiffKind::RoutineAlter
        )
    }
}

/// オブジェクトを識別するキー
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    /// オブジェクトの分類
    pub class: ObjectClass,
    /// オブジェクト名
    pub name: String,
}

impl ObjectKey {
    /// 新しいオブジェクトキーを作成
    pub fn new(class: ObjectClass, name: impl Into<String>) -> Self {
        Self {
            class,
            name: name.into(),
        }
    }

    /// スキーマ修飾した表示名（エラーメッセージ用）
    ///
    /// スキーマ名が空の場合はオブジェクト名のみを使用します。
    pub fn qualified(&self, schema_name: &str) -> String {
        if schema_name.is_empty() {
            format!("{} `{}`", self.class, self.name)
        } else {
            format!("{} `{}`.`{}`", self.class, schema_name, self.name)
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.class, self.name)
    }
}

/// 差分が対象とするテーブルの参照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    /// テーブル名
    pub name: String,
    /// 推定行数
    #[serde(default)]
    pub row_estimate: u64,
}

impl TableRef {
    /// 新しいテーブル参照を作成
    pub fn new(name: impl Into<String>, row_estimate: u64) -> Self {
        Self {
            name: name.into(),
            row_estimate,
        }
    }
}

/// 差分エンジンが提供する1つのオブジェクト差分
///
/// ステートメント構築はこのインターフェースのみに依存します。
pub trait ObjectDiff: Send + Sync {
    /// 差分の種別
    fn kind(&self) -> DiffKind;

    /// 対象オブジェクトのキー
    fn object_key(&self) -> ObjectKey;

    /// テーブル差分の場合は対象テーブル
    fn table(&self) -> Option<&TableRef>;

    /// 危険な変更の場合はその理由
    fn unsafe_reason(&self) -> Option<String>;

    /// データ損失や不可逆な変更を伴うかどうか
    fn is_unsafe(&self) -> bool {
        self.unsafe_reason().is_some()
    }

    /// 修飾子に従ってSQLを生成
    fn render(&self, mods: &StatementModifiers) -> Result<String, RenderError>;
}

/// ALTER TABLE の1つの句
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterClause {
    /// 句のSQL（例: ADD COLUMN `value` bigint(20) DEFAULT NULL）
    pub sql: String,
    /// データ損失の可能性がある句かどうか
    #[serde(default, rename = "unsafe")]
    pub is_unsafe: bool,
}

impl AlterClause {
    /// 安全な句を作成
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            is_unsafe: false,
        }
    }

    /// 危険な句を作成
    pub fn destructive(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            is_unsafe: true,
        }
    }
}

/// ルーチンの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineType {
    Procedure,
    Function,
}

impl RoutineType {
    /// 対応するオブジェクト分類
    pub fn object_class(&self) -> ObjectClass {
        match self {
            RoutineType::Procedure => ObjectClass::Procedure,
            RoutineType::Function => ObjectClass::Function,
        }
    }
}

/// 差分が対象とするルーチンの参照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineRef {
    /// ルーチン名
    pub name: String,
    /// ルーチンの種類
    #[serde(rename = "type")]
    pub routine_type: RoutineType,
}

/// 差分の参照実装
///
/// YAMLの差分ファイルから読み込めるように、kindタグ付きでシリアライズされます。
/// SQL生成は `adapters::sql_generator::mysql` が担当します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaObjectDiff {
    /// ALTER DATABASE（文字セット・照合順序の変更）
    DatabaseAlter {
        database: String,
        #[serde(default)]
        charset: Option<String>,
        #[serde(default)]
        collation: Option<String>,
    },

    /// CREATE TABLE
    TableCreate {
        table: TableRef,
        /// テーブル名以降の定義（カラム定義とテーブルオプション）
        definition: String,
    },

    /// DROP TABLE
    TableDrop { table: TableRef },

    /// ALTER TABLE
    TableAlter {
        table: TableRef,
        clauses: Vec<AlterClause>,
    },

    /// CREATE PROCEDURE / FUNCTION
    RoutineCreate {
        routine: RoutineRef,
        /// ルーチン名以降の定義（パラメータリストと本体）
        definition: String,
    },

    /// DROP PROCEDURE / FUNCTION
    RoutineDrop { routine: RoutineRef },

    /// ALTER PROCEDURE / FUNCTION（特性の変更）
    RoutineAlter {
        routine: RoutineRef,
        characteristics: Vec<String>,
    },
}

impl SchemaObjectDiff {
    /// ALTER TABLE 差分を作成
    pub fn alter_table(table: TableRef, clauses: Vec<AlterClause>) -> Self {
        SchemaObjectDiff::TableAlter { table, clauses }
    }

    /// 差分の種別タグ
    pub fn diff_kind(&self) -> DiffKind {
        match self {
            SchemaObjectDiff::DatabaseAlter { .. } => DiffKind::DatabaseAlter,
            SchemaObjectDiff::TableCreate { .. } => DiffKind::TableCreate,
            SchemaObjectDiff::TableDrop { .. } => DiffKind::TableDrop,
            SchemaObjectDiff::TableAlter { .. } => DiffKind::TableAlter,
            SchemaObjectDiff::RoutineCreate { .. } => DiffKind::RoutineCreate,
            SchemaObjectDiff::RoutineDrop { .. } => DiffKind::RoutineDrop,
            SchemaObjectDiff::RoutineAlter { .. } => DiffKind::RoutineAlter,
        }
    }

    /// 対象オブジェクトのキー
    pub fn key(&self) -> ObjectKey {
        match self {
            SchemaObjectDiff::DatabaseAlter { database, .. } => {
                ObjectKey::new(ObjectClass::Database, database.clone())
            }
            SchemaObjectDiff::TableCreate { table, .. }
            | SchemaObjectDiff::TableDrop { table }
            | SchemaObjectDiff::TableAlter { table, .. } => {
                ObjectKey::new(ObjectClass::Table, table.name.clone())
            }
            SchemaObjectDiff::RoutineCreate { routine, .. }
            | SchemaObjectDiff::RoutineDrop { routine }
            | SchemaObjectDiff::RoutineAlter { routine, .. } => {
                ObjectKey::new(routine.routine_type.object_class(), routine.name.clone())
            }
        }
    }

    /// テーブル差分の場合は対象テーブル
    pub fn table_ref(&self) -> Option<&TableRef> {
        match self {
            SchemaObjectDiff::TableCreate { table, .. }
            | SchemaObjectDiff::TableDrop { table }
            | SchemaObjectDiff::TableAlter { table, .. } => Some(table),
            _ => None,
        }
    }

    /// 危険な変更の理由
    pub fn destructive_reason(&self) -> Option<String> {
        match self {
            SchemaObjectDiff::TableDrop { table } if table.row_estimate > 0 => Some(format!(
                "DROP TABLE discards approximately {} row(s)",
                table.row_estimate
            )),
            SchemaObjectDiff::TableDrop { .. } => {
                Some("DROP TABLE is irreversible".to_string())
            }
            SchemaObjectDiff::TableAlter { clauses, .. } => {
                let destructive: Vec<&str> = clauses
                    .iter()
                    .filter(|c| c.is_unsafe)
                    .map(|c| c.sql.as_str())
                    .collect();
                if destructive.is_empty() {
                    None
                } else {
                    Some(format!(
                        "clause(s) may cause data loss: {}",
                        destructive.join(", ")
                    ))
                }
            }
            SchemaObjectDiff::RoutineDrop { routine } => Some(format!(
                "DROP {} removes the routine definition",
                routine.routine_type.object_class()
            )),
            SchemaObjectDiff::DatabaseAlter { .. }
            | SchemaObjectDiff::TableCreate { .. }
            | SchemaObjectDiff::RoutineCreate { .. }
            | SchemaObjectDiff::RoutineAlter { .. } => None,
        }
    }
}
