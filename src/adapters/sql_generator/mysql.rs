// MySQL用SQLジェネレーター
//
// 差分の参照実装からMySQL用のDDL文を生成します。
// SchemaObjectDiff の ObjectDiff 実装もここで提供します。

use crate::adapters::sql_generator::SqlGenerator;
use crate::adapters::sql_quote::quote_identifier_mysql;
use crate::core::error::RenderError;
use crate::core::schema_diff::{
    DiffKind, ObjectDiff, ObjectKey, SchemaObjectDiff, TableRef,
};
use crate::core::statement_modifiers::StatementModifiers;

/// MySQL用SQLジェネレーター
#[derive(Debug, Clone, Default)]
pub struct MysqlSqlGenerator {}

impl MysqlSqlGenerator {
    /// 新しいMysqlSqlGeneratorを作成
    pub fn new() -> Self {
        Self {}
    }

    /// ALTER TABLE の先頭に付けるオンラインDDL句
    fn online_ddl_clauses(&self, mods: &StatementModifiers) -> Vec<String> {
        let mut clauses = Vec::new();

        let algorithm = mods.algorithm_clause.trim();
        if !algorithm.is_empty() {
            clauses.push(format!("ALGORITHM={}", algorithm.to_uppercase()));
        }

        let lock = mods.lock_clause.trim();
        if !lock.is_empty() {
            clauses.push(format!("LOCK={}", lock.to_uppercase()));
        }

        clauses
    }

    fn generate_alter_database(
        &self,
        key: &ObjectKey,
        charset: Option<&str>,
        collation: Option<&str>,
    ) -> Result<String, RenderError> {
        let mut parts = Vec::new();
        if let Some(charset) = charset.filter(|c| !c.trim().is_empty()) {
            parts.push(format!("CHARACTER SET {}", charset));
        }
        if let Some(collation) = collation.filter(|c| !c.trim().is_empty()) {
            parts.push(format!("COLLATE {}", collation));
        }

        if parts.is_empty() {
            return Err(RenderError::new(
                key.to_string(),
                "database diff specifies neither charset nor collation",
            ));
        }

        Ok(format!(
            "ALTER DATABASE {} {}",
            quote_identifier_mysql(&key.name),
            parts.join(" ")
        ))
    }

    fn generate_alter_table(
        &self,
        key: &ObjectKey,
        table: &TableRef,
        clause_sqls: Vec<&str>,
        mods: &StatementModifiers,
    ) -> Result<String, RenderError> {
        let clause_sqls: Vec<&str> = clause_sqls
            .into_iter()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();

        if clause_sqls.is_empty() {
            return Err(RenderError::new(
                key.to_string(),
                "ALTER TABLE diff has no clauses",
            ));
        }

        let mut parts = self.online_ddl_clauses(mods);
        parts.extend(clause_sqls.into_iter().map(str::to_string));

        Ok(format!(
            "ALTER TABLE {} {}",
            quote_identifier_mysql(&table.name),
            parts.join(", ")
        ))
    }

    fn require_definition<'a>(
        &self,
        key: &ObjectKey,
        definition: &'a str,
    ) -> Result<&'a str, RenderError> {
        let definition = definition.trim();
        if definition.is_empty() {
            return Err(RenderError::new(key.to_string(), "definition is empty"));
        }
        Ok(definition)
    }
}

impl SqlGenerator for MysqlSqlGenerator {
    fn generate(
        &self,
        diff: &SchemaObjectDiff,
        mods: &StatementModifiers,
    ) -> Result<String, RenderError> {
        let key = diff.key();

        // 危険な変更は許可されていない限り生成しない
        if let Some(reason) = diff.destructive_reason() {
            if !mods.permit_unsafe {
                return Err(RenderError::new(
                    key.to_string(),
                    format!("refusing to render unsafe change ({})", reason),
                ));
            }
        }

        let class = key.class.caps();
        let name = quote_identifier_mysql(&key.name);

        match diff {
            SchemaObjectDiff::DatabaseAlter {
                charset, collation, ..
            } => self.generate_alter_database(&key, charset.as_deref(), collation.as_deref()),
            SchemaObjectDiff::TableCreate { definition, .. }
            | SchemaObjectDiff::RoutineCreate { definition, .. } => {
                let definition = self.require_definition(&key, definition)?;
                let separator = if definition.starts_with('(') && diff.diff_kind().is_routine() {
                    ""
                } else {
                    " "
                };
                Ok(format!("CREATE {} {}{}{}", class, name, separator, definition))
            }
            SchemaObjectDiff::TableDrop { .. } | SchemaObjectDiff::RoutineDrop { .. } => {
                Ok(format!("DROP {} {}", class, name))
            }
            SchemaObjectDiff::TableAlter { table, clauses } => self.generate_alter_table(
                &key,
                table,
                clauses.iter().map(|c| c.sql.as_str()).collect(),
                mods,
            ),
            SchemaObjectDiff::RoutineAlter {
                characteristics, ..
            } => {
                let characteristics: Vec<&str> = characteristics
                    .iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .collect();
                if characteristics.is_empty() {
                    return Err(RenderError::new(
                        key.to_string(),
                        "ALTER routine diff has no characteristics",
                    ));
                }
                Ok(format!("ALTER {} {} {}", class, name, characteristics.join(" ")))
            }
        }
    }
}

impl ObjectDiff for SchemaObjectDiff {
    fn kind(&self) -> DiffKind {
        self.diff_kind()
    }

    fn object_key(&self) -> ObjectKey {
        self.key()
    }

    fn table(&self) -> Option<&TableRef> {
        self.table_ref()
    }

    fn unsafe_reason(&self) -> Option<String> {
        self.destructive_reason()
    }

    fn render(&self, mods: &StatementModifiers) -> Result<String, RenderError> {
        MysqlSqlGenerator::new().generate(self, mods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema_diff::{AlterClause, RoutineRef, RoutineType};

    fn online_mods() -> StatementModifiers {
        StatementModifiers::new()
            .with_algorithm_clause("inplace")
            .with_lock_clause("none")
    }

    #[test]
    fn test_generate_alter_table_with_online_clauses() {
        let diff = SchemaObjectDiff::alter_table(
            TableRef::new("rollups", 0),
            vec![AlterClause::new("ADD COLUMN `value` bigint(20) DEFAULT NULL")],
        );

        let sql = diff.render(&online_mods()).unwrap();

        assert_eq!(
            sql,
            "ALTER TABLE `rollups` ALGORITHM=INPLACE, LOCK=NONE, ADD COLUMN `value` bigint(20) DEFAULT NULL"
        );
    }

    #[test]
    fn test_generate_alter_table_without_online_clauses() {
        let diff = SchemaObjectDiff::alter_table(
            TableRef::new("rollups", 0),
            vec![
                AlterClause::new("ADD COLUMN `value` bigint(20) DEFAULT NULL"),
                AlterClause::new("ADD KEY `idx_value` (`value`)"),
            ],
        );

        let sql = diff.render(&StatementModifiers::new()).unwrap();

        assert_eq!(
            sql,
            "ALTER TABLE `rollups` ADD COLUMN `value` bigint(20) DEFAULT NULL, ADD KEY `idx_value` (`value`)"
        );
    }

    #[test]
    fn test_generate_alter_table_without_clauses_fails() {
        let diff = SchemaObjectDiff::alter_table(
            TableRef::new("rollups", 0),
            vec![AlterClause::new("  ")],
        );

        let err = diff.render(&StatementModifiers::new()).unwrap_err();
        assert!(err.message.contains("no clauses"));
    }

    #[test]
    fn test_generate_refuses_unsafe_without_permission() {
        let diff = SchemaObjectDiff::TableDrop {
            table: TableRef::new("widget_counts", 5),
        };

        assert!(diff.render(&StatementModifiers::new()).is_err());
        assert_eq!(
            diff.render(&StatementModifiers::new().with_permit_unsafe(true))
                .unwrap(),
            "DROP TABLE `widget_counts`"
        );
    }

    #[test]
    fn test_generate_create_table() {
        let diff = SchemaObjectDiff::TableCreate {
            table: TableRef::new("activity", 0),
            definition: "(\n  `id` int NOT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB".to_string(),
        };

        let sql = diff.render(&online_mods()).unwrap();

        assert!(sql.starts_with("CREATE TABLE `activity` ("));
        // CREATE TABLE にはオンラインDDL句を付けない
        assert!(!sql.contains("ALGORITHM="));
    }

    #[test]
    fn test_generate_alter_database() {
        let diff = SchemaObjectDiff::DatabaseAlter {
            database: "analytics".to_string(),
            charset: Some("utf8mb4".to_string()),
            collation: Some("utf8mb4_unicode_ci".to_string()),
        };

        assert_eq!(
            diff.render(&online_mods()).unwrap(),
            "ALTER DATABASE `analytics` CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci"
        );
    }

    #[test]
    fn test_generate_alter_database_without_changes_fails() {
        let diff = SchemaObjectDiff::DatabaseAlter {
            database: "analytics".to_string(),
            charset: None,
            collation: Some(" ".to_string()),
        };

        assert!(diff.render(&StatementModifiers::new()).is_err());
    }

    #[test]
    fn test_generate_routines() {
        let routine = RoutineRef {
            name: "cleanup".to_string(),
            routine_type: RoutineType::Procedure,
        };

        let create = SchemaObjectDiff::RoutineCreate {
            routine: routine.clone(),
            definition: "() BEGIN DELETE FROM sessions; END".to_string(),
        };
        assert_eq!(
            create.render(&StatementModifiers::new()).unwrap(),
            "CREATE PROCEDURE `cleanup`() BEGIN DELETE FROM sessions; END"
        );

        let alter = SchemaObjectDiff::RoutineAlter {
            routine: routine.clone(),
            characteristics: vec!["COMMENT 'nightly'".to_string()],
        };
        assert_eq!(
            alter.render(&StatementModifiers::new()).unwrap(),
            "ALTER PROCEDURE `cleanup` COMMENT 'nightly'"
        );

        let drop = SchemaObjectDiff::RoutineDrop { routine };
        assert_eq!(
            drop.render(&StatementModifiers::new().with_permit_unsafe(true))
                .unwrap(),
            "DROP PROCEDURE `cleanup`"
        );
    }

    #[test]
    fn test_object_diff_trait_delegation() {
        let diff = SchemaObjectDiff::alter_table(
            TableRef::new("pageviews", 1),
            vec![AlterClause::destructive("DROP COLUMN `domain`")],
        );
        let dyn_diff: &dyn ObjectDiff = &diff;

        assert_eq!(dyn_diff.kind(), DiffKind::TableAlter);
        assert_eq!(dyn_diff.table().unwrap().row_estimate, 1);
        assert!(dyn_diff.is_unsafe());
    }
}
