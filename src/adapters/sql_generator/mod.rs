// SQL生成アダプター
//
// 差分の参照実装から各データベース方言用のDDL文を生成するアダプター層。

pub mod mysql;

use crate::core::error::RenderError;
use crate::core::schema_diff::SchemaObjectDiff;
use crate::core::statement_modifiers::StatementModifiers;

/// SQLジェネレータートレイト
///
/// 各データベース方言用のSQLジェネレーターが実装すべきインターフェース。
pub trait SqlGenerator {
    /// 差分からDDL文を生成
    ///
    /// # Arguments
    ///
    /// * `diff` - オブジェクト差分
    /// * `mods` - ステートメント修飾子
    ///
    /// # Returns
    ///
    /// 1つのDDL文（末尾のセミコロンなし）、または生成できない理由
    fn generate(
        &self,
        diff: &SchemaObjectDiff,
        mods: &StatementModifiers,
    ) -> Result<String, RenderError>;
}
