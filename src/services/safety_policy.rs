// 安全性ポリシー
//
// 危険な変更（データ損失・不可逆な変更）をステートメント化してよいかを判定します。

use tracing::debug;

use crate::core::error::ApplierError;
use crate::core::schema_diff::ObjectDiff;
use crate::core::statement_modifiers::StatementModifiers;

/// 安全性ポリシー
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SafetyPolicy {
    /// この推定行数未満のテーブルは危険な変更も許可する（0は無効）
    safe_below_size: u64,
}

impl SafetyPolicy {
    /// 新しいSafetyPolicyを作成
    pub fn new(safe_below_size: u64) -> Self {
        Self { safe_below_size }
    }

    /// テーブルが十分小さく、危険な変更を許可できるか
    pub fn is_below_safe_size(&self, diff: &dyn ObjectDiff) -> bool {
        self.safe_below_size > 0
            && diff
                .table()
                .is_some_and(|t| t.row_estimate < self.safe_below_size)
    }

    /// 差分をステートメント化してよいか検証
    ///
    /// # Returns
    ///
    /// 危険な変更が許可されていない場合は `ApplierError::UnsafeChange`
    pub fn validate(
        &self,
        diff: &dyn ObjectDiff,
        mods: &StatementModifiers,
    ) -> Result<(), ApplierError> {
        let Some(reason) = diff.unsafe_reason() else {
            return Ok(());
        };

        if mods.permit_unsafe {
            debug!(object = %diff.object_key(), "Unsafe change permitted by modifiers");
            return Ok(());
        }

        if self.is_below_safe_size(diff) {
            debug!(
                object = %diff.object_key(),
                safe_below_size = self.safe_below_size,
                "Unsafe change permitted for small table"
            );
            return Ok(());
        }

        Err(ApplierError::UnsafeChange {
            object: diff.object_key().to_string(),
            reason,
        })
    }

    /// SQL生成に渡す修飾子を決定
    ///
    /// safe-below-size により許可された場合は `permit_unsafe` を立てた修飾子を返します。
    pub fn effective_modifiers(
        &self,
        diff: &dyn ObjectDiff,
        mods: &StatementModifiers,
    ) -> StatementModifiers {
        if !mods.permit_unsafe && diff.is_unsafe() && self.is_below_safe_size(diff) {
            mods.clone().with_permit_unsafe(true)
        } else {
            mods.clone()
        }
    }
}
