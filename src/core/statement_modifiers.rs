// ステートメント修飾子
//
// SQL生成時の方言・安全性を制御するフラグの集合。
// 構築後は不変で、変更メソッドは新しい値を返します。

/// ステートメント修飾子
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementModifiers {
    /// 危険な変更を許可するかどうか
    pub permit_unsafe: bool,
    /// LOCK句の値（空の場合は出力しない）
    pub lock_clause: String,
    /// ALGORITHM句の値（空の場合は出力しない）
    pub algorithm_clause: String,
    /// 直接実行時に foreign_key_checks を無効化するかどうか
    pub suppress_fk_checks: bool,
}

impl StatementModifiers {
    /// 新しい修飾子を作成（すべて無効）
    pub fn new() -> Self {
        Self::default()
    }

    /// 危険な変更の許可を設定
    pub fn with_permit_unsafe(mut self, permit_unsafe: bool) -> Self {
        self.permit_unsafe = permit_unsafe;
        self
    }

    /// LOCK句を設定
    pub fn with_lock_clause(mut self, lock: impl Into<String>) -> Self {
        self.lock_clause = lock.into();
        self
    }

    /// ALGORITHM句を設定
    pub fn with_algorithm_clause(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm_clause = algorithm.into();
        self
    }

    /// foreign_key_checks の無効化を設定
    pub fn with_suppress_fk_checks(mut self, suppress: bool) -> Self {
        self.suppress_fk_checks = suppress;
        self
    }

    /// LOCK句またはALGORITHM句が指定されているか
    pub fn has_online_ddl_clauses(&self) -> bool {
        !self.lock_clause.trim().is_empty() || !self.algorithm_clause.trim().is_empty()
    }

    /// LOCK句とALGORITHM句を取り除いた修飾子を返す
    pub fn without_online_ddl_clauses(&self) -> Self {
        Self {
            lock_clause: String::new(),
            algorithm_clause: String::new(),
            ..self.clone()
        }
    }
}
