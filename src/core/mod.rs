// Core Domain
// 差分、修飾子、ターゲット設定、エラーの純粋なドメインモデル

pub mod config;
pub mod error;
pub mod schema_diff;
pub mod statement_modifiers;
pub mod target;
