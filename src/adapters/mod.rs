// Adapters
// データベース接続、子プロセス実行、SQL生成へのアクセスを抽象化

pub mod database;
pub mod shell;
pub mod sql_generator;
pub mod sql_quote;
