// Services Layer
// 差分からDDLステートメントを構築・実行するサービス層

pub mod ddl_statement;
pub mod safety_policy;
pub mod shell_command_builder;
pub mod statement_builder;
pub mod statement_executor;
pub mod target_context;
pub mod wrapper_selector;
