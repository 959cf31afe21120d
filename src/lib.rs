// strata-applierライブラリのエントリーポイント
//
// モジュール構造:
// - cli: CLIレイヤー（ユーザー入力の受付とコマンドルーティング）
// - core: コアドメイン（差分モデル、修飾子、設定、エラー）
// - adapters: データベース接続・シェル実行・SQL生成を抽象化
// - services: ステートメントの構築と実行

pub mod adapters;
pub mod cli;
pub mod core;
pub mod services;
