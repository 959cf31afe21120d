use anyhow::{Context, Result};
use clap::Parser;
use colored::control as color_control;
use std::env;
use std::path::PathBuf;
use std::process;
use strata_applier::cli::commands::apply::{ApplyCommand, ApplyCommandHandler, ApplyIncomplete};
use strata_applier::cli::commands::plan::{PlanCommand, PlanCommandHandler};
use strata_applier::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    // CLIをパースして実行
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // 非同期ランタイムを作成して実行
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create Tokio runtime")
        .unwrap_or_else(|e| {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        });

    let result = runtime.block_on(run_command(cli));

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            // 失敗時も実行結果は標準出力へ
            if let Some(incomplete) = e.downcast_ref::<ApplyIncomplete>() {
                println!("{}", incomplete.rendered);
            }
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// トレーシングを初期化する
///
/// --verbose 指定時は debug、それ以外は RUST_LOG（未設定なら warn）に従う。
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// コマンドを実行する
async fn run_command(cli: Cli) -> Result<String> {
    // --no-color フラグの処理
    if cli.no_color {
        color_control::set_override(false);
    }

    // プロジェクトのルートパスを取得
    let project_path = env::current_dir()?;

    // --config フラグの処理（絶対パスに変換）
    let config_path: Option<PathBuf> = cli.config.map(|p| {
        if p.is_absolute() {
            p
        } else {
            project_path.join(p)
        }
    });

    match cli.command {
        Commands::Plan {
            env,
            diffs,
            allow_unsafe,
        } => {
            let handler = PlanCommandHandler::new();
            let command = PlanCommand {
                project_path,
                config_path,
                env,
                diffs,
                allow_unsafe,
                format: cli.format,
            };
            handler.execute(&command)
        }

        Commands::Apply {
            env,
            diffs,
            allow_unsafe,
            continue_on_error,
        } => {
            let handler = ApplyCommandHandler::new();
            let command = ApplyCommand {
                project_path,
                config_path,
                env,
                diffs,
                allow_unsafe,
                continue_on_error,
                format: cli.format,
            };
            handler.execute(&command).await
        }
    }
}
