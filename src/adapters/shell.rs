// シェル実行アダプター
//
// レンダリング済みのコマンドラインを /bin/sh -c で子プロセスとして実行し、
// 終了ステータスと出力をキャプチャします。

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// 子プロセスの実行結果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShellOutput {
    /// 終了コード（シグナルで終了した場合は None）
    pub status: Option<i32>,
    /// 標準出力
    pub stdout: String,
    /// 標準エラー出力
    pub stderr: String,
}

impl ShellOutput {
    /// 終了コード0で終了したか
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// 標準出力と標準エラー出力を結合した文字列
    pub fn combined(&self) -> String {
        let mut combined = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&self.stderr);
        }
        combined
    }
}

/// コマンドラインを同期的に実行する外部機能
///
/// テスト時はフェイク実装に差し替えます。
#[async_trait]
pub trait ShellRunner: Send + Sync {
    /// コマンドラインを実行して完了を待つ
    ///
    /// 起動に失敗した場合のみ Err を返し、非0終了は ShellOutput で表現します。
    async fn run(&self, command: &str) -> io::Result<ShellOutput>;
}

/// システムシェルで実行するShellRunner
#[derive(Debug, Clone)]
pub struct SystemShellRunner {
    shell: PathBuf,
}

impl SystemShellRunner {
    /// /bin/sh を使用するランナーを作成
    pub fn new() -> Self {
        Self::with_shell("/bin/sh")
    }

    /// 使用するシェルを指定してランナーを作成
    pub fn with_shell(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for SystemShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShellRunner for SystemShellRunner {
    async fn run(&self, command: &str) -> io::Result<ShellOutput> {
        debug!(shell = %self.shell.display(), command = command, "Spawning shell command");

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await?;

        Ok(ShellOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_output() {
        let output = ShellOutput {
            status: Some(1),
            stdout: "partial".to_string(),
            stderr: "failed\n".to_string(),
        };

        assert!(!output.success());
        assert_eq!(output.combined(), "partial\nfailed\n");
    }

    #[test]
    fn test_combined_output_stdout_only() {
        let output = ShellOutput {
            status: Some(0),
            stdout: "ok\n".to_string(),
            stderr: String::new(),
        };

        assert!(output.success());
        assert_eq!(output.combined(), "ok\n");
    }

    #[tokio::test]
    async fn test_system_shell_runner_captures_output_and_status() {
        let runner = SystemShellRunner::new();

        let output = runner.run("echo hello; echo oops >&2; exit 3").await.unwrap();

        assert_eq!(output.status, Some(3));
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.stderr, "oops\n");
    }

    #[tokio::test]
    async fn test_system_shell_runner_spawn_failure() {
        let runner = SystemShellRunner::with_shell("/nonexistent/shell");

        assert!(runner.run("true").await.is_err());
    }
}
