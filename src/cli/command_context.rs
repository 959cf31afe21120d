// コマンド共通コンテキスト
//
// 設定ファイル・差分ファイルの読み込みとターゲット解決をCLI層で集約する。

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::config::{Config, EnvironmentConfig};
use crate::core::schema_diff::SchemaObjectDiff;
use crate::core::statement_modifiers::StatementModifiers;
use crate::services::target_context::TargetContext;

/// 差分ファイル
///
/// スキーマ名ごとに、適用順に並んだ差分を保持します。
///
/// ```yaml
/// schemas:
///   analytics:
///     - kind: table_alter
///       table: { name: rollups, row_estimate: 0 }
///       clauses:
///         - sql: "ADD COLUMN `value` bigint(20) DEFAULT NULL"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffFile {
    #[serde(default)]
    pub schemas: BTreeMap<String, Vec<SchemaObjectDiff>>,
}

impl DiffFile {
    /// ファイルから差分を読み込む
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read diff file: {:?}", path))?;
        content
            .parse()
            .with_context(|| format!("Invalid diff file: {:?}", path))
    }

    /// 差分の総数
    pub fn len(&self) -> usize {
        self.schemas.values().map(Vec::len).sum()
    }

    /// 差分が1つもないか
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromStr for DiffFile {
    type Err = anyhow::Error;

    fn from_str(yaml: &str) -> Result<Self, Self::Err> {
        serde_saphyr::from_str(yaml).with_context(|| "Failed to parse diff file")
    }
}

/// 1スキーマ分の作業単位
#[derive(Debug)]
pub struct SchemaTarget {
    pub target: TargetContext,
    pub diffs: Vec<SchemaObjectDiff>,
}

/// CLIコマンド共通の実行コンテキスト
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub project_path: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
}

impl CommandContext {
    /// プロジェクトルートから設定を読み込んでコンテキストを作成
    pub fn load(project_path: PathBuf) -> Result<Self> {
        Self::load_with_config(project_path, None)
    }

    /// カスタム設定ファイルパスを指定してコンテキストを作成
    pub fn load_with_config(
        project_path: PathBuf,
        custom_config_path: Option<PathBuf>,
    ) -> Result<Self> {
        let config_path = custom_config_path
            .unwrap_or_else(|| project_path.join(Config::DEFAULT_CONFIG_PATH));

        if !config_path.exists() {
            return Err(anyhow!("Config file not found: {:?}", config_path));
        }

        let config = Config::from_file(&config_path)?;

        Ok(Self {
            project_path,
            config_path,
            config,
        })
    }

    /// 環境設定を取得
    pub fn environment(&self, env: &str) -> Result<&EnvironmentConfig> {
        self.config.get_environment(env)
    }

    /// 差分ファイルのパスを解決（相対パスはプロジェクトルート基準）
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_path.join(path)
        }
    }

    /// 環境の既定修飾子を取得
    pub fn statement_modifiers(&self, env: &str, allow_unsafe: bool) -> Result<StatementModifiers> {
        Ok(self.environment(env)?.statement_modifiers(allow_unsafe))
    }

    /// 差分ファイルを読み込み、スキーマごとのターゲットを解決
    ///
    /// 差分ファイルのスキーマは環境の `schemas` に含まれている必要があります。
    /// 結果は環境の `schemas` の順序に従います。
    pub fn schema_targets(&self, env: &str, diffs_path: &Path) -> Result<Vec<SchemaTarget>> {
        let env_config = self.environment(env)?;
        let mut diff_file = DiffFile::from_file(&self.resolve_path(diffs_path))?;

        if let Some(unknown) = diff_file
            .schemas
            .keys()
            .find(|schema| !env_config.schemas.contains(*schema))
        {
            return Err(anyhow!(
                "Schema '{}' in diff file is not configured for environment '{}'. Configured schemas: {:?}",
                unknown,
                env,
                env_config.schemas
            ));
        }

        let mut targets = Vec::new();
        for schema in &env_config.schemas {
            let Some(diffs) = diff_file.schemas.remove(schema) else {
                continue;
            };
            if diffs.is_empty() {
                continue;
            }
            let target = TargetContext::from_environment(env, env_config, schema)
                .with_context(|| format!("Failed to resolve target for schema '{}'", schema))?;
            targets.push(SchemaTarget { target, diffs });
        }

        Ok(targets)
    }
}
