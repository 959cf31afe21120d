// ラッパー選択
//
// 差分の種別・テーブルサイズ・設定から、直接実行するか外部コマンドに委譲するかを決定します。

use serde::Serialize;
use std::fmt;

use crate::core::schema_diff::{DiffKind, ObjectDiff};
use crate::core::target::WrapperSettings;

/// 実行方法の選択結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapperChoice {
    /// データベースセッションで直接実行
    Direct,
    /// ddl-wrapper に委譲
    DdlWrapper,
    /// alter-wrapper に委譲
    AlterWrapper,
}

impl WrapperChoice {
    /// 設定キー名
    pub fn config_name(&self) -> &'static str {
        match self {
            WrapperChoice::Direct => "direct",
            WrapperChoice::DdlWrapper => "ddl-wrapper",
            WrapperChoice::AlterWrapper => "alter-wrapper",
        }
    }

    /// 選択されたラッパーのテンプレート
    pub fn template<'a>(&self, settings: &'a WrapperSettings) -> Option<&'a str> {
        match self {
            WrapperChoice::Direct => None,
            WrapperChoice::DdlWrapper => Some(settings.ddl_wrapper.as_str()),
            WrapperChoice::AlterWrapper => Some(settings.alter_wrapper.as_str()),
        }
    }
}

impl fmt::Display for WrapperChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

/// ラッパー選択サービス
#[derive(Debug, Clone, Copy)]
pub struct WrapperSelector<'a> {
    settings: &'a WrapperSettings,
}

impl<'a> WrapperSelector<'a> {
    /// 新しいWrapperSelectorを作成
    pub fn new(settings: &'a WrapperSettings) -> Self {
        Self { settings }
    }

    /// 差分の実行方法を選択
    ///
    /// ALTER TABLE は推定行数が alter-wrapper-min-size 以上なら alter-wrapper を優先し、
    /// それ以外の差分は ddl-wrapper が設定されていればそれを使用します。
    pub fn select(&self, diff: &dyn ObjectDiff) -> WrapperChoice {
        let fallback = if self.settings.has_ddl_wrapper() {
            WrapperChoice::DdlWrapper
        } else {
            WrapperChoice::Direct
        };

        match diff.kind() {
            DiffKind::TableAlter => {
                let rows = diff.table().map_or(0, |t| t.row_estimate);
                if self.settings.has_alter_wrapper()
                    && rows >= self.settings.alter_wrapper_min_size
                {
                    WrapperChoice::AlterWrapper
                } else {
                    fallback
                }
            }
            DiffKind::DatabaseAlter
            | DiffKind::TableCreate
            | DiffKind::TableDrop
            | DiffKind::RoutineCreate
            | DiffKind::RoutineDrop
            | DiffKind::RoutineAlter => fallback,
        }
    }
}
