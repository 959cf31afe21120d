// シェルコマンドビルダー
//
// {PLACEHOLDER} を含むテンプレートを、シェルに渡しても安全なコマンドラインに展開します。

use std::collections::BTreeMap;

use crate::adapters::sql_quote::quote_shell_arg;
use crate::core::error::TemplateError;

/// 値の挿入方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quoting {
    /// そのまま挿入（システムが生成する閉じたラベル集合のみ）
    Raw,
    /// 必要に応じてPOSIXシングルクォートでエスケープ
    Quoted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TemplateValue {
    value: String,
    quoting: Quoting,
}

/// プレースホルダーの値
///
/// 名前は大文字で保持し、テンプレート側では大文字小文字を区別しません。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    values: BTreeMap<String, TemplateValue>,
}

impl TemplateVars {
    /// 空の値セットを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// エスケープして挿入する値を設定
    pub fn set_quoted(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.set(name, value.into(), Quoting::Quoted)
    }

    /// そのまま挿入する値を設定
    pub fn set_raw(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.set(name, value.into(), Quoting::Raw)
    }

    fn set(&mut self, name: &str, value: String, quoting: Quoting) -> &mut Self {
        self.values
            .insert(name.to_ascii_uppercase(), TemplateValue { value, quoting });
        self
    }

    /// 値を取得（エスケープ前）
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.to_ascii_uppercase())
            .map(|v| v.value.as_str())
    }

    fn rendered(&self, name: &str) -> Option<String> {
        self.values.get(name).map(|v| match v.quoting {
            Quoting::Raw => v.value.clone(),
            Quoting::Quoted => quote_shell_arg(&v.value),
        })
    }
}

/// シェルコマンドビルダー
#[derive(Debug, Clone, Default)]
pub struct ShellCommandBuilder {}

impl ShellCommandBuilder {
    /// 新しいShellCommandBuilderを作成
    pub fn new() -> Self {
        Self {}
    }

    /// テンプレートをコマンドラインに展開
    ///
    /// `{` の直後に英字とアンダースコアのみが続き `}` で閉じるものをプレースホルダーとみなします。
    /// それ以外の波括弧（例: `awk '{print $1}'`）はそのまま出力します。
    ///
    /// # Arguments
    ///
    /// * `template` - ラッパーテンプレート
    /// * `vars` - プレースホルダーの値
    ///
    /// # Returns
    ///
    /// 展開されたコマンドライン、または未知/未終端のプレースホルダーによるエラー
    pub fn render(&self, template: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
        if template.trim().is_empty() {
            return Err(TemplateError::Malformed {
                message: "template is blank".to_string(),
                template: template.to_string(),
            });
        }

        let mut command = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            command.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let ident_len = after
                .find(|c: char| !(c.is_ascii_alphabetic() || c == '_'))
                .unwrap_or(after.len());
            let (ident, tail) = after.split_at(ident_len);

            if !ident.is_empty() && tail.starts_with('}') {
                let name = ident.to_ascii_uppercase();
                let value =
                    vars.rendered(&name)
                        .ok_or_else(|| TemplateError::UnknownPlaceholder {
                            name,
                            template: template.to_string(),
                        })?;
                command.push_str(&value);
                rest = &tail[1..];
            } else if !ident.is_empty() && tail.is_empty() {
                return Err(TemplateError::Malformed {
                    message: format!("unterminated placeholder {{{}", ident),
                    template: template.to_string(),
                });
            } else {
                command.push('{');
                rest = after;
            }
        }
        command.push_str(rest);

        Ok(command)
    }
}
