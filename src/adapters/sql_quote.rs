// クォートユーティリティ
//
// MySQL識別子のクォートと、シェル引数用のPOSIXシングルクォートエスケープを提供します。

/// MySQL用識別子クォート（バッククォート）
///
/// 識別子内のバッククォートは二重にエスケープします。
///
/// # Examples
/// ```
/// use strata_applier::adapters::sql_quote::quote_identifier_mysql;
/// assert_eq!(quote_identifier_mysql("users"), "`users`");
/// assert_eq!(quote_identifier_mysql("table`name"), "`table``name`");
/// ```
pub fn quote_identifier_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// クォートなしでシェルに渡しても安全な文字だけで構成されているか
///
/// 空文字列も安全とみなします。
pub fn is_shell_inert(value: &str) -> bool {
    value.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '/' | '@' | '%' | '=' | ':' | '.' | ',' | '+' | '-')
    })
}

/// POSIXシングルクォートでエスケープ
///
/// 値全体をシングルクォートで囲み、内部のシングルクォートは `'\''` に置き換えます。
///
/// # Examples
/// ```
/// use strata_applier::adapters::sql_quote::quote_shell_single;
/// assert_eq!(quote_shell_single("a b"), "'a b'");
/// assert_eq!(quote_shell_single("it's"), r#"'it'\''s'"#);
/// ```
pub fn quote_shell_single(value: &str) -> String {
    format!("'{}'", value.replace('\'', r#"'\''"#))
}

/// 必要な場合のみシェル引数としてクォート
///
/// # Examples
/// ```
/// use strata_applier::adapters::sql_quote::quote_shell_arg;
/// assert_eq!(quote_shell_arg("analytics"), "analytics");
/// assert_eq!(quote_shell_arg(""), "");
/// assert_eq!(quote_shell_arg("DROP COLUMN `x`"), "'DROP COLUMN `x`'");
/// ```
pub fn quote_shell_arg(value: &str) -> String {
    if is_shell_inert(value) {
        value.to_string()
    } else {
        quote_shell_single(value)
    }
}
