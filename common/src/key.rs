//! 品番キーの正規化
//!
//! 比較用に品番を文字列化・前後空白除去する。
//! 画像検索はファイル名（拡張子除く）との完全一致で行うため、
//! ここでは大文字小文字や記号の変換は行わない。

/// 表計算ソフトの欠損値表記
const MISSING_MARKER: &str = "nan";

/// 品番を比較用に正規化（前後空白・NBSP除去）
pub fn normalize_key(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{00A0}')
        .to_string()
}

/// 空セル扱いかどうか（空白のみ・`nan`）
pub fn is_blank_cell(raw: &str) -> bool {
    let trimmed = normalize_key(raw);
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(MISSING_MARKER)
}

/// 有効な品番を取得（空なら None）
pub fn key_of(raw: &str) -> Option<String> {
    let key = normalize_key(raw);
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
