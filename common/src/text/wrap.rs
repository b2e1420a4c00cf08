//! 単語単位の折り返しと見出しの切り詰め

use super::metrics::{FontMetrics, FontStyle};
use crate::layout::{ELLIPSIS, PLACEHOLDER_GLYPH};
use tracing::warn;

/// 列幅に収まらない単独文字を置換文字に差し替える
///
/// 単語自体は分割しない。1文字すら列幅を超える場合のみ置換するので、
/// 折り返しは必ず成功する。
pub fn sanitize_word<M: FontMetrics + ?Sized>(
    word: &str,
    max_width_mm: f32,
    size_pt: f32,
    style: FontStyle,
    metrics: &M,
) -> String {
    word.chars()
        .map(|ch| {
            let mut buf = [0u8; 4];
            let glyph = ch.encode_utf8(&mut buf);
            if metrics.text_width_mm(glyph, size_pt, style) > max_width_mm {
                warn!(
                    "文字 '{}' が列幅 {:.1}mm を超えるため '{}' に置換しました",
                    ch, max_width_mm, PLACEHOLDER_GLYPH
                );
                PLACEHOLDER_GLYPH
            } else {
                ch
            }
        })
        .collect()
}

/// 単語ごとに置換処理を行い、単一空白で連結し直す
pub fn sanitize_text<M: FontMetrics + ?Sized>(
    text: &str,
    max_width_mm: f32,
    size_pt: f32,
    style: FontStyle,
    metrics: &M,
) -> String {
    words(text)
        .map(|w| sanitize_word(w, max_width_mm, size_pt, style, metrics))
        .collect::<Vec<_>>()
        .join(" ")
}

/// 空白区切りの単語列に分解（NBSPは通常の空白扱い）
fn words(paragraph: &str) -> impl Iterator<Item = &str> {
    paragraph
        .split(|c: char| c == ' ' || c == '\u{00A0}' || c == '\t')
        .filter(|w| !w.is_empty())
}

/// テキストを列幅で折り返す
///
/// - 単語を行をまたいで分割しない（列より長い単語はその行を占有する）
/// - 改行は段落区切りとして維持する
/// - 結果は少なくとも1行
pub fn wrap_words<M: FontMetrics + ?Sized>(
    text: &str,
    max_width_mm: f32,
    size_pt: f32,
    style: FontStyle,
    metrics: &M,
) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.trim().lines() {
        let mut current = String::new();
        for word in words(paragraph) {
            let word = sanitize_word(word, max_width_mm, size_pt, style, metrics);
            if current.is_empty() {
                current = word;
                continue;
            }
            let candidate = format!("{} {}", current, word);
            if metrics.text_width_mm(&candidate, size_pt, style) <= max_width_mm {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word));
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// 1行に収まるか
pub fn fits_single_line<M: FontMetrics + ?Sized>(
    text: &str,
    max_width_mm: f32,
    size_pt: f32,
    style: FontStyle,
    metrics: &M,
) -> bool {
    metrics.text_width_mm(text, size_pt, style) <= max_width_mm
}

/// 末尾に省略記号を付けて1行に収める
///
/// 収まる場合はそのまま返す。省略記号すら入らない場合は省略記号のみ。
pub fn truncate_with_ellipsis<M: FontMetrics + ?Sized>(
    text: &str,
    max_width_mm: f32,
    size_pt: f32,
    style: FontStyle,
    metrics: &M,
) -> String {
    if fits_single_line(text, max_width_mm, size_pt, style, metrics) {
        return text.to_string();
    }

    let mut truncated = String::new();
    for ch in text.chars() {
        let candidate = format!("{}{}{}", truncated, ch, ELLIPSIS);
        if metrics.text_width_mm(&candidate, size_pt, style) <= max_width_mm {
            truncated.push(ch);
        } else {
            break;
        }
    }
    truncated.push_str(ELLIPSIS);
    truncated
}
