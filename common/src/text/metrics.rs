//! フォント幅の計測
//!
//! PDF組み込みフォント（Helvetica / Helvetica-Bold）のAFM文字幅を保持し、
//! 文字列幅をmm単位で返す。

use crate::layout::MM_TO_PT;

/// 書体スタイル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
}

/// 文字幅の計測インターフェース
pub trait FontMetrics {
    /// 1文字の幅（1000 units/em）
    fn char_width(&self, ch: char, style: FontStyle) -> u16;

    /// 文字列幅（mm）
    fn text_width_mm(&self, text: &str, size_pt: f32, style: FontStyle) -> f32 {
        let units: u32 = text.chars().map(|c| self.char_width(c, style) as u32).sum();
        units as f32 * size_pt / 1000.0 / MM_TO_PT
    }
}

/// ASCII 32..=126 の Helvetica 文字幅
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// ASCII 32..=126 の Helvetica-Bold 文字幅
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// ASCII外の文字に使う平均幅
const FALLBACK_WIDTH: u16 = 556;

/// 組み込みHelveticaの文字幅
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinHelvetica;

impl FontMetrics for BuiltinHelvetica {
    fn char_width(&self, ch: char, style: FontStyle) -> u16 {
        let table = match style {
            FontStyle::Regular => &HELVETICA,
            FontStyle::Bold => &HELVETICA_BOLD,
        };
        let code = ch as u32;
        if (32..=126).contains(&code) {
            table[(code - 32) as usize]
        } else if ch == '\u{00A0}' {
            table[0]
        } else {
            FALLBACK_WIDTH
        }
    }
}
