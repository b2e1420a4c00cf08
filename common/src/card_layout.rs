//! カードの2列テーブル レイアウト
//!
//! 見出し（太字・1行）と値（単語単位で折り返し）のテーブルが
//! 画像下のテキスト領域に収まる最大のフォントサイズを探す。
//!
//! 探索はフォントサイズ候補を大きい順に走査し、次の2条件を独立に判定する。
//! 1. すべての見出しが見出し列幅の1行に収まる
//! 2. 行ブロック全体の高さがテキスト領域の高さ以内
//!
//! どのサイズでも満たせない場合は最小サイズを採用し、
//! 収まらない見出しを省略記号付きで切り詰める（エラーにはしない）。

use crate::export::card_core::CardField;
use crate::layout::{pt_to_mm, CardGeometry};
use crate::text::{
    fits_single_line, sanitize_text, truncate_with_ellipsis, wrap_words, FontMetrics, FontStyle,
};
use serde::Serialize;
use tracing::{debug, warn};

/// レイアウト済みの1行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaidOutRow {
    /// 見出し（1行、必要なら切り詰め済み）
    pub header: String,
    /// 値（折り返し済み）
    pub value_lines: Vec<String>,
    /// 行の上端Y（mm、ページ上端から）
    pub top_mm: f32,
    /// 行の高さ（mm、行間余白を含む）
    pub height_mm: f32,
}

impl LaidOutRow {
    /// 値が1行に収まっているか
    pub fn is_single_line(&self) -> bool {
        self.value_lines.len() <= 1
    }
}

/// レイアウト結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardLayout {
    pub font_size: u8,
    pub header_col_width_mm: f32,
    pub value_col_width_mm: f32,
    pub line_height_mm: f32,
    pub rows: Vec<LaidOutRow>,
    /// 行ブロックの合計高さ（mm）
    pub total_height_mm: f32,
    /// 条件を満たすサイズが見つかった（false = 最小サイズでのフォールバック）
    pub fitted: bool,
}

impl CardLayout {
    /// 値列の左端X（mm）
    pub fn value_x_mm(&self, geometry: &CardGeometry) -> f32 {
        geometry.margin_mm + self.header_col_width_mm + geometry.gutter_mm
    }

    /// テキストがテキスト領域からはみ出しているか
    pub fn overflows(&self, geometry: &CardGeometry) -> bool {
        self.total_height_mm > geometry.text_area_height_mm()
    }
}

/// 見出し・値の整形結果（位置決め前）
struct PreparedRow {
    header: String,
    value_lines: Vec<String>,
}

/// レイアウトエンジン
pub struct CardLayoutEngine<'a, M: FontMetrics + ?Sized> {
    geometry: &'a CardGeometry,
    metrics: &'a M,
}

impl<'a, M: FontMetrics + ?Sized> CardLayoutEngine<'a, M> {
    pub fn new(geometry: &'a CardGeometry, metrics: &'a M) -> Self {
        Self { geometry, metrics }
    }

    /// 列幅を決定（見出し列幅, 値列幅）
    ///
    /// 見出し列は最大フォントサイズ・太字での最長見出しの幅。ただし利用可能幅の40%が上限。
    pub fn column_widths(&self, fields: &[CardField]) -> (f32, f32) {
        let max_size = self.geometry.max_font_size as f32;
        let widest = fields
            .iter()
            .map(|f| self.metrics.text_width_mm(&f.header, max_size, FontStyle::Bold))
            .fold(0.0_f32, f32::max);

        let header_col = widest.min(self.geometry.header_cap_mm());
        let value_col = self.geometry.usable_width_mm() - header_col - self.geometry.gutter_mm;
        (header_col, value_col)
    }

    /// 行高（mm）= フォントサイズ
    pub fn line_height_mm(size_pt: f32) -> f32 {
        pt_to_mm(size_pt)
    }

    /// 条件1: すべての見出しが1行に収まる
    pub fn headers_fit(&self, headers: &[&str], size_pt: f32, header_col_mm: f32) -> bool {
        headers
            .iter()
            .all(|h| fits_single_line(h, header_col_mm, size_pt, FontStyle::Bold, self.metrics))
    }

    /// 行ブロックの合計高さ（mm）
    ///
    /// 各行 = max(見出し1行, 値の行数) × 行高 + 行間余白
    pub fn block_height_mm(&self, value_line_counts: &[usize], size_pt: f32) -> f32 {
        let line_height = Self::line_height_mm(size_pt);
        value_line_counts
            .iter()
            .map(|&n| n.max(1) as f32 * line_height + self.geometry.row_padding_mm)
            .sum()
    }

    /// 条件2: 行ブロックがテキスト領域に収まる
    pub fn height_fits(&self, value_line_counts: &[usize], size_pt: f32) -> bool {
        self.block_height_mm(value_line_counts, size_pt) <= self.geometry.text_area_height_mm()
    }

    fn prepare(&self, fields: &[CardField], size_pt: f32, header_col: f32, value_col: f32) -> Vec<PreparedRow> {
        fields
            .iter()
            .map(|f| PreparedRow {
                header: sanitize_text(&f.header, header_col, size_pt, FontStyle::Bold, self.metrics),
                value_lines: wrap_words(&f.value, value_col, size_pt, FontStyle::Regular, self.metrics),
            })
            .collect()
    }

    /// レイアウトを計算
    pub fn layout(&self, fields: &[CardField]) -> CardLayout {
        let (header_col, value_col) = self.column_widths(fields);

        for size in self.geometry.font_sizes() {
            let size_pt = size as f32;
            let prepared = self.prepare(fields, size_pt, header_col, value_col);

            let headers: Vec<&str> = prepared.iter().map(|r| r.header.as_str()).collect();
            if !self.headers_fit(&headers, size_pt, header_col) {
                continue;
            }
            let counts: Vec<usize> = prepared.iter().map(|r| r.value_lines.len()).collect();
            if !self.height_fits(&counts, size_pt) {
                continue;
            }

            debug!(font_size = size, rows = fields.len(), "レイアウト確定");
            return self.position(prepared, size, header_col, value_col, true);
        }

        // フォールバック: 最小サイズで見出しを切り詰める
        let size = self.geometry.min_font_size;
        let size_pt = size as f32;
        let prepared: Vec<PreparedRow> = self
            .prepare(fields, size_pt, header_col, value_col)
            .into_iter()
            .map(|row| PreparedRow {
                header: truncate_with_ellipsis(&row.header, header_col, size_pt, FontStyle::Bold, self.metrics),
                value_lines: row.value_lines,
            })
            .collect();

        let layout = self.position(prepared, size, header_col, value_col, false);
        if layout.overflows(self.geometry) {
            warn!(
                "最小フォントサイズ {}pt でもテキストが収まりません（{:.1}mm > {:.1}mm）",
                size,
                layout.total_height_mm,
                self.geometry.text_area_height_mm()
            );
        }
        layout
    }

    fn position(
        &self,
        prepared: Vec<PreparedRow>,
        font_size: u8,
        header_col: f32,
        value_col: f32,
        fitted: bool,
    ) -> CardLayout {
        let line_height = Self::line_height_mm(font_size as f32);
        let mut cursor = self.geometry.text_top_mm;
        let mut rows = Vec::with_capacity(prepared.len());

        for row in prepared {
            let height = row.value_lines.len().max(1) as f32 * line_height + self.geometry.row_padding_mm;
            rows.push(LaidOutRow {
                header: row.header,
                value_lines: row.value_lines,
                top_mm: cursor,
                height_mm: height,
            });
            cursor += height;
        }

        CardLayout {
            font_size,
            header_col_width_mm: header_col,
            value_col_width_mm: value_col,
            line_height_mm: line_height,
            rows,
            total_height_mm: cursor - self.geometry.text_top_mm,
            fitted,
        }
    }
}
