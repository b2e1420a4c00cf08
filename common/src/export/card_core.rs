//! Card export core utilities shared by the layout engine and the PDF writer.

use crate::key::is_blank_cell;
use crate::layout::{mm_to_pt, CardGeometry};
use serde::{Deserialize, Serialize};

/// カードの2列テーブルに表示する1行（見出し・値）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardField {
    pub header: String,
    pub value: String,
}

impl CardField {
    pub fn new(header: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            value: value.into(),
        }
    }
}

/// 行データからカード表示用フィールドを構築
///
/// - 値が空・`nan` のセルは除外
/// - 見出しセルが無い列は `Column {n}`、見出しが空・`nan` の列は除外
/// - `excluded_columns` は画像として描画済みの列など
pub fn build_card_fields(header: &[String], row: &[String], excluded_columns: &[usize]) -> Vec<CardField> {
    row.iter()
        .enumerate()
        .filter(|(i, _)| !excluded_columns.contains(i))
        .filter_map(|(i, cell)| {
            if is_blank_cell(cell) {
                return None;
            }
            let label = match header.get(i) {
                Some(label) if is_blank_cell(label) => return None,
                Some(label) => label.trim().to_string(),
                None => format!("Column {}", i + 1),
            };
            Some(CardField::new(label, cell.trim()))
        })
        .collect()
}

/// PDF描画で使用する座標変換（pt単位、左下原点）
#[derive(Debug, Clone)]
pub struct CardLayoutCore {
    pub page_width_pt: f32,
    pub page_height_pt: f32,
}

impl CardLayoutCore {
    pub fn from_geometry(geometry: &CardGeometry) -> Self {
        Self {
            page_width_pt: mm_to_pt(geometry.page_width_mm),
            page_height_pt: mm_to_pt(geometry.page_height_mm),
        }
    }

    /// 上端基準(mm)の矩形の下端Y座標（pt、下から）
    pub fn bottom_y_pt(&self, top_mm: f32, height_mm: f32) -> f32 {
        self.page_height_pt - mm_to_pt(top_mm + height_mm)
    }

    /// 上端基準(mm)のテキスト行のベースラインY座標（pt、下から）
    ///
    /// 行高 = フォントサイズとして、ベースラインを行の下端から
    /// ディセンダ分（サイズの約2割）持ち上げる。
    pub fn baseline_y_pt(&self, line_top_mm: f32, font_size_pt: f32) -> f32 {
        let line_bottom_pt = self.page_height_pt - mm_to_pt(line_top_mm) - font_size_pt;
        line_bottom_pt + font_size_pt * 0.2
    }
}
