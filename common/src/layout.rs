//! カードレイアウト設定モジュール
//!
//! mm基準のカード寸法定義（Source of Truth）
//! PDF出力・レイアウト計算はすべてここから導出する

use crate::error::{Error, Result};

// ============================================
// mm基準レイアウト（Source of Truth）
// ============================================

/// カードサイズ（mm）
pub const CARD_WIDTH_MM: f32 = 90.0;
pub const CARD_HEIGHT_MM: f32 = 160.0;

/// テキスト領域の左右余白（mm）
pub const MARGIN_MM: f32 = 10.0;

/// 画像スロット（mm、上から）
pub const IMAGE_TOP_MM: f32 = 5.0;
pub const PRODUCT_IMAGE_X_MM: f32 = 5.0;
pub const PACKAGE_IMAGE_X_MM: f32 = 45.0;
pub const IMAGE_WIDTH_MM: f32 = 40.0;
pub const IMAGE_MAX_HEIGHT_MM: f32 = 44.0;

/// テキスト領域（mm、上から）
pub const TEXT_TOP_MM: f32 = 50.0;
pub const TEXT_BOTTOM_MM: f32 = 155.0;

/// 2列テーブル
pub const COLUMN_GUTTER_MM: f32 = 10.0;
pub const ROW_PADDING_MM: f32 = 2.0;
pub const HEADER_COLUMN_RATIO: f32 = 0.4;

/// フォントサイズ候補（pt、大→小）
pub const MAX_FONT_SIZE_PT: u8 = 14;
pub const MIN_FONT_SIZE_PT: u8 = 6;

/// 幅超過文字の置換文字・見出し切り詰め記号
pub const PLACEHOLDER_GLYPH: char = '?';
pub const ELLIPSIS: &str = "...";

// ============================================
// 変換係数
// ============================================

/// mm → pt変換 (1mm = 72/25.4 pt ≈ 2.835pt)
pub const MM_TO_PT: f32 = 72.0 / 25.4;

/// 画像スロット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    /// 商品画像（左）
    Product,
    /// パッケージ画像（右）
    Package,
}

/// 画像の配置矩形（mm、左上原点）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

/// カード寸法
#[derive(Debug, Clone)]
pub struct CardGeometry {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
    pub image_top_mm: f32,
    pub image_width_mm: f32,
    pub image_max_height_mm: f32,
    pub text_top_mm: f32,
    pub text_bottom_mm: f32,
    pub gutter_mm: f32,
    pub row_padding_mm: f32,
    pub header_ratio: f32,
    pub max_font_size: u8,
    pub min_font_size: u8,
}

impl Default for CardGeometry {
    fn default() -> Self {
        Self::standard()
    }
}

impl CardGeometry {
    /// 90×160mmの標準カード
    pub fn standard() -> Self {
        Self {
            page_width_mm: CARD_WIDTH_MM,
            page_height_mm: CARD_HEIGHT_MM,
            margin_mm: MARGIN_MM,
            image_top_mm: IMAGE_TOP_MM,
            image_width_mm: IMAGE_WIDTH_MM,
            image_max_height_mm: IMAGE_MAX_HEIGHT_MM,
            text_top_mm: TEXT_TOP_MM,
            text_bottom_mm: TEXT_BOTTOM_MM,
            gutter_mm: COLUMN_GUTTER_MM,
            row_padding_mm: ROW_PADDING_MM,
            header_ratio: HEADER_COLUMN_RATIO,
            max_font_size: MAX_FONT_SIZE_PT,
            min_font_size: MIN_FONT_SIZE_PT,
        }
    }

    /// 寸法の整合性チェック
    pub fn validate(&self) -> Result<()> {
        if self.usable_width_mm() <= self.gutter_mm {
            return Err(Error::Layout(format!(
                "usable width {}mm leaves no room for gutter {}mm",
                self.usable_width_mm(),
                self.gutter_mm
            )));
        }
        if self.text_area_height_mm() <= 0.0 {
            return Err(Error::Layout("text area has no height".into()));
        }
        if self.min_font_size == 0 || self.min_font_size > self.max_font_size {
            return Err(Error::Layout(format!(
                "invalid font size range {}..={}",
                self.min_font_size, self.max_font_size
            )));
        }
        Ok(())
    }

    /// テキスト利用可能幅（mm）
    pub fn usable_width_mm(&self) -> f32 {
        self.page_width_mm - self.margin_mm * 2.0
    }

    /// 画像下のテキスト利用可能高さ（mm）
    pub fn text_area_height_mm(&self) -> f32 {
        self.text_bottom_mm - self.text_top_mm
    }

    /// 見出し列の上限幅（mm）
    pub fn header_cap_mm(&self) -> f32 {
        self.usable_width_mm() * self.header_ratio
    }

    /// フォントサイズ候補（大→小）
    pub fn font_sizes(&self) -> impl Iterator<Item = u8> {
        (self.min_font_size..=self.max_font_size).rev()
    }

    /// 画像の配置矩形を算出（幅固定・縦横比維持、高さ上限あり）
    pub fn image_placement(&self, slot: ImageSlot, width_px: u32, height_px: u32) -> ImagePlacement {
        let x_mm = match slot {
            ImageSlot::Product => PRODUCT_IMAGE_X_MM,
            ImageSlot::Package => PACKAGE_IMAGE_X_MM,
        };
        let aspect = if width_px == 0 {
            1.0
        } else {
            height_px as f32 / width_px as f32
        };

        let mut width_mm = self.image_width_mm;
        let mut height_mm = width_mm * aspect;
        if height_mm > self.image_max_height_mm {
            height_mm = self.image_max_height_mm;
            width_mm = height_mm / aspect;
        }

        ImagePlacement {
            x_mm,
            y_mm: self.image_top_mm,
            width_mm,
            height_mm,
        }
    }
}

// ============================================
// ヘルパー関数
// ============================================

/// mm → pt 変換
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * MM_TO_PT
}

/// pt → mm 変換
#[inline]
pub fn pt_to_mm(pt: f32) -> f32 {
    pt / MM_TO_PT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let geometry = CardGeometry::standard();
        assert!((geometry.usable_width_mm() - 70.0).abs() < 0.01);
        assert!((geometry.text_area_height_mm() - 105.0).abs() < 0.01);
        assert!((geometry.header_cap_mm() - 28.0).abs() < 0.01);
        assert!(geometry.validate().is_ok());
    }

    #[test]
    fn test_conversion() {
        assert!((MM_TO_PT - 2.835).abs() < 0.01);
        assert!((mm_to_pt(10.0) - 28.35).abs() < 0.1);
        assert!((pt_to_mm(mm_to_pt(42.0)) - 42.0).abs() < 0.001);
    }

    #[test]
    fn test_font_sizes_descending() {
        let sizes: Vec<u8> = CardGeometry::standard().font_sizes().collect();
        assert_eq!(sizes.first(), Some(&14));
        assert_eq!(sizes.last(), Some(&6));
        assert_eq!(sizes.len(), 9);
    }

    #[test]
    fn test_image_placement_landscape_keeps_width() {
        let geometry = CardGeometry::standard();
        let placement = geometry.image_placement(ImageSlot::Package, 400, 200);
        assert_eq!(placement.x_mm, PACKAGE_IMAGE_X_MM);
        assert!((placement.width_mm - 40.0).abs() < 0.01);
        assert!((placement.height_mm - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_image_placement_tall_image_capped() {
        let geometry = CardGeometry::standard();
        let placement = geometry.image_placement(ImageSlot::Product, 100, 400);
        assert!((placement.height_mm - IMAGE_MAX_HEIGHT_MM).abs() < 0.01);
        assert!((placement.width_mm - 11.0).abs() < 0.01);
        // 画像がテキスト領域に食い込まない
        assert!(placement.y_mm + placement.height_mm <= TEXT_TOP_MM);
    }

    #[test]
    fn test_invalid_font_range() {
        let geometry = CardGeometry {
            min_font_size: 10,
            max_font_size: 8,
            ..CardGeometry::standard()
        };
        assert!(geometry.validate().is_err());
    }
}
