//! カードPDF生成
//!
//! 1カード = 1ページ（90×160mm）。画像2枠と2列テーブルを描画する。

use crate::error::{CardError, Result};
use crate::transcoder::{flatten_to_rgb, JpegQualityEncoder, LossyEncoder};
use image::{ColorType, ImageFormat};
use printpdf::{
    BuiltinFont, DictItem, ExternalStream, ExternalXObject, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt,
    Px, TextItem, XObjectTransform,
};
use product_cards_common::layout::mm_to_pt;
use product_cards_common::{CardGeometry, CardLayout, CardLayoutCore, ImagePlacement, ImageSlot};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const HEADER_FONT: BuiltinFont = BuiltinFont::HelveticaBold;
const VALUE_FONT: BuiltinFont = BuiltinFont::Helvetica;

/// 描画中のカード（1ページ分の描画命令）
#[derive(Default)]
pub struct CardPage {
    ops: Vec<Op>,
    images: usize,
}

impl CardPage {
    /// 配置済み画像の枚数
    pub fn image_count(&self) -> usize {
        self.images
    }
}

pub struct CardPdfWriter {
    doc: PdfDocument,
    pages: Vec<PdfPage>,
    geometry: CardGeometry,
    core: CardLayoutCore,
}

impl CardPdfWriter {
    pub fn new(title: &str, geometry: CardGeometry) -> Self {
        let core = CardLayoutCore::from_geometry(&geometry);
        Self {
            doc: PdfDocument::new(title),
            pages: Vec::new(),
            geometry,
            core,
        }
    }

    /// 確定済みページ数
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn begin_card(&self) -> CardPage {
        CardPage::default()
    }

    /// 画像を指定スロットに配置
    ///
    /// JPEGはバイト列をそのまま DCTDecode ストリームとして埋め込む（再圧縮しない）。
    /// それ以外の形式は `reencode_quality` でJPEGに変換してから埋め込む。
    /// デコードできない場合はエラー（呼び出し側で画像なしとして扱う）。
    pub fn draw_image(
        &mut self,
        page: &mut CardPage,
        bytes: &[u8],
        slot: ImageSlot,
        reencode_quality: u8,
    ) -> Result<ImagePlacement> {
        let embedded = prepare_jpeg(bytes, reencode_quality)?;
        let (width_px, height_px) = (embedded.width, embedded.height);
        let placement = self.geometry.image_placement(slot, width_px, height_px);

        let mut dict = BTreeMap::new();
        dict.insert("Type".to_string(), DictItem::Name(b"XObject".to_vec()));
        dict.insert("Subtype".to_string(), DictItem::Name(b"Image".to_vec()));
        dict.insert("Width".to_string(), DictItem::Int(width_px as i64));
        dict.insert("Height".to_string(), DictItem::Int(height_px as i64));
        dict.insert(
            "ColorSpace".to_string(),
            DictItem::Name(embedded.color_space.as_bytes().to_vec()),
        );
        dict.insert("BitsPerComponent".to_string(), DictItem::Int(8));
        dict.insert("Filter".to_string(), DictItem::Name(b"DCTDecode".to_vec()));

        let stream_len = embedded.bytes.len();
        let xobject = ExternalXObject {
            stream: ExternalStream {
                dict,
                content: embedded.bytes,
                compress: false,
            },
            width: Some(Px(width_px as usize)),
            height: Some(Px(height_px as usize)),
            dpi: Some(72.0),
        };
        let id = self.doc.add_xobject(&xobject);

        // dpi=72 で 1px = 1pt
        let transform = XObjectTransform {
            translate_x: Some(Pt(mm_to_pt(placement.x_mm))),
            translate_y: Some(Pt(self.core.bottom_y_pt(placement.y_mm, placement.height_mm))),
            scale_x: Some(mm_to_pt(placement.width_mm) / width_px as f32),
            scale_y: Some(mm_to_pt(placement.height_mm) / height_px as f32),
            dpi: Some(72.0),
            ..Default::default()
        };
        page.ops.push(Op::UseXobject { id, transform });
        page.images += 1;

        debug!(?slot, width_px, height_px, stream_len, "画像を配置");
        Ok(placement)
    }

    /// 2列テーブルを描画
    ///
    /// 見出しは太字で行の上端に左寄せ、値は見出し列＋余白の右に1行ずつ配置する。
    pub fn draw_text(&self, page: &mut CardPage, layout: &CardLayout) {
        let size = layout.font_size as f32;
        let header_x = self.geometry.margin_mm;
        let value_x = layout.value_x_mm(&self.geometry);

        for row in &layout.rows {
            self.push_text(page, &row.header, header_x, row.top_mm, size, HEADER_FONT);

            if row.is_single_line() {
                if let Some(line) = row.value_lines.first() {
                    self.push_text(page, line, value_x, row.top_mm, size, VALUE_FONT);
                }
            } else {
                for (i, line) in row.value_lines.iter().enumerate() {
                    let top = row.top_mm + i as f32 * layout.line_height_mm;
                    self.push_text(page, line, value_x, top, size, VALUE_FONT);
                }
            }
        }
    }

    fn push_text(&self, page: &mut CardPage, text: &str, x_mm: f32, top_mm: f32, size: f32, font: BuiltinFont) {
        if text.is_empty() {
            return;
        }
        page.ops.extend([
            Op::StartTextSection,
            Op::SetTextCursor {
                pos: Point {
                    x: Pt(mm_to_pt(x_mm)),
                    y: Pt(self.core.baseline_y_pt(top_mm, size)),
                },
            },
            Op::SetFontSizeBuiltinFont { size: Pt(size), font },
            Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(text.to_string())],
                font,
            },
            Op::EndTextSection,
        ]);
    }

    /// ページを確定
    pub fn commit(&mut self, page: CardPage) {
        let pdf_page = PdfPage::new(
            printpdf::Mm(self.geometry.page_width_mm),
            printpdf::Mm(self.geometry.page_height_mm),
            page.ops,
        );
        self.pages.push(pdf_page);
    }

    /// PDFを書き出し、書き込んだバイト数を返す
    pub fn save(self, output_path: &Path) -> Result<u64> {
        if self.pages.is_empty() {
            return Err(CardError::PdfGeneration("ページがありません".into()));
        }

        let CardPdfWriter { mut doc, pages, .. } = self;
        let mut warnings = Vec::new();
        // 画像は変換済みストリームのまま書き出す
        let options = PdfSaveOptions {
            image_optimization: None,
            ..Default::default()
        };
        let bytes = doc.with_pages(pages).save(&options, &mut warnings);
        if !warnings.is_empty() {
            debug!("PDF保存時の警告: {}件", warnings.len());
        }

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(output_path, &bytes)
            .map_err(|e| CardError::PdfGeneration(format!("PDF保存エラー ({}): {}", output_path.display(), e)))?;

        Ok(bytes.len() as u64)
    }
}

/// 埋め込み用のJPEGストリーム
struct EmbeddedJpeg {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    color_space: &'static str,
}

fn prepare_jpeg(bytes: &[u8], reencode_quality: u8) -> Result<EmbeddedJpeg> {
    let decoded = image::load_from_memory(bytes).map_err(|e| CardError::ImageLoad(e.to_string()))?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(CardError::ImageLoad("画像サイズが0です".into()));
    }

    if matches!(image::guess_format(bytes), Ok(ImageFormat::Jpeg)) {
        let color_space = match decoded.color() {
            ColorType::L8 | ColorType::La8 => "DeviceGray",
            _ => "DeviceRGB",
        };
        return Ok(EmbeddedJpeg {
            bytes: bytes.to_vec(),
            width,
            height,
            color_space,
        });
    }

    let rgb = flatten_to_rgb(decoded);
    let bytes = JpegQualityEncoder.encode(&rgb, reencode_quality)?;
    Ok(EmbeddedJpeg {
        bytes,
        width,
        height,
        color_space: "DeviceRGB",
    })
}
