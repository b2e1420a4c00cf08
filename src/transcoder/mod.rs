//! 画像サイズ調整モジュール
//!
//! 画像1枚あたりの予算（KB）に収まるようJPEGで再エンコードする。
//! 最初に圧縮が必要になった画像で品質を探索し、その品質を同一実行内の
//! 以降の画像すべてに使い回す（以降はサイズ確認をしない）。

use crate::error::{CardError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use product_cards_common::ImageBudget;
use std::path::Path;
use tracing::{debug, info, warn};

/// 探索開始品質
pub const DEFAULT_IMG_QUALITY: u8 = 90;
/// 最低品質
pub const MIN_IMG_QUALITY: u8 = 1;
/// 探索ステップ
pub const QUALITY_STEP: u8 = 5;

/// 1回の生成処理で共有する品質キャッシュ
///
/// 最初に決まった品質のみ保持する（以降の書き込みは無視）。
#[derive(Debug, Clone, Default)]
pub struct TranscodeCache {
    quality: Option<u8>,
}

impl TranscodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quality(&self) -> Option<u8> {
        self.quality
    }

    /// 未設定の場合のみ品質を記録
    pub fn set(&mut self, quality: u8) {
        if self.quality.is_none() {
            self.quality = Some(quality.clamp(1, 100));
        }
    }
}

/// 非可逆エンコーダ
pub trait LossyEncoder {
    fn encode(&self, image: &RgbImage, quality: u8) -> Result<Vec<u8>>;
}

/// JPEGエンコーダ
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegQualityEncoder;

impl LossyEncoder for JpegQualityEncoder {
    fn encode(&self, image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality)
            .encode_image(image)
            .map_err(|e| CardError::ImageEncode(format!("JPEG品質{}: {}", quality, e)))?;
        Ok(buffer)
    }
}

/// 変換の経路
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeOutcome {
    /// 予算内のため元ファイルのまま
    Passthrough,
    /// キャッシュ済み品質で再エンコード（サイズ未確認）
    CachedQuality(u8),
    /// 探索で予算内に収まった品質
    Searched(u8),
    /// 最低品質でも予算超過
    Floor,
    /// 変換失敗のため元ファイルのまま
    OriginalFallback,
}

#[derive(Debug, Clone)]
pub struct TranscodedImage {
    pub bytes: Vec<u8>,
    pub outcome: TranscodeOutcome,
}

pub struct ImageTranscoder<E = JpegQualityEncoder> {
    encoder: E,
    start_quality: u8,
    step: u8,
    floor: u8,
}

impl ImageTranscoder<JpegQualityEncoder> {
    pub fn new() -> Self {
        Self::with_encoder(JpegQualityEncoder)
    }
}

impl Default for ImageTranscoder<JpegQualityEncoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: LossyEncoder> ImageTranscoder<E> {
    pub fn with_encoder(encoder: E) -> Self {
        Self {
            encoder,
            start_quality: DEFAULT_IMG_QUALITY,
            step: QUALITY_STEP,
            floor: MIN_IMG_QUALITY,
        }
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// 探索する品質（高→低、最後は必ず最低品質）
    pub fn quality_candidates(&self) -> Vec<u8> {
        let mut qualities: Vec<u8> = (self.floor..=self.start_quality)
            .rev()
            .step_by(self.step.max(1) as usize)
            .collect();
        if qualities.last() != Some(&self.floor) {
            qualities.push(self.floor);
        }
        qualities
    }

    /// 予算に合わせて変換
    ///
    /// 読み込み・エンコードに失敗した場合は元ファイルのバイト列を返す。
    /// 元ファイルも読めない場合のみエラー（呼び出し側はその画像を省略する）。
    pub fn transcode(&self, path: &Path, budget: &ImageBudget, cache: &mut TranscodeCache) -> Result<TranscodedImage> {
        match self.try_transcode(path, budget, cache) {
            Ok(transcoded) => Ok(transcoded),
            Err(e) => {
                warn!("画像の変換に失敗したため元ファイルを使用します ({}): {}", path.display(), e);
                let bytes = std::fs::read(path)
                    .map_err(|io| CardError::ImageLoad(format!("{}: {}", path.display(), io)))?;
                Ok(TranscodedImage {
                    bytes,
                    outcome: TranscodeOutcome::OriginalFallback,
                })
            }
        }
    }

    fn try_transcode(&self, path: &Path, budget: &ImageBudget, cache: &mut TranscodeCache) -> Result<TranscodedImage> {
        if let Some(quality) = cache.quality() {
            debug!("キャッシュ済み品質 {}% を使用: {}", quality, path.display());
            let image = load_flattened(path)?;
            let bytes = self.encoder.encode(&image, quality)?;
            return Ok(TranscodedImage {
                bytes,
                outcome: TranscodeOutcome::CachedQuality(quality),
            });
        }

        let size = std::fs::metadata(path)?.len();
        if budget.fits(size) {
            debug!("予算内のため変換不要 ({:.1}KB): {}", size as f64 / 1024.0, path.display());
            return Ok(TranscodedImage {
                bytes: std::fs::read(path)?,
                outcome: TranscodeOutcome::Passthrough,
            });
        }

        let image = load_flattened(path)?;
        let mut last = None;
        for quality in self.quality_candidates() {
            let bytes = match self.encoder.encode(&image, quality) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("品質 {}% でのエンコードに失敗: {}", quality, e);
                    continue;
                }
            };
            debug!("品質 {}%: {:.1}KB", quality, bytes.len() as f64 / 1024.0);

            if budget.fits(bytes.len() as u64) {
                info!("品質 {}% で目標 {:.1}KB 以内に収まりました", quality, budget.target_kb);
                cache.set(quality);
                return Ok(TranscodedImage {
                    bytes,
                    outcome: TranscodeOutcome::Searched(quality),
                });
            }
            last = Some((quality, bytes));
        }

        match last {
            Some((quality, bytes)) => {
                warn!(
                    "最低品質でも目標 {:.1}KB を超えます（{:.1}KB）: {}",
                    budget.target_kb,
                    bytes.len() as f64 / 1024.0,
                    path.display()
                );
                cache.set(quality);
                Ok(TranscodedImage {
                    bytes,
                    outcome: TranscodeOutcome::Floor,
                })
            }
            None => Err(CardError::ImageEncode(format!(
                "すべての品質でエンコードに失敗: {}",
                path.display()
            ))),
        }
    }
}

/// 画像を読み込み、不透明RGBに変換
fn load_flattened(path: &Path) -> Result<RgbImage> {
    let image = image::open(path).map_err(|e| CardError::ImageLoad(format!("{}: {}", path.display(), e)))?;
    Ok(flatten_to_rgb(image))
}

/// アルファ付き画像を白背景に合成（JPEGは透過非対応）
pub fn flatten_to_rgb(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
