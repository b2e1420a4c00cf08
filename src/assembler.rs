//! カード一括生成
//!
//! 1行 = 1カード。行ごとに 画像検索 → 予算算出（実行ごとに1回）→ 変換 → 配置
//! → テキストレイアウト → ページ確定 を順に行い、最後にPDFを書き出す。
//!
//! 画像が見つからない行もカードは生成し、未検出リストに記録する。
//! 1枚もカードが確定しなかった場合のみ失敗とする。

use crate::error::{CardError, Result};
use crate::export::{output_path_for, CardPdfWriter};
use crate::resolver::{ImageIndex, SearchResult, SearchRoots, IMAGE_EXTENSIONS};
use crate::table::Table;
use crate::transcoder::{ImageTranscoder, JpegQualityEncoder, LossyEncoder, TranscodeCache, DEFAULT_IMG_QUALITY};
use chrono::Local;
use product_cards_common::{
    build_card_fields, key_of, plan, BuiltinHelvetica, CardGeometry, CardLayoutEngine, ImageBudget, ImageSlot,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 進捗通知の既定間隔（行）
pub const DEFAULT_PROGRESS_EVERY: usize = 5;

/// 生成リクエスト
#[derive(Debug, Clone)]
pub struct AssembleRequest<'a> {
    pub table: &'a Table,
    /// 品番列（0始まり）
    pub key_column: usize,
    pub product_roots: SearchRoots,
    pub package_roots: SearchRoots,
    /// 出力PDFの上限サイズ（MB）
    pub size_cap_mb: f64,
    /// 出力先（フォルダまたはファイル）
    pub output: PathBuf,
    /// テーブルに表示しない列（0始まり）
    pub excluded_columns: Vec<usize>,
    /// 商品・パッケージとも画像がない行はカードにしない
    pub skip_imageless: bool,
    /// サブフォルダも検索
    pub recursive: bool,
    pub title: String,
}

impl<'a> AssembleRequest<'a> {
    pub fn new(table: &'a Table, key_column: usize, output: impl Into<PathBuf>) -> Self {
        Self {
            table,
            key_column,
            product_roots: SearchRoots::default(),
            package_roots: SearchRoots::default(),
            size_cap_mb: 100.0,
            output: output.into(),
            excluded_columns: Vec::new(),
            skip_imageless: false,
            recursive: true,
            title: "Product cards".into(),
        }
    }
}

/// 進捗通知・中断の制御
pub struct RunControl<'a> {
    progress: Option<Box<dyn FnMut(usize, usize) + 'a>>,
    progress_every: usize,
    stop: Option<Arc<AtomicBool>>,
}

impl Default for RunControl<'_> {
    fn default() -> Self {
        Self {
            progress: None,
            progress_every: DEFAULT_PROGRESS_EVERY,
            stop: None,
        }
    }
}

impl<'a> RunControl<'a> {
    /// 進捗通知 `(処理済み行数, 全行数)`
    pub fn with_progress(mut self, callback: impl FnMut(usize, usize) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn every(mut self, rows: usize) -> Self {
        self.progress_every = rows.max(1);
        self
    }

    /// 行の処理前に確認する中断フラグ
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    fn should_stop(&self) -> bool {
        self.stop.as_ref().is_some_and(|s| s.load(Ordering::Relaxed))
    }

    fn report(&mut self, done: usize, total: usize) {
        if done % self.progress_every != 0 && done != total {
            return;
        }
        if let Some(callback) = self.progress.as_mut() {
            callback(done, total);
        }
    }
}

/// 生成結果の集計
#[derive(Debug, Clone)]
pub struct RunReport {
    pub artifact: PathBuf,
    pub artifact_bytes: u64,
    pub card_count: usize,
    pub rows_total: usize,
    /// 品番が空のためスキップした行数
    pub skipped_empty_keys: usize,
    /// 商品・パッケージのいずれかの画像が見つからなかった品番
    pub unresolved_keys: Vec<String>,
    /// 採用フォルダに複数候補があった品番 → 候補一覧
    pub ambiguous: BTreeMap<String, Vec<PathBuf>>,
    /// 変換・配置に失敗して省略した画像数
    pub omitted_images: usize,
    /// 最小フォントでもテキストが収まらなかった品番
    pub overflowed_keys: Vec<String>,
    pub budget: ImageBudget,
    /// 実行中に確定した圧縮品質
    pub final_quality: Option<u8>,
    /// 中断フラグにより途中で終了した
    pub stopped_early: bool,
}

pub struct DocumentAssembler<E = JpegQualityEncoder> {
    transcoder: ImageTranscoder<E>,
    geometry: CardGeometry,
    metrics: BuiltinHelvetica,
}

impl DocumentAssembler<JpegQualityEncoder> {
    pub fn new() -> Self {
        Self::with_transcoder(ImageTranscoder::new())
    }
}

impl Default for DocumentAssembler<JpegQualityEncoder> {
    fn default() -> Self {
        Self::new()
    }
}

/// 行ごとの集計（確定前）
#[derive(Default)]
struct Tally {
    card_count: usize,
    skipped_empty_keys: usize,
    unresolved_keys: Vec<String>,
    ambiguous: BTreeMap<String, Vec<PathBuf>>,
    omitted_images: usize,
    overflowed_keys: Vec<String>,
}

impl<E: LossyEncoder> DocumentAssembler<E> {
    pub fn with_transcoder(transcoder: ImageTranscoder<E>) -> Self {
        Self {
            transcoder,
            geometry: CardGeometry::standard(),
            metrics: BuiltinHelvetica,
        }
    }

    pub fn assemble(&self, request: &AssembleRequest<'_>, mut control: RunControl<'_>) -> Result<RunReport> {
        let table = request.table;
        if table.is_empty() {
            return Err(CardError::EmptyTable("データ行がありません".into()));
        }
        if request.key_column >= table.header.len() {
            return Err(CardError::InvalidColumn(format!(
                "品番列 {} は表の範囲外です（列数: {}）",
                request.key_column + 1,
                table.header.len()
            )));
        }
        self.geometry.validate()?;

        let item_count = table
            .rows
            .iter()
            .filter(|row| row_key(row, request.key_column).is_some())
            .count();
        let budget = plan(request.size_cap_mb, item_count);
        info!(
            "{}行（品番あり {}件）, 画像1枚あたり {:.1}KB",
            table.rows.len(),
            item_count,
            budget.target_kb
        );

        let product_index = ImageIndex::build(&request.product_roots, IMAGE_EXTENSIONS, request.recursive);
        let package_index = ImageIndex::build(&request.package_roots, IMAGE_EXTENSIONS, request.recursive);

        let engine = CardLayoutEngine::new(&self.geometry, &self.metrics);
        let mut writer = CardPdfWriter::new(&request.title, self.geometry.clone());
        let mut cache = TranscodeCache::new();
        let mut tally = Tally::default();
        let mut stopped_early = false;
        let total = table.rows.len();

        for (i, row) in table.rows.iter().enumerate() {
            if control.should_stop() {
                warn!("中断要求により {}/{} 行で終了します", i, total);
                stopped_early = true;
                break;
            }

            let Some(key) = row_key(row, request.key_column) else {
                debug!("{}行目: 品番が空のためスキップ", i + 1);
                tally.skipped_empty_keys += 1;
                control.report(i + 1, total);
                continue;
            };

            let product = product_index.resolve(&key);
            let package = package_index.resolve(&key);
            for result in [&product, &package] {
                if result.is_ambiguous() {
                    tally.ambiguous.entry(key.clone()).or_default().extend(result.matches.iter().cloned());
                }
            }
            if !product.found || !package.found {
                tally.unresolved_keys.push(key.clone());
            }

            if request.skip_imageless && !product.found && !package.found {
                info!("品番 '{}': 画像がないためカードを作成しません", key);
                control.report(i + 1, total);
                continue;
            }

            let mut page = writer.begin_card();
            for (slot, result) in [(ImageSlot::Product, &product), (ImageSlot::Package, &package)] {
                if !self.place(&mut writer, &mut page, result, slot, &budget, &mut cache, &key) {
                    tally.omitted_images += 1;
                }
            }

            let fields = build_card_fields(&table.header, row, &request.excluded_columns);
            let layout = engine.layout(&fields);
            if !layout.fitted {
                tally.overflowed_keys.push(key.clone());
            }
            writer.draw_text(&mut page, &layout);
            writer.commit(page);
            tally.card_count += 1;

            control.report(i + 1, total);
        }

        if tally.card_count == 0 {
            error!("カードが1枚も生成されませんでした");
            return Err(CardError::NoCardsProduced {
                unresolved_keys: tally.unresolved_keys,
            });
        }

        let artifact = output_path_for(&request.output, Local::now());
        let artifact_bytes = writer.save(&artifact)?;
        info!(
            "{}枚のカードを出力: {} ({:.1}KB)",
            tally.card_count,
            artifact.display(),
            artifact_bytes as f64 / 1024.0
        );

        Ok(RunReport {
            artifact,
            artifact_bytes,
            card_count: tally.card_count,
            rows_total: total,
            skipped_empty_keys: tally.skipped_empty_keys,
            unresolved_keys: tally.unresolved_keys,
            ambiguous: tally.ambiguous,
            omitted_images: tally.omitted_images,
            overflowed_keys: tally.overflowed_keys,
            budget,
            final_quality: cache.quality(),
            stopped_early,
        })
    }

    /// 画像を変換して配置。画像が見つかったのに配置できなかった場合のみ false
    #[allow(clippy::too_many_arguments)]
    fn place(
        &self,
        writer: &mut CardPdfWriter,
        page: &mut crate::export::CardPage,
        result: &SearchResult,
        slot: ImageSlot,
        budget: &ImageBudget,
        cache: &mut TranscodeCache,
        key: &str,
    ) -> bool {
        let Some(path) = result.first() else {
            return true;
        };

        let transcoded = match self.transcoder.transcode(path, budget, cache) {
            Ok(transcoded) => transcoded,
            Err(e) => {
                error!("品番 '{}' の画像を読み込めません ({}): {}", key, path.display(), e);
                return false;
            }
        };
        debug!("品番 '{}' {:?}: {:?}", key, slot, transcoded.outcome);

        // JPEG以外（予算内のPNG等）は確定済み品質で埋め込み用に変換
        let reencode_quality = cache.quality().unwrap_or(DEFAULT_IMG_QUALITY);
        match writer.draw_image(page, &transcoded.bytes, slot, reencode_quality) {
            Ok(_) => true,
            Err(e) => {
                error!("品番 '{}' の画像を配置できません ({}): {}", key, display_name(path), e);
                false
            }
        }
    }
}

/// 行の品番（列が無い・空なら None）
fn row_key(row: &[String], column: usize) -> Option<String> {
    row.get(column).and_then(|cell| key_of(cell))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// 既定の設定で生成
pub fn assemble(request: &AssembleRequest<'_>) -> Result<RunReport> {
    DocumentAssembler::new().assemble(request, RunControl::default())
}
