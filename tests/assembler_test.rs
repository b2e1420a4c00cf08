//! カード一括生成テスト
//!
//! 画像検索からPDF出力までの一連の流れを検証

use image::{ImageFormat, Rgb, RgbImage};
use product_cards::assembler::{assemble, AssembleRequest, DocumentAssembler, RunControl};
use product_cards::error::CardError;
use product_cards::resolver::SearchRoots;
use product_cards::table::Table;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

fn table(header: &[&str], rows: &[&[&str]]) -> Table {
    Table::new(
        header.iter().map(|s| s.to_string()).collect(),
        rows.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect(),
    )
}

fn write_image(path: &Path, width: u32, height: u32, format: ImageFormat) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_pixel(width, height, Rgb([200, 60, 40]));
    img.save_with_format(path, format).unwrap();
}

/// 圧縮の効きにくいノイズ画像（PNGで数十KB以上）
fn write_noise_png(path: &Path, size: u32) {
    let mut state: u32 = 12345;
    let img = RgbImage::from_fn(size, size, |_, _| {
        let mut next = || {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            (state >> 16) as u8
        };
        Rgb([next(), next(), next()])
    });
    img.save_with_format(path, ImageFormat::Png).unwrap();
}

fn assert_pdf(path: &Path) {
    let bytes = std::fs::read(path).expect("PDFが出力されていない");
    assert!(bytes.starts_with(b"%PDF"));
}

/// 画像のない行・品番が空の行が混在する表
#[test]
fn test_mixed_rows() {
    let dir = tempdir().expect("Failed to create temp dir");
    let product_dir = dir.path().join("products");
    let package_primary = dir.path().join("packages_new");
    let package_dir = dir.path().join("packages");
    std::fs::create_dir_all(&package_primary).unwrap();
    write_image(&product_dir.join("A1.png"), 40, 30, ImageFormat::Png);
    // パッケージ画像は第2フォルダにのみ存在
    write_image(&package_dir.join("A1.jpg"), 30, 40, ImageFormat::Jpeg);

    let t = table(
        &["Article", "Name"],
        &[&["A1", "Mug"], &["", "no key"], &["A2", "Cup"]],
    );
    let mut request = AssembleRequest::new(&t, 0, dir.path().join("out"));
    request.product_roots = SearchRoots::new([&product_dir]);
    request.package_roots = SearchRoots::new([&package_primary, &package_dir]);

    let report = assemble(&request).expect("生成に失敗");

    assert_eq!(report.card_count, 2);
    assert_eq!(report.rows_total, 3);
    assert_eq!(report.skipped_empty_keys, 1);
    assert_eq!(report.unresolved_keys, vec!["A2".to_string()]);
    assert!(report.ambiguous.is_empty());
    assert_eq!(report.omitted_images, 0);
    assert!(!report.stopped_early);

    // 小さい画像は予算内なので再エンコードしない
    assert_eq!(report.final_quality, None);
    assert_eq!(report.budget.target_kb, 2048.0);

    let file_name = report.artifact.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("product_cards_"));
    assert!(file_name.ends_with(".pdf"));
    assert_eq!(report.artifact.parent().unwrap(), dir.path().join("out"));
    assert_eq!(std::fs::metadata(&report.artifact).unwrap().len(), report.artifact_bytes);
    assert_pdf(&report.artifact);
}

/// 片方の画像のみ見つかった品番も未検出として記録
#[test]
fn test_partial_images_reported() {
    let dir = tempdir().expect("Failed to create temp dir");
    let product_dir = dir.path().join("products");
    write_image(&product_dir.join("P-100.png"), 20, 20, ImageFormat::Png);

    let t = table(&["Article"], &[&["P-100"]]);
    let mut request = AssembleRequest::new(&t, 0, dir.path().join("deck.pdf"));
    request.product_roots = SearchRoots::new([&product_dir]);
    request.package_roots = SearchRoots::new([dir.path().join("missing")]);

    let report = assemble(&request).unwrap();
    assert_eq!(report.card_count, 1);
    assert_eq!(report.unresolved_keys, vec!["P-100".to_string()]);
    assert_eq!(report.artifact, dir.path().join("deck.pdf"));
    assert_pdf(&report.artifact);
}

/// 画像なし行をスキップする設定で全品番が未検出
#[test]
fn test_no_cards_when_all_unresolved() {
    let dir = tempdir().expect("Failed to create temp dir");
    let t = table(&["Article", "Name"], &[&["X1", "a"], &["X2", "b"]]);
    let mut request = AssembleRequest::new(&t, 0, dir.path());
    request.product_roots = SearchRoots::new([dir.path()]);
    request.skip_imageless = true;

    match assemble(&request) {
        Err(CardError::NoCardsProduced { unresolved_keys }) => {
            assert_eq!(unresolved_keys, vec!["X1".to_string(), "X2".to_string()]);
        }
        other => panic!("NoCardsProduced を期待: {:?}", other.map(|r| r.card_count)),
    }

    // PDFは出力されない
    let pdfs = std::fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == "pdf"))
        .count();
    assert_eq!(pdfs, 0);
}

/// 画像なし行もカードにする既定動作
#[test]
fn test_imageless_rows_still_produce_cards() {
    let dir = tempdir().expect("Failed to create temp dir");
    let t = table(&["Article", "Name"], &[&["X1", "a"], &["X2", "b"]]);
    let request = AssembleRequest::new(&t, 0, dir.path());

    let report = assemble(&request).unwrap();
    assert_eq!(report.card_count, 2);
    assert_eq!(report.unresolved_keys.len(), 2);
    assert_pdf(&report.artifact);
}

/// 品番がすべて空
#[test]
fn test_all_keys_empty() {
    let dir = tempdir().expect("Failed to create temp dir");
    let t = table(&["Article", "Name"], &[&["", "a"], &["\u{00A0}", "b"], &["  ", "c"]]);
    let request = AssembleRequest::new(&t, 0, dir.path());

    match assemble(&request) {
        Err(CardError::NoCardsProduced { unresolved_keys }) => assert!(unresolved_keys.is_empty()),
        other => panic!("NoCardsProduced を期待: {:?}", other.map(|r| r.card_count)),
    }
}

#[test]
fn test_empty_table_and_bad_column() {
    let dir = tempdir().expect("Failed to create temp dir");

    let empty = table(&["Article"], &[]);
    let request = AssembleRequest::new(&empty, 0, dir.path());
    assert!(matches!(assemble(&request), Err(CardError::EmptyTable(_))));

    let t = table(&["Article"], &[&["A1"]]);
    let request = AssembleRequest::new(&t, 3, dir.path());
    assert!(matches!(assemble(&request), Err(CardError::InvalidColumn(_))));
}

/// 採用フォルダ内の複数候補
#[test]
fn test_ambiguous_matches_reported() {
    let dir = tempdir().expect("Failed to create temp dir");
    let product_dir = dir.path().join("products");
    write_image(&product_dir.join("A1.png"), 10, 10, ImageFormat::Png);
    write_image(&product_dir.join("sub").join("A1.jpg"), 10, 10, ImageFormat::Jpeg);

    let t = table(&["Article"], &[&["A1"]]);
    let mut request = AssembleRequest::new(&t, 0, dir.path());
    request.product_roots = SearchRoots::new([&product_dir]);

    let report = assemble(&request).unwrap();
    let candidates = report.ambiguous.get("A1").expect("A1 が複数候補として記録されていない");
    assert_eq!(candidates.len(), 2);

    // サブフォルダを検索しなければ候補は1件
    request.recursive = false;
    let report = assemble(&request).unwrap();
    assert!(report.ambiguous.is_empty());
}

/// 予算を超える画像で品質が確定する
#[test]
fn test_tight_budget_sets_quality() {
    let dir = tempdir().expect("Failed to create temp dir");
    let product_dir = dir.path().join("products");
    std::fs::create_dir_all(&product_dir).unwrap();
    write_noise_png(&product_dir.join("N1.png"), 200);
    write_noise_png(&product_dir.join("N2.png"), 200);

    let t = table(&["Article"], &[&["N1"], &["N2"]]);
    let mut request = AssembleRequest::new(&t, 0, dir.path());
    request.product_roots = SearchRoots::new([&product_dir]);
    request.size_cap_mb = 0.001;

    let report = assemble(&request).unwrap();
    assert_eq!(report.budget.target_kb, 10.0);
    let quality = report.final_quality.expect("品質が確定していない");
    assert!((1..=90).contains(&quality));
    assert_eq!(report.card_count, 2);
    assert_eq!(report.omitted_images, 0);
    assert_pdf(&report.artifact);
}

/// 上限サイズが厳しい場合も出力PDFは上限内に収まる
#[test]
fn test_artifact_within_size_cap() {
    let dir = tempdir().expect("Failed to create temp dir");
    let product_dir = dir.path().join("products");
    std::fs::create_dir_all(&product_dir).unwrap();
    let keys = ["B1", "B2", "B3", "B4"];
    let mut source_bytes = 0;
    for key in keys {
        let path = product_dir.join(format!("{}.png", key));
        write_noise_png(&path, 300);
        source_bytes += std::fs::metadata(&path).unwrap().len();
    }

    let rows: Vec<Vec<String>> = keys.iter().map(|k| vec![k.to_string()]).collect();
    let t = Table::new(vec!["Article".into()], rows);
    let mut request = AssembleRequest::new(&t, 0, dir.path().join("capped.pdf"));
    request.product_roots = SearchRoots::new([&product_dir]);
    request.size_cap_mb = 0.2;

    let report = assemble(&request).unwrap();
    let cap_bytes = (0.2 * 1024.0 * 1024.0) as u64;
    assert!(source_bytes > cap_bytes);
    assert!(report.final_quality.is_some());
    assert_eq!(report.card_count, 4);
    assert!(
        report.artifact_bytes <= cap_bytes,
        "出力 {}B が上限 {}B を超えている",
        report.artifact_bytes,
        cap_bytes
    );
    assert_pdf(&report.artifact);
}

/// 進捗通知の間隔
#[test]
fn test_progress_callback() {
    let dir = tempdir().expect("Failed to create temp dir");
    let keys: Vec<String> = (1..=12).map(|i| format!("K{}", i)).collect();
    let rows: Vec<Vec<String>> = keys.iter().map(|k| vec![k.clone()]).collect();
    let t = Table::new(vec!["Article".into()], rows);
    let request = AssembleRequest::new(&t, 0, dir.path());

    let mut calls = Vec::new();
    let control = RunControl::default().with_progress(|done, total| calls.push((done, total)));
    let report = DocumentAssembler::new().assemble(&request, control).unwrap();

    assert_eq!(report.card_count, 12);
    assert_eq!(calls, vec![(5, 12), (10, 12), (12, 12)]);
}

/// 中断フラグで途中終了しても確定済みのカードは出力
#[test]
fn test_stop_flag() {
    let dir = tempdir().expect("Failed to create temp dir");
    let t = table(&["Article"], &[&["S1"], &["S2"], &["S3"]]);
    let request = AssembleRequest::new(&t, 0, dir.path());

    let stop = Arc::new(AtomicBool::new(false));
    let trigger = Arc::clone(&stop);
    let control = RunControl::default()
        .every(1)
        .with_stop(Arc::clone(&stop))
        .with_progress(move |done, _| {
            if done == 1 {
                trigger.store(true, Ordering::Relaxed);
            }
        });

    let report = DocumentAssembler::new().assemble(&request, control).unwrap();
    assert!(report.stopped_early);
    assert_eq!(report.card_count, 1);
    assert_pdf(&report.artifact);
}

/// 表示除外列
#[test]
fn test_excluded_columns() {
    let dir = tempdir().expect("Failed to create temp dir");
    let t = table(&["Article", "Internal", "Name"], &[&["E1", "secret", "Bowl"]]);
    let mut request = AssembleRequest::new(&t, 0, dir.path());
    request.excluded_columns = vec![1];

    let report = assemble(&request).unwrap();
    assert_eq!(report.card_count, 1);
    assert!(report.overflowed_keys.is_empty());
}
