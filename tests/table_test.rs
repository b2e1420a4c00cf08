//! 表ファイル読み込みテスト
//!
//! xlsxファイルからの見出し・データ行の読み込みと列指定の解決を検証

use product_cards::error::CardError;
use product_cards::table::{read_table, resolve_column};
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tempfile::tempdir;

fn write_workbook(path: &Path) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Items").unwrap();

    sheet.write_string(0, 0, "Article").unwrap();
    sheet.write_string(0, 1, "Name").unwrap();
    sheet.write_string(0, 2, "Price").unwrap();

    sheet.write_string(1, 0, "A-1").unwrap();
    sheet.write_string(1, 1, "Mug").unwrap();
    sheet.write_number(1, 2, 120.0).unwrap();

    // 品番が数値のセル
    sheet.write_number(2, 0, 1002.0).unwrap();
    sheet.write_string(2, 1, "Cup").unwrap();
    sheet.write_number(2, 2, 9.5).unwrap();

    // 途中の列のみ
    sheet.write_string(3, 1, "Lid").unwrap();

    workbook.save(path).unwrap();
}

#[test]
fn test_read_table() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("items.xlsx");
    write_workbook(&path);

    let table = read_table(&path, None).expect("表の読み込みに失敗");
    assert_eq!(table.header, vec!["Article", "Name", "Price"]);
    assert_eq!(table.rows.len(), 3);
    assert_eq!(table.rows[0], vec!["A-1", "Mug", "120"]);
    assert_eq!(table.rows[1], vec!["1002", "Cup", "9.5"]);
    assert_eq!(table.rows[2], vec!["", "Lid", ""]);
}

#[test]
fn test_read_named_sheet() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("items.xlsx");
    write_workbook(&path);

    assert!(read_table(&path, Some("Items")).is_ok());
    assert!(matches!(read_table(&path, Some("Nope")), Err(CardError::TableRead(_))));
}

/// 見出し行のみの表
#[test]
fn test_header_only_is_empty() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("header.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Article").unwrap();
    workbook.save(&path).unwrap();

    assert!(matches!(read_table(&path, None), Err(CardError::EmptyTable(_))));
}

#[test]
fn test_missing_file() {
    let result = read_table(Path::new("/nonexistent/items.xlsx"), None);
    assert!(matches!(result, Err(CardError::FileNotFound(_))));
}

/// 読み込んだ見出しに対する列指定
#[test]
fn test_resolve_column_against_sheet() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("items.xlsx");
    write_workbook(&path);
    let table = read_table(&path, None).unwrap();

    assert_eq!(resolve_column("A", &table.header).unwrap(), 0);
    assert_eq!(resolve_column("Price", &table.header).unwrap(), 2);
    assert_eq!(resolve_column("2", &table.header).unwrap(), 1);
    assert!(matches!(resolve_column("D", &table.header), Err(CardError::InvalidColumn(_))));
}
