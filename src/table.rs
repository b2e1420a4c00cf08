//! 表ファイル読み込み
//!
//! 1行目（空行を除く最初の行）を見出し行、以降をデータ行として読み込む。
//! セル値はすべて文字列化する。

use crate::error::{CardError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::debug;

/// 見出し行とデータ行
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// セル値を文字列化（整数値の小数は ".0" を付けない）
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}

/// 表ファイル（xlsx/xlsm/xls/ods）を読み込む
///
/// `sheet` 未指定時は先頭シート。
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table> {
    if !path.exists() {
        return Err(CardError::FileNotFound(path.display().to_string()));
    }

    let mut workbook =
        open_workbook_auto(path).map_err(|e| CardError::TableRead(format!("{}: {}", path.display(), e)))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| CardError::TableRead(format!("シートがありません: {}", path.display())))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| CardError::TableRead(format!("シート '{}': {}", sheet_name, e)))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>())
        .skip_while(|row| row.iter().all(|c| c.trim().is_empty()));

    let header = rows
        .next()
        .ok_or_else(|| CardError::EmptyTable(format!("見出し行がありません: {}", path.display())))?;

    let data: Vec<Vec<String>> = rows
        .map(|mut row| {
            if row.len() < header.len() {
                row.resize(header.len(), String::new());
            }
            row
        })
        .collect();

    if data.is_empty() {
        return Err(CardError::EmptyTable(path.display().to_string()));
    }

    debug!("表を読み込み: シート '{}', {}列, {}行", sheet_name, header.len(), data.len());
    Ok(Table::new(header, data))
}

/// 列記号（A, B, ..., Z, AA, ...）を0始まりの列番号に変換
fn column_letters_to_index(letters: &str) -> Option<usize> {
    let mut index = 0usize;
    for ch in letters.chars() {
        let ch = ch.to_ascii_uppercase();
        if !ch.is_ascii_uppercase() {
            return None;
        }
        index = index.checked_mul(26)?.checked_add((ch as u8 - b'A' + 1) as usize)?;
    }
    index.checked_sub(1)
}

/// 品番列の指定を0始まりの列番号に解決
///
/// - 数字のみ: 1始まりの列番号
/// - 英字のみ: 列記号（見出し名より優先）
/// - それ以外: 見出し名の完全一致
pub fn resolve_column(identifier: &str, header: &[String]) -> Result<usize> {
    let identifier = identifier.trim();
    let width = header.len();
    let out_of_range = |what: &str| {
        CardError::InvalidColumn(format!(
            "{} '{}' は表の範囲外です（列数: {}）",
            what, identifier, width
        ))
    };

    if identifier.is_empty() {
        return Err(CardError::InvalidColumn("列が指定されていません".into()));
    }

    if identifier.chars().all(|c| c.is_ascii_digit()) {
        let number: usize = identifier
            .parse()
            .map_err(|_| CardError::InvalidColumn(format!("列番号が不正です: '{}'", identifier)))?;
        return match number.checked_sub(1) {
            Some(index) if index < width => Ok(index),
            _ => Err(out_of_range("列番号")),
        };
    }

    if identifier.chars().all(|c| c.is_ascii_alphabetic()) {
        if let Some(index) = column_letters_to_index(identifier) {
            if index < width {
                return Ok(index);
            }
        }
    }

    header
        .iter()
        .position(|label| label.trim() == identifier)
        .ok_or_else(|| CardError::InvalidColumn(format!("列 '{}' が見つかりません", identifier)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters_to_index("A"), Some(0));
        assert_eq!(column_letters_to_index("z"), Some(25));
        assert_eq!(column_letters_to_index("AA"), Some(26));
        assert_eq!(column_letters_to_index("AB"), Some(27));
        assert_eq!(column_letters_to_index("A1"), None);
    }

    #[test]
    fn test_resolve_by_number() {
        let h = header(&["Article", "Name", "Price"]);
        assert_eq!(resolve_column("1", &h).unwrap(), 0);
        assert_eq!(resolve_column(" 3 ", &h).unwrap(), 2);
        assert!(matches!(resolve_column("4", &h), Err(CardError::InvalidColumn(_))));
        assert!(matches!(resolve_column("0", &h), Err(CardError::InvalidColumn(_))));
    }

    #[test]
    fn test_resolve_by_letter_and_label() {
        let h = header(&["Article", "Name", "Price"]);
        assert_eq!(resolve_column("b", &h).unwrap(), 1);
        assert_eq!(resolve_column("Price", &h).unwrap(), 2);
        assert_eq!(resolve_column("Name", &h).unwrap(), 1);
    }

    #[test]
    fn test_letter_wins_over_label() {
        let h = header(&["C", "B", "A"]);
        assert_eq!(resolve_column("A", &h).unwrap(), 0);
    }

    #[test]
    fn test_unknown_label() {
        let h = header(&["Article"]);
        assert!(matches!(resolve_column("Артикул 2", &h), Err(CardError::InvalidColumn(_))));
        assert!(matches!(resolve_column("", &h), Err(CardError::InvalidColumn(_))));
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::Float(123.0)), "123");
        assert_eq!(cell_to_string(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_to_string(&Data::Int(42)), "42");
        assert_eq!(cell_to_string(&Data::String("A-1".into())), "A-1");
        assert_eq!(cell_to_string(&Data::Bool(true)), "true");
    }
}
