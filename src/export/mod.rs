pub mod pdf;

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub use pdf::{CardPage, CardPdfWriter};

/// 既定の出力ファイル名: product_cards_YYYYMMDD_HHMMSS.pdf
pub fn default_file_name(now: DateTime<Local>) -> String {
    format!("product_cards_{}.pdf", now.format("%Y%m%d_%H%M%S"))
}

/// 出力先の解決（フォルダ指定ならタイムスタンプ付きファイル名を付与）
pub fn output_path_for(output: &Path, now: DateTime<Local>) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(default_file_name(now))
    } else {
        output.to_path_buf()
    }
}
