//! 画像サイズ予算
//!
//! 出力PDF全体の上限サイズ（MB）と品番数から、画像1枚あたりの目標サイズ（KB）を決める。

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// PDF構造のオーバーヘッド分を差し引いた、画像に割り当てる比率
pub const SIZE_BUDGET_FACTOR: f64 = 0.85;
/// 1枚あたりの下限（KB）
pub const MIN_KB_PER_IMAGE: f64 = 10.0;
/// 1枚あたりの上限（KB）
pub const MAX_KB_PER_IMAGE: f64 = 2048.0;

/// 画像1枚あたりのサイズ予算
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageBudget {
    pub target_kb: f64,
    pub min_kb: f64,
    pub max_kb: f64,
    /// 品番数0のため1で代用した
    pub count_fallback: bool,
}

impl ImageBudget {
    /// 目標サイズ（バイト）
    pub fn target_bytes(&self) -> u64 {
        (self.target_kb * 1024.0).floor() as u64
    }

    /// バイト数が予算内か
    pub fn fits(&self, bytes: u64) -> bool {
        bytes as f64 / 1024.0 <= self.target_kb
    }
}

/// 予算を算出
///
/// `item_count` は品番が空でない行の数。0の場合は1で代用する。
pub fn plan(total_size_cap_mb: f64, item_count: usize) -> ImageBudget {
    let count_fallback = item_count == 0;
    if count_fallback {
        warn!("品番のある行が0件のため、予算計算では1件として扱います");
    }
    let count = item_count.max(1) as f64;

    let raw = SIZE_BUDGET_FACTOR * total_size_cap_mb * 1024.0 / count;
    let target_kb = raw.clamp(MIN_KB_PER_IMAGE, MAX_KB_PER_IMAGE);
    debug!(
        total_size_cap_mb,
        item_count,
        target_kb,
        "画像1枚あたりの目標サイズを決定"
    );

    ImageBudget {
        target_kb,
        min_kb: MIN_KB_PER_IMAGE,
        max_kb: MAX_KB_PER_IMAGE,
        count_fallback,
    }
}
