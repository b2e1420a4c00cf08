//! バッチ用の画像インデックス
//!
//! 行ごとにフォルダを走査し直す代わりに、各フォルダを1回だけ走査して
//! 「ファイル名（拡張子除く）→ パス一覧」を作る。結果は [`super::resolve`] と同一。

use super::{root_available, walk_images, SearchResult, SearchRoots, Tier};
use product_cards_common::normalize_key;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct ImageIndex {
    tiers: Vec<(Tier, HashMap<String, Vec<PathBuf>>)>,
}

impl ImageIndex {
    pub fn build(roots: &SearchRoots, allowed_extensions: &[&str], recursive: bool) -> Self {
        let mut tiers = Vec::new();

        for (tier, root) in roots.tiers() {
            if !root_available(root) {
                continue;
            }

            let mut by_stem: HashMap<String, Vec<PathBuf>> = HashMap::new();
            for path in walk_images(root, allowed_extensions, recursive) {
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    debug!("UTF-8でないファイル名をスキップ: {}", path.display());
                    continue;
                };
                by_stem.entry(stem.to_string()).or_default().push(path);
            }
            debug!("{} フォルダ {} の画像 {}件を登録", tier, root.display(), by_stem.values().map(Vec::len).sum::<usize>());
            tiers.push((tier, by_stem));
        }

        Self { tiers }
    }

    /// 品番で検索（優先度順、最初にヒットしたフォルダのみ）
    pub fn resolve(&self, key: &str) -> SearchResult {
        let key = normalize_key(key);
        let key = key.as_str();
        for (tier, by_stem) in &self.tiers {
            if let Some(matches) = by_stem.get(key) {
                info!("品番 '{}' の画像を検出 ({}): {}", key, tier, matches[0].display());
                if matches.len() > 1 {
                    warn!("品番 '{}' の候補が{}件あります。先頭を使用します", key, matches.len());
                }
                return SearchResult::from_matches(*tier, matches.clone());
            }
        }

        warn!("品番 '{}' の画像がどのフォルダにも見つかりません", key);
        SearchResult::not_found()
    }

    /// 登録済み画像の総数
    pub fn len(&self) -> usize {
        self.tiers
            .iter()
            .map(|(_, by_stem)| by_stem.values().map(Vec::len).sum::<usize>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
