//! 品番による画像検索
//!
//! 優先度順の検索フォルダ（第1〜第3）を順に調べ、
//! ファイル名（拡張子除く）が品番と完全一致する画像を探す。
//! 最初に1件以上ヒットしたフォルダの結果のみを返し、下位フォルダは参照しない。

mod index;

pub use index::ImageIndex;

use product_cards_common::normalize_key;
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// 対象とする画像拡張子（大文字小文字は区別しない）
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];

/// 検索フォルダの優先度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Primary,
    Secondary,
    Tertiary,
    None,
}

impl Tier {
    fn from_index(index: usize) -> Self {
        match index {
            0 => Tier::Primary,
            1 => Tier::Secondary,
            2 => Tier::Tertiary,
            _ => Tier::None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Primary => write!(f, "primary"),
            Tier::Secondary => write!(f, "secondary"),
            Tier::Tertiary => write!(f, "tertiary"),
            Tier::None => write!(f, "none"),
        }
    }
}

/// 優先度順の検索フォルダ（最大3、未設定の枠はスキップ）
#[derive(Debug, Clone, Default)]
pub struct SearchRoots {
    roots: Vec<Option<PathBuf>>,
}

impl SearchRoots {
    pub const MAX_TIERS: usize = 3;

    /// 空パスは未設定扱い。4件目以降は無視する
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::from_slots(roots.into_iter().map(|p| {
            let path: PathBuf = p.into();
            if path.as_os_str().is_empty() {
                None
            } else {
                Some(path)
            }
        }))
    }

    /// 枠ごとの指定（None = 未設定）
    pub fn from_slots<I>(slots: I) -> Self
    where
        I: IntoIterator<Item = Option<PathBuf>>,
    {
        let mut roots: Vec<Option<PathBuf>> = slots.into_iter().collect();
        if roots.len() > Self::MAX_TIERS {
            warn!("検索フォルダは{}件までです。{}件目以降は無視します", Self::MAX_TIERS, Self::MAX_TIERS + 1);
            roots.truncate(Self::MAX_TIERS);
        }
        Self { roots }
    }

    /// 設定済みの枠を優先度順に列挙
    pub fn tiers(&self) -> impl Iterator<Item = (Tier, &Path)> {
        self.roots
            .iter()
            .enumerate()
            .filter_map(|(i, root)| root.as_deref().map(|p| (Tier::from_index(i), p)))
    }

    pub fn is_empty(&self) -> bool {
        self.tiers().next().is_none()
    }
}

/// 検索結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub found: bool,
    /// 採用フォルダ内の一致ファイル（ファイル名順）
    pub matches: Vec<PathBuf>,
    pub source_tier: Tier,
}

impl SearchResult {
    pub fn not_found() -> Self {
        Self {
            found: false,
            matches: Vec::new(),
            source_tier: Tier::None,
        }
    }

    pub(crate) fn from_matches(tier: Tier, matches: Vec<PathBuf>) -> Self {
        Self {
            found: !matches.is_empty(),
            matches,
            source_tier: tier,
        }
    }

    /// 使用する画像（一致が複数なら先頭）
    pub fn first(&self) -> Option<&Path> {
        self.matches.first().map(PathBuf::as_path)
    }

    /// 採用フォルダに複数の候補がある
    pub fn is_ambiguous(&self) -> bool {
        self.matches.len() > 1
    }
}

/// 拡張子が対象か
pub fn is_image_extension(path: &Path, allowed_extensions: &[&str]) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            allowed_extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

/// ファイルが品番に一致するか（拡張子除くファイル名の完全一致）
fn matches_key(path: &Path, key: &str, allowed_extensions: &[&str]) -> bool {
    path.file_stem() == Some(OsStr::new(key)) && is_image_extension(path, allowed_extensions)
}

/// フォルダが検索可能か（存在しない・フォルダでない場合は警告してスキップ）
fn root_available(root: &Path) -> bool {
    if root.is_dir() {
        true
    } else {
        warn!("画像フォルダが存在しないかアクセスできません: {}", root.display());
        false
    }
}

/// フォルダ内の画像候補を列挙（ディレクトリごとにファイル名順）
pub(crate) fn walk_images<'a>(
    root: &Path,
    allowed_extensions: &'a [&'a str],
    recursive: bool,
) -> impl Iterator<Item = PathBuf> + 'a {
    let max_depth = if recursive { usize::MAX } else { 1 };
    WalkDir::new(root)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("読み取れないエントリをスキップ: {}", e);
                None
            }
        })
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file())
        .filter(move |path| is_image_extension(path, allowed_extensions))
}

/// 品番で画像を検索
///
/// 品番は前後の空白を除いてから比較する（表から読んだ品番と同じ扱い）。
pub fn resolve(key: &str, roots: &SearchRoots, allowed_extensions: &[&str], recursive: bool) -> SearchResult {
    let key = normalize_key(key);
    let key = key.as_str();
    debug!("品番 '{}' の画像を検索", key);

    for (tier, root) in roots.tiers() {
        if !root_available(root) {
            continue;
        }

        let matches: Vec<PathBuf> = walk_images(root, allowed_extensions, recursive)
            .filter(|path| matches_key(path, key, allowed_extensions))
            .collect();

        if !matches.is_empty() {
            info!("品番 '{}' の画像を検出 ({}): {}", key, tier, matches[0].display());
            if matches.len() > 1 {
                warn!("品番 '{}' の候補が{}件あります。先頭を使用します", key, matches.len());
            }
            return SearchResult::from_matches(tier, matches);
        }
    }

    warn!("品番 '{}' の画像がどのフォルダにも見つかりません", key);
    SearchResult::not_found()
}
