//! Product Cards Common Library
//!
//! カード寸法・画像サイズ予算・テキストレイアウトなど、
//! ファイルI/Oを伴わない共通ロジック

pub mod budget;
pub mod card_layout;
pub mod error;
pub mod export;
pub mod key;
pub mod layout;
pub mod text;

pub use budget::{plan, ImageBudget};
pub use card_layout::{CardLayout, CardLayoutEngine, LaidOutRow};
pub use error::{Error, Result};
pub use export::card_core::{build_card_fields, CardField, CardLayoutCore};
pub use key::{is_blank_cell, key_of, normalize_key};
pub use layout::{CardGeometry, ImagePlacement, ImageSlot};
pub use text::{BuiltinHelvetica, FontMetrics, FontStyle};
