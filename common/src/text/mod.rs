//! テキスト計測・折り返し

pub mod metrics;
pub mod wrap;

pub use metrics::{BuiltinHelvetica, FontMetrics, FontStyle};
pub use wrap::{fits_single_line, sanitize_text, sanitize_word, truncate_with_ellipsis, wrap_words};
