use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("表ファイル読み込みエラー: {0}")]
    TableRead(String),

    #[error("表にデータ行がありません: {0}")]
    EmptyTable(String),

    #[error("品番列の指定が不正: {0}")]
    InvalidColumn(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("画像エンコードエラー: {0}")]
    ImageEncode(String),

    #[error("PDF生成エラー: {0}")]
    PdfGeneration(String),

    #[error("カードが1枚も生成されませんでした（画像未検出: {}件）", .unresolved_keys.len())]
    NoCardsProduced { unresolved_keys: Vec<String> },

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] product_cards_common::Error),
}

pub type Result<T> = std::result::Result<T, CardError>;
