use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "product-cards")]
#[command(about = "表データと商品画像から商品カードPDFを生成", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 表ファイルから商品カードPDFを生成
    Build {
        /// 表ファイル（xlsx/xls/ods）
        #[arg(required = true)]
        table: PathBuf,

        /// シート名（省略時は先頭シート）
        #[arg(long)]
        sheet: Option<String>,

        /// 品番列（見出し名・1始まりの列番号・列記号）
        #[arg(short = 'k', long)]
        key_column: Option<String>,

        /// 商品画像フォルダ（優先度順、最大3）
        #[arg(long = "product", value_name = "DIR")]
        product_roots: Vec<PathBuf>,

        /// パッケージ画像フォルダ（優先度順、最大3）
        #[arg(long = "package", value_name = "DIR")]
        package_roots: Vec<PathBuf>,

        /// 出力PDFの上限サイズ（MB）
        #[arg(long)]
        max_size_mb: Option<f64>,

        /// 出力ファイル/ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// テーブルに表示しない列（1始まりの列番号・列記号・見出し名）
        #[arg(long = "exclude", value_name = "COLUMN")]
        excluded_columns: Vec<String>,

        /// サブフォルダを検索しない
        #[arg(long)]
        flat: bool,

        /// 画像が1枚もない品番はカードにしない
        #[arg(long)]
        skip_imageless: bool,

        /// ドキュメントタイトル
        #[arg(short, long, default_value = "Product cards")]
        title: String,
    },

    /// 品番の画像検索結果を表示
    Resolve {
        /// 品番
        #[arg(required = true)]
        key: String,

        /// 商品画像フォルダ（省略時は設定値）
        #[arg(long = "product", value_name = "DIR")]
        product_roots: Vec<PathBuf>,

        /// パッケージ画像フォルダ（省略時は設定値）
        #[arg(long = "package", value_name = "DIR")]
        package_roots: Vec<PathBuf>,

        /// サブフォルダを検索しない
        #[arg(long)]
        flat: bool,
    },

    /// 設定を表示/編集
    Config {
        /// 商品画像フォルダを設定（優先度順）
        #[arg(long, value_name = "DIR", num_args = 1..=3)]
        set_product_roots: Option<Vec<PathBuf>>,

        /// パッケージ画像フォルダを設定（優先度順）
        #[arg(long, value_name = "DIR", num_args = 1..=3)]
        set_package_roots: Option<Vec<PathBuf>>,

        /// 品番列を設定
        #[arg(long)]
        set_article_column: Option<String>,

        /// 出力PDFの上限サイズ（MB）を設定
        #[arg(long)]
        set_max_size_mb: Option<f64>,

        /// 出力先フォルダを設定
        #[arg(long)]
        set_output_folder: Option<PathBuf>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
