use crate::error::{CardError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 1カテゴリあたりの検索フォルダ数（優先度順）
pub const MAX_ROOTS_PER_CATEGORY: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 商品画像フォルダ（優先度順、最大3）
    pub product_roots: Vec<PathBuf>,
    /// パッケージ画像フォルダ（優先度順、最大3）
    pub package_roots: Vec<PathBuf>,
    /// 品番列（見出し名・1始まりの列番号・列記号）
    pub article_column: String,
    /// 出力PDFの上限サイズ（MB）
    pub max_file_size_mb: f64,
    /// 出力先フォルダ
    pub output_folder: Option<PathBuf>,
    /// サブフォルダも検索
    pub recursive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            product_roots: Vec::new(),
            package_roots: Vec::new(),
            article_column: "A".into(),
            max_file_size_mb: 100.0,
            output_folder: None,
            recursive: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.validate()?;
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CardError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("product-cards").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.product_roots.len() > MAX_ROOTS_PER_CATEGORY
            || self.package_roots.len() > MAX_ROOTS_PER_CATEGORY
        {
            return Err(CardError::Config(format!(
                "画像フォルダは各カテゴリ最大{}件までです",
                MAX_ROOTS_PER_CATEGORY
            )));
        }
        if !(self.max_file_size_mb > 0.0) {
            return Err(CardError::Config(format!(
                "上限サイズが不正です: {}MB",
                self.max_file_size_mb
            )));
        }
        Ok(())
    }

    /// 出力先（未設定ならダウンロードフォルダ、なければカレント）
    pub fn output_folder_or_default(&self) -> PathBuf {
        self.output_folder
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.article_column, "A");
        assert_eq!(config.max_file_size_mb, 100.0);
        assert!(config.recursive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"product_roots": ["/img/a"]}"#).unwrap();
        assert_eq!(config.product_roots, vec![PathBuf::from("/img/a")]);
        assert_eq!(config.article_column, "A");
        assert!(config.recursive);
    }

    #[test]
    fn test_too_many_roots_rejected() {
        let config = Config {
            package_roots: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CardError::Config(_))));
    }

    #[test]
    fn test_invalid_size_rejected() {
        let config = Config {
            max_file_size_mb: 0.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
