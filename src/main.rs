use anyhow::{bail, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use product_cards::assembler::{AssembleRequest, DocumentAssembler, RunControl, RunReport};
use product_cards::cli::{Cli, Commands};
use product_cards::config::Config;
use product_cards::error::CardError;
use product_cards::resolver::{self, SearchRoots, IMAGE_EXTENSIONS};
use product_cards::table;
use product_cards_common::normalize_key;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// CLI指定があればそれを、なければ設定値を使う
fn roots_or(cli_roots: Vec<PathBuf>, configured: &[PathBuf]) -> SearchRoots {
    if cli_roots.is_empty() {
        SearchRoots::new(configured.iter().cloned())
    } else {
        SearchRoots::new(cli_roots)
    }
}

fn print_report(report: &RunReport) {
    println!("✔ {}枚のカードを生成（全{}行）", report.card_count, report.rows_total);
    if report.skipped_empty_keys > 0 {
        println!("- 品番が空の行をスキップ: {}行", report.skipped_empty_keys);
    }
    println!(
        "- 画像1枚あたりの目標: {:.1}KB{}",
        report.budget.target_kb,
        report
            .final_quality
            .map(|q| format!("（JPEG品質 {}%）", q))
            .unwrap_or_default()
    );

    if !report.unresolved_keys.is_empty() {
        println!("\n⚠ 画像が見つからない品番: {}件", report.unresolved_keys.len());
        for key in &report.unresolved_keys {
            println!("  - {}", key);
        }
    }

    if !report.ambiguous.is_empty() {
        println!("\n⚠ 画像候補が複数ある品番: {}件（先頭を使用）", report.ambiguous.len());
        for (key, candidates) in &report.ambiguous {
            println!("  - {}", key);
            for candidate in candidates {
                println!("      {}", candidate.display());
            }
        }
    }

    if report.omitted_images > 0 {
        println!("\n⚠ 読み込めずに省略した画像: {}枚", report.omitted_images);
    }
    if !report.overflowed_keys.is_empty() {
        println!(
            "\n⚠ 最小フォントでも収まらなかったカード: {}",
            report.overflowed_keys.join(", ")
        );
    }
    if report.stopped_early {
        println!("\n⚠ 処理を途中で中断しました");
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Build {
            table: table_path,
            sheet,
            key_column,
            product_roots,
            package_roots,
            max_size_mb,
            output,
            excluded_columns,
            flat,
            skip_imageless,
            title,
        } => {
            println!("🗂  product-cards - カード生成\n");

            // 1. 表読み込み
            println!("[1/2] 表を読み込み中...");
            let table = table::read_table(&table_path, sheet.as_deref())
                .with_context(|| format!("表ファイル: {}", table_path.display()))?;
            println!("✔ {}行を読み込み\n", table.rows.len());

            let key_column_id = key_column.unwrap_or_else(|| config.article_column.clone());
            let key_column = table::resolve_column(&key_column_id, &table.header)?;
            let excluded_columns = excluded_columns
                .iter()
                .map(|c| table::resolve_column(c, &table.header))
                .collect::<Result<Vec<_>, _>>()?;

            let size_cap_mb = max_size_mb.unwrap_or(config.max_file_size_mb);
            if !(size_cap_mb > 0.0) {
                bail!("上限サイズが不正です: {}MB", size_cap_mb);
            }

            let request = AssembleRequest {
                table: &table,
                key_column,
                product_roots: roots_or(product_roots, &config.product_roots),
                package_roots: roots_or(package_roots, &config.package_roots),
                size_cap_mb,
                output: output.unwrap_or_else(|| config.output_folder_or_default()),
                excluded_columns,
                skip_imageless,
                recursive: config.recursive && !flat,
                title,
            };

            // 2. カード生成
            println!("[2/2] カード生成中... (上限 {}MB)", size_cap_mb);
            let bar = ProgressBar::new(table.rows.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:30.green/yellow} {percent}% ({pos}/{len})")?
                    .progress_chars("■■-"),
            );
            let control = RunControl::default()
                .every(1)
                .with_progress(|done, _total| bar.set_position(done as u64));

            let result = DocumentAssembler::new().assemble(&request, control);
            bar.finish_and_clear();

            match result {
                Ok(report) => {
                    print_report(&report);
                    println!(
                        "\n✔ PDF出力: {} ({:.2}MB)",
                        report.artifact.display(),
                        report.artifact_bytes as f64 / 1024.0 / 1024.0
                    );
                    println!("\n✅ 完了");
                }
                Err(CardError::NoCardsProduced { unresolved_keys }) => {
                    if !unresolved_keys.is_empty() {
                        println!("⚠ 画像が見つからない品番: {}", unresolved_keys.join(", "));
                    }
                    bail!(CardError::NoCardsProduced { unresolved_keys });
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Resolve {
            key,
            product_roots,
            package_roots,
            flat,
        } => {
            let key = normalize_key(&key);
            if key.is_empty() {
                bail!("品番が空です");
            }
            let recursive = config.recursive && !flat;
            let categories = [
                ("商品", roots_or(product_roots, &config.product_roots)),
                ("パッケージ", roots_or(package_roots, &config.package_roots)),
            ];

            for (label, roots) in &categories {
                let result = resolver::resolve(&key, roots, IMAGE_EXTENSIONS, recursive);
                if result.found {
                    println!("✔ {}: {} ({}件)", label, result.source_tier, result.matches.len());
                    for path in &result.matches {
                        println!("    {}", path.display());
                    }
                } else {
                    println!("✖ {}: 見つかりません", label);
                }
            }
        }

        Commands::Config {
            set_product_roots,
            set_package_roots,
            set_article_column,
            set_max_size_mb,
            set_output_folder,
            show,
        } => {
            let mut config = config;
            let mut changed = false;

            if let Some(roots) = set_product_roots {
                config.product_roots = roots;
                changed = true;
            }
            if let Some(roots) = set_package_roots {
                config.package_roots = roots;
                changed = true;
            }
            if let Some(column) = set_article_column {
                config.article_column = column;
                changed = true;
            }
            if let Some(size) = set_max_size_mb {
                config.max_file_size_mb = size;
                changed = true;
            }
            if let Some(folder) = set_output_folder {
                config.output_folder = Some(folder);
                changed = true;
            }

            if changed {
                config.save()?;
                println!("✔ 設定を保存しました: {}", Config::config_path()?.display());
            }

            if show || !changed {
                let list = |roots: &[PathBuf]| {
                    if roots.is_empty() {
                        "未設定".to_string()
                    } else {
                        roots.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(" > ")
                    }
                };
                println!("設定:");
                println!("  商品画像フォルダ: {}", list(&config.product_roots));
                println!("  パッケージ画像フォルダ: {}", list(&config.package_roots));
                println!("  品番列: {}", config.article_column);
                println!("  上限サイズ: {}MB", config.max_file_size_mb);
                println!("  出力先: {}", config.output_folder_or_default().display());
                println!("  サブフォルダ検索: {}", if config.recursive { "する" } else { "しない" });
            }
        }
    }

    Ok(())
}
