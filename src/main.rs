//! Langtree CLI - inspect the language layers of a document

mod ui;

use clap::{Parser, Subcommand};
use langtree::config::{self, LangtreeConfig};
use langtree::{LanguageRegistry, LanguageTree, Region, Source, TextBuffer};
use serde::Serialize;
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "langtree")]
#[command(version = "0.0.1")]
#[command(about = "Layered multi-language syntax trees")]
#[command(long_about = r#"
Langtree parses a document with its own grammar, discovers languages embedded
inside it through injection queries, and parses each of those in turn.

Example usage:
  langtree parse app.js
  langtree parse page.txt --language javascript --format json
  langtree languages
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and print its language layers
    Parse {
        /// File to parse
        file: PathBuf,

        /// Root language (defaults to the file extension's language)
        #[arg(short, long)]
        language: Option<String>,

        /// Output format: table or json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// List registered languages
    Languages,

    /// Write an empty config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

/// One layer of the parsed document
#[derive(Serialize)]
struct LayerSummary {
    language: String,
    depth: usize,
    trees: usize,
    regions: Vec<Region>,
    has_errors: bool,
}

impl LayerSummary {
    fn of(node: &LanguageTree) -> Self {
        Self {
            language: node.language().to_string(),
            depth: node.depth(),
            trees: node.trees().count(),
            regions: node.included_regions().to_vec(),
            has_errors: node.trees().any(|t| t.root_node().has_error()),
        }
    }

    fn row(&self) -> ui::LayerRow {
        let ranges = if self.regions.is_empty() {
            "whole document".to_string()
        } else {
            self.regions
                .iter()
                .map(|region| {
                    region
                        .ranges()
                        .iter()
                        .map(|r| format!("{}..{}", r.start_byte, r.end_byte))
                        .collect::<Vec<_>>()
                        .join(" + ")
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        ui::LayerRow {
            layer: format!("{}{}", "  ".repeat(self.depth), self.language),
            regions: self.regions.len(),
            trees: self.trees,
            ranges,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let mut registry = LanguageRegistry::with_builtin();
    config.apply_aliases(&mut registry);

    match cli.command {
        Commands::Parse { file, language, format } => {
            let language = match language.or_else(|| registry.language_for_path(&file).map(str::to_string)) {
                Some(language) => language,
                None => anyhow::bail!("cannot infer a language for {}; pass --language", file.display()),
            };
            tracing::info!("Parsing {} as {}", file.display(), language);

            let text = std::fs::read_to_string(&file)?;
            let options = config.tree_options(&registry);
            let source = Source::shared(TextBuffer::new(text));
            let mut tree = LanguageTree::create(source, &language, Rc::new(registry), options)?;
            let changes = tree.parse()?.changes.len();

            let mut layers = Vec::new();
            tree.for_each_child(|node| layers.push(LayerSummary::of(node)), true);

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&layers)?);
            } else {
                ui::header(&format!("{} ({})", file.display(), ui::language(&language)));
                ui::info("Layers", &layers.len().to_string());
                ui::info("Changed ranges", &changes.to_string());
                let rows: Vec<ui::LayerRow> = layers.iter().map(LayerSummary::row).collect();
                println!("{}", ui::layer_table(&rows));
                for layer in layers.iter().filter(|l| l.has_errors) {
                    ui::warn(&format!("{} layer contains syntax errors", layer.language));
                }
            }
        }

        Commands::Languages => {
            ui::section("Languages");
            for id in registry.languages() {
                let grammar = registry.load(id)?;
                let injections = if grammar.injections().is_some() || config.injections.contains_key(id) {
                    "injections"
                } else {
                    ""
                };
                println!(
                    "  {} {} {}",
                    ui::language(id),
                    ui::muted(&grammar.extensions().join(", ")),
                    injections
                );
            }
        }

        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            match config::write_config(&path, &LangtreeConfig::default(), force) {
                Ok(()) => ui::success(&format!("Wrote {}", path.display())),
                Err(e) => {
                    ui::error(&e.to_string());
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
