use crate::registry::LanguageRegistry;
use crate::tree::TreeOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LangtreeConfig {
    /// Injection query source per language
    pub injections: HashMap<String, String>,
    /// Injection query files per language, relative to the config file
    pub injection_files: HashMap<String, String>,
    /// Extra names accepted for a language
    pub aliases: HashMap<String, String>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("langtree.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<LangtreeConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let mut config: LangtreeConfig = toml::from_str(&contents)?;
    config.resolve_files(path.parent().unwrap_or(Path::new("")))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &LangtreeConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

impl LangtreeConfig {
    /// Read every `injection_files` entry into `injections`. Inline queries win.
    fn resolve_files(&mut self, base: &Path) -> anyhow::Result<()> {
        for (language, file) in &self.injection_files {
            if self.injections.contains_key(language) {
                continue;
            }
            let path = base.join(file);
            let query = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
            self.injections.insert(language.clone(), query);
        }
        Ok(())
    }

    /// Add configured aliases to a registry
    pub fn apply_aliases(&self, registry: &mut LanguageRegistry) {
        for (alias, language) in &self.aliases {
            registry.alias(alias, language);
        }
    }

    /// Options for building trees, with override keys resolved to canonical ids
    pub fn tree_options(&self, registry: &LanguageRegistry) -> TreeOptions {
        let mut options = TreeOptions::new();
        for (language, query) in &self.injections {
            let id = registry.resolve(language).unwrap_or(language.as_str());
            options = options.with_injection_query(id, query);
        }
        options
    }
}
