//! Configuration loading from `~/.agentnet/config.toml` with defaults.
//!
//! The root file may list `include = ["discovery.toml", ...]`: plain file
//! names in the same directory, each holding some of the `[discovery]`,
//! `[client]` and `[agent]` sections. Includes are layered in order under
//! the root file, section by section, and may not include further files.

use agentnet_types::config::NetConfig;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Top-level keys of [`NetConfig`]. Sections merge key by key.
const KNOWN_KEYS: [&str; 4] = ["log_level", "discovery", "client", "agent"];

/// Load configuration, falling back to defaults on any failure.
///
/// Runs before tracing is installed, so problems are returned as warnings for
/// the caller to log once a subscriber exists.
pub fn load_config(path: Option<&Path>) -> (NetConfig, Vec<String>) {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);
    let mut warnings = Vec::new();

    if !config_path.exists() {
        if path.is_some() {
            warnings.push(format!(
                "config file {} not found, using defaults",
                config_path.display()
            ));
        }
        return (NetConfig::default(), warnings);
    }

    match read_layered(&config_path, &mut warnings) {
        Ok(table) => match toml::Value::Table(table).try_into::<NetConfig>() {
            Ok(config) => match config.validate() {
                Ok(()) => return (config, warnings),
                Err(e) => warnings.push(format!("{e}, using defaults")),
            },
            Err(e) => warnings.push(format!(
                "failed to deserialize {}: {e}, using defaults",
                config_path.display()
            )),
        },
        Err(e) => warnings.push(format!("{e}, using defaults")),
    }

    (NetConfig::default(), warnings)
}

fn read_table(path: &Path) -> Result<toml::Table, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    toml::from_str(&contents).map_err(|e| format!("failed to parse {}: {e}", path.display()))
}

/// The root table with its includes layered underneath. A bad include is
/// reported and the root values are used alone.
fn read_layered(config_path: &Path, warnings: &mut Vec<String>) -> Result<toml::Table, String> {
    let mut root = read_table(config_path)?;
    let includes = match root.remove("include") {
        None => Vec::new(),
        Some(toml::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        Some(_) => {
            warnings.push("`include` must be a list of file names, ignored".to_string());
            Vec::new()
        }
    };

    let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let mut layered = toml::Table::new();
    for name in &includes {
        match read_include(dir, config_path, name) {
            Ok(table) => {
                warn_unknown_keys(&table, name, warnings);
                merge_sections(&mut layered, table);
            }
            Err(e) => {
                warnings.push(format!("{e}, using root config only"));
                layered.clear();
                break;
            }
        }
    }

    warn_unknown_keys(&root, &config_path.display().to_string(), warnings);
    merge_sections(&mut layered, root);
    Ok(layered)
}

fn read_include(dir: &Path, root: &Path, name: &str) -> Result<toml::Table, String> {
    let is_plain_name = Path::new(name).file_name().and_then(|f| f.to_str()) == Some(name);
    if !is_plain_name {
        return Err(format!(
            "include '{name}' must be a file name in {}",
            dir.display()
        ));
    }
    let path = dir.join(name);
    if path == root {
        return Err(format!("include '{name}' is the root config itself"));
    }
    let table = read_table(&path)?;
    if table.contains_key("include") {
        return Err(format!("include '{name}' may not include further files"));
    }
    Ok(table)
}

fn warn_unknown_keys(table: &toml::Table, source: &str, warnings: &mut Vec<String>) {
    for key in table.keys().filter(|k| !KNOWN_KEYS.contains(&k.as_str())) {
        warnings.push(format!("unknown config key '{key}' in {source}, ignored"));
    }
}

/// Layer `overlay` over `base`: sections merge key by key, everything else
/// is replaced.
fn merge_sections(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(section)), toml::Value::Table(overrides)) => {
                for (field, value) in overrides {
                    section.insert(field, value);
                }
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

pub fn agentnet_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".agentnet")
}

pub fn default_config_path() -> PathBuf {
    agentnet_home().join("config.toml")
}

/// Log warnings collected by [`load_config`].
pub fn report(config_path: Option<&Path>, warnings: &[String]) {
    for warning in warnings {
        warn!("{warning}");
    }
    if warnings.is_empty() {
        if let Some(path) = config_path {
            info!(path = %path.display(), "Loaded configuration");
        }
    }
}
