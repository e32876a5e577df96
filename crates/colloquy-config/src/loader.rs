//! Config file discovery and layered loading.
//!
//! The `load()` algorithm:
//! 1. Parse embedded `defaults.toml` → base
//! 2. Merge `~/.colloquy/config.toml` (user)
//! 3. Merge `{workspace}/.colloquy/config.toml` (workspace)
//! 4. Apply environment variable overrides for secrets
//! 5. Deserialize merged tree → `Config`
//! 6. Validate

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Load the unified configuration with layered file precedence.
///
/// `workspace_root` is the root of the current project; if `None` the
/// workspace layer is skipped. `home_override` bypasses the default home
/// directory discovery (used by tests).
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(workspace_root: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<Config> {
    let mut merged: toml::Value = toml::from_str(DEFAULTS_TOML).map_err(|e| {
        ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        }
    })?;

    // User layer.
    if let Some(home) = home_override.map(Path::to_path_buf).or_else(home_directory) {
        let user_path = home.join(".colloquy").join("config.toml");
        if let Some(overlay) = try_load_file(&user_path)? {
            deep_merge(&mut merged, &overlay);
            info!(path = %user_path.display(), "loaded user config");
        }
    }

    // Workspace layer.
    if let Some(root) = workspace_root {
        let workspace_path = root.join(".colloquy").join("config.toml");
        if let Some(overlay) = try_load_file(&workspace_path)? {
            deep_merge(&mut merged, &overlay);
            info!(path = %workspace_path.display(), "loaded workspace config");
        }
    }

    let mut config: Config = merged
        .try_into()
        .map_err(|e| ConfigError::ParseError {
            path: "<merged configuration>".to_owned(),
            source: e,
        })?;

    apply_env_overrides(&mut config);
    validate::validate(&config)?;
    Ok(config)
}

/// Parse a configuration from a TOML string over the embedded defaults.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the string is malformed or the result
/// fails validation.
pub fn load_from_str(toml_str: &str) -> ConfigResult<Config> {
    let mut merged: toml::Value = toml::from_str(DEFAULTS_TOML).map_err(|e| {
        ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        }
    })?;

    let overlay: toml::Value =
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<inline>".to_owned(),
            source: e,
        })?;
    deep_merge(&mut merged, &overlay);

    let mut config: Config = merged
        .try_into()
        .map_err(|e| ConfigError::ParseError {
            path: "<merged configuration>".to_owned(),
            source: e,
        })?;

    apply_env_overrides(&mut config);
    validate::validate(&config)?;
    Ok(config)
}

/// Read and parse one optional TOML file.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    if !path.is_file() {
        debug!(path = %path.display(), "config file not present, skipping");
        return Ok(None);
    }
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let value: toml::Value = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

/// Recursively merge `overlay` into `base`. Tables merge key-by-key;
/// everything else replaces.
fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_value) in overlay_table {
                match base_table.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_table.insert(key.clone(), overlay_value.clone());
                    },
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Apply environment variable overrides for secrets.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(api_key) = std::env::var("COLLOQUY_API_KEY")
        && !api_key.is_empty()
    {
        config.model.api_key = Some(api_key);
    }
    if let Ok(api_url) = std::env::var("COLLOQUY_API_URL")
        && !api_url.is_empty()
    {
        config.model.api_url = Some(api_url);
    }
}

/// The user's home directory, from `COLLOQUY_HOME` or `HOME`.
fn home_directory() -> Option<PathBuf> {
    std::env::var_os("COLLOQUY_HOME")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults_only() {
        let empty_home = tempfile::tempdir().unwrap();
        let config = load(None, Some(empty_home.path())).unwrap();
        assert_eq!(config.agent.max_steps, 15);
    }

    #[test]
    fn test_workspace_overrides_user() {
        let home = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();

        std::fs::create_dir_all(home.path().join(".colloquy")).unwrap();
        std::fs::write(
            home.path().join(".colloquy").join("config.toml"),
            "[agent]\nmax_steps = 5\nrequire_approval = true\n",
        )
        .unwrap();

        std::fs::create_dir_all(workspace.path().join(".colloquy")).unwrap();
        std::fs::write(
            workspace.path().join(".colloquy").join("config.toml"),
            "[agent]\nmax_steps = 7\n",
        )
        .unwrap();

        let config = load(Some(workspace.path()), Some(home.path())).unwrap();
        // Workspace wins where set, user layer survives where not
        assert_eq!(config.agent.max_steps, 7);
        assert!(config.agent.require_approval);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join(".colloquy")).unwrap();
        std::fs::write(
            home.path().join(".colloquy").join("config.toml"),
            "not [valid toml",
        )
        .unwrap();

        assert!(load(None, Some(home.path())).is_err());
    }

    #[test]
    fn test_load_from_str() {
        let config = load_from_str("[tools]\nmax_in_flight = 9\n").unwrap();
        assert_eq!(config.tools.max_in_flight, 9);
        assert_eq!(config.tools.call_timeout_secs, 60);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(load_from_str("[agent]\nmax_steps = 0\n").is_err());
    }
}
