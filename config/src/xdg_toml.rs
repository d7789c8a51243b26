//! `[env]` table of `<config dir>/<app>/config.toml`.
//!
//! The config dir is `$XDG_CONFIG_HOME` when set, else the platform config dir.
//! Values may be strings, integers, floats or booleans; other TOML types are rejected.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::LoadError;

fn config_home() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
}

/// Path of the app's `config.toml`, whether or not it exists.
pub fn config_path(app_name: &str) -> Result<PathBuf, LoadError> {
    let home = config_home()
        .ok_or_else(|| LoadError::XdgPath("no config directory for this platform".to_string()))?;
    Ok(home.join(app_name).join("config.toml"))
}

#[derive(serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    env: HashMap<String, toml::Value>,
}

fn scalar_to_string(key: &str, value: toml::Value) -> Result<String, LoadError> {
    match value {
        toml::Value::String(s) => Ok(s),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        other => Err(LoadError::XdgValue {
            key: key.to_string(),
            kind: other.type_str().to_string(),
        }),
    }
}

/// Env pairs from the `[env]` table. A missing file or section gives an empty map.
pub fn load_env_map(app_name: &str) -> Result<HashMap<String, String>, LoadError> {
    let path = config_path(app_name)?;
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(&path).map_err(LoadError::XdgRead)?;
    let file: ConfigFile = toml::from_str(&content)?;
    file.env
        .into_iter()
        .map(|(k, v)| scalar_to_string(&k, v).map(|s| (k, s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_env::{with_xdg_home, write_config};

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let map = with_xdg_home(dir.path(), || load_env_map("coach-missing")).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn scalars_become_strings() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "coach",
            "[env]\nCOACH_MODEL = \"gpt-4o\"\nCOACH_CHUNK_SIZE = 512\nCOACH_TEMPERATURE = 0.5\nFLAG = true\n",
        );
        let map = with_xdg_home(dir.path(), || load_env_map("coach")).unwrap();
        assert_eq!(map.get("COACH_MODEL").map(String::as_str), Some("gpt-4o"));
        assert_eq!(map.get("COACH_CHUNK_SIZE").map(String::as_str), Some("512"));
        assert_eq!(map.get("COACH_TEMPERATURE").map(String::as_str), Some("0.5"));
        assert_eq!(map.get("FLAG").map(String::as_str), Some("true"));
    }

    #[test]
    fn other_sections_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "coach", "[server]\nport = 1\n");
        let map = with_xdg_home(dir.path(), || load_env_map("coach")).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn array_value_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "coach", "[env]\nLIST = [1, 2]\n");
        let err = with_xdg_home(dir.path(), || load_env_map("coach")).unwrap_err();
        assert!(matches!(err, LoadError::XdgValue { ref key, .. } if key == "LIST"));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "coach", "[env\nbroken");
        let err = with_xdg_home(dir.path(), || load_env_map("coach")).unwrap_err();
        assert!(matches!(err, LoadError::XdgParse(_)));
    }
}
