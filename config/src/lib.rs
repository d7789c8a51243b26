//! Load configuration from XDG `config.toml` and project `.env`, then apply to the process
//! environment with priority: **existing env > .env > XDG**.
//!
//! Typed settings are read from the environment afterwards by the application
//! (see `coach::CoachConfig::from_env`).

mod dotenv;
mod xdg_toml;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use dotenv::parse as parse_dotenv;
pub use xdg_toml::config_path;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("xdg config [env].{key} must be a string, number or boolean, found {kind}")]
    XdgValue { key: String, kind: String },
    #[error("read .env: {0}")]
    DotenvRead(std::io::Error),
}

/// Where each newly set key came from. Keys already in the environment are not listed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Applied {
    pub from_dotenv: Vec<String>,
    pub from_xdg: Vec<String>,
}

impl Applied {
    pub fn is_empty(&self) -> bool {
        self.from_dotenv.is_empty() && self.from_xdg.is_empty()
    }
}

/// Sets env vars from `.env` and `<config dir>/<app_name>/config.toml` for keys that are
/// not already set.
///
/// * `app_name`: e.g. `"coach"`, giving `~/.config/coach/config.toml`.
/// * `dotenv_dir`: directory holding `.env`; the current directory when `None`.
pub fn load_and_apply(app_name: &str, dotenv_dir: Option<&Path>) -> Result<Applied, LoadError> {
    let xdg = xdg_toml::load_env_map(app_name)?;
    let dotenv = dotenv::load_env_map(dotenv_dir).map_err(LoadError::DotenvRead)?;
    Ok(apply(dotenv, xdg))
}

fn apply(dotenv: HashMap<String, String>, mut xdg: HashMap<String, String>) -> Applied {
    let mut applied = Applied::default();

    let mut dotenv: Vec<_> = dotenv.into_iter().collect();
    dotenv.sort();
    for (key, value) in dotenv {
        xdg.remove(&key);
        if std::env::var_os(&key).is_none() {
            std::env::set_var(&key, value);
            applied.from_dotenv.push(key);
        }
    }

    let mut xdg: Vec<_> = xdg.into_iter().collect();
    xdg.sort();
    for (key, value) in xdg {
        if std::env::var_os(&key).is_none() {
            std::env::set_var(&key, value);
            applied.from_xdg.push(key);
        }
    }
    applied
}

/// Files consulted by [`load_and_apply`], XDG config first, for diagnostics.
pub fn describe_sources(app_name: &str, dotenv_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Ok(p) = config_path(app_name) {
        out.push(p);
    }
    let dir = dotenv_dir
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok());
    if let Some(d) = dir {
        out.push(d.join(".env"));
    }
    out
}
