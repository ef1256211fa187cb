use chrono::Local;
use clap::Parser;
use directories::BaseDirs;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::api::client::{ApiClient, RemoteStore};
use crate::book::ContactBook;
use crate::storage::{self, LocalCache};
use crate::ui::shell::Shell;
use crate::utils;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

#[derive(Parser, Debug, Default)]
#[command(name = "contact-book")]
#[command(about = "Contact manager with a local cache and an optional remote mirror", long_about = None)]
pub struct Options {
    /// The configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base address of the remote contact service
    #[arg(short, long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Work from the local cache only
    #[arg(long)]
    pub offline: bool,

    /// Directory holding the local cache
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("local storage unavailable: {0}")]
    Storage(#[from] storage::Error),

    #[error("terminal io failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub remote_enabled: bool,
    pub data_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            remote_enabled: true,
            data_dir: None,
        }
    }
}

impl Settings {
    // TOML is the primary format. A legacy JSON file is still read and rewritten as TOML.
    pub fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        let cfg_dir = base.config_dir();
        Some(cfg_dir.join("contact-book").join("config.toml"))
    }

    fn legacy_json_path() -> Option<PathBuf> {
        let proj = directories::ProjectDirs::from("com", "example", "ContactBook")?;
        Some(proj.config_dir().join("settings.json"))
    }

    /// Loads from `path` (or the default TOML location), then the legacy JSON file, then defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let toml_path = path.map(Path::to_path_buf).or_else(Self::toml_path);
        Self::load_from(toml_path.as_deref(), Self::legacy_json_path().as_deref())
    }

    fn load_from(toml_path: Option<&Path>, legacy: Option<&Path>) -> Self {
        if let Some(path) = toml_path {
            if let Ok(text) = fs::read_to_string(path) {
                match toml::from_str::<Settings>(&text) {
                    Ok(settings) => return settings.normalized(),
                    Err(e) => warn!("ignoring unreadable config {}: {e}", path.display()),
                }
            }
        }

        if let Some(legacy) = legacy {
            if let Ok(bytes) = fs::read(legacy) {
                if let Ok(settings) = serde_json::from_slice::<Settings>(&bytes) {
                    let settings = settings.normalized();
                    if let Some(path) = toml_path {
                        if let Err(e) = settings.save_to(path) {
                            warn!("could not migrate legacy settings: {e}");
                        }
                    }
                    return settings;
                }
            }
        }

        Self::default()
    }

    fn normalized(mut self) -> Self {
        self.base_url = utils::normalize_url(&self.base_url);
        self
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self).map_err(|e| io::Error::other(e.to_string()))?;
        fs::write(path, toml)
    }

    pub fn apply_overrides(&mut self, opts: &Options) {
        if let Some(url) = &opts.base_url {
            self.base_url = utils::normalize_url(url);
        }
        if opts.offline {
            self.remote_enabled = false;
        }
        if let Some(dir) = &opts.data_dir {
            self.data_dir = Some(dir.clone());
        }
    }

    /// The remote service to mirror to, or `None` when disabled or misconfigured.
    pub fn remote_client(&self) -> Option<Arc<dyn RemoteStore>> {
        if !self.remote_enabled {
            info!("remote service disabled, working from local cache only");
            return None;
        }
        match ApiClient::new(&self.base_url) {
            Ok(client) => {
                let remote: Arc<dyn RemoteStore> = Arc::new(client);
                Some(remote)
            }
            Err(e) => {
                warn!("remote service disabled: {e}");
                None
            }
        }
    }
}

pub fn run(opts: &Options) -> Result<(), Error> {
    let config_path = opts.config.clone().or_else(Settings::toml_path);
    let mut settings = Settings::load(config_path.as_deref());
    settings.apply_overrides(opts);

    let cache = LocalCache::open_default(settings.data_dir.as_deref())?;
    info!("local cache at {}", cache.path().display());
    let remote = settings.remote_client();
    let (book, source) = utils::block_on(ContactBook::open(remote, cache));

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut shell = Shell::new(book, settings, config_path, stdin.lock(), stdout.lock());
    shell.greet(source, Local::now().date_naive())?;
    shell.run()?;
    Ok(())
}
