use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use shared::domain::DEFAULT_PAGE_SIZE;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub page_size: u32,
    pub session_file: PathBuf,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".into(),
            page_size: DEFAULT_PAGE_SIZE,
            session_file: PathBuf::from(".customer-session.toml"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    page_size: Option<u32>,
    session_file: Option<PathBuf>,
}

/// Defaults, then `client.toml` (or `config_path`), then environment.
pub fn load_settings(config_path: Option<&Path>) -> ClientSettings {
    load_settings_with(config_path, |key| std::env::var(key).ok())
}

fn load_settings_with(
    config_path: Option<&Path>,
    var: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw, path);
    }

    apply_env(&mut settings, var);
    settings
}

fn apply_file(settings: &mut ClientSettings, raw: &str, path: &Path) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!("config: ignoring unreadable '{}': {err}", path.display());
            return;
        }
    };
    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.page_size.filter(|size| *size > 0) {
        settings.page_size = v;
    }
    if let Some(v) = file_cfg.session_file {
        settings.session_file = v;
    }
}

fn apply_env(settings: &mut ClientSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("CUSTOMER_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = var("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = var("APP__PAGE_SIZE") {
        match v.parse::<u32>() {
            Ok(parsed) if parsed > 0 => settings.page_size = parsed,
            _ => warn!("config: ignoring APP__PAGE_SIZE={v}"),
        }
    }

    if let Some(v) = var("APP__SESSION_FILE") {
        settings.session_file = PathBuf::from(v);
    }
}
