//! Configuration management for the AeroPdf server

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::{EditConfig, StandardFont};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, empty means any
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub pdf_dir: PathBuf,
    pub render_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub render_zoom: f32,
    /// Bound on reads; writes always run to completion
    pub operation_timeout: Duration,
    pub edit: EditConfig,
}

impl Default for Config {
    fn default() -> Self {
        let storage = PathBuf::from("storage");
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                cors_origins: Vec::new(),
                max_upload_bytes: 100 * 1024 * 1024,
            },
            storage: StorageConfig {
                pdf_dir: storage.join("pdfs"),
                render_dir: storage.join("renders"),
            },
            database: DatabaseConfig {
                url: "sqlite:./aeropdf.db".to_string(),
            },
            engine: EngineConfig {
                render_zoom: 2.0,
                operation_timeout: Duration::from_secs(30),
                edit: EditConfig::default(),
            },
        }
    }
}

/// Parse an env var, falling back to `default` when unset or malformed.
fn parsed<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

/// Comma separated origins; `*` or an empty value allows any origin.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty() && *o != "*")
        .map(String::from)
        .collect()
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        let edit = defaults.engine.edit;

        let storage_dir = env::var("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("storage"));

        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parsed("SERVER_PORT", defaults.server.port),
                cors_origins: env::var("CORS_ORIGINS")
                    .map(|raw| parse_origins(&raw))
                    .unwrap_or_default(),
                max_upload_bytes: parsed("MAX_UPLOAD_BYTES", defaults.server.max_upload_bytes),
            },
            storage: StorageConfig {
                pdf_dir: env::var("PDF_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| storage_dir.join("pdfs")),
                render_dir: env::var("RENDER_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| storage_dir.join("renders")),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            engine: EngineConfig {
                render_zoom: parsed("RENDER_ZOOM", defaults.engine.render_zoom),
                operation_timeout: Duration::from_secs(parsed(
                    "OPERATION_TIMEOUT_SECS",
                    defaults.engine.operation_timeout.as_secs(),
                )),
                edit: EditConfig {
                    font: parsed::<StandardFont>("EDIT_FONT", edit.font),
                    font_size: parsed("EDIT_FONT_SIZE", edit.font_size),
                    block_padding: parsed("EDIT_BLOCK_PADDING", edit.block_padding),
                    word_padding: parsed("EDIT_WORD_PADDING", edit.word_padding),
                    line_spacing: parsed("EDIT_LINE_SPACING", edit.line_spacing),
                },
            },
        }
    }

    /// Same as the defaults, with storage rooted at `root` and the database in memory.
    pub fn for_storage_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut config = Config::default();
        config.storage = StorageConfig {
            pdf_dir: root.join("pdfs"),
            render_dir: root.join("renders"),
        };
        config.database.url = "sqlite::memory:".to_string();
        config
    }
}
