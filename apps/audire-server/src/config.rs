//! Configuration management for the Audire server

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::findings::FailurePolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub processing: ProcessingConfig,
    pub export: ExportConfig,
    pub prompts: PromptsConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub temp_dir: PathBuf,
    pub session_ttl_secs: u64,
    pub reap_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    pub extraction_timeout_secs: u64,
    pub refine_latency_ms: u64,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub export_dir: PathBuf,
    pub public_base_url: String,
    pub soffice_path: PathBuf,
    pub conversion_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptsConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub origins: Vec<String>,
}

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:5173,http://localhost:5174,http://127.0.0.1:5173,http://127.0.0.1:5174";

const HOMEBREW_SOFFICE: &str = "/opt/homebrew/bin/soffice";

fn default_soffice() -> PathBuf {
    if Path::new(HOMEBREW_SOFFICE).exists() {
        PathBuf::from(HOMEBREW_SOFFICE)
    } else {
        PathBuf::from("soffice")
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read and parse a variable, warning and using `default` when it does not parse
fn parsed<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value {:?} for {}, using default", raw, key);
            default
        }),
        Err(_) => default,
    }
}

fn string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                max_upload_bytes: 50 * 1024 * 1024,
            },
            storage: StorageConfig {
                temp_dir: PathBuf::from("./temp"),
                session_ttl_secs: 86_400,
                reap_interval_secs: 600,
            },
            processing: ProcessingConfig {
                extraction_timeout_secs: 120,
                refine_latency_ms: 2_000,
                failure_policy: FailurePolicy::Abort,
            },
            export: ExportConfig {
                export_dir: PathBuf::from("./exports"),
                public_base_url: "http://localhost:8000".to_string(),
                soffice_path: default_soffice(),
                conversion_timeout_secs: 30,
            },
            prompts: PromptsConfig {
                dir: PathBuf::from("./prompts"),
            },
            cors: CorsConfig {
                origins: split_origins(DEFAULT_CORS_ORIGINS),
            },
        }
    }
}

impl Config {
    /// Load from the environment; unset or unparsable values keep their defaults
    pub fn from_env() -> Self {
        let d = Config::default();
        Config {
            server: ServerConfig {
                host: string("SERVER_HOST", &d.server.host),
                port: parsed("SERVER_PORT", d.server.port),
                max_upload_bytes: parsed("MAX_UPLOAD_BYTES", d.server.max_upload_bytes),
            },
            storage: StorageConfig {
                temp_dir: env::var("TEMP_DIR").map(PathBuf::from).unwrap_or(d.storage.temp_dir),
                session_ttl_secs: parsed("SESSION_TTL_SECS", d.storage.session_ttl_secs),
                reap_interval_secs: parsed("REAP_INTERVAL_SECS", d.storage.reap_interval_secs),
            },
            processing: ProcessingConfig {
                extraction_timeout_secs: parsed(
                    "EXTRACTION_TIMEOUT_SECS",
                    d.processing.extraction_timeout_secs,
                ),
                refine_latency_ms: parsed("REFINE_LATENCY_MS", d.processing.refine_latency_ms),
                failure_policy: parsed("REFINE_FAILURE_POLICY", d.processing.failure_policy),
            },
            export: ExportConfig {
                export_dir: env::var("EXPORT_DIR").map(PathBuf::from).unwrap_or(d.export.export_dir),
                public_base_url: string("PUBLIC_BASE_URL", &d.export.public_base_url),
                soffice_path: env::var("SOFFICE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(d.export.soffice_path),
                conversion_timeout_secs: parsed(
                    "CONVERSION_TIMEOUT_SECS",
                    d.export.conversion_timeout_secs,
                ),
            },
            prompts: PromptsConfig {
                dir: env::var("PROMPTS_DIR").map(PathBuf::from).unwrap_or(d.prompts.dir),
            },
            cors: CorsConfig {
                origins: env::var("CORS_ORIGINS")
                    .map(|raw| split_origins(&raw))
                    .unwrap_or(d.cors.origins),
            },
        }
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.processing.extraction_timeout_secs)
    }

    pub fn refine_latency(&self) -> Duration {
        Duration::from_millis(self.processing.refine_latency_ms)
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.export.conversion_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.storage.session_ttl_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.storage.reap_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.max_upload_bytes, 52_428_800);
        assert_eq!(config.processing.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.conversion_timeout(), Duration::from_secs(30));
        assert_eq!(config.cors.origins.len(), 4);
    }

    #[test]
    fn test_split_origins() {
        assert_eq!(
            split_origins(" http://a:1 ,,http://b:2"),
            vec!["http://a:1".to_string(), "http://b:2".to_string()]
        );
    }
}
