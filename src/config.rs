//! Configuration management for the OCR Pipeline server

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::ocr::DEFAULT_LANGUAGE;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub ocr: OcrConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct PathsConfig {
    /// Uploaded PDFs waiting for OCR
    pub upload_dir: PathBuf,
    /// Finished `*_ocr.pdf` files
    pub output_dir: PathBuf,
    /// Web front-end
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub ocrmypdf_bin: PathBuf,
    pub language: String,
    /// Engine worker count per job
    pub jobs: usize,
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub max_upload_bytes: u64,
}

impl LimitsConfig {
    /// Upload limit in whole megabytes, for messages
    pub fn max_upload_mb(&self) -> u64 {
        self.max_upload_bytes / MIB
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            paths: PathsConfig {
                upload_dir: PathBuf::from("uploads"),
                output_dir: PathBuf::from("output"),
                static_dir: PathBuf::from("static"),
            },
            ocr: OcrConfig {
                ocrmypdf_bin: PathBuf::from("ocrmypdf"),
                language: DEFAULT_LANGUAGE.to_string(),
                jobs: 1,
            },
            limits: LimitsConfig {
                max_upload_bytes: 200 * MIB,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", env::var("SERVER_PORT").ok(), defaults.server.port)?,
            },
            paths: PathsConfig {
                upload_dir: path_var("UPLOAD_DIR", defaults.paths.upload_dir),
                output_dir: path_var("OUTPUT_DIR", defaults.paths.output_dir),
                static_dir: path_var("STATIC_DIR", defaults.paths.static_dir),
            },
            ocr: OcrConfig {
                ocrmypdf_bin: path_var("OCRMYPDF_BIN", defaults.ocr.ocrmypdf_bin),
                language: env::var("OCR_LANGUAGE").unwrap_or(defaults.ocr.language),
                jobs: parse_var("OCR_JOBS", env::var("OCR_JOBS").ok(), defaults.ocr.jobs)?,
            },
            limits: LimitsConfig {
                max_upload_bytes: upload_limit_bytes(
                    env::var("MAX_UPLOAD_MB").ok(),
                    defaults.limits.max_upload_bytes,
                )?,
            },
        })
    }

    /// Address the server binds to
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = IpAddr::from_str(&self.server.host).map_err(|_| ConfigError::Invalid {
            key: "SERVER_HOST",
            value: self.server.host.clone(),
        })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Create the upload and output directories
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.paths.upload_dir)?;
        std::fs::create_dir_all(&self.paths.output_dir)?;
        Ok(())
    }
}

fn path_var(key: &str, default: PathBuf) -> PathBuf {
    env::var_os(key).map(PathBuf::from).unwrap_or(default)
}

fn parse_var<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// `MAX_UPLOAD_MB` in bytes; values that overflow are invalid
fn upload_limit_bytes(raw: Option<String>, default_bytes: u64) -> Result<u64, ConfigError> {
    let megabytes = parse_var::<u64>("MAX_UPLOAD_MB", raw.clone(), default_bytes / MIB)?;
    megabytes.checked_mul(MIB).ok_or_else(|| ConfigError::Invalid {
        key: "MAX_UPLOAD_MB",
        value: raw.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.ocr.language, "deu+eng");
        assert_eq!(config.limits.max_upload_mb(), 200);
        assert_eq!(config.paths.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn test_parse_var() {
        assert_eq!(parse_var("SERVER_PORT", None, 8000u16).unwrap(), 8000);
        assert_eq!(parse_var("SERVER_PORT", Some(" 9000 ".to_string()), 8000u16).unwrap(), 9000);
        assert_eq!(parse_var("SERVER_PORT", Some(String::new()), 8000u16).unwrap(), 8000);
        assert!(matches!(
            parse_var("SERVER_PORT", Some("http".to_string()), 8000u16),
            Err(ConfigError::Invalid { key: "SERVER_PORT", .. })
        ));
    }

    #[test]
    fn test_upload_limit_bytes() {
        assert_eq!(upload_limit_bytes(None, 200 * MIB).unwrap(), 200 * MIB);
        assert_eq!(upload_limit_bytes(Some("50".to_string()), 200 * MIB).unwrap(), 50 * MIB);

        let huge = u64::MAX.to_string();
        match upload_limit_bytes(Some(huge.clone()), 200 * MIB) {
            Err(ConfigError::Invalid { key, value }) => {
                assert_eq!(key, "MAX_UPLOAD_MB");
                assert_eq!(value, huge);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_socket_addr() {
        let mut config = Config::default();
        assert_eq!(config.socket_addr().unwrap().port(), 8000);

        config.server.host = "localhost:80".to_string();
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_ensure_dirs() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.upload_dir = temp_dir.path().join("uploads");
        config.paths.output_dir = temp_dir.path().join("nested/output");

        config.ensure_dirs().unwrap();
        assert!(config.paths.upload_dir.is_dir());
        assert!(config.paths.output_dir.is_dir());
    }
}
