use fileserve_av::{EncodeSettings, ToolPaths};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::delivery::DeliveryMode;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub encoding: EncodingConfig,

    #[serde(default)]
    pub tools: ToolPaths,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// `development` drops the `Secure` flag from auth cookies.
    #[serde(default)]
    pub environment: Environment,

    /// Optional frontend build served for non-API paths
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
            static_dir: None,
        }
    }
}

/// Where the database and generated artifacts live.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub preview_dir: Option<PathBuf>,

    #[serde(default)]
    pub optimized_dir: Option<PathBuf>,

    #[serde(default)]
    pub stream_dir: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            preview_dir: None,
            optimized_dir: None,
            stream_dir: None,
        }
    }
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("fileserve.db")
    }

    pub fn preview_root(&self) -> PathBuf {
        self.preview_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("previews"))
    }

    pub fn optimized_root(&self) -> PathBuf {
        self.optimized_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("web-optimized"))
    }

    pub fn stream_root(&self) -> PathBuf {
        self.stream_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("streams"))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub mode: DeliveryMode,

    /// Location prefix of the proxy's internal file location, accelerated
    /// mode only.
    #[serde(default = "default_internal_prefix")]
    pub internal_prefix: String,

    /// Directory the proxy's internal location is rooted at. Redirect paths
    /// are relative to it.
    #[serde(default = "default_internal_root")]
    pub internal_root: PathBuf,
}

fn default_internal_prefix() -> String {
    "/files".to_string()
}

fn default_internal_root() -> PathBuf {
    PathBuf::from("/")
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::default(),
            internal_prefix: default_internal_prefix(),
            internal_root: default_internal_root(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncodingConfig {
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    #[serde(default = "default_crf")]
    pub crf: u8,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_hls_segment_seconds")]
    pub hls_segment_seconds: u32,

    /// Encoder timeout in seconds (default: 6 hours)
    #[serde(default = "default_encode_timeout")]
    pub timeout_secs: u64,
}

fn default_max_width() -> u32 {
    1920
}
fn default_crf() -> u8 {
    23
}
fn default_preset() -> String {
    "medium".to_string()
}
fn default_hls_segment_seconds() -> u32 {
    6
}
fn default_encode_timeout() -> u64 {
    6 * 60 * 60
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            crf: default_crf(),
            preset: default_preset(),
            hls_segment_seconds: default_hls_segment_seconds(),
            timeout_secs: default_encode_timeout(),
        }
    }
}

impl EncodingConfig {
    pub fn settings(&self) -> EncodeSettings {
        EncodeSettings {
            max_width: self.max_width,
            crf: self.crf,
            preset: self.preset.clone(),
            hls_segment_seconds: self.hls_segment_seconds,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
