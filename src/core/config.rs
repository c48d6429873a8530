//! 运行配置：TOML 文件 + 环境变量覆盖

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::core::pipeline::{PromptSet, SegmentPlan};
use crate::core::remote::transport::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_OPERATION};
use crate::core::remote::{GeminiEndpoint, RetryPolicy};
use crate::core::video::sampler::{DEFAULT_JPEG_QUALITY, DEFAULT_SCALE};
use crate::core::video::FfmpegTools;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("读取配置文件失败 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("配置解析失败: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("配置无效: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub sampling: SamplingConfig,
    pub ffmpeg: FfmpegTools,
    pub prompts: PromptSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub model: String,
    pub operation: String,
    pub api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            operation: DEFAULT_OPERATION.to_string(),
            api_key: String::new(),
        }
    }
}

impl ApiConfig {
    pub fn endpoint(&self) -> GeminiEndpoint {
        GeminiEndpoint {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            operation: self.operation.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.multiplier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub frame_count: usize,
    pub segment_count: usize,
    /// 相对原始分辨率的缩放比例
    pub scale: f32,
    /// JPEG 质量，0-1
    pub jpeg_quality: f32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        let plan = SegmentPlan::default();
        Self {
            frame_count: plan.frame_count,
            segment_count: plan.segment_count,
            scale: DEFAULT_SCALE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl SamplingConfig {
    pub fn plan(&self) -> SegmentPlan {
        SegmentPlan {
            frame_count: self.frame_count,
            segment_count: self.segment_count,
        }
    }
}

impl SummarizerConfig {
    /// 读取可选的配置文件，再叠加 `.env` 与环境变量
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if dotenvy::dotenv().is_ok() {
            debug!("Loaded .env");
        }
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("📖 Reading config: {}", path.display());
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// `HLVS_API_KEY`（或 `GEMINI_API_KEY`）、`HLVS_MODEL`、`HLVS_BASE_URL`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("HLVS_API_KEY").or_else(|| non_empty("GEMINI_API_KEY")) {
            self.api.api_key = key;
        }
        if let Some(model) = non_empty("HLVS_MODEL") {
            self.api.model = model;
        }
        if let Some(url) = non_empty("HLVS_BASE_URL") {
            self.api.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.sampling;
        if s.frame_count == 0 {
            return Err(ConfigError::Invalid("sampling.frame_count 必须大于 0".into()));
        }
        if s.segment_count == 0 || s.segment_count > s.frame_count {
            return Err(ConfigError::Invalid(format!(
                "sampling.segment_count 必须在 1 到 {} 之间",
                s.frame_count
            )));
        }
        if !(s.scale > 0.0 && s.scale <= 1.0) {
            return Err(ConfigError::Invalid("sampling.scale 必须在 (0, 1] 范围内".into()));
        }
        if !(s.jpeg_quality > 0.0 && s.jpeg_quality <= 1.0) {
            return Err(ConfigError::Invalid(
                "sampling.jpeg_quality 必须在 (0, 1] 范围内".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts 必须大于 0".into()));
        }
        let multiplier = self.retry.multiplier;
        if !(multiplier.is_finite() && multiplier >= 1.0) {
            return Err(ConfigError::Invalid(
                "retry.multiplier 必须是不小于 1 的有限数".into(),
            ));
        }
        Ok(())
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        if self.api.api_key.trim().is_empty() {
            Err(ConfigError::Invalid(
                "缺少 API key（设置 api.api_key 或 HLVS_API_KEY）".into(),
            ))
        } else {
            Ok(&self.api.api_key)
        }
    }
}
