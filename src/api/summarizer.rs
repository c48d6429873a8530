//! 层次化视频摘要

use crate::core::config::{ConfigError, SummarizerConfig};
use crate::core::pipeline::{Orchestrator, PipelineSnapshot, RunStatus};
use crate::core::remote::GeminiTransport;
use crate::core::video::{FfmpegSource, SamplingError};
use flutter_rust_bridge::frb;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::{watch, Mutex, MutexGuard};

/// 摘要 API 错误类型，FRB 友好的设计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerApiError {
    pub error_type: String,
    pub message: String,
}

impl SummarizerApiError {
    fn busy() -> Self {
        Self {
            error_type: "Busy".to_string(),
            message: "摘要正在进行中，无法更换视频".to_string(),
        }
    }
}

impl From<ConfigError> for SummarizerApiError {
    fn from(e: ConfigError) -> Self {
        Self {
            error_type: "Config".to_string(),
            message: e.to_string(),
        }
    }
}

impl From<SamplingError> for SummarizerApiError {
    fn from(e: SamplingError) -> Self {
        Self {
            error_type: "VideoSource".to_string(),
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for SummarizerApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)
    }
}

impl std::error::Error for SummarizerApiError {}

/// 视频摘要器 - 抽帧 + 三阶段推理
///
/// ```dart
/// final summarizer = VideoSummarizer.create(configPath: null);
/// await summarizer.setVideoSource(path: videoPath);
/// final status = await summarizer.start();
/// final snapshot = summarizer.snapshot();
/// ```
#[frb(opaque)]
pub struct VideoSummarizer {
    config: SummarizerConfig,
    orchestrator: Mutex<Orchestrator<GeminiTransport>>,
    updates: watch::Receiver<PipelineSnapshot>,
}

impl VideoSummarizer {
    /// 读取配置并创建摘要器，缺少 API key 时报错
    #[frb(sync)]
    pub fn create(config_path: Option<String>) -> Result<Self, SummarizerApiError> {
        let config = SummarizerConfig::load(config_path.as_deref().map(Path::new))?;
        config.require_api_key()?;

        let transport = GeminiTransport::new(config.api.endpoint());
        let orchestrator = Orchestrator::from_config(transport, &config);
        let updates = orchestrator.subscribe();
        info!("🎬 VideoSummarizer: created (model {})", config.api.model);

        Ok(Self {
            config,
            orchestrator: Mutex::new(orchestrator),
            updates,
        })
    }

    /// 设置视频文件，清空上一轮结果；`start()` 正在执行时拒绝
    pub async fn set_video_source(&self, path: String) -> Result<(), SummarizerApiError> {
        let mut orchestrator = self.lock_idle()?;
        let source = FfmpegSource::open(&path, self.config.ffmpeg.clone()).await?;
        orchestrator.set_video_source(Box::new(source));
        Ok(())
    }

    /// 锁被 `start()` 持有即为正在运行。被中途丢弃的运行不持有锁，
    /// 其残留的 Processing 状态由新视频源重置。
    fn lock_idle(
        &self,
    ) -> Result<MutexGuard<'_, Orchestrator<GeminiTransport>>, SummarizerApiError> {
        self.orchestrator
            .try_lock()
            .map_err(|_| SummarizerApiError::busy())
    }

    /// 运行一轮摘要并返回最终状态；已在运行时直接返回 Processing
    pub async fn start(&self) -> RunStatus {
        match self.orchestrator.try_lock() {
            Ok(mut orchestrator) => orchestrator.start().await,
            Err(_) => RunStatus::Processing,
        }
    }

    /// 当前状态快照
    #[frb(sync)]
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.updates.borrow().clone()
    }
}

impl Drop for VideoSummarizer {
    fn drop(&mut self) {
        info!("🗑️ VideoSummarizer: released");
    }
}
