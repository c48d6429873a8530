//! 视频源抽象：时长、分辨率、按时间戳精确取帧

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::Command;

use super::error::SamplingError;
use super::frame::DecodedFrame;

/// 可解码的视频源。`capture_at` 是一次 seek + 等待解码完成，调用方一次只发起一个。
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// 时长（秒），未知时为 `None`
    fn duration(&self) -> Option<f64>;

    /// 原始分辨率 (width, height)
    fn dimensions(&self) -> (u32, u32);

    async fn capture_at(&self, timestamp: f64) -> Result<DecodedFrame, SamplingError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegTools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

/// 基于 ffmpeg/ffprobe 子进程的本地文件视频源
#[derive(Debug)]
pub struct FfmpegSource {
    path: PathBuf,
    tools: FfmpegTools,
    duration: Option<f64>,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl FfmpegSource {
    pub async fn open(path: impl AsRef<Path>, tools: FfmpegTools) -> Result<Self, SamplingError> {
        let path = path.as_ref().to_path_buf();
        info!("🎬 Probing video: {}", path.display());

        let output = Command::new(&tools.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height:format=duration",
                "-of",
                "json",
            ])
            .arg(&path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(SamplingError::Probe(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| SamplingError::Probe(format!("无法解析 ffprobe 输出: {}", e)))?;
        let (width, height) = probe
            .streams
            .first()
            .and_then(|s| Some((s.width?, s.height?)))
            .ok_or_else(|| SamplingError::Probe("没有视频流".to_string()))?;
        let duration = probe
            .format
            .and_then(|f| f.duration)
            .and_then(|d| parse_duration(&d));

        info!(
            "📊 Video: {}x{}, duration {:?}s",
            width, height, duration
        );

        Ok(Self {
            path,
            tools,
            duration,
            width,
            height,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_duration(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}

#[async_trait]
impl VideoSource for FfmpegSource {
    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    async fn capture_at(&self, timestamp: f64) -> Result<DecodedFrame, SamplingError> {
        debug!("⏩ Seeking to {:.3}s", timestamp);

        // 子进程只存活于本次取帧，drop 时强制回收
        let seek = format!("{:.3}", timestamp);
        let output = Command::new(&self.tools.ffmpeg)
            .args(["-v", "error", "-noautorotate", "-ss", seek.as_str(), "-i"])
            .arg(&self.path)
            .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(SamplingError::Decode {
                timestamp,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let expected = (self.width as usize) * (self.height as usize) * 4;
        if output.stdout.len() != expected {
            return Err(SamplingError::BadFrame {
                expected,
                actual: output.stdout.len(),
            });
        }

        Ok(DecodedFrame::new(
            self.width,
            self.height,
            output.stdout,
            Duration::from_secs_f64(timestamp),
        ))
    }
}

/// 内存中的确定性视频源：每帧为纯色，亮度随时间戳线性变化，并记录每次 seek
pub struct SyntheticVideoSource {
    duration: Option<f64>,
    width: u32,
    height: u32,
    seeks: Mutex<Vec<f64>>,
}

impl SyntheticVideoSource {
    pub fn new(duration: f64, width: u32, height: u32) -> Self {
        Self {
            duration: Some(duration),
            width,
            height,
            seeks: Mutex::new(Vec::new()),
        }
    }

    /// 没有可用时长的源（例如损坏的容器）
    pub fn without_duration(width: u32, height: u32) -> Self {
        Self {
            duration: None,
            width,
            height,
            seeks: Mutex::new(Vec::new()),
        }
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.seeks.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl VideoSource for SyntheticVideoSource {
    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    async fn capture_at(&self, timestamp: f64) -> Result<DecodedFrame, SamplingError> {
        if let Ok(mut seeks) = self.seeks.lock() {
            seeks.push(timestamp);
        }
        tokio::task::yield_now().await;

        let duration = self.duration.unwrap_or(1.0).max(f64::EPSILON);
        let level = ((timestamp / duration).clamp(0.0, 1.0) * 255.0) as u8;
        let mut data = Vec::with_capacity((self.width * self.height * 4) as usize);
        for _ in 0..(self.width * self.height) {
            data.extend_from_slice(&[level, 255 - level, 128, 255]);
        }

        Ok(DecodedFrame::new(
            self.width,
            self.height,
            data,
            Duration::from_secs_f64(timestamp),
        ))
    }
}
