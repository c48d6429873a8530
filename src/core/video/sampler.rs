//! 均匀时间采样：把 `[0, duration)` 等分为 `count` 段，每段起点取一帧

use log::{debug, info};
use rayon::prelude::*;

use super::error::SamplingError;
use super::frame::{DecodedFrame, Frame, JPEG_MIME};
use super::source::VideoSource;

pub const DEFAULT_SCALE: f32 = 0.5;
pub const DEFAULT_JPEG_QUALITY: f32 = 0.6;

pub struct FrameSampler {
    scale: f32,
    jpeg_quality: u8,
}

impl FrameSampler {
    pub fn new() -> Self {
        Self::with_config(DEFAULT_SCALE, DEFAULT_JPEG_QUALITY)
    }

    /// `scale` 为相对原始分辨率的缩放比例，`jpeg_quality` 取值 0-1
    pub fn with_config(scale: f32, jpeg_quality: f32) -> Self {
        Self {
            scale,
            jpeg_quality: (jpeg_quality * 100.0).round().clamp(1.0, 100.0) as u8,
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// 第 i 帧的时间戳为 `(duration / count) * i`
    pub fn timestamps(duration: f64, count: usize) -> Vec<f64> {
        let step = duration / count as f64;
        (0..count).map(|i| step * i as f64).collect()
    }

    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        let w = ((width as f32 * self.scale) as u32).max(1);
        let h = ((height as f32 * self.scale) as u32).max(1);
        (w, h)
    }

    pub async fn sample(
        &self,
        source: &dyn VideoSource,
        count: usize,
    ) -> Result<Vec<Frame>, SamplingError> {
        if count == 0 {
            return Err(SamplingError::InvalidCount(count));
        }
        let duration = source
            .duration()
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or(SamplingError::NoDuration)?;

        let (native_w, native_h) = source.dimensions();
        let (target_w, target_h) = self.target_size(native_w, native_h);
        info!(
            "🎞️ Sampling {} frames over {:.2}s ({}x{} -> {}x{})",
            count, duration, native_w, native_h, target_w, target_h
        );

        // 逐帧 seek，前一帧解码完成后才发起下一次
        let mut decoded = Vec::with_capacity(count);
        for timestamp in Self::timestamps(duration, count) {
            let frame = source.capture_at(timestamp).await?;
            debug!("✓ Captured frame at {:.3}s", timestamp);
            decoded.push(frame);
        }

        let quality = self.jpeg_quality;
        let frames = tokio::task::spawn_blocking(move || {
            encode_all(decoded, target_w, target_h, quality)
        })
        .await
        .map_err(|e| SamplingError::Worker(e.to_string()))??;

        let total_bytes: usize = frames.iter().map(|f| f.data.len()).sum();
        info!("✅ Sampled {} frames, {} bytes compressed", frames.len(), total_bytes);
        Ok(frames)
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_all(
    decoded: Vec<DecodedFrame>,
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<Frame>, SamplingError> {
    decoded
        .into_par_iter()
        .enumerate()
        .map(|(index, frame)| {
            let scaled = frame.resize_to(width, height)?;
            let data = scaled.encode_jpeg(quality)?;
            Ok(Frame {
                index,
                timestamp_ms: frame.timestamp.as_millis() as u64,
                width,
                height,
                data,
                mime_type: JPEG_MIME,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::video::source::SyntheticVideoSource;

    #[tokio::test]
    async fn test_sample_yields_exact_count_in_order() {
        let source = SyntheticVideoSource::new(30.0, 64, 48);
        let sampler = FrameSampler::new();

        let frames = sampler.sample(&source, 12).await.unwrap();

        assert_eq!(frames.len(), 12);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index, i);
            assert_eq!(frame.timestamp_ms, 2500 * i as u64);
            assert_eq!(frame.mime_type, "image/jpeg");
            assert_eq!((frame.width, frame.height), (32, 24));
            assert_eq!(&frame.data[..2], &[0xFF, 0xD8]);
        }
        assert!(frames.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
    }

    #[tokio::test]
    async fn test_seeks_are_evenly_spaced() {
        let source = SyntheticVideoSource::new(10.0, 16, 16);
        FrameSampler::new().sample(&source, 4).await.unwrap();

        assert_eq!(source.seeks(), vec![0.0, 2.5, 5.0, 7.5]);
    }

    #[tokio::test]
    async fn test_single_frame_starts_at_zero() {
        let source = SyntheticVideoSource::new(7.0, 16, 16);
        let frames = FrameSampler::new().sample(&source, 1).await.unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(source.seeks(), vec![0.0]);
    }

    #[tokio::test]
    async fn test_zero_count_rejected() {
        let source = SyntheticVideoSource::new(30.0, 16, 16);
        let result = FrameSampler::new().sample(&source, 0).await;

        assert!(matches!(result, Err(SamplingError::InvalidCount(0))));
        assert!(source.seeks().is_empty());
    }

    #[tokio::test]
    async fn test_missing_duration_rejected() {
        let source = SyntheticVideoSource::without_duration(16, 16);
        let result = FrameSampler::new().sample(&source, 12).await;

        assert!(matches!(result, Err(SamplingError::NoDuration)));
    }

    #[tokio::test]
    async fn test_zero_duration_rejected() {
        let source = SyntheticVideoSource::new(0.0, 16, 16);
        let result = FrameSampler::new().sample(&source, 3).await;

        assert!(matches!(result, Err(SamplingError::NoDuration)));
    }

    #[test]
    fn test_target_size_never_zero() {
        let sampler = FrameSampler::new();
        assert_eq!(sampler.target_size(1920, 1080), (960, 540));
        assert_eq!(sampler.target_size(1, 1), (1, 1));
    }

    #[test]
    fn test_quality_mapping() {
        assert_eq!(FrameSampler::new().jpeg_quality(), 60);
        assert_eq!(FrameSampler::with_config(0.5, 0.0).jpeg_quality(), 1);
        assert_eq!(FrameSampler::with_config(0.5, 1.0).jpeg_quality(), 100);
    }
}
