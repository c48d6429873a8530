use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageOutputFormat, RgbImage, RgbaImage};
use std::io::Cursor;
use std::time::Duration;

use super::error::SamplingError;

pub const JPEG_MIME: &str = "image/jpeg";

/// 解码后的原始帧（RGBA）
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA 格式
    pub timestamp: Duration,
}

impl DecodedFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, timestamp: Duration) -> Self {
        Self {
            width,
            height,
            data,
            timestamp,
        }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.pixel_count() * 3);
        for chunk in self.data.chunks_exact(4) {
            rgb.push(chunk[0]); // R
            rgb.push(chunk[1]); // G
            rgb.push(chunk[2]); // B
        }
        rgb
    }

    pub fn resize_to(&self, target_width: u32, target_height: u32) -> Result<DecodedFrame, SamplingError> {
        if target_width == self.width && target_height == self.height {
            return Ok(self.clone());
        }

        let img = RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            SamplingError::BadFrame {
                expected: self.pixel_count() * 4,
                actual: self.data.len(),
            },
        )?;
        let resized = image::imageops::resize(
            &img,
            target_width,
            target_height,
            image::imageops::FilterType::Triangle,
        );

        Ok(DecodedFrame {
            width: target_width,
            height: target_height,
            data: resized.into_raw(),
            timestamp: self.timestamp,
        })
    }

    /// 压缩为 JPEG，`quality` 取值 1-100
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, SamplingError> {
        let img = RgbImage::from_raw(self.width, self.height, self.to_rgb()).ok_or(
            SamplingError::BadFrame {
                expected: self.pixel_count() * 4,
                actual: self.data.len(),
            },
        )?;

        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageOutputFormat::Jpeg(quality))?;
        Ok(buffer.into_inner())
    }
}

/// 采样得到的一帧，已缩放并压缩，可直接随请求发送
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: usize,
    pub timestamp_ms: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub mime_type: &'static str,
}

impl Frame {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let data = vec![255u8; 100 * 100 * 4]; // 100x100 white image
        let frame = DecodedFrame::new(100, 100, data, Duration::from_millis(1000));

        assert_eq!(frame.width, 100);
        assert_eq!(frame.height, 100);
        assert_eq!(frame.pixel_count(), 10000);
        assert_eq!(frame.timestamp.as_millis(), 1000);
    }

    #[test]
    fn test_frame_resize() {
        let data = vec![255u8; 100 * 100 * 4];
        let frame = DecodedFrame::new(100, 100, data, Duration::ZERO);
        let resized = frame.resize_to(50, 50).unwrap();

        assert_eq!(resized.width, 50);
        assert_eq!(resized.height, 50);
        assert_eq!(resized.data.len(), 50 * 50 * 4);
    }

    #[test]
    fn test_resize_rejects_truncated_buffer() {
        let frame = DecodedFrame::new(10, 10, vec![0u8; 12], Duration::ZERO);
        assert!(matches!(
            frame.resize_to(5, 5),
            Err(SamplingError::BadFrame { expected: 400, actual: 12 })
        ));
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg_markers() {
        let frame = DecodedFrame::new(32, 32, vec![90u8; 32 * 32 * 4], Duration::ZERO);
        let jpeg = frame.encode_jpeg(60).unwrap();

        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_base64_payload() {
        let frame = Frame {
            index: 0,
            timestamp_ms: 0,
            width: 1,
            height: 1,
            data: b"abc".to_vec(),
            mime_type: JPEG_MIME,
        };
        assert_eq!(frame.to_base64(), "YWJj");
    }
}
