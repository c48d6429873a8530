use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("无效的帧数: {0}")]
    InvalidCount(usize),
    #[error("视频没有可用的时长")]
    NoDuration,
    #[error("视频探测失败: {0}")]
    Probe(String),
    #[error("解码失败 ({timestamp:.3}s): {reason}")]
    Decode { timestamp: f64, reason: String },
    #[error("帧数据大小不符: 期望 {expected} 字节, 实际 {actual}")]
    BadFrame { expected: usize, actual: usize },
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("图像编码失败: {0}")]
    Image(#[from] image::ImageError),
    #[error("编码线程失败: {0}")]
    Worker(String),
}
