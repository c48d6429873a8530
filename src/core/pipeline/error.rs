use thiserror::Error;

use crate::core::remote::RemoteCallError;
use crate::core::video::SamplingError;

/// 终止本次运行的错误
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("未设置视频源")]
    NoSource,
    #[error("抽帧失败: {0}")]
    Sampling(#[from] SamplingError),
    #[error("{0}")]
    Remote(#[from] RemoteCallError),
}
