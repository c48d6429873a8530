use thiserror::Error;

/// 单次请求失败（网络错误、非 2xx、响应体无法解析），重试时一视同仁
#[derive(Debug, Error)]
pub enum RemoteTransportError {
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API 返回错误状态: {status}")]
    Status { status: u16, body: String },
    #[error("响应解析失败: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RemoteCallError {
    #[error("远程调用在 {attempts} 次尝试后失败: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: RemoteTransportError,
    },
}

impl RemoteTransportError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RemoteTransportError::Status { status, .. } => Some(*status),
            RemoteTransportError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
