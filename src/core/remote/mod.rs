pub mod error;
pub mod payload;
pub mod retry;
pub mod transport;

pub use error::{RemoteCallError, RemoteTransportError};
pub use payload::{extract_text, GenerateRequest, Part};
pub use retry::{ResilientCaller, RetryPolicy};
pub use transport::{
    text_response, GeminiEndpoint, GeminiTransport, InferenceTransport, MockTransport,
};
