pub mod error;
pub mod frame;
pub mod sampler;
pub mod source;

pub use error::SamplingError;
pub use frame::{DecodedFrame, Frame, JPEG_MIME};
pub use sampler::FrameSampler;
pub use source::{FfmpegSource, FfmpegTools, SyntheticVideoSource, VideoSource};
