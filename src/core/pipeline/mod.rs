pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod run;
pub mod segment;

pub use error::PipelineError;
pub use orchestrator::{Orchestrator, CAPTION_SENTINEL};
pub use prompts::PromptSet;
pub use run::{CaptionEntry, LogEntry, PipelineRun, PipelineSnapshot, RunStatus};
pub use segment::{partition, Segment, SegmentPlan};
