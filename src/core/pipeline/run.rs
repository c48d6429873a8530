//! 一次摘要运行的全部产物：状态、进度、日志、各阶段结果

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// 阶段一对单个片段的描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionEntry {
    pub segment_index: usize,
    pub text: String,
}

impl CaptionEntry {
    pub fn label(&self) -> String {
        format!("Segment {}", self.segment_index + 1)
    }
}

/// 只读快照，供展示层轮询或订阅
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub status: RunStatus,
    pub progress: u8,
    pub logs: Vec<LogEntry>,
    pub captions: Vec<CaptionEntry>,
    pub logical_chain: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Default)]
pub struct PipelineRun {
    status: RunStatus,
    progress: u8,
    logs: Vec<LogEntry>,
    captions: Vec<CaptionEntry>,
    logical_chain: Option<String>,
    summary: Option<String>,
}

impl PipelineRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn captions(&self) -> &[CaptionEntry] {
        &self.captions
    }

    pub fn logical_chain(&self) -> Option<&str> {
        self.logical_chain.as_deref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// 清空所有派生数据，回到 Idle
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 开始新一轮：清空旧结果，直接进入 Processing
    pub fn begin(&mut self, initial_progress: u8) {
        self.reset();
        self.status = RunStatus::Processing;
        self.progress = initial_progress.min(100);
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.logs.push(LogEntry {
            timestamp: Local::now(),
            message: message.into(),
        });
    }

    /// 进度只增不减
    pub fn advance_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
    }

    pub fn push_caption(&mut self, entry: CaptionEntry) {
        self.captions.push(entry);
    }

    pub fn set_logical_chain(&mut self, chain: Option<String>) {
        self.logical_chain = chain;
    }

    pub fn set_summary(&mut self, summary: Option<String>) {
        self.summary = summary;
    }

    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
    }

    /// 记录错误并进入 Failed；已有结果与进度保持不变
    pub fn fail(&mut self, message: impl fmt::Display) {
        self.log(format!("error: {}", message));
        self.status = RunStatus::Failed;
    }

    /// 按片段顺序拼接的证据块
    pub fn evidence_block(&self) -> String {
        self.captions
            .iter()
            .map(|c| format!("{}: {}", c.label(), c.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            status: self.status,
            progress: self.progress,
            logs: self.logs.clone(),
            captions: self.captions.clone(),
            logical_chain: self.logical_chain.clone(),
            summary: self.summary.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caption(index: usize, text: &str) -> CaptionEntry {
        CaptionEntry {
            segment_index: index,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_begin_clears_previous_results() {
        let mut run = PipelineRun::new();
        run.begin(10);
        run.push_caption(caption(0, "a"));
        run.set_logical_chain(Some("chain".into()));
        run.set_summary(Some("summary".into()));
        run.log("old");
        run.complete();

        run.begin(10);

        assert_eq!(run.status(), RunStatus::Processing);
        assert_eq!(run.progress(), 10);
        assert!(run.captions().is_empty());
        assert!(run.logical_chain().is_none());
        assert!(run.summary().is_none());
        assert!(run.logs().is_empty());
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut run = PipelineRun::new();
        run.begin(10);
        run.advance_progress(50);
        run.advance_progress(30);
        assert_eq!(run.progress(), 50);
        run.advance_progress(250);
        assert_eq!(run.progress(), 100);
    }

    #[test]
    fn test_fail_keeps_partial_results() {
        let mut run = PipelineRun::new();
        run.begin(10);
        run.push_caption(caption(0, "a"));
        run.advance_progress(30);

        run.fail("boom");

        assert_eq!(run.status(), RunStatus::Failed);
        assert_eq!(run.progress(), 30);
        assert_eq!(run.captions().len(), 1);
        assert_eq!(run.logs().last().unwrap().message, "error: boom");
    }

    #[test]
    fn test_evidence_block_in_segment_order() {
        let mut run = PipelineRun::new();
        run.push_caption(caption(0, "a man enters"));
        run.push_caption(caption(1, "he sits down"));
        run.push_caption(caption(2, "he leaves"));

        assert_eq!(
            run.evidence_block(),
            "Segment 1: a man enters\n\nSegment 2: he sits down\n\nSegment 3: he leaves"
        );
    }

    #[test]
    fn test_log_entry_display() {
        let entry = LogEntry {
            timestamp: Local::now(),
            message: "hello".into(),
        };
        let rendered = entry.to_string();
        assert!(rendered.starts_with('['));
        assert!(rendered.ends_with("] hello"));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RunStatus::Idle.is_terminal());
        assert!(!RunStatus::Processing.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
    }
}
