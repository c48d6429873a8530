//! 三阶段层次化摘要：事件描述 -> 逻辑链 -> 摘要
//!
//! 所有远程调用严格串行：阶段 N 在阶段 N-1 全部完成后才开始，
//! 阶段一内第 i 段在第 i-1 段返回后才发出。运行状态只由本模块修改，
//! 每次修改后通过 watch 通道发布只读快照。

use log::{error, info, warn};
use tokio::sync::watch;

use super::error::PipelineError;
use super::prompts::PromptSet;
use super::run::{CaptionEntry, PipelineRun, PipelineSnapshot, RunStatus};
use super::segment::{partition, SegmentPlan};
use crate::core::config::SummarizerConfig;
use crate::core::remote::{extract_text, GenerateRequest, InferenceTransport, ResilientCaller};
use crate::core::video::{FrameSampler, VideoSource};

/// 阶段一字段缺失或为空字符串时的占位文本
pub const CAPTION_SENTINEL: &str = "[caption extraction failed]";

const START_PROGRESS: u8 = 10;
const CAPTION_PROGRESS_SPAN: u8 = 60;
const CHAIN_PROGRESS: u8 = 80;
const DONE_PROGRESS: u8 = 100;

pub struct Orchestrator<T> {
    caller: ResilientCaller<T>,
    sampler: FrameSampler,
    prompts: PromptSet,
    plan: SegmentPlan,
    source: Option<Box<dyn VideoSource>>,
    run: PipelineRun,
    updates: watch::Sender<PipelineSnapshot>,
}

impl<T: InferenceTransport> Orchestrator<T> {
    pub fn new(caller: ResilientCaller<T>) -> Self {
        let (updates, _) = watch::channel(PipelineSnapshot::default());
        Self {
            caller,
            sampler: FrameSampler::new(),
            prompts: PromptSet::default(),
            plan: SegmentPlan::default(),
            source: None,
            run: PipelineRun::new(),
            updates,
        }
    }

    pub fn from_config(transport: T, config: &SummarizerConfig) -> Self {
        Self::new(ResilientCaller::with_policy(transport, config.retry.policy()))
            .with_sampler(FrameSampler::with_config(
                config.sampling.scale,
                config.sampling.jpeg_quality,
            ))
            .with_prompts(config.prompts.clone())
            .with_plan(config.sampling.plan())
    }

    pub fn with_sampler(mut self, sampler: FrameSampler) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_plan(mut self, plan: SegmentPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn caller(&self) -> &ResilientCaller<T> {
        &self.caller
    }

    pub fn plan(&self) -> SegmentPlan {
        self.plan
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn status(&self) -> RunStatus {
        self.run.status()
    }

    pub fn run(&self) -> &PipelineRun {
        &self.run
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.updates.borrow().clone()
    }

    /// 订阅快照更新，接收端只读
    pub fn subscribe(&self) -> watch::Receiver<PipelineSnapshot> {
        self.updates.subscribe()
    }

    /// 替换视频源，并清空上一轮的全部结果
    pub fn set_video_source(&mut self, source: Box<dyn VideoSource>) {
        info!("🎬 Video source set");
        self.source = Some(source);
        self.run.reset();
        self.publish();
    }

    /// 执行一轮完整流程并返回最终状态。
    /// 没有视频源或已在处理中时不做任何事，直接返回当前状态。
    pub async fn start(&mut self) -> RunStatus {
        if self.source.is_none() {
            warn!("⚠️ start() ignored: no video source");
            return self.run.status();
        }
        if self.run.status() == RunStatus::Processing {
            warn!("⚠️ start() ignored: a run is already in progress");
            return RunStatus::Processing;
        }

        self.run.begin(START_PROGRESS);
        self.run.log("Starting hierarchical summarization");
        self.publish();

        match self.execute().await {
            Ok(()) => {
                self.run.complete();
                self.run.log("Summary generated");
                info!("✅ Summarization completed");
            }
            Err(e) => {
                error!("❌ Summarization failed: {}", e);
                self.run.fail(&e);
            }
        }
        self.publish();
        self.run.status()
    }

    async fn execute(&mut self) -> Result<(), PipelineError> {
        self.caption_segments().await?;
        let chain = self.build_logical_chain().await?;
        self.synthesize(chain.as_deref().unwrap_or_default()).await
    }

    /// 阶段一：逐段生成事件级描述
    async fn caption_segments(&mut self) -> Result<(), PipelineError> {
        let SegmentPlan {
            frame_count,
            segment_count,
        } = self.plan;
        self.run.log(format!(
            "Stage 1: event-level captioning ({} frames, {} segments)",
            frame_count, segment_count
        ));
        self.publish();

        let source = self.source.as_deref().ok_or(PipelineError::NoSource)?;
        let frames = self.sampler.sample(source, frame_count).await?;

        for segment in partition(frames, segment_count) {
            let request = GenerateRequest::with_frames(self.prompts.caption_prompt(), &segment.frames);
            let response = self.caller.call(&request).await?;

            let text = match extract_text(&response).filter(|t| !t.is_empty()) {
                Some(text) => text,
                None => {
                    warn!("⚠️ Segment {} response had no text", segment.index + 1);
                    CAPTION_SENTINEL.to_string()
                }
            };
            self.run.push_caption(CaptionEntry {
                segment_index: segment.index,
                text,
            });
            self.run
                .advance_progress(caption_progress(segment.index, segment_count));
            self.run.log(format!(
                "Segment {}/{} captioned",
                segment.index + 1,
                segment_count
            ));
            self.publish();
        }

        self.run.log("Stage 1 complete: visual fact base established");
        self.publish();
        Ok(())
    }

    /// 阶段二：把所有描述串成逻辑链
    async fn build_logical_chain(&mut self) -> Result<Option<String>, PipelineError> {
        self.run.log("Stage 2: building logical reasoning chain");
        self.publish();

        let prompt = self.prompts.reasoning_prompt(&self.run.evidence_block());
        let response = self.caller.call(&GenerateRequest::text(prompt)).await?;

        // 字段缺失时不报错，带着空值进入阶段三
        let chain = extract_text(&response);
        if chain.is_none() {
            warn!("⚠️ Logical chain response had no text; continuing with an empty chain");
        }
        self.run.set_logical_chain(chain.clone());
        self.run.advance_progress(CHAIN_PROGRESS);
        self.run.log("Stage 2 complete: temporal logic chain established");
        self.publish();
        Ok(chain)
    }

    /// 阶段三：基于逻辑链生成最终摘要
    async fn synthesize(&mut self, chain: &str) -> Result<(), PipelineError> {
        self.run.log("Stage 3: generating objective summary");
        self.publish();

        let prompt = self.prompts.synthesis_prompt(chain);
        let response = self.caller.call(&GenerateRequest::text(prompt)).await?;

        let summary = extract_text(&response);
        if summary.is_none() {
            warn!("⚠️ Summary response had no text");
        }
        self.run.set_summary(summary);
        self.run.advance_progress(DONE_PROGRESS);
        Ok(())
    }

    fn publish(&self) {
        self.updates.send_replace(self.run.snapshot());
    }
}

/// 第 `index` 段完成后的进度：10 + 60 * (index + 1) / segment_count
fn caption_progress(index: usize, segment_count: usize) -> u8 {
    let span = CAPTION_PROGRESS_SPAN as usize * (index + 1) / segment_count.max(1);
    START_PROGRESS + span.min(CAPTION_PROGRESS_SPAN as usize) as u8
}
