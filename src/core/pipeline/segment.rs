use serde::{Deserialize, Serialize};

use crate::core::video::Frame;

/// 一次阶段一调用所携带的连续帧
#[derive(Debug, Clone)]
pub struct Segment {
    pub index: usize,
    pub frames: Vec<Frame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentPlan {
    pub frame_count: usize,
    pub segment_count: usize,
}

impl Default for SegmentPlan {
    fn default() -> Self {
        Self {
            frame_count: 12,
            segment_count: 3,
        }
    }
}

/// 按时间顺序切成 `segment_count` 段，不重叠、无空隙。
/// 无法整除时，靠前的片段各多分一帧。
pub fn partition(frames: Vec<Frame>, segment_count: usize) -> Vec<Segment> {
    if segment_count == 0 {
        return Vec::new();
    }

    let base = frames.len() / segment_count;
    let extra = frames.len() % segment_count;
    let mut remaining = frames.into_iter();

    (0..segment_count)
        .map(|index| {
            let size = base + usize::from(index < extra);
            Segment {
                index,
                frames: remaining.by_ref().take(size).collect(),
            }
        })
        .collect()
}
