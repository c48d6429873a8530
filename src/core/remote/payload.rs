use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::video::Frame;

/// `{ contents: [ { parts: [...] } ] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self::with_frames(prompt, &[])
    }

    /// 文本指令在前，图片按顺序以内联附件跟随
    pub fn with_frames(prompt: impl Into<String>, frames: &[Frame]) -> Self {
        let mut parts = Vec::with_capacity(frames.len() + 1);
        parts.push(Part::Text {
            text: prompt.into(),
        });
        parts.extend(frames.iter().map(|f| Part::InlineData {
            inline_data: InlineData {
                mime_type: f.mime_type.to_string(),
                data: f.to_base64(),
            },
        }));

        Self {
            contents: vec![Content { parts }],
        }
    }

    pub fn prompt_text(&self) -> String {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn image_count(&self) -> usize {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter(|p| matches!(p, Part::InlineData { .. }))
            .count()
    }
}

/// 取第一个候选的第一个文本片段；字段缺失返回 `None`，不报错
pub fn extract_text(response: &Value) -> Option<String> {
    response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::video::JPEG_MIME;
    use serde_json::json;

    fn frame(index: usize, data: &[u8]) -> Frame {
        Frame {
            index,
            timestamp_ms: 0,
            width: 2,
            height: 2,
            data: data.to_vec(),
            mime_type: JPEG_MIME,
        }
    }

    #[test]
    fn test_request_wire_shape() {
        let request = GenerateRequest::with_frames("describe", &[frame(0, b"abc")]);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "contents": [{
                    "parts": [
                        {"text": "describe"},
                        {"inlineData": {"mimeType": "image/jpeg", "data": "YWJj"}}
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_images_keep_frame_order() {
        let request =
            GenerateRequest::with_frames("p", &[frame(0, b"a"), frame(1, b"b"), frame(2, b"c")]);
        let parts = &request.contents[0].parts;

        assert_eq!(request.image_count(), 3);
        let data: Vec<_> = parts
            .iter()
            .filter_map(|p| match p {
                Part::InlineData { inline_data } => Some(inline_data.data.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(data, vec!["YQ==", "Yg==", "Yw=="]);
    }

    #[test]
    fn test_request_round_trips_untagged_parts() {
        let raw = json!({"contents": [{"parts": [{"text": "hi"}, {"inlineData": {"mimeType": "image/jpeg", "data": "AA=="}}]}]});
        let request: GenerateRequest = serde_json::from_value(raw).unwrap();

        assert_eq!(request.prompt_text(), "hi");
        assert_eq!(request.image_count(), 1);
    }

    #[test]
    fn test_extract_text_present() {
        let response = json!({
            "candidates": [{"content": {"parts": [{"text": "first"}, {"text": "second"}]}}]
        });
        assert_eq!(extract_text(&response).as_deref(), Some("first"));
    }

    #[test]
    fn test_extract_text_missing_fields() {
        assert_eq!(extract_text(&json!({})), None);
        assert_eq!(extract_text(&json!({"candidates": []})), None);
        assert_eq!(
            extract_text(&json!({"candidates": [{"finishReason": "SAFETY"}]})),
            None
        );
        assert_eq!(
            extract_text(&json!({"candidates": [{"content": {"parts": [{"inlineData": {}}]}}]})),
            None
        );
    }
}
