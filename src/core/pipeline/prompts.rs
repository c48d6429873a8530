use serde::{Deserialize, Serialize};

pub const EVIDENCE_PLACEHOLDER: &str = "{evidence}";
pub const CHAIN_PLACEHOLDER: &str = "{chain}";

const CAPTION_PROMPT: &str = "Describe in detail the concrete events in this video segment. \
Include: 1. which people or objects appear; 2. what specific actions they perform; \
3. how the scene or environment changes. Describe facts only, no artistic evaluation.";

const REASONING_PROMPT: &str = "Based on the following detailed descriptions of video segments, \
lay out the logical thread of the video:
1. Cause: what state is the video in at the start?
2. Development: which key continuous actions or changes happen?
3. Causality: how are the actions in consecutive segments logically connected?

Stick to the facts; do not analyse filming technique.

Input descriptions:
{evidence}";

const SYNTHESIS_PROMPT: &str = "Based on the following logical chain, write an objective summary \
of the video of about 200 words.
Requirements:
1. Follow an opening / development / turn / conclusion structure, but describe concrete on-screen content.
2. Do not use abstract art-criticism vocabulary such as \"narrative function\" or \"aesthetic meaning\".
3. Focus on: what did the people do? what did the environment become? what was the final outcome?
4. Every sentence must be traceable to a fact in the logical chain.

Logical chain:
{chain}";

/// 三个阶段的提示词模板
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSet {
    pub caption: String,
    pub reasoning: String,
    pub synthesis: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            caption: CAPTION_PROMPT.to_string(),
            reasoning: REASONING_PROMPT.to_string(),
            synthesis: SYNTHESIS_PROMPT.to_string(),
        }
    }
}

impl PromptSet {
    pub fn caption_prompt(&self) -> &str {
        &self.caption
    }

    pub fn reasoning_prompt(&self, evidence: &str) -> String {
        fill(&self.reasoning, EVIDENCE_PLACEHOLDER, evidence)
    }

    pub fn synthesis_prompt(&self, chain: &str) -> String {
        fill(&self.synthesis, CHAIN_PLACEHOLDER, chain)
    }
}

/// 模板缺少占位符时把内容追加到末尾
fn fill(template: &str, placeholder: &str, value: &str) -> String {
    if template.contains(placeholder) {
        template.replace(placeholder, value)
    } else {
        format!("{}\n\n{}", template, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_templates_embed_inputs() {
        let prompts = PromptSet::default();

        let reasoning = prompts.reasoning_prompt("Segment 1: cat jumps");
        assert!(reasoning.ends_with("Input descriptions:\nSegment 1: cat jumps"));
        assert!(!reasoning.contains(EVIDENCE_PLACEHOLDER));

        let synthesis = prompts.synthesis_prompt("the cat jumped, then slept");
        assert!(synthesis.ends_with("the cat jumped, then slept"));
        assert!(!synthesis.contains(CHAIN_PLACEHOLDER));
    }

    #[test]
    fn test_template_without_placeholder_appends() {
        let prompts = PromptSet {
            reasoning: "Reason about this.".to_string(),
            ..Default::default()
        };
        assert_eq!(prompts.reasoning_prompt("E"), "Reason about this.\n\nE");
    }
}
