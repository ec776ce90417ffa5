//! Synthesis：把所有子问题的搜索结果编号为引用列表，交给 LLM 生成最终回答
//!
//! 无结果的子问题渲染为一行 "(no result)" 占位，使引用编号在空批次之间也保持稳定可追溯。

use std::sync::Arc;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::react::prompts::{fill_template, SYNTHESIS_PROMPT};
use crate::tools::SearchBatch;

/// 无任何搜索批次时放入 prompt 的文本
pub const NO_SEARCH_DATA: &str = "(no search data)";

/// 编号引用列表：`[n] title | snippet | url`，空批次为 `[n] (no result) <subq>`
pub fn format_citations(batches: &[SearchBatch]) -> String {
    let mut lines = Vec::new();
    let mut idx = 1;
    for batch in batches {
        if batch.results.is_empty() {
            lines.push(format!("[{}] (no result) {}", idx, batch.sub_question.text));
            idx += 1;
            continue;
        }
        for r in &batch.results {
            let title = if r.title.is_empty() { "(untitled)" } else { r.title.as_str() };
            lines.push(format!("[{}] {} | {} | {}", idx, title, r.snippet, r.url));
            idx += 1;
        }
    }
    if lines.is_empty() {
        NO_SEARCH_DATA.to_string()
    } else {
        lines.join("\n")
    }
}

/// Synthesizer：持有 LLM 与 system prompt
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    pub async fn synthesize(&self, topic: &str, batches: &[SearchBatch]) -> Result<String, AgentError> {
        let citations = format_citations(batches);
        let prompt = fill_template(
            SYNTHESIS_PROMPT,
            &[("snippets", citations.as_str()), ("query", topic)],
        );
        let messages = vec![Message::system(self.system_prompt.clone()), Message::user(prompt)];
        self.llm
            .complete(&messages)
            .await
            .map_err(AgentError::LlmError)
    }
}
