//! Planner：把用户问题拆分为子问题（Plan）
//!
//! 调用 LLM 得到 `[{"subq", "reason"}]` JSON 数组；解析失败、非数组或没有可用条目时
//! 不报错，而是退化为只含原始问题的单元素 Plan（Outcome::Degraded），保证后续搜索至少有一个子问题。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{AgentError, Outcome};
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::react::prompts::{fill_template, PLAN_PROMPT};

/// 子问题：可独立检索的问题文本与拆分理由
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuestion {
    #[serde(rename = "subq")]
    pub text: String,
    #[serde(rename = "reason", default)]
    pub rationale: String,
}

impl SubQuestion {
    pub fn new(text: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rationale: rationale.into(),
        }
    }
}

/// 退化 Plan 中原始问题的 reason
pub const DEGRADED_PLAN_REASON: &str = "original question (plan fallback)";

/// 去掉 ```json ... ``` 包裹（若有）
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim());
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        return rest.strip_suffix("```").unwrap_or(rest).trim();
    }
    trimmed
}

/// 解析 Plan；超过 max_subquestions 的部分被截掉
pub fn parse_plan(output: &str, query: &str, max_subquestions: usize) -> Outcome<Vec<SubQuestion>> {
    let fallback = || vec![SubQuestion::new(query, DEGRADED_PLAN_REASON)];

    let value: Value = match serde_json::from_str(strip_code_fence(output)) {
        Ok(v) => v,
        Err(e) => return Outcome::format_error(format!("plan is not valid JSON: {}", e), fallback()),
    };
    let Value::Array(items) = value else {
        return Outcome::format_error("plan is not a JSON array", fallback());
    };

    let plan: Vec<SubQuestion> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(SubQuestion::new(s.trim(), "")),
            Value::Object(obj) => {
                let text = obj.get("subq").and_then(Value::as_str)?.trim();
                if text.is_empty() {
                    return None;
                }
                let reason = obj.get("reason").and_then(Value::as_str).unwrap_or("");
                Some(SubQuestion::new(text, reason))
            }
            _ => None,
        })
        .take(max_subquestions)
        .collect();

    if plan.is_empty() {
        return Outcome::format_error("plan contained no usable sub-questions", fallback());
    }
    Outcome::Parsed(plan)
}

/// Planner：持有 LLM、system prompt 与子问题上限
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    max_subquestions: usize,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>, max_subquestions: usize) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            max_subquestions,
        }
    }

    pub fn max_subquestions(&self) -> usize {
        self.max_subquestions
    }

    /// 生成 Plan；只有 LLM 调用本身失败时才返回错误
    pub async fn plan(&self, query: &str) -> Result<Outcome<Vec<SubQuestion>>, AgentError> {
        let max = self.max_subquestions.to_string();
        let prompt = fill_template(
            PLAN_PROMPT,
            &[("max_subquestions", max.as_str()), ("query", query)],
        );
        let messages = vec![Message::system(self.system_prompt.clone()), Message::user(prompt)];
        let output = self
            .llm
            .complete(&messages)
            .await
            .map_err(AgentError::LlmError)?;

        let plan = parse_plan(&output, query, self.max_subquestions);
        match &plan {
            Outcome::Parsed(p) => tracing::info!(count = p.len(), "plan created"),
            Outcome::Degraded { reason, .. } => {
                tracing::warn!(reason = %reason, raw = %output.chars().take(200).collect::<String>(), "plan degraded to original query")
            }
        }
        Ok(plan)
    }
}
