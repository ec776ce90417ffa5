//! Critic：针对用户反馈判断是否需要补充搜索，并直接给出改进后的回答
//!
//! LLM 按固定 JSON 结构返回 need_new_search / new_subquestions / improved_answer；
//! 无法解析时退化为 "parse failed" 回显（Outcome::Degraded），不会抛错。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{AgentError, Outcome};
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::react::planner::strip_code_fence;
use crate::react::prompts::{fill_template, CRITIQUE_PROMPT};

/// 退化回答的前缀，后接 LLM 原始输出
pub const CRITIQUE_PARSE_FAILED_PREFIX: &str = "Failed to parse the critique JSON; raw response:";

/// Critique 结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueOutcome {
    #[serde(default)]
    pub need_new_search: bool,
    #[serde(default)]
    pub new_subquestions: Vec<String>,
    pub improved_answer: String,
}

impl CritiqueOutcome {
    /// 是否需要重新进入搜索阶段
    pub fn wants_search(&self) -> bool {
        self.need_new_search && !self.new_subquestions.is_empty()
    }
}

/// 从文本中提取 JSON 对象（```json 块，或首个 `{` 到最后一个 `}`）
fn extract_json_object(output: &str) -> &str {
    let text = strip_code_fence(output);
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

pub fn parse_critique(output: &str) -> Outcome<CritiqueOutcome> {
    match serde_json::from_str::<CritiqueOutcome>(extract_json_object(output)) {
        Ok(mut parsed) => {
            parsed.new_subquestions = parsed
                .new_subquestions
                .into_iter()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect();
            Outcome::Parsed(parsed)
        }
        Err(e) => Outcome::format_error(
            format!("critique is not valid JSON: {}", e),
            CritiqueOutcome {
                need_new_search: false,
                new_subquestions: Vec::new(),
                improved_answer: format!("{}\n{}", CRITIQUE_PARSE_FAILED_PREFIX, output.trim()),
            },
        ),
    }
}

/// Critic：持有 LLM 与 system prompt
pub struct Critic {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Critic {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    /// context 为反馈之前的对话（已渲染），使 LLM 能看到被质疑的回答
    pub async fn judge(
        &self,
        context: &[Message],
        feedback: &str,
    ) -> Result<Outcome<CritiqueOutcome>, AgentError> {
        let mut messages = Vec::with_capacity(context.len() + 2);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(context.iter().cloned());
        messages.push(Message::user(fill_template(CRITIQUE_PROMPT, &[("feedback", feedback)])));

        let output = self
            .llm
            .complete(&messages)
            .await
            .map_err(AgentError::LlmError)?;

        let outcome = parse_critique(&output);
        match &outcome {
            Outcome::Parsed(c) => tracing::info!(
                need_new_search = c.need_new_search,
                new_subquestions = c.new_subquestions.len(),
                "critique judged"
            ),
            Outcome::Degraded { reason, .. } => tracing::warn!(reason = %reason, "critique degraded"),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[test]
    fn test_parse_with_surrounding_text() {
        let outcome = parse_critique(
            "Here you go:\n{\"need_new_search\": true, \"new_subquestions\": [\"windowing\", \" \"], \"improved_answer\": \"better\"}\nThanks",
        );
        assert!(!outcome.is_degraded());
        let c = outcome.into_value();
        assert!(c.wants_search());
        assert_eq!(c.new_subquestions, vec!["windowing"]);
        assert_eq!(c.improved_answer, "better");
    }

    #[test]
    fn test_parse_failure_echoes_raw_text() {
        let outcome = parse_critique("I think the answer is fine.");
        assert!(outcome.is_degraded());
        assert!(outcome
            .degraded_reason()
            .unwrap()
            .starts_with("Response format error: critique is not valid JSON"));
        let c = outcome.value();
        assert!(!c.need_new_search);
        assert!(c.improved_answer.starts_with(CRITIQUE_PARSE_FAILED_PREFIX));
        assert!(c.improved_answer.ends_with("I think the answer is fine."));
    }

    #[test]
    fn test_missing_improved_answer_degrades() {
        assert!(parse_critique(r#"{"need_new_search": false}"#).is_degraded());
    }

    #[test]
    fn test_need_search_without_questions_does_not_search() {
        let c = parse_critique(r#"{"need_new_search": true, "new_subquestions": [], "improved_answer": "x"}"#)
            .into_value();
        assert!(!c.wants_search());
    }

    #[tokio::test]
    async fn test_judge_sends_context_and_feedback() {
        let llm = Arc::new(MockLlmClient::with_replies([
            r#"{"need_new_search": false, "new_subquestions": [], "improved_answer": "ok"}"#,
        ]));
        let critic = Critic::new(llm.clone(), "sys");
        let context = vec![Message::user("q"), Message::assistant("first answer")];
        critic.judge(&context, "add more detail").await.unwrap();

        let req = &llm.requests()[0];
        assert_eq!(req.len(), 4);
        assert_eq!(req[2].content, "first answer");
        assert!(req[3].content.contains("\"add more detail\""));
    }
}
