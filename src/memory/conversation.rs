//! 短期记忆：对话历史 + 压缩上下文
//!
//! 按时间顺序追加 user/assistant 消息；消息数达到 compress_after 时，
//! 将除最近 keep_last_n 条以外的旧消息交给 summarizer 折叠为一段 compressed_context。
//! 渲染时 compressed_context 总是排在所有保留消息之前。

use serde::{Deserialize, Serialize};

use crate::core::CompressionOutcome;
use crate::llm::LlmClient;
use crate::memory::TokenEstimator;
use crate::react::prompts::{fill_template, MEMORY_SUMMARIZE_PROMPT};

/// 无 summarizer（或 summarizer 失败）时使用的固定占位摘要
pub const FALLBACK_SUMMARY: &str =
    "(compressed without a summarizer) Earlier turns discussed the user's research goals; details were folded.";

/// 渲染时压缩上下文的前缀标记
pub const COMPRESSED_CONTEXT_MARKER: &str = "[COMPRESSED_CONTEXT]";

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// 记忆中 Turn 的角色；system 消息只由 render() 生成，不进入记忆
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        }
    }
}

/// 单条消息（对话中的一个 Turn，创建后不可变）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 压缩策略：compress_after = T_compress，keep_last_n = K_keep
#[derive(Clone, Copy, Debug)]
pub struct CompressionPolicy {
    pub compress_after: usize,
    pub keep_last_n: usize,
    /// 为 true 时把上一份摘要放在待折叠记录前一并交给 summarizer
    pub carry_forward_summary: bool,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            compress_after: 8,
            keep_last_n: 4,
            carry_forward_summary: true,
        }
    }
}

impl From<&crate::config::MemorySection> for CompressionPolicy {
    fn from(section: &crate::config::MemorySection) -> Self {
        Self {
            compress_after: section.compress_after,
            keep_last_n: section.keep_last_n,
            carry_forward_summary: section.carry_forward_summary,
        }
    }
}

/// 导出用的只读快照
#[derive(Clone, Debug, Serialize)]
pub struct MemorySnapshot {
    pub compressed_context: Option<String>,
    pub messages: Vec<Message>,
}

/// 对话记忆：一个会话独占一个实例
#[derive(Clone, Debug, Default)]
pub struct ConversationMemory {
    messages: Vec<Message>,
    compressed_context: Option<String>,
    policy: CompressionPolicy,
}

impl ConversationMemory {
    pub fn new(policy: CompressionPolicy) -> Self {
        Self {
            messages: Vec::new(),
            compressed_context: None,
            policy,
        }
    }

    pub fn append(&mut self, role: TurnRole, content: impl Into<String>) {
        self.messages.push(Message {
            role: role.into(),
            content: content.into(),
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn compressed_context(&self) -> Option<&str> {
        self.compressed_context.as_deref()
    }

    pub fn policy(&self) -> &CompressionPolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 供 LLM 使用的有序消息：可选的压缩上下文（system）+ 全部保留消息
    pub fn render(&self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        if let Some(ctx) = &self.compressed_context {
            out.push(Message::system(format!(
                "{}\n{}",
                COMPRESSED_CONTEXT_MARKER, ctx
            )));
        }
        out.extend(self.messages.iter().cloned());
        out
    }

    /// 近似 token 数（保留消息 + 压缩上下文）
    pub fn token_estimate(&self) -> usize {
        TokenEstimator::estimate_all(
            self.messages
                .iter()
                .map(|m| m.content.as_str())
                .chain(self.compressed_context.as_deref()),
        )
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            compressed_context: self.compressed_context.clone(),
            messages: self.messages.clone(),
        }
    }

    /// 消息数达到 compress_after 时，把旧前缀折叠进 compressed_context，只保留最近 keep_last_n 条。
    /// 新摘要替换旧摘要；summarizer 缺失或失败时使用 FALLBACK_SUMMARY，不返回错误。
    pub async fn maybe_compress(&mut self, summarizer: Option<&dyn LlmClient>) -> CompressionOutcome {
        if self.messages.len() < self.policy.compress_after {
            return CompressionOutcome::NotDue;
        }

        let split = self.messages.len().saturating_sub(self.policy.keep_last_n);
        if split == 0 {
            return CompressionOutcome::NothingToFold;
        }

        let prompt = self.summarize_prompt(&self.messages[..split]);
        let (summary, outcome) = match summarizer {
            None => (
                FALLBACK_SUMMARY.to_string(),
                CompressionOutcome::Fallback("no summarizer configured".to_string()),
            ),
            Some(llm) => match llm.complete(&[Message::user(prompt)]).await {
                Ok(text) if !text.trim().is_empty() => {
                    (text.trim().to_string(), CompressionOutcome::Summarized)
                }
                Ok(_) => (
                    FALLBACK_SUMMARY.to_string(),
                    CompressionOutcome::Fallback("summarizer returned empty text".to_string()),
                ),
                Err(e) => (
                    FALLBACK_SUMMARY.to_string(),
                    CompressionOutcome::Fallback(format!("summarizer failed: {}", e)),
                ),
            },
        };

        if let CompressionOutcome::Fallback(reason) = &outcome {
            tracing::warn!(reason = %reason, folded = split, "memory compression fell back to placeholder summary");
        } else {
            tracing::info!(folded = split, kept = self.messages.len() - split, "memory compressed");
        }

        self.compressed_context = Some(summary);
        self.messages.drain(..split);
        outcome
    }

    /// 编号的对话记录 + 摘要指令
    fn summarize_prompt(&self, old: &[Message]) -> String {
        let mut history = String::new();
        if self.policy.carry_forward_summary {
            if let Some(prev) = &self.compressed_context {
                history.push_str(&format!("0. [earlier summary] {}\n", prev));
            }
        }
        for (idx, msg) in old.iter().enumerate() {
            history.push_str(&format!("{}. [{}] {}\n", idx + 1, msg.role.as_str(), msg.content));
        }
        fill_template(MEMORY_SUMMARIZE_PROMPT, &[("history", history.as_str())])
    }
}
