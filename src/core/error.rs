//! Agent 错误类型与降级结果
//!
//! 配置与注册表构建错误对会话启动是致命的，直接向调用方传播；
//! 单个子问题的搜索错误在 SearchDispatcher 内就地恢复；
//! LLM 结构化输出解析失败以 Outcome::Degraded 表达，从不抛出。

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Research Agent 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Tool config not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Tool config format error: {0}")]
    ConfigFormatError(String),

    #[error("No tool available")]
    NoToolAvailable,

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool '{tool}' invocation failed: {cause}")]
    ToolInvocationError { tool: String, cause: String },

    #[error("Response format error: {0}")]
    ResponseFormatError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Config error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

/// LLM 结构化输出的解析结果：成功解析，或走降级路径（带原因与回退值）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<T> {
    Parsed(T),
    Degraded { reason: String, fallback: T },
}

impl<T> Outcome<T> {
    pub fn degraded(reason: impl Into<String>, fallback: T) -> Self {
        Outcome::Degraded {
            reason: reason.into(),
            fallback,
        }
    }

    /// 结构化输出格式错误：原因即 ResponseFormatError 的文本
    pub fn format_error(detail: impl Into<String>, fallback: T) -> Self {
        Self::degraded(AgentError::ResponseFormatError(detail.into()).to_string(), fallback)
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Parsed(v) => v,
            Outcome::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn value_mut(&mut self) -> &mut T {
        match self {
            Outcome::Parsed(v) => v,
            Outcome::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Parsed(v) => v,
            Outcome::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            Outcome::Parsed(_) => None,
            Outcome::Degraded { reason, .. } => Some(reason),
        }
    }
}

/// maybe_compress 的结果；Fallback 即 CompressionFallback（降级但成功）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionOutcome {
    /// 未达阈值
    NotDue,
    /// 已达阈值但没有可折叠的旧消息
    NothingToFold,
    /// 由 summarizer 生成摘要
    Summarized,
    /// 无 summarizer 或 summarizer 失败，使用固定占位摘要
    Fallback(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let parsed: Outcome<u8> = Outcome::Parsed(1);
        assert!(!parsed.is_degraded());
        assert_eq!(parsed.degraded_reason(), None);
        assert_eq!(*parsed.value(), 1);

        let degraded = Outcome::degraded("bad json", 2u8);
        assert!(degraded.is_degraded());
        assert_eq!(degraded.degraded_reason(), Some("bad json"));
        assert_eq!(degraded.into_value(), 2);

        let bad = Outcome::format_error("not an array", 0u8);
        assert_eq!(
            bad.degraded_reason(),
            Some("Response format error: not an array")
        );
    }

    #[test]
    fn test_error_display() {
        let e = AgentError::ToolInvocationError {
            tool: "web_search".into(),
            cause: "connection refused".into(),
        };
        assert_eq!(
            e.to_string(),
            "Tool 'web_search' invocation failed: connection refused"
        );
        let e = AgentError::ConfigNotFound(PathBuf::from("missing.yaml"));
        assert_eq!(e.to_string(), "Tool config not found: missing.yaml");
    }
}
