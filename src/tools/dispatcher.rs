//! 搜索分发：把 Plan 转为逐子问题的 SearchBatch
//!
//! 子问题严格按顺序处理；每个子问题单独解析工具并调用，任何错误只写入该条目的 error，
//! 不会中断整批。未配置搜索能力时，每个子问题都得到带固定错误的空结果，且不发起调用。

use std::sync::Arc;

use serde::Serialize;

use crate::config::AppConfig;
use crate::react::SubQuestion;
use crate::tools::{SearchResultItem, ToolRegistry};

/// 搜索能力未启用时写入每个条目的错误
pub const TOOL_DISABLED_ERROR: &str = "search tool disabled";

/// 单个子问题的搜索记录
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchBatch {
    pub sub_question: SubQuestion,
    pub results: Vec<SearchResultItem>,
    pub error: Option<String>,
    /// 实际使用的工具名（未解析出工具时为 None）
    pub tool_used: Option<String>,
}

/// 搜索分发器：持有可选的共享注册表与默认请求的工具名
pub struct SearchDispatcher {
    registry: Option<Arc<ToolRegistry>>,
    requested_tool: String,
}

impl SearchDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, requested_tool: impl Into<String>) -> Self {
        Self {
            registry: Some(registry),
            requested_tool: requested_tool.into(),
        }
    }

    /// 未配置任何搜索能力
    pub fn disabled() -> Self {
        Self {
            registry: None,
            requested_tool: String::new(),
        }
    }

    /// 按配置构建：enable_search_tool = false 或未给出注册表时为 disabled
    pub fn from_config(cfg: &AppConfig, registry: Option<Arc<ToolRegistry>>) -> Self {
        match registry {
            Some(r) if cfg.tools.enable_search_tool => {
                Self::new(r, cfg.tools.search_tool_name.clone())
            }
            _ => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.registry.is_some()
    }

    pub fn registry(&self) -> Option<&Arc<ToolRegistry>> {
        self.registry.as_ref()
    }

    /// 输出长度恒等于输入子问题数；单个失败不影响其他条目
    pub async fn dispatch(&self, plan: &[SubQuestion], preferred: &[String]) -> Vec<SearchBatch> {
        let Some(registry) = &self.registry else {
            return plan
                .iter()
                .map(|sq| SearchBatch {
                    sub_question: sq.clone(),
                    results: Vec::new(),
                    error: Some(TOOL_DISABLED_ERROR.to_string()),
                    tool_used: None,
                })
                .collect();
        };

        let mut batches = Vec::with_capacity(plan.len());
        for sq in plan {
            let resolved = registry.resolve(&self.requested_tool, preferred);
            let batch = match resolved {
                Err(e) => {
                    tracing::warn!(subq = %sq.text, error = %e, "no tool resolved for sub-question");
                    SearchBatch {
                        sub_question: sq.clone(),
                        results: Vec::new(),
                        error: Some(e.to_string()),
                        tool_used: None,
                    }
                }
                Ok(tool) => {
                    tracing::info!(tool = %tool, subq = %sq.text, "dispatching sub-question");
                    match registry.invoke(&tool, &sq.text).await {
                        Ok(results) => {
                            if results.is_empty() {
                                tracing::warn!(tool = %tool, subq = %sq.text, "search returned no results");
                            } else {
                                tracing::info!(tool = %tool, count = results.len(), "search results received");
                            }
                            SearchBatch {
                                sub_question: sq.clone(),
                                results,
                                error: None,
                                tool_used: Some(tool),
                            }
                        }
                        Err(e) => {
                            tracing::warn!(tool = %tool, subq = %sq.text, error = %e, "search invocation failed");
                            SearchBatch {
                                sub_question: sq.clone(),
                                results: Vec::new(),
                                error: Some(e.to_string()),
                                tool_used: Some(tool),
                            }
                        }
                    }
                }
            };
            batches.push(batch);
        }
        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AgentError;
    use crate::tools::{InvocationMethod, SearchBackend, ToolEntry};
    use async_trait::async_trait;

    /// 查询中包含 "fail" 时报错，否则返回一条结果
    struct FlakyBackend;

    #[async_trait]
    impl SearchBackend for FlakyBackend {
        async fn fetch(&self, entry: &ToolEntry, query: &str) -> Result<String, AgentError> {
            if query.contains("fail") {
                return Err(AgentError::ToolInvocationError {
                    tool: entry.name.clone(),
                    cause: "connection reset".into(),
                });
            }
            Ok(format!(r#"[{{"title": "{}", "snippet": "s", "url": "u"}}]"#, query))
        }
    }

    fn plan(texts: &[&str]) -> Vec<SubQuestion> {
        texts.iter().map(|t| SubQuestion::new(*t, "test")).collect()
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let mut registry = ToolRegistry::new(Arc::new(FlakyBackend), 100);
        registry.register(ToolEntry::new("web_search", "http://x", InvocationMethod::Get));
        let dispatcher = SearchDispatcher::new(Arc::new(registry), "web_search");

        let batches = dispatcher
            .dispatch(&plan(&["one", "please fail", "three"]), &[])
            .await;
        assert_eq!(batches.len(), 3);
        assert!(batches[0].error.is_none());
        assert_eq!(batches[0].results[0].title, "one");
        assert!(batches[1].results.is_empty());
        assert!(batches[1].error.as_deref().unwrap().contains("connection reset"));
        assert_eq!(batches[1].tool_used.as_deref(), Some("web_search"));
        assert!(batches[2].error.is_none());
        assert_eq!(batches[2].results[0].title, "three");
    }

    #[tokio::test]
    async fn test_disabled_yields_fixed_error() {
        let dispatcher = SearchDispatcher::disabled();
        let batches = dispatcher.dispatch(&plan(&["a", "b"]), &[]).await;
        assert_eq!(batches.len(), 2);
        for b in &batches {
            assert!(b.results.is_empty());
            assert_eq!(b.error.as_deref(), Some(TOOL_DISABLED_ERROR));
            assert!(b.tool_used.is_none());
        }
    }

    #[tokio::test]
    async fn test_empty_registry_records_no_tool_error() {
        let registry = ToolRegistry::new(Arc::new(FlakyBackend), 100);
        let dispatcher = SearchDispatcher::new(Arc::new(registry), "web_search");
        let batches = dispatcher.dispatch(&plan(&["a"]), &[]).await;
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].error.as_deref(), Some("No tool available"));
    }

    #[test]
    fn test_from_config_respects_switch() {
        let mut cfg = AppConfig::default();
        let registry = Arc::new(ToolRegistry::new(Arc::new(FlakyBackend), 100));
        assert!(SearchDispatcher::from_config(&cfg, Some(registry.clone())).is_enabled());
        cfg.tools.enable_search_tool = false;
        assert!(!SearchDispatcher::from_config(&cfg, Some(registry)).is_enabled());
        assert!(!SearchDispatcher::from_config(&AppConfig::default(), None).is_enabled());
    }
}
