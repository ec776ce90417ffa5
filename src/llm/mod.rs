//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock），以及按配置构建主模型与压缩模型

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::LlmClient;

use crate::config::AppConfig;

/// 是否能拿到可用的 API Key（配置或环境变量）
fn has_api_key(cfg: &AppConfig) -> bool {
    cfg.llm.api_key.is_some() || std::env::var("OPENAI_API_KEY").is_ok()
}

/// 根据配置选择主 LLM 后端：provider = mock 或缺少 API Key 时回退到 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    if provider == "mock" || !has_api_key(cfg) {
        tracing::warn!("No API key configured (or provider = mock), using Mock LLM");
        return Arc::new(MockLlmClient::new());
    }
    tracing::info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
    Arc::new(
        OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            cfg.llm.api_key.as_deref(),
        )
        .with_sampling(cfg.llm.temperature, cfg.llm.max_tokens),
    )
}

/// 记忆压缩用的 summarizer；mock 模式下不提供（压缩走固定占位摘要）
pub fn create_summarizer_from_config(cfg: &AppConfig) -> Option<Arc<dyn LlmClient>> {
    let provider = cfg.llm.provider.to_lowercase();
    if provider == "mock" || !has_api_key(cfg) {
        return None;
    }
    let model = cfg.llm.summary_model.as_deref().unwrap_or(&cfg.llm.model);
    tracing::info!("Using memory summarizer ({})", model);
    Some(Arc::new(
        OpenAiClient::new(cfg.llm.base_url.as_deref(), model, cfg.llm.api_key.as_deref())
            .with_sampling(0.2, 1024),
    ))
}
