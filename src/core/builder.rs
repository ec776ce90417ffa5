//! Agent 构建器：统一的 ResearchAgent 初始化逻辑
//!
//! 未显式注入的组件按配置构建：LLM 与 summarizer 来自 [llm]，注册表从 tools.catalog_path 加载。
//! 注册表加载失败（文件缺失、格式错误）对会话启动是致命的。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{AgentError, ResearchAgent};
use crate::llm::{create_llm_from_config, create_summarizer_from_config, LlmClient};
use crate::memory::{CompressionPolicy, ConversationMemory};
use crate::react::prompts::SYSTEM_RESEARCH_BASE;
use crate::tools::{SearchDispatcher, ToolRegistry};

/// 摘要模型的注入状态：未指定时按配置构建
enum SummarizerChoice {
    FromConfig,
    Explicit(Option<Arc<dyn LlmClient>>),
}

pub struct AgentBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    summarizer: SummarizerChoice,
    registry: Option<Arc<ToolRegistry>>,
    system_prompt: String,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            summarizer: SummarizerChoice::FromConfig,
            registry: None,
            system_prompt: SYSTEM_RESEARCH_BASE.to_string(),
        }
    }

    /// 注入主 LLM（测试中通常是 MockLlmClient）
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// 注入压缩用 summarizer；传入 None 表示不使用 summarizer（压缩走占位摘要）
    pub fn with_summarizer(mut self, summarizer: Option<Arc<dyn LlmClient>>) -> Self {
        self.summarizer = SummarizerChoice::Explicit(summarizer);
        self
    }

    /// 注入共享注册表，跳过从 catalog_path 加载
    pub fn with_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 搜索开启时返回注册表（注入的或从目录加载的）
    fn build_registry(&self) -> Result<Option<Arc<ToolRegistry>>, AgentError> {
        if !self.config.tools.enable_search_tool {
            tracing::info!("search tool disabled by config");
            return Ok(None);
        }
        if let Some(registry) = &self.registry {
            return Ok(Some(registry.clone()));
        }
        let registry = ToolRegistry::load(&self.config.tools.catalog_path, &self.config)?;
        Ok(Some(Arc::new(registry)))
    }

    pub fn build(self) -> Result<ResearchAgent, AgentError> {
        self.config.validate();

        let registry = self.build_registry()?;
        let preferred_tools = registry
            .as_ref()
            .map(|r| {
                r.preferred_tools_for(
                    &self.config.app.agent_key,
                    &self.config.tools.search_tool_name,
                )
            })
            .unwrap_or_default();
        let dispatcher = SearchDispatcher::from_config(&self.config, registry);

        let llm = self
            .llm
            .unwrap_or_else(|| create_llm_from_config(&self.config));
        let summarizer = match self.summarizer {
            SummarizerChoice::FromConfig => create_summarizer_from_config(&self.config),
            SummarizerChoice::Explicit(s) => s,
        };
        let memory = ConversationMemory::new(CompressionPolicy::from(&self.config.memory));

        let agent = ResearchAgent::from_parts(
            llm,
            summarizer,
            self.system_prompt,
            self.config.research.max_subquestions,
            dispatcher,
            preferred_tools,
            memory,
        );
        tracing::info!(
            session = %agent.session_id(),
            search_enabled = agent.dispatcher().is_enabled(),
            preferred = ?agent.preferred_tools(),
            "research agent ready"
        );
        Ok(agent)
    }
}
