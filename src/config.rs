//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `RESEARCH__*` 覆盖（双下划线表示嵌套，如 `RESEARCH__MEMORY__KEEP_LAST_N=6`）。
//! 配置在进程启动时构建一次，以引用传入 ToolRegistry / SearchDispatcher / ResearchAgent，不存在全局单例。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub memory: MemorySection,
    #[serde(default)]
    pub research: ResearchSection,
    #[serde(default)]
    pub tools: ToolsSection,
}

/// [app] 段：应用名与 agent 标识（用于在工具目录的 agent_tools 中查找优先工具）
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    #[serde(default = "default_agent_key")]
    pub agent_key: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            agent_key: default_agent_key(),
        }
    }
}

fn default_agent_key() -> String {
    "research".to_string()
}

/// [llm] 段：后端选择、模型与采样参数
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// 记忆压缩使用的模型，未设置时与 model 相同
    pub summary_model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key: None,
            summary_model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2048
}

/// [memory] 段：压缩阈值（T_compress）、保留条数（K_keep）与摘要延续策略
#[derive(Debug, Clone, Deserialize)]
pub struct MemorySection {
    #[serde(default = "default_compress_after")]
    pub compress_after: usize,
    #[serde(default = "default_keep_last_n")]
    pub keep_last_n: usize,
    /// 再次压缩时是否把上一份摘要一并交给 summarizer（新摘要始终替换旧摘要）
    #[serde(default = "default_carry_forward_summary")]
    pub carry_forward_summary: bool,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            compress_after: default_compress_after(),
            keep_last_n: default_keep_last_n(),
            carry_forward_summary: default_carry_forward_summary(),
        }
    }
}

fn default_carry_forward_summary() -> bool {
    true
}

fn default_compress_after() -> usize {
    8
}

fn default_keep_last_n() -> usize {
    4
}

/// [research] 段：子问题数量上限
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchSection {
    #[serde(default = "default_max_subquestions")]
    pub max_subquestions: usize,
}

impl Default for ResearchSection {
    fn default() -> Self {
        Self {
            max_subquestions: default_max_subquestions(),
        }
    }
}

fn default_max_subquestions() -> usize {
    5
}

/// [tools] 段：搜索开关、默认工具名、工具目录路径、调用超时与原文截断长度
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_enable_search_tool")]
    pub enable_search_tool: bool,
    #[serde(default = "default_search_tool_name")]
    pub search_tool_name: String,
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    /// 单次搜索调用超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 非 JSON 响应包装为单条结果时保留的最大字符数
    #[serde(default = "default_max_raw_chars")]
    pub max_raw_chars: usize,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            enable_search_tool: default_enable_search_tool(),
            search_tool_name: default_search_tool_name(),
            catalog_path: default_catalog_path(),
            timeout_secs: default_timeout_secs(),
            max_raw_chars: default_max_raw_chars(),
        }
    }
}

fn default_enable_search_tool() -> bool {
    true
}

fn default_search_tool_name() -> String {
    "web_search".to_string()
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("config/tools.yaml")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_raw_chars() -> usize {
    2000
}

impl AppConfig {
    /// 检查退化配置：compress_after <= keep_last_n 合法，但每次追加都会触发压缩
    pub fn validate(&self) {
        if self.memory.compress_after <= self.memory.keep_last_n {
            tracing::warn!(
                compress_after = self.memory.compress_after,
                keep_last_n = self.memory.keep_last_n,
                "memory.compress_after should exceed memory.keep_last_n; compression will run on every turn"
            );
        }
        if self.research.max_subquestions == 0 {
            tracing::warn!("research.max_subquestions is 0; plans will always degrade to the original query");
        }
    }
}

/// 从 config 目录加载配置，环境变量 RESEARCH__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 RESEARCH__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("RESEARCH")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
