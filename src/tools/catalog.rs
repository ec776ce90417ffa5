//! 工具目录解析
//!
//! 支持两种配置形态（.json / .yaml / .yml / .toml）：
//!
//! 扁平列表：
//! ```yaml
//! tools:
//!   - name: web_search
//!     endpoint: "http://localhost:8000/search"
//!     method: GET
//!     params:
//!       q: "{{query}}"
//! ```
//!
//! 服务映射（可带 agent 优先工具覆盖）：
//! ```json
//! { "services": { "bing": { "name": "web_search", "url": "...", "method": "POST" } },
//!   "agent_tools": { "research": { "tools": ["bing"] } } }
//! ```
//! 服务条目以声明的 name 为键，未声明时用其内部 key；`mcpServers` 与 `services` 等价。

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::AgentError;

/// 查询文本在参数模板中的占位符
pub const QUERY_PLACEHOLDER: &str = "{{query}}";

/// 调用方式：GET 带查询参数，或 POST 带 JSON 体
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvocationMethod {
    Get,
    Post,
}

impl InvocationMethod {
    /// GET（不区分大小写）以外的任何值都视为 POST
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(m) if !m.trim().eq_ignore_ascii_case("get") => InvocationMethod::Post,
            _ => InvocationMethod::Get,
        }
    }
}

/// 一个可调用的搜索后端
#[derive(Clone, Debug, PartialEq)]
pub struct ToolEntry {
    pub name: String,
    /// 服务映射形态下的内部 key
    pub server_key: Option<String>,
    pub endpoint: String,
    pub method: InvocationMethod,
    /// 参数模板（GET 为查询参数，POST 为 JSON 体）
    pub params: Value,
    pub headers: BTreeMap<String, String>,
    pub api_key: Option<String>,
}

impl ToolEntry {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, method: InvocationMethod) -> Self {
        Self {
            name: name.into(),
            server_key: None,
            endpoint: endpoint.into(),
            method,
            params: Value::Object(Map::new()),
            headers: BTreeMap::new(),
            api_key: None,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// 将模板中的 {{query}} 替换为查询文本（递归处理嵌套对象与数组）
    pub fn render_params(&self, query: &str) -> Value {
        render_template(&self.params, query)
    }
}

fn render_template(template: &Value, query: &str) -> Value {
    match template {
        Value::String(s) => Value::String(s.replace(QUERY_PLACEHOLDER, query)),
        Value::Array(items) => Value::Array(items.iter().map(|v| render_template(v, query)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_template(v, query)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// 解析后的工具目录：按输入顺序排列的条目 + agent 优先工具列表
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub entries: Vec<ToolEntry>,
    pub agent_tools: BTreeMap<String, Vec<String>>,
}

/// 条目在文件中的原始形态（两种形态共用）
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTool {
    name: Option<String>,
    endpoint: Option<String>,
    url: Option<String>,
    method: Option<String>,
    params: Option<Value>,
    payload: Option<Value>,
    headers: BTreeMap<String, String>,
    api_key: Option<String>,
}

impl RawTool {
    fn into_entry(self, name: String, server_key: Option<String>) -> Result<ToolEntry, AgentError> {
        let endpoint = self.endpoint.or(self.url).ok_or_else(|| {
            AgentError::ConfigFormatError(format!("tool '{}' has no endpoint", name))
        })?;
        Ok(ToolEntry {
            name,
            server_key,
            endpoint,
            method: InvocationMethod::parse(self.method.as_deref()),
            params: self
                .params
                .or(self.payload)
                .unwrap_or_else(|| Value::Object(Map::new())),
            headers: self.headers,
            api_key: self.api_key,
        })
    }
}

/// 读取并解析目录文件：不存在 -> ConfigNotFound；无法解析或形态不支持 -> ConfigFormatError
pub fn load_catalog(path: &Path) -> Result<Catalog, AgentError> {
    if !path.exists() {
        return Err(AgentError::ConfigNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|e| {
        AgentError::ConfigFormatError(format!("read {}: {}", path.display(), e))
    })?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let value = parse_document(&text, &ext)?;
    parse_catalog(value)
}

fn parse_document(text: &str, ext: &str) -> Result<Value, AgentError> {
    let fmt_err = |e: String| AgentError::ConfigFormatError(e);
    match ext {
        "json" => serde_json::from_str(text).map_err(|e| fmt_err(e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str(text).map_err(|e| fmt_err(e.to_string())),
        "toml" => toml::from_str(text).map_err(|e| fmt_err(e.to_string())),
        _ => serde_json::from_str(text)
            .or_else(|_| serde_yaml::from_str(text))
            .map_err(|e| fmt_err(e.to_string())),
    }
}

/// 按形态解析已读入的文档
pub fn parse_catalog(value: Value) -> Result<Catalog, AgentError> {
    let Value::Object(mut root) = value else {
        return Err(AgentError::ConfigFormatError(
            "tool config must be a mapping".to_string(),
        ));
    };

    if let Some(tools) = root.remove("tools") {
        return parse_flat(tools);
    }

    let services = root.remove("services").or_else(|| root.remove("mcpServers"));
    match services {
        Some(services) => parse_service_map(services, root.remove("agent_tools")),
        None => Err(AgentError::ConfigFormatError(
            "unsupported tool config shape: expected a `tools` list or a `services` map".to_string(),
        )),
    }
}

fn parse_flat(tools: Value) -> Result<Catalog, AgentError> {
    let Value::Array(items) = tools else {
        return Err(AgentError::ConfigFormatError("`tools` must be a list".to_string()));
    };
    let mut catalog = Catalog::default();
    for (idx, item) in items.into_iter().enumerate() {
        let raw: RawTool = serde_json::from_value(item)
            .map_err(|e| AgentError::ConfigFormatError(format!("tools[{}]: {}", idx, e)))?;
        let name = raw.name.clone().ok_or_else(|| {
            AgentError::ConfigFormatError(format!("tools[{}] has no name", idx))
        })?;
        catalog.entries.push(raw.into_entry(name, None)?);
    }
    Ok(catalog)
}

fn parse_service_map(services: Value, agent_tools: Option<Value>) -> Result<Catalog, AgentError> {
    let Value::Object(services) = services else {
        return Err(AgentError::ConfigFormatError("`services` must be a mapping".to_string()));
    };
    let mut catalog = Catalog::default();
    for (key, service) in services {
        let raw: RawTool = serde_json::from_value(service)
            .map_err(|e| AgentError::ConfigFormatError(format!("services.{}: {}", key, e)))?;
        let name = raw.name.clone().unwrap_or_else(|| key.clone());
        catalog.entries.push(raw.into_entry(name, Some(key))?);
    }
    if let Some(agent_tools) = agent_tools {
        catalog.agent_tools = parse_agent_tools(agent_tools)?;
    }
    Ok(catalog)
}

/// agent_tools: `{ agent: { tools: [..] } }` 或 `{ agent: [..] }`
fn parse_agent_tools(value: Value) -> Result<BTreeMap<String, Vec<String>>, AgentError> {
    let Value::Object(map) = value else {
        return Err(AgentError::ConfigFormatError("`agent_tools` must be a mapping".to_string()));
    };
    let mut out = BTreeMap::new();
    for (agent, spec) in map {
        let list = match spec {
            Value::Object(mut obj) => obj.remove("tools").unwrap_or(Value::Array(Vec::new())),
            other => other,
        };
        let tools: Vec<String> = serde_json::from_value(list).map_err(|e| {
            AgentError::ConfigFormatError(format!("agent_tools.{}: {}", agent, e))
        })?;
        out.insert(agent, tools);
    }
    Ok(out)
}
