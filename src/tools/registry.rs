//! 工具注册表
//!
//! 从工具目录加载全部 ToolEntry（按输入顺序，同名条目后者覆盖前者但保留原位置），
//! 提供名称解析（请求名 -> 优先列表 -> 任一已知工具）与调用（后端请求 + 响应归一化）。
//! 构建后只读，可在多个会话间共享；重新加载需要重建注册表。

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::core::AgentError;
use crate::tools::{
    load_catalog, normalize, Catalog, HttpSearchBackend, SearchBackend, SearchResultItem,
    ToolEntry,
};

/// 工具注册表：logical name -> ToolEntry，附带 agent 优先工具映射与调用后端
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
    index: HashMap<String, usize>,
    agent_tools: BTreeMap<String, Vec<String>>,
    backend: Arc<dyn SearchBackend>,
    max_raw_chars: usize,
}

impl ToolRegistry {
    pub fn new(backend: Arc<dyn SearchBackend>, max_raw_chars: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            agent_tools: BTreeMap::new(),
            backend,
            max_raw_chars,
        }
    }

    /// 从目录文件构建（HTTP 后端，超时与截断长度取自配置）
    pub fn load(path: &Path, cfg: &AppConfig) -> Result<Self, AgentError> {
        let catalog = load_catalog(path)?;
        let backend = Arc::new(HttpSearchBackend::new(cfg.tools.timeout_secs));
        let registry = Self::from_catalog(catalog, backend, cfg.tools.max_raw_chars);
        tracing::info!(path = %path.display(), tools = ?registry.tool_names(), "tool registry loaded");
        Ok(registry)
    }

    pub fn from_catalog(
        catalog: Catalog,
        backend: Arc<dyn SearchBackend>,
        max_raw_chars: usize,
    ) -> Self {
        let mut registry = Self::new(backend, max_raw_chars);
        for entry in catalog.entries {
            registry.register(entry);
        }
        registry.agent_tools = catalog.agent_tools;
        registry
    }

    /// 注册条目；同名时覆盖并保留首次出现的位置
    pub fn register(&mut self, entry: ToolEntry) {
        match self.index.get(&entry.name) {
            Some(&idx) => {
                tracing::warn!(tool = %entry.name, "duplicate tool name in catalog, later entry wins");
                self.entries[idx] = entry;
            }
            None => {
                self.index.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.index.get(name).map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// 按注册顺序返回全部工具名
    pub fn tool_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 在 [requested] + preferred + 其余已知工具中返回第一个存在的名称；注册表为空时 NoToolAvailable。
    /// 只要至少配置了一个工具，解析总会成功；需要严格匹配的调用方应自行比较返回值与请求名。
    pub fn resolve(&self, requested: &str, preferred: &[String]) -> Result<String, AgentError> {
        std::iter::once(requested)
            .chain(preferred.iter().map(String::as_str))
            .find(|name| self.contains(name))
            .map(str::to_string)
            .or_else(|| self.entries.first().map(|e| e.name.clone()))
            .ok_or(AgentError::NoToolAvailable)
    }

    /// 某个 agent 的优先工具列表：agent_tools 中的引用可以是工具名或服务 key；
    /// 配置的默认搜索工具名（若已注册）总是排在最前
    pub fn preferred_tools_for(&self, agent_key: &str, search_tool_name: &str) -> Vec<String> {
        let mut preferred: Vec<String> = Vec::new();
        if let Some(refs) = self.agent_tools.get(agent_key) {
            for tool_ref in refs {
                let name = if self.contains(tool_ref) {
                    Some(tool_ref.clone())
                } else {
                    self.entries
                        .iter()
                        .find(|e| e.server_key.as_deref() == Some(tool_ref.as_str()))
                        .map(|e| e.name.clone())
                };
                match name {
                    Some(n) if !preferred.contains(&n) => preferred.push(n),
                    Some(_) => {}
                    None => tracing::warn!(agent = %agent_key, tool = %tool_ref, "preferred tool not in catalog"),
                }
            }
        }
        if self.contains(search_tool_name) {
            preferred.retain(|n| n != search_tool_name);
            preferred.insert(0, search_tool_name.to_string());
        }
        preferred
    }

    /// 调用工具并归一化结果；传输错误以 ToolInvocationError 返回，不重试
    pub async fn invoke(&self, name: &str, query: &str) -> Result<Vec<SearchResultItem>, AgentError> {
        let entry = self
            .get(name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;

        let start = Instant::now();
        let result = self.backend.fetch(entry, query).await;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": name,
            "ok": result.is_ok(),
            "duration_ms": start.elapsed().as_millis() as u64,
            "query_preview": query.chars().take(200).collect::<String>(),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        let raw = result?;
        tracing::debug!(tool = %name, bytes = raw.len(), "raw search response");
        Ok(normalize(&raw, self.max_raw_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::InvocationMethod;
    use async_trait::async_trait;

    struct StaticBackend(&'static str);

    #[async_trait]
    impl SearchBackend for StaticBackend {
        async fn fetch(&self, _entry: &ToolEntry, _query: &str) -> Result<String, AgentError> {
            Ok(self.0.to_string())
        }
    }

    fn entry(name: &str) -> ToolEntry {
        ToolEntry::new(name, format!("http://{}.local", name), InvocationMethod::Get)
    }

    fn registry(names: &[&str]) -> ToolRegistry {
        let mut r = ToolRegistry::new(Arc::new(StaticBackend("[]")), 100);
        for n in names {
            r.register(entry(n));
        }
        r
    }

    #[test]
    fn test_resolve_falls_back_to_sole_tool() {
        let r = registry(&["web_search"]);
        assert_eq!(r.resolve("missing_name", &[]).unwrap(), "web_search");
    }

    #[test]
    fn test_resolve_empty_registry_fails() {
        let r = registry(&[]);
        assert!(matches!(
            r.resolve("web_search", &["x".to_string()]),
            Err(AgentError::NoToolAvailable)
        ));
    }

    #[test]
    fn test_resolve_order() {
        let r = registry(&["a", "b", "c"]);
        assert_eq!(r.resolve("b", &["c".to_string()]).unwrap(), "b");
        assert_eq!(
            r.resolve("zzz", &["nope".to_string(), "c".to_string()]).unwrap(),
            "c"
        );
        assert_eq!(r.resolve("zzz", &[]).unwrap(), "a");
    }

    #[test]
    fn test_duplicate_name_last_wins_in_place() {
        let mut r = registry(&["a", "b"]);
        r.register(ToolEntry::new("a", "http://override.local", InvocationMethod::Post));
        assert_eq!(r.tool_names(), vec!["a", "b"]);
        assert_eq!(r.get("a").unwrap().endpoint, "http://override.local");
    }

    #[test]
    fn test_preferred_tools_maps_server_keys() {
        let mut catalog = Catalog::default();
        let mut bing = entry("web_search");
        bing.server_key = Some("bing".into());
        let mut ddg = entry("ddg_search");
        ddg.server_key = Some("ddg".into());
        catalog.entries = vec![bing, ddg];
        catalog
            .agent_tools
            .insert("research".into(), vec!["ddg".into(), "unknown".into(), "web_search".into()]);
        let r = ToolRegistry::from_catalog(catalog, Arc::new(StaticBackend("[]")), 100);

        assert_eq!(
            r.preferred_tools_for("research", "web_search"),
            vec!["web_search", "ddg_search"]
        );
        assert_eq!(r.preferred_tools_for("other", "missing"), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_invoke_normalizes() {
        let mut r = ToolRegistry::new(Arc::new(StaticBackend(r#"{"data": [{"title": "A"}]}"#)), 100);
        r.register(entry("web_search"));
        let items = r.invoke("web_search", "q").await.unwrap();
        assert_eq!(items, vec![SearchResultItem::new("A", "", "")]);

        assert!(matches!(
            r.invoke("nope", "q").await,
            Err(AgentError::UnknownTool(_))
        ));
    }
}
