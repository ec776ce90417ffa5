//! 工具目录加载集成测试（tempfile）

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;

    use research_agent::config::AppConfig;
    use research_agent::core::{AgentBuilder, AgentError};
    use research_agent::llm::MockLlmClient;
    use research_agent::tools::{load_catalog, InvocationMethod, ToolRegistry};
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_yaml_service_map_with_agent_overlay() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "tools.yaml",
            r#"
services:
  bing:
    name: bing_search
    url: https://bing.local/search
    params:
      q: "{{query}}"
  searxng:
    name: web_search
    url: https://searx.local/search
    method: post
agent_tools:
  research:
    tools: [bing, searxng, ghost]
"#,
        );

        let registry = ToolRegistry::load(&path, &AppConfig::default()).unwrap();
        assert_eq!(registry.tool_names(), vec!["bing_search", "web_search"]);
        assert_eq!(
            registry.get("web_search").unwrap().method,
            InvocationMethod::Post
        );
        assert_eq!(
            registry.get("bing_search").unwrap().render_params("rust"),
            json!({"q": "rust"})
        );

        // 默认搜索工具名排在最前，未知引用被忽略
        assert_eq!(
            registry.preferred_tools_for("research", "web_search"),
            vec!["web_search", "bing_search"]
        );
        assert_eq!(
            registry.resolve("missing", &registry.preferred_tools_for("research", "missing")).unwrap(),
            "bing_search"
        );
    }

    #[test]
    fn test_later_service_wins_name_collision() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "tools.yaml",
            r#"
services:
  zeta:
    name: web
    url: http://z
  alpha:
    name: web
    url: http://a
  beta:
    url: http://b
"#,
        );

        let registry = ToolRegistry::load(&path, &AppConfig::default()).unwrap();
        assert_eq!(registry.tool_names(), vec!["web", "beta"]);
        let web = registry.get("web").unwrap();
        assert_eq!(web.endpoint, "http://a");
        assert_eq!(web.server_key.as_deref(), Some("alpha"));
        assert_eq!(registry.resolve("missing", &[]).unwrap(), "web");
    }

    #[test]
    fn test_json_and_toml_flat_lists() {
        let dir = TempDir::new().unwrap();
        let json_path = write(
            &dir,
            "tools.json",
            r#"{"tools": [{"name": "web_search", "endpoint": "https://a.local", "api_key": "k"}]}"#,
        );
        let toml_path = write(
            &dir,
            "tools.toml",
            r#"
[[tools]]
name = "web_search"
endpoint = "https://b.local"
method = "POST"

[tools.params]
query = "{{query}}"
"#,
        );

        let from_json = load_catalog(&json_path).unwrap();
        assert_eq!(from_json.entries[0].endpoint, "https://a.local");
        assert_eq!(from_json.entries[0].api_key.as_deref(), Some("k"));
        assert_eq!(from_json.entries[0].method, InvocationMethod::Get);

        let from_toml = load_catalog(&toml_path).unwrap();
        assert_eq!(from_toml.entries[0].method, InvocationMethod::Post);
        assert_eq!(
            from_toml.entries[0].render_params("q"),
            json!({"query": "q"})
        );
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            load_catalog(&missing),
            Err(AgentError::ConfigNotFound(p)) if p == missing
        ));

        let broken = write(&dir, "broken.json", "{ not json");
        assert!(matches!(
            load_catalog(&broken),
            Err(AgentError::ConfigFormatError(_))
        ));

        let wrong_shape = write(&dir, "shape.yaml", "endpoints: []\n");
        assert!(matches!(
            load_catalog(&wrong_shape),
            Err(AgentError::ConfigFormatError(_))
        ));
    }

    #[test]
    fn test_builder_loads_catalog_from_config() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "tools.yaml",
            "tools:\n  - name: web_search\n    endpoint: https://a.local\n",
        );
        let mut cfg = AppConfig::default();
        cfg.tools.catalog_path = path;

        let agent = AgentBuilder::new(cfg)
            .with_llm(Arc::new(MockLlmClient::new()))
            .with_summarizer(None)
            .build()
            .unwrap();
        let registry = agent.registry().unwrap();
        assert!(registry.contains("web_search"));
        assert_eq!(agent.preferred_tools(), ["web_search".to_string()]);
    }
}
