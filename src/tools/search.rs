//! 搜索后端：按 ToolEntry 声明的方式发起 HTTP 调用
//!
//! GET 将渲染后的参数模板作为查询参数；POST 作为 JSON 体。请求带超时与 User-Agent；
//! 凭据以 Bearer 方式发送。返回原始响应文本，归一化由 ToolRegistry 完成。
//! 传输失败与非 2xx 状态码统一转为 ToolInvocationError，本层不做重试。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::core::AgentError;
use crate::tools::{InvocationMethod, ToolEntry};

/// 搜索后端 trait：对一个 ToolEntry 执行一次查询，返回原始响应文本
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn fetch(&self, entry: &ToolEntry, query: &str) -> Result<String, AgentError>;
}

/// HTTP 搜索后端（reqwest）
pub struct HttpSearchBackend {
    client: Client,
}

impl HttpSearchBackend {
    pub fn new(timeout_secs: u64) -> Self {
        const USER_AGENT: &str = concat!("research-agent/", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

/// 参数对象转为查询参数对（非字符串值按 JSON 文本）
fn query_pairs(params: &Value) -> Vec<(String, String)> {
    params
        .as_object()
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), v)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn fetch(&self, entry: &ToolEntry, query: &str) -> Result<String, AgentError> {
        let invocation_err = |cause: String| AgentError::ToolInvocationError {
            tool: entry.name.clone(),
            cause,
        };

        let params = entry.render_params(query);
        let mut request = match entry.method {
            InvocationMethod::Get => self.client.get(&entry.endpoint).query(&query_pairs(&params)),
            InvocationMethod::Post => self.client.post(&entry.endpoint).json(&params),
        };
        for (k, v) in &entry.headers {
            request = request.header(k.as_str(), v.as_str());
        }
        if let Some(key) = &entry.api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!(tool = %entry.name, endpoint = %entry.endpoint, method = ?entry.method, "search backend request");
        let resp = request
            .send()
            .await
            .map_err(|e| invocation_err(format!("Request failed: {}", e)))?;
        if !resp.status().is_success() {
            return Err(invocation_err(format!("HTTP {}", resp.status())));
        }
        resp.text()
            .await
            .map_err(|e| invocation_err(format!("Read body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_pairs() {
        let pairs = query_pairs(&json!({"q": "rust async", "limit": 5}));
        assert_eq!(
            pairs,
            vec![
                ("q".to_string(), "rust async".to_string()),
                ("limit".to_string(), "5".to_string())
            ]
        );
        assert!(query_pairs(&json!("scalar")).is_empty());
    }
}
