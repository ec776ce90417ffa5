//! 搜索响应归一化
//!
//! 按固定顺序依次尝试形态匹配器，把后端原始响应转为统一的 SearchResultItem 列表：
//! 1. 响应本身是列表 -> 直接逐项转换
//! 2. 响应是对象且含已知结果字段（RESULT_FIELDS 顺序）-> 取该字段的列表
//! 3. 其他 JSON -> 整体包装为一条合成结果
//! 4. 非 JSON 文本 -> 包装为一条结果，snippet 为截断后的原文（HTML 先提取可读文本）

use html2text::from_read;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 对象响应中承载结果列表的字段，按优先级排列
pub const RESULT_FIELDS: [&str; 5] = ["results", "data", "items", "hits", "organic_results"];

const TITLE_KEYS: [&str; 2] = ["title", "name"];
const SNIPPET_KEYS: [&str; 4] = ["snippet", "content", "description", "text"];
const URL_KEYS: [&str; 3] = ["url", "link", "href"];

/// 统一的搜索结果条目；三个字段总是存在，可以为空
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub url: String,
}

impl SearchResultItem {
    pub fn new(title: impl Into<String>, snippet: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            url: url.into(),
        }
    }
}

/// 识别出的响应形态
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseShape {
    /// 顶层即列表
    ItemList(Vec<Value>),
    /// 对象中的结果字段
    ResultsField { field: &'static str, items: Vec<Value> },
    /// 其他可解析的 JSON
    Opaque(Value),
    /// 非 JSON 文本
    Unparseable(String),
}

type ShapeMatcher = fn(&Value) -> Option<ResponseShape>;

/// 形态匹配器，按顺序尝试，首个命中者生效
const MATCHERS: [ShapeMatcher; 2] = [match_item_list, match_results_field];

fn match_item_list(value: &Value) -> Option<ResponseShape> {
    value.as_array().map(|items| ResponseShape::ItemList(items.clone()))
}

fn match_results_field(value: &Value) -> Option<ResponseShape> {
    let obj = value.as_object()?;
    RESULT_FIELDS.iter().find_map(|field| {
        obj.get(*field)
            .and_then(Value::as_array)
            .map(|items| ResponseShape::ResultsField {
                field: *field,
                items: items.clone(),
            })
    })
}

/// 对原始响应文本分类
pub fn classify(raw: &str) -> ResponseShape {
    let trimmed = raw.trim_start_matches('\u{FEFF}');
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => classify_value(value),
        Err(_) => ResponseShape::Unparseable(trimmed.to_string()),
    }
}

pub fn classify_value(value: Value) -> ResponseShape {
    MATCHERS
        .iter()
        .find_map(|m| m(&value))
        .unwrap_or(ResponseShape::Opaque(value))
}

/// 归一化原始响应文本；max_chars 限制合成条目的 snippet 长度
pub fn normalize(raw: &str, max_chars: usize) -> Vec<SearchResultItem> {
    normalize_shape(classify(raw), max_chars)
}

pub fn normalize_shape(shape: ResponseShape, max_chars: usize) -> Vec<SearchResultItem> {
    match shape {
        ResponseShape::ItemList(items) | ResponseShape::ResultsField { items, .. } => {
            items.iter().filter_map(item_from_value).collect()
        }
        ResponseShape::Opaque(Value::Null) => Vec::new(),
        // 整个响应序列化进 snippet；title / url 若存在则另外取出
        ResponseShape::Opaque(value) => {
            let pick = |keys: &[&str]| -> String {
                value
                    .as_object()
                    .and_then(|obj| keys.iter().find_map(|k| obj.get(*k).map(value_to_text)))
                    .unwrap_or_default()
            };
            let title = match pick(&TITLE_KEYS) {
                t if t.is_empty() => "(raw response)".to_string(),
                t => t,
            };
            let url = pick(&URL_KEYS);
            vec![SearchResultItem::new(
                title,
                truncate_chars(&value.to_string(), max_chars),
                url,
            )]
        }
        ResponseShape::Unparseable(text) => {
            let text = if looks_like_html(&text) {
                html_to_text(&text)
            } else {
                text
            };
            vec![SearchResultItem::new(
                "(unparsed response)",
                truncate_chars(text.trim(), max_chars),
                "",
            )]
        }
    }
}

/// 单个 JSON 值转为结果条目：对象按已知键取字段（一个都没有时整体序列化为 snippet），
/// 字符串作为 snippet，null 跳过
fn item_from_value(value: &Value) -> Option<SearchResultItem> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(SearchResultItem::new("", s.clone(), "")),
        Value::Object(obj) => {
            let pick = |keys: &[&str]| -> Option<String> {
                keys.iter().find_map(|k| obj.get(*k).map(value_to_text))
            };
            let title = pick(&TITLE_KEYS);
            let snippet = pick(&SNIPPET_KEYS);
            let url = pick(&URL_KEYS);
            if title.is_none() && snippet.is_none() && url.is_none() {
                return Some(SearchResultItem::new("", value.to_string(), ""));
            }
            Some(SearchResultItem {
                title: title.unwrap_or_default(),
                snippet: snippet.unwrap_or_default(),
                url: url.unwrap_or_default(),
            })
        }
        other => Some(SearchResultItem::new("", other.to_string(), "")),
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// 按字符截断，超出时追加 ...[truncated]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect::<String>() + "...[truncated]"
    } else {
        text.to_string()
    }
}

/// 简易去除 HTML 标签（html2text 失败时的回退）
fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 判断内容是否像 HTML（需提取可读文本）
fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("<!")
        || s.starts_with("<html")
        || s.starts_with("<HTML")
        || (s.len() > 20
            && s.contains('<')
            && (s.contains("</") || s.contains("<head") || s.contains("<title")))
}

fn html_to_text(html: &str) -> String {
    match from_read(html.as_bytes(), 120) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => strip_html_tags(html),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_passes_through_unchanged() {
        let items = vec![
            SearchResultItem::new("A", "alpha", "https://a.example"),
            SearchResultItem::new("B", "", ""),
        ];
        let raw = serde_json::to_string(&items).unwrap();
        assert_eq!(normalize(&raw, 100), items);
    }

    #[test]
    fn test_data_field_extracted() {
        let out = normalize(r#"{"data": [{"title": "A"}]}"#, 100);
        assert_eq!(out, vec![SearchResultItem::new("A", "", "")]);
    }

    #[test]
    fn test_field_priority_order() {
        let shape = classify_value(json!({
            "items": [{"title": "from items"}],
            "results": [{"title": "from results"}]
        }));
        match shape {
            ResponseShape::ResultsField { field, items } => {
                assert_eq!(field, "results");
                assert_eq!(items.len(), 1);
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_non_json_wrapped_as_single_item() {
        let out = normalize("not json", 100);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].snippet, "not json");
    }

    #[test]
    fn test_non_json_truncated() {
        let raw = "x".repeat(50);
        let out = normalize(&raw, 10);
        assert_eq!(out[0].snippet, format!("{}...[truncated]", "x".repeat(10)));
    }

    #[test]
    fn test_opaque_mapping_keeps_data() {
        let out = normalize(r#"{"answer": 42, "status": "ok"}"#, 1000);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "(raw response)");
        assert!(out[0].snippet.contains("\"answer\":42"));
    }

    #[test]
    fn test_opaque_with_known_keys_keeps_whole_body() {
        let out = normalize(
            r#"{"url": "https://x.example", "answer": "forty-two", "score": 0.9}"#,
            1000,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "(raw response)");
        assert_eq!(out[0].url, "https://x.example");
        assert!(out[0].snippet.contains("forty-two"));
        assert!(out[0].snippet.contains("\"score\":0.9"));

        let out = normalize(r#"{"title": "T", "extra": "kept"}"#, 10);
        assert_eq!(out[0].title, "T");
        assert!(out[0].snippet.ends_with("...[truncated]"));
    }

    #[test]
    fn test_alternate_item_keys() {
        let out = normalize(
            r#"{"results": [{"name": "Rust", "description": "A language", "link": "https://rust-lang.org"}, null, "plain"]}"#,
            100,
        );
        assert_eq!(
            out,
            vec![
                SearchResultItem::new("Rust", "A language", "https://rust-lang.org"),
                SearchResultItem::new("", "plain", ""),
            ]
        );
    }

    #[test]
    fn test_null_response_is_empty() {
        assert!(normalize("null", 100).is_empty());
    }

    #[test]
    fn test_html_body_converted_to_text() {
        let out = normalize(
            "<html><head><title>T</title></head><body><p>Hello research</p></body></html>",
            500,
        );
        assert_eq!(out.len(), 1);
        assert!(out[0].snippet.contains("Hello research"));
        assert!(!out[0].snippet.contains("<p>"));
    }
}
