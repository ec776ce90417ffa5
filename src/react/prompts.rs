//! Prompt 模板
//!
//! 占位符以 `{name}` 形式出现，调用方用 str::replace 填充。

pub const SYSTEM_RESEARCH_BASE: &str = "You are a professional research assistant who works systematically.
Your job is to:
1. Analyse the user's question and devise a sensible search strategy
2. Use the web search results you are given as evidence
3. Synthesise the evidence into an accurate, well-reasoned answer
4. Keep the conversation coherent across turns

Stay objective and precise; say so explicitly when the evidence is insufficient.";

pub const PLAN_PROMPT: &str = r#"User question: "{query}"

Devise an information retrieval plan by splitting the question into at most {max_subquestions} sub-questions.
Each sub-question should be:
1. Specific and searchable
2. Complementary to the others, without overlap
3. Useful for answering the user's question in full

Return a JSON array in exactly this format:
[
  {"subq": "first sub-question", "reason": "why this needs to be searched"},
  {"subq": "second sub-question", "reason": "why this needs to be searched"}
]

Return only the JSON array, with no other text."#;

pub const SYNTHESIS_PROMPT: &str = r#"User question: "{query}"

Retrieved snippets (numbered for citation):
{snippets}

Write a complete, accurate answer based on these snippets.
Requirements:
1. Answer the user's question directly
2. Cite sources by their [n] number
3. Keep the structure clear and logical
4. State explicitly where the information is insufficient"#;

pub const CRITIQUE_PROMPT: &str = r#"The user gave this feedback on the previous answer: "{feedback}"

Decide whether you need to:
1. Run new searches to fill gaps
2. Revise or extend the existing answer
3. Clarify particular concepts

Return JSON in exactly this format:
{
  "need_new_search": true,
  "new_subquestions": ["new search question 1", "new search question 2"],
  "improved_answer": "the complete improved answer"
}

If no new search is needed, set need_new_search to false and new_subquestions to an empty array."#;

pub const MEMORY_SUMMARIZE_PROMPT: &str = r#"Below is a conversation transcript. Compress it into one concise summary that keeps the key information and context.

Transcript:
{history}

The summary must:
1. Keep the user's main questions and research goals
2. Keep important findings and conclusions
3. Keep key technical details and concepts
4. Stay under 1000 words

Summary:"#;

/// 单遍填充 `{name}` 占位符：只扫描模板本身，替换进去的值不会被再次展开
pub fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = vars.iter().find(|(key, _)| {
            tail.strip_prefix(*key)
                .is_some_and(|after| after.starts_with('}'))
        });
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
