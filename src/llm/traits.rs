//! LLM 客户端抽象
//!
//! Completion capability：有序的角色消息进，单条文本出。重试与退避不在此契约内，
//! 调用方自行处理空文本或格式错误的文本。

use async_trait::async_trait;

use crate::memory::Message;

/// LLM 客户端 trait：单次非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
