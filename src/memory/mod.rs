//! 记忆层：对话历史、压缩上下文与 token 估算

pub mod conversation;
pub mod token_budget;

pub use conversation::{
    CompressionPolicy, ConversationMemory, MemorySnapshot, Message, Role, TurnRole, FALLBACK_SUMMARY,
};
pub use token_budget::TokenEstimator;
