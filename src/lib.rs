//! Research Agent - 多轮研究助手
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、会话阶段、AgentBuilder、ResearchAgent 状态机
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 对话记忆、摘要压缩与 token 估算
//! - **observability**: tracing 初始化
//! - **react**: Planner、Critic、Synthesizer 与提示词
//! - **tools**: 工具目录、注册表、HTTP 搜索后端、响应归一化与搜索分发

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;

pub use crate::core::{AgentBuilder, AgentError, ResearchAgent};
