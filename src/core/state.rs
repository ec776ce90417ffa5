//! 状态定义：Research 会话阶段
//!
//! Idle -> Planning -> Searching -> Synthesizing -> Answered -> (可选) Critiquing -> Searching -> Synthesizing -> Answered。
//! Answered 是单轮用户输入的终态；会话本身长期存活，等待下一条输入。

use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ResearchPhase {
    #[default]
    Idle,
    Planning,
    Searching,
    Synthesizing,
    Answered,
    Critiquing,
}
