//! 核心编排层：错误与降级结果、会话阶段、构建器、Research 主控状态机

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod state;

pub use builder::AgentBuilder;
pub use error::{AgentError, CompressionOutcome, Outcome};
pub use orchestrator::{
    AskReport, CritiqueReport, ExportedState, ResearchAgent, CRITIQUE_SUBQ_REASON,
    SUPPLEMENT_HEADING,
};
pub use state::ResearchPhase;
