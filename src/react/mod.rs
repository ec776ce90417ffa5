//! 认知层：Planner（子问题规划）、Critic（反馈评估）、Synthesizer（引用综合）与 Prompt 模板

pub mod critic;
pub mod planner;
pub mod prompts;
pub mod synthesis;

pub use critic::{parse_critique, Critic, CritiqueOutcome, CRITIQUE_PARSE_FAILED_PREFIX};
pub use planner::{parse_plan, Planner, SubQuestion, DEGRADED_PLAN_REASON};
pub use synthesis::{format_citations, Synthesizer};
