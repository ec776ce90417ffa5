//! Research 编排器：会话状态机
//!
//! ask：Planning -> Searching -> Synthesizing -> Answered（用户输入与回答写入记忆，随后按需压缩）。
//! critique：Critiquing -> (需要时) Searching -> Synthesizing -> Answered；补充搜索覆盖全部新子问题，
//! 综合只以第一个新子问题为主题，结果追加在改进回答的固定标题下。
//! continue_dialog：不规划、不搜索，把完整渲染后的记忆交给 LLM。
//! 单会话单线程：所有外部调用依次 await，没有并行也没有取消。

use std::sync::Arc;

use serde::Serialize;

use crate::core::{AgentError, CompressionOutcome, Outcome, ResearchPhase};
use crate::llm::LlmClient;
use crate::memory::{ConversationMemory, Message, TurnRole};
use crate::react::{Critic, CritiqueOutcome, Planner, SubQuestion, Synthesizer};
use crate::tools::{SearchBatch, SearchDispatcher, ToolRegistry};

/// 补充搜索综合在改进回答中的标题
pub const SUPPLEMENT_HEADING: &str = "## Supplementary search synthesis";

/// critique 新增子问题的 reason
pub const CRITIQUE_SUBQ_REASON: &str = "added after user critique";

/// ask 的结果
#[derive(Debug, Clone, Serialize)]
pub struct AskReport {
    pub plan: Outcome<Vec<SubQuestion>>,
    pub search_raw: Vec<SearchBatch>,
    pub answer_markdown: String,
    pub compression: CompressionOutcome,
}

/// critique 的结果；critique_result 中的 improved_answer 已包含补充综合（如有）
#[derive(Debug, Clone, Serialize)]
pub struct CritiqueReport {
    pub critique_result: Outcome<CritiqueOutcome>,
    pub new_search_raw: Vec<SearchBatch>,
    pub compression: CompressionOutcome,
}

/// export_state 的结果
#[derive(Debug, Clone, Serialize)]
pub struct ExportedState {
    pub session_id: String,
    pub compressed_context: Option<String>,
    pub messages: Vec<Message>,
}

/// 单用户多轮 Research Agent
pub struct ResearchAgent {
    session_id: String,
    llm: Arc<dyn LlmClient>,
    summarizer: Option<Arc<dyn LlmClient>>,
    system_prompt: String,
    planner: Planner,
    critic: Critic,
    synthesizer: Synthesizer,
    dispatcher: SearchDispatcher,
    preferred_tools: Vec<String>,
    memory: ConversationMemory,
    phase: ResearchPhase,
}

impl ResearchAgent {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        llm: Arc<dyn LlmClient>,
        summarizer: Option<Arc<dyn LlmClient>>,
        system_prompt: String,
        max_subquestions: usize,
        dispatcher: SearchDispatcher,
        preferred_tools: Vec<String>,
        memory: ConversationMemory,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            planner: Planner::new(llm.clone(), system_prompt.clone(), max_subquestions),
            critic: Critic::new(llm.clone(), system_prompt.clone()),
            synthesizer: Synthesizer::new(llm.clone(), system_prompt.clone()),
            llm,
            summarizer,
            system_prompt,
            dispatcher,
            preferred_tools,
            memory,
            phase: ResearchPhase::Idle,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn phase(&self) -> ResearchPhase {
        self.phase
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn dispatcher(&self) -> &SearchDispatcher {
        &self.dispatcher
    }

    /// 共享的工具注册表；搜索未启用时为 None
    pub fn registry(&self) -> Option<&Arc<ToolRegistry>> {
        self.dispatcher.registry()
    }

    pub fn preferred_tools(&self) -> &[String] {
        &self.preferred_tools
    }

    /// LLM 调用失败时回到 Idle 并向上返回错误
    fn fail<T>(&mut self, err: AgentError) -> Result<T, AgentError> {
        tracing::error!(session = %self.session_id, phase = ?self.phase, error = %err, "research step failed");
        self.phase = ResearchPhase::Idle;
        Err(err)
    }

    async fn compress(&mut self) -> CompressionOutcome {
        self.memory.maybe_compress(self.summarizer.as_deref()).await
    }

    /// 完整研究流程：规划 -> 搜索 -> 综合
    pub async fn ask(&mut self, query: &str) -> Result<AskReport, AgentError> {
        self.memory.append(TurnRole::User, query);

        self.phase = ResearchPhase::Planning;
        let plan = match self.planner.plan(query).await {
            Ok(p) => p,
            Err(e) => return self.fail(e),
        };

        self.phase = ResearchPhase::Searching;
        let search_raw = self
            .dispatcher
            .dispatch(plan.value(), &self.preferred_tools)
            .await;

        self.phase = ResearchPhase::Synthesizing;
        let answer_markdown = match self.synthesizer.synthesize(query, &search_raw).await {
            Ok(a) => a,
            Err(e) => return self.fail(e),
        };

        self.memory.append(TurnRole::Assistant, answer_markdown.clone());
        let compression = self.compress().await;
        self.phase = ResearchPhase::Answered;
        tracing::info!(
            session = %self.session_id,
            subquestions = plan.value().len(),
            degraded_plan = plan.is_degraded(),
            "research answered"
        );

        Ok(AskReport {
            plan,
            search_raw,
            answer_markdown,
            compression,
        })
    }

    /// 用户质疑：评估 -> 按需补充搜索与综合 -> 写回改进回答
    pub async fn critique(&mut self, feedback: &str) -> Result<CritiqueReport, AgentError> {
        let context = self.memory.render();
        self.memory.append(TurnRole::User, feedback);

        self.phase = ResearchPhase::Critiquing;
        let mut critique_result = match self.critic.judge(&context, feedback).await {
            Ok(c) => c,
            Err(e) => return self.fail(e),
        };

        let mut new_search_raw = Vec::new();
        if critique_result.value().wants_search() {
            let new_subquestions = critique_result.value().new_subquestions.clone();
            let plan: Vec<SubQuestion> = new_subquestions
                .iter()
                .map(|q| SubQuestion::new(q.as_str(), CRITIQUE_SUBQ_REASON))
                .collect();

            self.phase = ResearchPhase::Searching;
            new_search_raw = self.dispatcher.dispatch(&plan, &self.preferred_tools).await;

            // 搜索覆盖全部新子问题，综合只围绕第一个
            self.phase = ResearchPhase::Synthesizing;
            let supplement = match self
                .synthesizer
                .synthesize(&new_subquestions[0], &new_search_raw)
                .await
            {
                Ok(s) => s,
                Err(e) => return self.fail(e),
            };
            let improved = &mut critique_result.value_mut().improved_answer;
            improved.push_str("\n\n");
            improved.push_str(SUPPLEMENT_HEADING);
            improved.push('\n');
            improved.push_str(&supplement);
        }

        self.memory
            .append(TurnRole::Assistant, critique_result.value().improved_answer.clone());
        let compression = self.compress().await;
        self.phase = ResearchPhase::Answered;

        Ok(CritiqueReport {
            critique_result,
            new_search_raw,
            compression,
        })
    }

    /// 轻量追问：重放完整渲染记忆，不规划、不搜索
    pub async fn continue_dialog(&mut self, message: &str) -> Result<String, AgentError> {
        self.memory.append(TurnRole::User, message);

        let mut messages = vec![Message::system(self.system_prompt.clone())];
        messages.extend(self.memory.render());
        let reply = match self.llm.complete(&messages).await {
            Ok(r) => r,
            Err(e) => return self.fail(AgentError::LlmError(e)),
        };

        self.memory.append(TurnRole::Assistant, reply.clone());
        self.compress().await;
        self.phase = ResearchPhase::Answered;
        Ok(reply)
    }

    /// 只读导出：压缩上下文与全部保留消息
    pub fn export_state(&self) -> ExportedState {
        let snapshot = self.memory.snapshot();
        ExportedState {
            session_id: self.session_id.clone(),
            compressed_context: snapshot.compressed_context,
            messages: snapshot.messages,
        }
    }
}
