//! 主控：驱动诊断状态机
//!
//! 每轮由 next_stage 选出阶段，执行该阶段并把增量合并进会话状态，保存检查点，直到终态或步数上限。
//! 同一时刻只运行一个阶段；模型与工具的失败都已在各阶段内部转为回退结果。

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::core::{
    next_stage, AgentError, Answer, CheckpointStore, Outcome, SessionState, Stage, Termination,
};
use crate::llm::LlmClient;
use crate::react::{
    fallback_plan, Action, Critic, EvaluationMetrics, Oracle, Plan, Planner, Refiner, WorkflowEvent,
    DEFAULT_QUALITY_THRESHOLD,
};
use crate::tools::{ToolExecutor, ToolOutput, FINAL_ANSWER};

/// 工作流参数
#[derive(Debug, Clone, Copy)]
pub struct WorkflowSettings {
    /// 单次模型调用超时（秒）
    pub llm_timeout_secs: u64,
    pub max_steps: usize,
    pub max_refinements: usize,
    pub quality_threshold: f64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            llm_timeout_secs: 60,
            max_steps: 20,
            max_refinements: 3,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
        }
    }
}

/// 本次驱动消耗的 token（客户端累计值之差）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenCounts {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenCounts {
    pub fn between(before: (u64, u64, u64), after: (u64, u64, u64)) -> Self {
        Self {
            prompt_tokens: after.0.saturating_sub(before.0),
            completion_tokens: after.1.saturating_sub(before.1),
            total_tokens: after.2.saturating_sub(before.2),
        }
    }
}

/// 运行报告：交给外部导出的终态结果
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub query: String,
    pub answer: Option<String>,
    pub metrics: Option<EvaluationMetrics>,
    pub passed: bool,
    pub termination: Termination,
    pub steps: usize,
    pub plan: Option<Plan>,
    /// 已结束的运行被恢复时为 0
    pub tokens: TokenCounts,
}

impl RunReport {
    pub fn from_state(run_id: &str, state: &SessionState) -> Self {
        let outcome = state.outcome.clone().unwrap_or(Outcome {
            termination: Termination::StepBudgetExhausted,
            passed: false,
            overall_score: None,
        });
        Self {
            run_id: run_id.to_string(),
            query: state.query.clone(),
            answer: state.answer().map(str::to_string),
            metrics: state.reflection.as_ref().map(|r| r.metrics.clone()),
            passed: outcome.passed,
            termination: outcome.termination,
            steps: state.steps,
            plan: state.plan.clone(),
            tokens: TokenCounts::default(),
        }
    }

    /// 质量提示（未通过时明确标出）
    pub fn quality_note(&self) -> &'static str {
        if self.passed {
            "met quality standards"
        } else {
            "did not meet quality standards"
        }
    }

    /// 扁平的键值记录
    pub fn to_record(&self) -> BTreeMap<String, String> {
        let mut record = BTreeMap::new();
        record.insert("run_id".to_string(), self.run_id.clone());
        record.insert("query".to_string(), self.query.clone());
        record.insert("answer".to_string(), self.answer.clone().unwrap_or_default());
        record.insert("passed".to_string(), self.passed.to_string());
        record.insert("quality".to_string(), self.quality_note().to_string());
        let termination = match self.termination {
            Termination::Accepted => "accepted",
            Termination::StepBudgetExhausted => "step_budget_exhausted",
        };
        record.insert("termination".to_string(), termination.to_string());
        record.insert("steps".to_string(), self.steps.to_string());
        record.insert("prompt_tokens".to_string(), self.tokens.prompt_tokens.to_string());
        record.insert("completion_tokens".to_string(), self.tokens.completion_tokens.to_string());
        record.insert("total_tokens".to_string(), self.tokens.total_tokens.to_string());
        if let Some(m) = &self.metrics {
            for (key, value) in [
                ("factual_correctness", m.factual_correctness),
                ("completeness", m.completeness),
                ("evidence_basis", m.evidence_basis),
                ("logical_coherence", m.logical_coherence),
                ("alternative_considerations", m.alternative_considerations),
                ("overall_score", m.overall_score),
            ] {
                record.insert(key.to_string(), format!("{:.2}", value));
            }
            record.insert("improvements".to_string(), m.improvements.join("; "));
        }
        if let Some(plan) = &self.plan {
            record.insert("plan".to_string(), plan.steps.join("; "));
        }
        record
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > 200 {
        format!("{}...", text.chars().take(200).collect::<String>())
    } else {
        text.to_string()
    }
}

/// 主控：持有各阶段与工具层，会话状态由调用方按运行传入
pub struct Controller {
    llm: Arc<dyn LlmClient>,
    planner: Planner,
    oracle: Oracle,
    critic: Critic,
    refiner: Refiner,
    tools: Arc<ToolExecutor>,
    checkpoints: Option<Arc<dyn CheckpointStore>>,
    events: Option<mpsc::UnboundedSender<WorkflowEvent>>,
    settings: WorkflowSettings,
}

impl Controller {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<ToolExecutor>, settings: WorkflowSettings) -> Self {
        let timeout = settings.llm_timeout_secs;
        Self {
            planner: Planner::new(llm.clone(), timeout),
            oracle: Oracle::new(llm.clone(), tools.clone(), timeout),
            critic: Critic::new(llm.clone(), timeout)
                .with_threshold(settings.quality_threshold)
                .with_max_refinements(settings.max_refinements),
            refiner: Refiner::new(llm.clone(), timeout),
            llm,
            tools,
            checkpoints: None,
            events: None,
            settings,
        }
    }

    pub fn with_checkpoints(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = Some(store);
        self
    }

    pub fn with_events(mut self, tx: mpsc::UnboundedSender<WorkflowEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn settings(&self) -> WorkflowSettings {
        self.settings
    }

    /// 入口前置阶段：新会话的所有字段取空 / 中性默认值，角色为 planner。
    /// 从检查点恢复的状态缺失字段时由反序列化默认值补齐。
    pub fn process_input(query: &str) -> SessionState {
        SessionState::new(query.trim())
    }

    /// 以新的运行 ID 执行一次完整诊断
    pub async fn run(&self, query: &str) -> Result<RunReport, AgentError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(run_id = %run_id, query = %query, "diagnosis run started");
        self.drive(&run_id, Self::process_input(query)).await
    }

    /// 从检查点继续；已结束的运行直接返回报告
    pub async fn resume(&self, run_id: &str) -> Result<RunReport, AgentError> {
        let store = self
            .checkpoints
            .as_ref()
            .ok_or_else(|| AgentError::Checkpoint("no checkpoint store configured".to_string()))?;
        let state = store
            .load(run_id)
            .map_err(|e| AgentError::Checkpoint(e.to_string()))?
            .ok_or_else(|| AgentError::Checkpoint(format!("no checkpoint for run {run_id}")))?;
        tracing::info!(run_id = %run_id, steps = state.steps, "resuming run");
        if state.is_finished() {
            return Ok(RunReport::from_state(run_id, &state));
        }
        self.drive(run_id, state).await
    }

    /// 驱动循环：直到终态或步数上限
    pub async fn drive(&self, run_id: &str, mut state: SessionState) -> Result<RunReport, AgentError> {
        let usage_before = self.llm.token_usage();
        while !state.is_finished() {
            if state.steps >= self.settings.max_steps {
                tracing::warn!(run_id = %run_id, steps = state.steps, "step budget exhausted");
                state.outcome = Some(self.outcome(&state, Termination::StepBudgetExhausted));
                self.checkpoint(run_id, &state);
                self.emit(WorkflowEvent::Finished {
                    termination: Termination::StepBudgetExhausted,
                    answer: state.answer().map(str::to_string),
                });
                break;
            }

            let stage = next_stage(&state);
            tracing::info!(run_id = %run_id, step = state.steps, stage = %stage, "stage");
            self.emit(WorkflowEvent::StageEntered {
                stage: stage.name().to_string(),
                step: state.steps,
            });
            self.step(&stage, &mut state).await;
            state.steps += 1;
            self.checkpoint(run_id, &state);
        }
        let mut report = RunReport::from_state(run_id, &state);
        report.tokens = TokenCounts::between(usage_before, self.llm.token_usage());
        tracing::info!(run_id = %run_id, total_tokens = report.tokens.total_tokens, "run finished");
        Ok(report)
    }

    /// 执行单个阶段
    pub async fn step(&self, stage: &Stage, state: &mut SessionState) {
        match stage {
            Stage::Planner => {
                let plan = self.planner.run(state).await;
                self.emit(WorkflowEvent::PlanCreated {
                    fallback: plan == fallback_plan(),
                    steps: plan.steps,
                });
            }
            Stage::Oracle => self.oracle_turn(state).await,
            Stage::Critic => {
                let reflection = self.critic.run(state).await;
                self.emit(WorkflowEvent::Evaluation {
                    overall_score: reflection.metrics.overall_score,
                    needs_refinement: reflection.needs_refinement,
                });
            }
            Stage::Refiner => {
                if self.refiner.run(state).await {
                    self.emit(WorkflowEvent::Refined {
                        pass: state.refinements,
                    });
                }
            }
            Stage::Tool(_) => self.tool_turn(state).await,
            Stage::ToolError(name) => {
                let e = AgentError::UnknownTool(name.clone());
                tracing::warn!(error = %e, "tool dispatch failed");
                self.emit(WorkflowEvent::Error { text: e.to_string() });
                state.push_final_answer(Action::tool_error());
            }
            Stage::FinalAnswer => self.deliver(state).await,
        }
    }

    async fn oracle_turn(&self, state: &mut SessionState) {
        let action = self.oracle.run(state).await;
        if !action.is_final_answer() {
            self.emit(WorkflowEvent::ToolCall {
                tool: action.tool_name.clone(),
                args: Value::Object(action.tool_input.clone()),
            });
        }
    }

    /// 工具阶段：执行最后一条待执行的 Action 并原地填入输出；
    /// 已执行过的 Action 表示该轮观察已就绪，转为一轮 Oracle
    async fn tool_turn(&self, state: &mut SessionState) {
        let Some(pending) = state.last_action().filter(|a| !a.is_executed()).cloned() else {
            self.oracle_turn(state).await;
            return;
        };

        match self.tools.execute_action(&pending).await {
            Ok(done) => {
                self.emit(WorkflowEvent::Observation {
                    tool: done.tool_name.clone(),
                    preview: preview(done.tool_output.as_deref().unwrap_or_default()),
                });
                if let Some(last) = state.trail.last_mut() {
                    *last = done;
                }
            }
            Err(e) => {
                tracing::warn!(tool = %pending.tool_name, error = %e, "tool execution failed");
                self.emit(WorkflowEvent::Error { text: e.to_string() });
                state.push_final_answer(Action::tool_error());
            }
        }
    }

    /// 终态：经 final_answer 工具交付当前答案（精修后的文本优先）
    async fn deliver(&self, state: &mut SessionState) {
        let text = state
            .answer()
            .or_else(|| state.last_action().and_then(|a| a.tool_output.as_deref()))
            .unwrap_or_default()
            .to_string();
        let mut args = Map::new();
        args.insert("answer".to_string(), Value::String(text.clone()));

        match self.tools.execute(FINAL_ANSWER, args).await {
            Ok(ToolOutput::Answer(answer)) => state.output = Some(answer),
            Ok(other) => state.output = Some(Answer { answer: other.to_string() }),
            Err(e) => {
                tracing::warn!(error = %e, "final_answer tool failed, delivering answer as is");
                state.output = Some(Answer { answer: text });
            }
        }

        let outcome = self.outcome(state, Termination::Accepted);
        tracing::info!(
            passed = outcome.passed,
            overall = ?outcome.overall_score,
            "diagnosis delivered"
        );
        state.outcome = Some(outcome);
        self.emit(WorkflowEvent::Finished {
            termination: Termination::Accepted,
            answer: state.answer().map(str::to_string),
        });
    }

    fn outcome(&self, state: &SessionState, termination: Termination) -> Outcome {
        let metrics = state.reflection.as_ref().map(|r| &r.metrics);
        Outcome {
            termination,
            passed: metrics.is_some_and(|m| m.passed_threshold(self.settings.quality_threshold)),
            overall_score: metrics.map(|m| m.overall_score),
        }
    }

    /// 保存失败只记录日志，运行继续（不带检查点）
    fn checkpoint(&self, run_id: &str, state: &SessionState) {
        if let Some(store) = &self.checkpoints {
            if let Err(e) = store.save(run_id, state) {
                tracing::warn!(run_id = %run_id, error = %e, "checkpoint save failed");
            }
        }
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
