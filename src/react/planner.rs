//! Planner：一次模型调用生成诊断计划
//!
//! 回复需为 `{"steps": [...], "reasoning": "..."}`（允许 ```json 包裹）；
//! 解析失败、缺少步骤或调用失败时改用固定的五步回退计划，且不把失败的交互写入历史。

use std::sync::Arc;

use serde::Deserialize;

use crate::core::{AgentError, AgentRole, SessionState};
use crate::llm::{complete_within, LlmClient};
use crate::memory::Message;
use crate::react::prompts::planning_prompt;
use crate::react::{strip_code_fence, Plan};

const FALLBACK_STEPS: [&str; 5] = [
    "Understand the patient's symptoms and medical history",
    "Search for relevant medical information",
    "Analyze the available data",
    "Generate a diagnosis based on the evidence",
    "Provide a final diagnostic report",
];

const FALLBACK_RATIONALE: &str = "This is a default diagnostic process when detailed planning failed.";

/// 回退计划
pub fn fallback_plan() -> Plan {
    Plan::new(
        FALLBACK_STEPS.iter().map(|s| s.to_string()).collect(),
        FALLBACK_RATIONALE,
    )
}

#[derive(Debug, Deserialize)]
struct PlanReply {
    #[serde(default)]
    steps: Vec<String>,
    reasoning: Option<String>,
}

/// 解析计划回复；空字符串步骤被丢弃，没有剩余步骤视为格式错误
pub fn parse_plan(content: &str) -> Result<Plan, AgentError> {
    let reply: PlanReply =
        serde_json::from_str(content).map_err(|e| AgentError::JsonParseError(e.to_string()))?;
    let steps: Vec<String> = reply
        .steps
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if steps.is_empty() {
        return Err(AgentError::MalformedOutput("plan has no steps".to_string()));
    }
    Ok(Plan::new(
        steps,
        reply.reasoning.unwrap_or_else(|| "No reasoning provided".to_string()),
    ))
}

/// Planner：持有 LLM 与单次调用超时
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    timeout_secs: u64,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, timeout_secs: u64) -> Self {
        Self { llm, timeout_secs }
    }

    /// 生成计划并写入状态，角色切到 executor；总是返回可用计划
    pub async fn run(&self, state: &mut SessionState) -> Plan {
        let prompt = planning_prompt(&state.query);
        let messages = vec![
            Message::system(AgentRole::Planner.profile().system_prompt),
            Message::user(prompt.clone()),
        ];

        let attempt = complete_within(self.llm.as_ref(), &messages, self.timeout_secs)
            .await
            .and_then(|raw| {
                let content = strip_code_fence(&raw);
                tracing::debug!(response = %content, "planner response");
                parse_plan(&content).map(|plan| (plan, content))
            });

        let plan = match attempt {
            Ok((plan, content)) => {
                state.history.push(Message::user(prompt));
                state.history.push(Message::assistant(content));
                tracing::info!(steps = plan.steps.len(), "diagnosis plan created");
                plan
            }
            Err(e) => {
                tracing::warn!(error = %e, "planning failed, using fallback plan");
                fallback_plan()
            }
        };

        state.plan = Some(plan.clone());
        state.role = AgentRole::Executor;
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ScriptedLlmClient, StalledLlmClient};

    #[tokio::test]
    async fn test_plan_from_model() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"```json
{"steps": ["gather history", "search literature", "form diagnosis"], "reasoning": "standard work-up"}
```"#,
        ]));
        let planner = Planner::new(llm, 5);
        let mut state = SessionState::new("chest pain for 3 days");
        let plan = planner.run(&mut state).await;
        assert_eq!(plan.steps, vec!["gather history", "search literature", "form diagnosis"]);
        assert_eq!(plan.cursor, 0);
        assert_eq!(state.role, AgentRole::Executor);
        assert_eq!(state.history.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_reply_uses_fallback() {
        for reply in ["not json", r#"{"reasoning": "x"}"#, r#"{"steps": ["", "  "]}"#, r#"{"steps": "one"}"#] {
            let planner = Planner::new(Arc::new(ScriptedLlmClient::new([reply])), 5);
            let mut state = SessionState::new("q");
            let plan = planner.run(&mut state).await;
            assert_eq!(plan, fallback_plan());
            assert_eq!(state.role, AgentRole::Executor);
            assert!(state.history.is_empty());
        }
    }

    #[tokio::test]
    async fn test_call_failure_uses_fallback() {
        let planner = Planner::new(Arc::new(ScriptedLlmClient::from_results([Err("down".to_string())])), 5);
        let mut state = SessionState::new("q");
        assert_eq!(planner.run(&mut state).await.steps.len(), 5);
        assert!(state.history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_uses_fallback() {
        let planner = Planner::new(Arc::new(StalledLlmClient), 30);
        let mut state = SessionState::new("q");
        assert_eq!(planner.run(&mut state).await, fallback_plan());
        assert_eq!(state.role, AgentRole::Executor);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_missing_reasoning() {
        let plan = parse_plan(r#"{"steps": ["a"]}"#).unwrap();
        assert_eq!(plan.rationale, "No reasoning provided");
    }
}
