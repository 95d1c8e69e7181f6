//! Oracle（Executor）：每轮一次模型调用，产出一条 Action
//!
//! prompt = 角色 system（含工具列表，executor 时附计划）+ 对话历史 + 原始查询 + scratchpad + 继续提示。
//! 回复解析为工具调用或最终答案；调用失败时以固定错误提示作为最终答案。

use std::sync::Arc;

use crate::core::SessionState;
use crate::llm::{complete_within, LlmClient};
use crate::memory::Message;
use crate::react::prompts::{continuation_message, system_prompt_with_plan};
use crate::react::{parse_model_reply, scratchpad, Action};
use crate::tools::{tool_call_schema_json, ToolExecutor};

pub struct Oracle {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolExecutor>,
    timeout_secs: u64,
}

impl Oracle {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<ToolExecutor>, timeout_secs: u64) -> Self {
        Self {
            llm,
            tools,
            timeout_secs,
        }
    }

    /// 组装本轮发给模型的消息
    pub fn build_messages(&self, state: &SessionState) -> Vec<Message> {
        let role_prompt = system_prompt_with_plan(state.role, state.plan.as_ref());
        let system = format!(
            "{}\n\nTo call a tool, reply with only a JSON object of this shape:\n{}\nOtherwise reply with the final diagnosis as plain text.",
            self.tools.registry().tools_prompt(&role_prompt),
            tool_call_schema_json()
        );

        let mut pad = scratchpad(&state.trail);
        if !pad.is_empty() {
            pad.push(Message::user(continuation_message(&state.query, state.plan.as_ref())));
        }

        let mut messages = Vec::with_capacity(state.history.len() + pad.len() + 2);
        messages.push(Message::system(system));
        messages.extend(state.history.iter().cloned());
        messages.push(Message::user(state.query.clone()));
        messages.extend(pad);
        messages
    }

    /// 执行一轮：追加 Action 到轨迹；最终答案同时覆盖当前输出，并在计划未完成时推进一步
    pub async fn run(&self, state: &mut SessionState) -> Action {
        let messages = self.build_messages(state);
        tracing::info!(role = %state.role.profile().name, trail = state.trail.len(), "oracle turn");

        let action = match complete_within(self.llm.as_ref(), &messages, self.timeout_secs).await {
            Ok(raw) => {
                tracing::debug!(response = %raw, "oracle response");
                let action = parse_model_reply(&raw).into_action();
                if action.is_final_answer() {
                    if let Some(plan) = state.plan.as_mut() {
                        if !plan.is_complete() {
                            plan.advance();
                        }
                    }
                }
                action
            }
            Err(e) => {
                tracing::warn!(error = %e, "oracle call failed");
                Action::tool_error()
            }
        };

        if action.is_final_answer() {
            state.push_final_answer(action.clone());
        } else {
            state.trail.push(action.clone());
        }
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AgentRole;
    use crate::llm::ScriptedLlmClient;
    use crate::memory::Role;
    use crate::react::{Plan, TOOL_ERROR_MESSAGE};
    use crate::tools::{FinalAnswerTool, ToolRegistry};
    use serde_json::{Map, Value};

    fn executor() -> Arc<ToolExecutor> {
        let mut registry = ToolRegistry::new();
        registry.register(FinalAnswerTool);
        Arc::new(ToolExecutor::new(registry, 5))
    }

    fn state() -> SessionState {
        let mut state = SessionState::new("chest pain for 3 days");
        state.plan = Some(Plan::new(
            vec!["gather history".into(), "search literature".into(), "form diagnosis".into()],
            "r",
        ));
        state.role = AgentRole::Executor;
        state
    }

    #[tokio::test]
    async fn test_tool_call_is_appended_pending() {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"name": "search", "parameters": {"query": "angina"}}"#]));
        let oracle = Oracle::new(llm, executor(), 5);
        let mut state = state();
        let action = oracle.run(&mut state).await;
        assert_eq!(action.tool_name, "search");
        assert!(!action.is_executed());
        assert_eq!(state.trail.len(), 1);
        assert_eq!(state.plan.as_ref().unwrap().cursor, 0);
        assert!(state.output.is_none());
    }

    #[tokio::test]
    async fn test_final_answer_advances_plan_and_sets_output() {
        let llm = Arc::new(ScriptedLlmClient::new(["Diagnosis: stable angina"]));
        let oracle = Oracle::new(llm, executor(), 5);
        let mut state = state();
        oracle.run(&mut state).await;
        assert_eq!(state.plan.as_ref().unwrap().cursor, 1);
        assert_eq!(state.answer(), Some("Diagnosis: stable angina"));
        assert!(state.last_action().unwrap().is_final_answer());
    }

    #[tokio::test]
    async fn test_call_failure_yields_error_action() {
        let llm = Arc::new(ScriptedLlmClient::from_results([Err("connection refused".to_string())]));
        let oracle = Oracle::new(llm, executor(), 5);
        let mut state = state();
        let action = oracle.run(&mut state).await;
        assert_eq!(action.tool_output.as_deref(), Some(TOOL_ERROR_MESSAGE));
        assert_eq!(state.plan.as_ref().unwrap().cursor, 0);
    }

    #[test]
    fn test_messages_include_scratchpad_and_continuation() {
        let oracle = Oracle::new(Arc::new(ScriptedLlmClient::default()), executor(), 5);
        let mut state = state();
        state.history.push(Message::user("planning prompt"));
        let mut args = Map::new();
        args.insert("query".into(), Value::String("angina".into()));
        state.trail.push(Action::tool_call("search", args).with_output("Angina pectoris ..."));

        let messages = oracle.build_messages(&state);
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("CURRENT PLAN STEP: gather history"));
        assert!(messages[0].content.contains("Tools:"));
        assert_eq!(messages[2].content, "chest pain for 3 days");
        assert_eq!(messages[3].role, Role::Assistant);
        assert_eq!(messages[4].content, "Angina pectoris ...");
        assert!(messages[5].content.starts_with("You are on step: \"gather history\""));
    }
}
