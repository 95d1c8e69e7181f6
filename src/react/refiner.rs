//! Refiner：按评审建议改写当前答案，然后交回 Critic 复评
//!
//! 调用失败时保留原答案并回到 executor，打断精修循环。

use std::sync::Arc;

use crate::core::{AgentRole, Answer, SessionState};
use crate::llm::{complete_within, LlmClient};
use crate::memory::Message;
use crate::react::prompts::{refinement_prompt, NO_DIAGNOSIS};

pub struct Refiner {
    llm: Arc<dyn LlmClient>,
    timeout_secs: u64,
}

impl Refiner {
    pub fn new(llm: Arc<dyn LlmClient>, timeout_secs: u64) -> Self {
        Self { llm, timeout_secs }
    }

    /// 返回是否成功改写
    pub async fn run(&self, state: &mut SessionState) -> bool {
        state.refinements += 1;
        let diagnosis = state.answer().unwrap_or(NO_DIAGNOSIS).to_string();
        let improvements = state
            .reflection
            .as_ref()
            .map(|r| r.metrics.improvements.clone())
            .unwrap_or_default();
        let prompt = refinement_prompt(&diagnosis, &improvements);
        let messages = vec![
            Message::system(AgentRole::Refiner.profile().system_prompt),
            Message::user(prompt.clone()),
        ];

        match complete_within(self.llm.as_ref(), &messages, self.timeout_secs).await {
            Ok(raw) => {
                let refined = raw.trim().to_string();
                state.history.push(Message::user(prompt));
                state.history.push(Message::assistant(refined.clone()));
                state.output = Some(Answer { answer: refined });
                state.role = AgentRole::Critic;
                tracing::info!(pass = state.refinements, "diagnosis refined");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "refinement failed, keeping current answer");
                state.role = AgentRole::Executor;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Reflection;
    use crate::llm::ScriptedLlmClient;
    use crate::react::{Action, EvaluationMetrics};

    fn state() -> SessionState {
        let mut state = SessionState::new("q");
        state.push_final_answer(Action::final_answer("Pneumonia"));
        state.reflection = Some(Reflection {
            metrics: EvaluationMetrics::fallback(),
            critique: String::new(),
            needs_refinement: true,
        });
        state.role = AgentRole::Refiner;
        state
    }

    #[tokio::test]
    async fn test_refined_answer_replaces_output() {
        let llm = Arc::new(ScriptedLlmClient::new(["  Community-acquired pneumonia, CURB-65 of 1.  "]));
        let mut state = state();
        assert!(Refiner::new(llm.clone(), 5).run(&mut state).await);
        assert_eq!(state.answer(), Some("Community-acquired pneumonia, CURB-65 of 1."));
        assert_eq!(state.role, AgentRole::Critic);
        assert_eq!(state.refinements, 1);
        let prompt = &llm.calls()[0][1].content;
        assert!(prompt.contains("- Consider alternative diagnoses more thoroughly."));
    }

    #[tokio::test]
    async fn test_failure_keeps_output() {
        let llm = Arc::new(ScriptedLlmClient::from_results([Err("503".to_string())]));
        let mut state = state();
        assert!(!Refiner::new(llm, 5).run(&mut state).await);
        assert_eq!(state.answer(), Some("Pneumonia"));
        assert_eq!(state.role, AgentRole::Executor);
        assert!(state.history.is_empty());
    }
}
