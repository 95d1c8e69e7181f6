//! 会话状态：一次诊断运行的唯一可变记录
//!
//! 由 Controller 独占；每个阶段读取当前状态并原地合并自己的增量。
//! 对话历史与行动轨迹只追加；计划与反思只会被整体替换。

use serde::{Deserialize, Serialize};

use crate::memory::Message;
use crate::react::{Action, EvaluationMetrics, Plan};

/// 当前活跃角色
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    #[default]
    Planner,
    Executor,
    Critic,
    Refiner,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Planner => "planner",
            AgentRole::Executor => "executor",
            AgentRole::Critic => "critic",
            AgentRole::Refiner => "refiner",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// final_answer 工具的单字段记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
}

/// Critic 的结构化评审
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub metrics: EvaluationMetrics,
    /// 评审原文（回退时为固定说明）
    pub critique: String,
    pub needs_refinement: bool,
}

/// 运行结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// 到达 final_answer 终态
    Accepted,
    /// 阶段数达到 max_steps 上限
    StepBudgetExhausted,
}

/// 运行结果元数据（终止时写入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub termination: Termination,
    /// 最后一次评审是否通过质量门槛；未评审时为 false
    pub passed: bool,
    pub overall_score: Option<f64>,
}

/// 会话状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// 原始查询
    pub query: String,
    pub history: Vec<Message>,
    pub trail: Vec<Action>,
    pub plan: Option<Plan>,
    /// 当前答案；每次产生最终答案时整体覆盖
    pub output: Option<Answer>,
    pub reflection: Option<Reflection>,
    pub role: AgentRole,
    pub outcome: Option<Outcome>,
    /// 已执行的阶段数（用于 max_steps 上限与断点续跑）
    pub steps: usize,
    /// 已执行的精修次数（用于 max_refinements 上限）
    pub refinements: usize,
}

impl SessionState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn last_action(&self) -> Option<&Action> {
        self.trail.last()
    }

    /// 当前答案文本
    pub fn answer(&self) -> Option<&str> {
        self.output.as_ref().map(|o| o.answer.as_str())
    }

    /// 追加一条最终答案 Action，并以其文本覆盖当前答案
    pub fn push_final_answer(&mut self, action: Action) {
        if let Some(text) = action.tool_output.clone() {
            self.output = Some(Answer { answer: text });
        }
        self.trail.push(action);
    }

    /// 运行已终止
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_fields_get_neutral_defaults() {
        let state: SessionState = serde_json::from_str(r#"{"query": "cough"}"#).unwrap();
        assert_eq!(state.query, "cough");
        assert!(state.trail.is_empty());
        assert!(state.history.is_empty());
        assert!(state.plan.is_none());
        assert!(state.reflection.is_none());
        assert_eq!(state.role, AgentRole::Planner);
    }

    #[test]
    fn test_push_final_answer_overwrites_output() {
        let mut state = SessionState::new("q");
        state.push_final_answer(Action::final_answer("first"));
        state.push_final_answer(Action::final_answer("second"));
        assert_eq!(state.answer(), Some("second"));
        assert_eq!(state.trail.len(), 2);
    }
}
