//! 路由：由会话状态决定下一个阶段
//!
//! 纯函数，不读取任何外部状态；同一状态永远得到同一阶段，可从检查点重放。

use serde::{Deserialize, Serialize};

use crate::core::{AgentRole, SessionState};
use crate::tools::ToolKind;

/// 状态机的阶段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "tool", rename_all = "snake_case")]
pub enum Stage {
    Planner,
    Oracle,
    Critic,
    Refiner,
    /// 执行最后一条 Action 的工具
    Tool(ToolKind),
    /// 最后一条 Action 的工具名不在工具集合内
    ToolError(String),
    /// 终态：交付答案
    FinalAnswer,
}

impl Stage {
    pub fn name(&self) -> &str {
        match self {
            Stage::Planner => "planner",
            Stage::Oracle => "oracle",
            Stage::Critic => "critic",
            Stage::Refiner => "refiner",
            Stage::Tool(kind) => kind.name(),
            Stage::ToolError(name) => name,
            Stage::FinalAnswer => "final_answer",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::FinalAnswer)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 转移函数（按优先级）：
/// 1. 没有计划 -> planner
/// 2. 轨迹为空 -> oracle
/// 3. 最后一条是最终答案且尚未评审：输出非空 -> critic，否则 -> oracle
/// 4. 角色为 refiner / critic -> 对应阶段
/// 5. 最后一条不是最终答案 -> 该工具的阶段
/// 6. 否则 -> final_answer（终态）
pub fn next_stage(state: &SessionState) -> Stage {
    if state.plan.is_none() {
        return Stage::Planner;
    }
    let Some(last) = state.last_action() else {
        return Stage::Oracle;
    };

    if last.is_final_answer() && state.reflection.is_none() {
        return if last.has_non_empty_output() {
            Stage::Critic
        } else {
            Stage::Oracle
        };
    }

    match state.role {
        AgentRole::Refiner => Stage::Refiner,
        AgentRole::Critic => Stage::Critic,
        _ if !last.is_final_answer() => match ToolKind::from_name(&last.tool_name) {
            Some(kind) => Stage::Tool(kind),
            None => Stage::ToolError(last.tool_name.clone()),
        },
        _ => Stage::FinalAnswer,
    }
}
