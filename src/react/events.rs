//! 工作流过程事件：供前端展示阶段进度、计划、工具调用、评审与最终结果

use serde::Serialize;

use crate::core::Termination;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// 进入某个阶段（第几步）
    StageEntered { stage: String, step: usize },
    /// 计划已生成
    PlanCreated { steps: Vec<String>, fallback: bool },
    /// 调用工具
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览，避免过长）
    Observation { tool: String, preview: String },
    /// 评审结果
    Evaluation {
        overall_score: f64,
        needs_refinement: bool,
    },
    /// 答案已精修（第几次）
    Refined { pass: usize },
    /// 运行结束
    Finished {
        termination: Termination,
        answer: Option<String>,
    },
    /// 错误（已被回退路径吸收）
    Error { text: String },
}
