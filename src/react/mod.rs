//! 认知层：计划、Action 与回复解析、各角色 prompt、Planner / Oracle / Critic / Refiner

pub mod action;
pub mod critic;
pub mod events;
pub mod oracle;
pub mod plan;
pub mod planner;
pub mod prompts;
pub mod refiner;

pub use action::{parse_model_reply, scratchpad, strip_code_fence, Action, ModelReply, TOOL_ERROR_MESSAGE};
pub use critic::{parse_metrics, Critic, EvaluationMetrics, DEFAULT_QUALITY_THRESHOLD};
pub use events::WorkflowEvent;
pub use oracle::Oracle;
pub use plan::Plan;
pub use planner::{fallback_plan, parse_plan, Planner};
pub use prompts::RoleProfile;
pub use refiner::Refiner;
