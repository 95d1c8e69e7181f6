//! Agent 错误类型
//!
//! 各阶段（Planner / Oracle / Critic / Refiner / 工具层）在自身边界内把 AgentError 映射为回退结果，
//! 只有检查点恢复的错误会交给调用方；启动期的配置与语料错误由构建器经 anyhow 上报。

use thiserror::Error;

use crate::retrieval::RetrievalError;

/// Agent 运行过程中可能出现的错误（模型调用、解析、工具、检索等）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    LlmError(String),

    /// 单次外部调用超过配置的超时时间
    #[error("LLM call timed out after {0}s")]
    LlmTimeout(u64),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    /// 模型输出缺少必需字段（如计划中没有 steps）
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for tool {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
}
