//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient：输入有序的角色消息，返回一段文本补全。

use std::time::Duration;

use async_trait::async_trait;

use crate::core::AgentError;
use crate::memory::Message;

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 在超时内完成一次调用；超时与调用失败都转为 AgentError，由各阶段映射到回退路径
pub async fn complete_within(
    llm: &dyn LlmClient,
    messages: &[Message],
    timeout_secs: u64,
) -> Result<String, AgentError> {
    match tokio::time::timeout(Duration::from_secs(timeout_secs), llm.complete(messages)).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(AgentError::LlmError(e)),
        Err(_) => Err(AgentError::LlmTimeout(timeout_secs)),
    }
}
