//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! - MockLlmClient：按 prompt 内容给出确定性的计划 / 工具调用 / 答案 / 评审，能跑通整个诊断流程
//! - ScriptedLlmClient：按顺序返回预设回复，并记录每次收到的消息，供测试断言
//! - StalledLlmClient：永不返回，用于超时路径

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

/// Mock 客户端：先检索一次，再给出答案；评审总是通过
#[derive(Debug, Default)]
pub struct MockLlmClient;

fn last_user(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("(no input)")
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let prompt = last_user(messages);

        if prompt.contains("\"steps\"") {
            return Ok(serde_json::json!({
                "steps": ["Review the presenting symptoms", "Search the reference literature", "Write the diagnosis report"],
                "reasoning": "Mock plan for offline runs."
            })
            .to_string());
        }
        if prompt.contains("overall_score") {
            return Ok(serde_json::json!({
                "factual_correctness": 0.8,
                "completeness": 0.8,
                "evidence_basis": 0.8,
                "logical_coherence": 0.8,
                "alternative_considerations": 0.8,
                "overall_score": 0.8,
                "improvements": []
            })
            .to_string());
        }
        if prompt.contains("IMPROVEMENT AREAS") {
            return Ok("Refined diagnosis (mock).".to_string());
        }

        let searched = messages
            .iter()
            .rposition(|m| m.role == Role::Assistant && m.content.contains("\"search\""));
        if let Some(i) = searched {
            // 助手提出检索后的下一条即检索结果
            let evidence: String = messages
                .get(i + 1)
                .map(|m| m.content.chars().take(200).collect())
                .unwrap_or_default();
            Ok(format!("Preliminary diagnosis (mock) based on: {}", evidence))
        } else {
            Ok(serde_json::json!({
                "name": "search",
                "parameters": { "query": prompt }
            })
            .to_string())
        }
    }
}

/// 脚本化客户端：依次弹出预设回复；用尽后返回错误
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn from_results(replies: impl IntoIterator<Item = Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 已收到的调用（每次调用的完整消息列表）
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        self.replies
            .lock()
            .map_err(|e| e.to_string())?
            .pop_front()
            .unwrap_or_else(|| Err("script exhausted".to_string()))
    }
}

/// 挂起的客户端：每次调用都睡眠一天
#[derive(Debug, Default)]
pub struct StalledLlmClient;

#[async_trait]
impl LlmClient for StalledLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        tokio::time::sleep(Duration::from_secs(86_400)).await;
        Err("stalled".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let llm = ScriptedLlmClient::from_results(vec![Ok("a".to_string()), Err("boom".to_string())]);
        assert_eq!(llm.complete(&[Message::user("x")]).await.unwrap(), "a");
        assert_eq!(llm.complete(&[]).await.unwrap_err(), "boom");
        assert_eq!(llm.complete(&[]).await.unwrap_err(), "script exhausted");
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_searches_first() {
        let reply = MockLlmClient
            .complete(&[Message::system("s"), Message::user("cough")])
            .await
            .unwrap();
        assert!(reply.contains("\"search\""));
    }
}
