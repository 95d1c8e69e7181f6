//! Action：一次工具调用（或最终答案）的记录，以及模型回复的解析
//!
//! 模型回复只有两种形态：`{"name": ..., "parameters": {...}}` 的工具调用，或其它任何文本（视为最终答案）。
//! 行动轨迹（trail）代替对话记忆：每条已有输出的 Action 在下一轮 prompt 中展开为两条消息。

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::memory::Message;
use crate::tools::FINAL_ANSWER;

/// 模型调用或工具执行失败时代替答案的固定提示
pub const TOOL_ERROR_MESSAGE: &str =
    "Error encountered during tool execution. Please check the input and try again.";

/// 一次工具调用：工具名、参数、输出（工具执行前为 None）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub tool_name: String,
    pub tool_input: Map<String, Value>,
    #[serde(default)]
    pub tool_output: Option<String>,
}

impl Action {
    /// 待执行的工具调用
    pub fn tool_call(name: impl Into<String>, input: Map<String, Value>) -> Self {
        Self {
            tool_name: name.into(),
            tool_input: input,
            tool_output: None,
        }
    }

    /// 最终答案：answer 同时作为输入与输出
    pub fn final_answer(answer: impl Into<String>) -> Self {
        let answer = answer.into();
        let mut input = Map::new();
        input.insert("answer".to_string(), Value::String(answer.clone()));
        Self {
            tool_name: FINAL_ANSWER.to_string(),
            tool_input: input,
            tool_output: Some(answer),
        }
    }

    /// 失败时的合成 Action：以固定错误提示作为最终答案
    pub fn tool_error() -> Self {
        Self::final_answer(TOOL_ERROR_MESSAGE)
    }

    pub fn is_final_answer(&self) -> bool {
        self.tool_name == FINAL_ANSWER
    }

    /// 工具已执行（输出已写入）
    pub fn is_executed(&self) -> bool {
        self.tool_output.is_some()
    }

    /// 填入工具输出；已有输出的 Action 保持不变
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        if self.tool_output.is_none() {
            self.tool_output = Some(output.into());
        }
        self
    }

    /// 输出非空（去掉空白后）
    pub fn has_non_empty_output(&self) -> bool {
        self.tool_output
            .as_deref()
            .is_some_and(|o| !o.trim().is_empty())
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tool: {}\nInput: {}",
            self.tool_name,
            Value::Object(self.tool_input.clone())
        )?;
        if let Some(out) = &self.tool_output {
            write!(f, "\nOutput: {}", out)?;
        }
        Ok(())
    }
}

/// 解析后的模型回复
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// 调用工具（名称不是 final_answer）
    ToolCall {
        name: String,
        arguments: Map<String, Value>,
    },
    /// 最终答案：原始文本（已去掉代码块包裹与首尾空白）
    FinalAnswer { text: String },
}

impl ModelReply {
    pub fn into_action(self) -> Action {
        match self {
            ModelReply::ToolCall { name, arguments } => Action::tool_call(name, arguments),
            ModelReply::FinalAnswer { text } => Action::final_answer(text),
        }
    }
}

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)^```[A-Za-z]*\s*|\s*```$").expect("static regex"))
}

/// 去掉 Markdown 代码块包裹（```json ... ```）与首尾空白
pub fn strip_code_fence(raw: &str) -> String {
    code_fence().replace_all(raw.trim(), "").trim().to_string()
}

/// 解析模型回复：含非空 name 与对象 parameters 的 JSON（且 name 不是 final_answer）为工具调用，
/// 其余一律为最终答案，不做部分匹配
pub fn parse_model_reply(raw: &str) -> ModelReply {
    let text = strip_code_fence(raw);
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(&text) {
        if let (Some(Value::String(name)), Some(Value::Object(params))) =
            (obj.get("name"), obj.get("parameters"))
        {
            if !name.trim().is_empty() && name != FINAL_ANSWER {
                return ModelReply::ToolCall {
                    name: name.clone(),
                    arguments: params.clone(),
                };
            }
        }
    }
    ModelReply::FinalAnswer { text }
}

/// 由行动轨迹合成 scratchpad：每条输出非空的 Action 展开为「助手提出调用」+「系统返回结果」两条消息
pub fn scratchpad(trail: &[Action]) -> Vec<Message> {
    trail
        .iter()
        .filter(|action| action.has_non_empty_output())
        .filter_map(|action| {
            action.tool_output.as_ref().map(|out| {
                let proposal = serde_json::json!({
                    "name": action.tool_name,
                    "parameters": action.tool_input,
                });
                [Message::assistant(proposal.to_string()), Message::user(out.clone())]
            })
        })
        .flatten()
        .collect()
}
