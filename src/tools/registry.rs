//! 工具注册表
//!
//! 所有工具实现 Tool trait（kind / description / parameters_schema / execute），由 ToolRegistry 按 ToolKind 注册，
//! 按名称查找时先经 ToolKind::from_name，未知名称直接得到 UnknownTool。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::{AgentError, Answer};
use crate::tools::ToolKind;

/// 工具返回值：检测标签列表 / 检索上下文与段落 / 单字段答案
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Labels(Vec<String>),
    Retrieval { context: String, passages: Vec<String> },
    Answer(Answer),
}

/// 写入 Action.tool_output 的字符串形式
impl std::fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolOutput::Labels(labels) => f.write_str(&labels.join(", ")),
            ToolOutput::Retrieval { context, .. } => f.write_str(context),
            ToolOutput::Answer(a) => f.write_str(&a.answer),
        }
    }
}

/// 工具 trait：种类、描述（供 LLM 理解）、参数 schema、异步执行（args 为命名参数）
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    /// 工具名称（用于回复 JSON 中的 "name" 字段）
    fn name(&self) -> &str {
        self.kind().name()
    }

    fn description(&self) -> &str;

    /// 参数 JSON Schema（对象，属性均为字符串，附 required 列表）
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, args: Map<String, Value>) -> Result<ToolOutput, AgentError>;
}

/// 把命名参数绑定到工具的参数结构体；多余或缺失的参数都会被拒绝
pub fn bind_args<T: DeserializeOwned>(kind: ToolKind, args: Map<String, Value>) -> Result<T, AgentError> {
    serde_json::from_value(Value::Object(args)).map_err(|e| AgentError::InvalidArguments {
        tool: kind.name().to_string(),
        reason: e.to_string(),
    })
}

/// 工具注册表：按 ToolKind 存储 Arc<dyn Tool>
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.kind(), Arc::new(tool));
    }

    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn Tool>> {
        self.tools.get(&kind).cloned()
    }

    /// 按名称解析；名称不在封闭集合内或未注册都视为未知工具
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, AgentError> {
        ToolKind::from_name(name)
            .and_then(|kind| self.get(kind))
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))
    }

    pub async fn execute(&self, name: &str, args: Map<String, Value>) -> Result<ToolOutput, AgentError> {
        self.resolve(name)?.execute(args).await
    }

    /// 已注册工具名（固定顺序）
    pub fn tool_names(&self) -> Vec<&'static str> {
        ToolKind::ALL
            .into_iter()
            .filter(|k| self.tools.contains_key(k))
            .map(|k| k.name())
            .collect()
    }

    /// 动态生成工具 schema JSON，与实际注册的工具一致
    pub fn to_schema_json(&self) -> String {
        let tools: Vec<Value> = ToolKind::ALL
            .into_iter()
            .filter_map(|k| self.tools.get(&k))
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": tool.parameters_schema()
                })
            })
            .collect();
        serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
    }

    /// 在角色 prompt 后追加工具列表
    pub fn tools_prompt(&self, base_prompt: &str) -> String {
        format!("{}\nTools:\n{}", base_prompt, self.to_schema_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FinalAnswerTool;

    #[tokio::test]
    async fn test_unknown_tool_name() {
        let mut registry = ToolRegistry::new();
        registry.register(FinalAnswerTool);
        let err = registry.execute("shell", Map::new()).await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownTool(name) if name == "shell"));
        // 名称合法但未注册
        assert!(registry.resolve("search").is_err());
    }

    #[test]
    fn test_tools_prompt_lists_registered_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(FinalAnswerTool);
        let prompt = registry.tools_prompt("You are a doctor.");
        assert!(prompt.starts_with("You are a doctor.\nTools:\n"));
        assert!(prompt.contains("\"final_answer\""));
        assert!(!prompt.contains("\"search\""));
        assert_eq!(registry.tool_names(), vec!["final_answer"]);
    }

    #[test]
    fn test_output_display() {
        let labels = ToolOutput::Labels(vec!["Edema".into(), "Fracture".into()]);
        assert_eq!(labels.to_string(), "Edema, Fracture");
        let r = ToolOutput::Retrieval {
            context: "a\nb".into(),
            passages: vec!["a".into(), "b".into()],
        };
        assert_eq!(r.to_string(), "a\nb");
    }
}
