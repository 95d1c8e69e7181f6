//! final_answer 工具：把答案包装成单字段记录，由主控直接写入会话输出

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::{AgentError, Answer};
use crate::tools::{bind_args, parameters_schema, Tool, ToolKind, ToolOutput};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FinalAnswerArgs {
    /// The complete diagnosis report
    pub answer: String,
}

pub struct FinalAnswerTool;

#[async_trait]
impl Tool for FinalAnswerTool {
    fn kind(&self) -> ToolKind {
        ToolKind::FinalAnswer
    }

    fn description(&self) -> &str {
        "Return the final diagnosis to the user."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<FinalAnswerArgs>()
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<ToolOutput, AgentError> {
        let args: FinalAnswerArgs = bind_args(self.kind(), args)?;
        Ok(ToolOutput::Answer(Answer { answer: args.answer }))
    }
}
