//! Search 工具：对参考语料做混合检索
//!
//! 返回换行拼接的上下文与有序段落；检索失败（嵌入、索引、重排）原样上抛，由工具层转成错误 Action。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::AgentError;
use crate::retrieval::HybridRetriever;
use crate::tools::{bind_args, parameters_schema, Tool, ToolKind, ToolOutput};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchArgs {
    /// Free-text medical query
    pub query: String,
}

/// Search 工具：共享只读检索器
pub struct SearchTool {
    retriever: Arc<HybridRetriever>,
}

impl SearchTool {
    pub fn new(retriever: Arc<HybridRetriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Search
    }

    fn description(&self) -> &str {
        "Search the medical reference corpus for passages relevant to the query."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<SearchArgs>()
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<ToolOutput, AgentError> {
        let args: SearchArgs = bind_args(self.kind(), args)?;
        let result = self.retriever.search(&args.query).await?;
        Ok(ToolOutput::Retrieval {
            context: result.context,
            passages: result.passages,
        })
    }
}
