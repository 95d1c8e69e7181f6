pub mod detect;
pub mod executor;
pub mod final_answer;
pub mod kind;
pub mod registry;
pub mod schema;
pub mod search;

pub use detect::{random_findings, DetectChestXrayTool, CHEXPERT_LABELS, NO_FINDING};
pub use executor::ToolExecutor;
pub use final_answer::FinalAnswerTool;
pub use kind::{ToolKind, DETECT_CHEST_XRAY, FINAL_ANSWER, SEARCH};
pub use registry::{bind_args, Tool, ToolOutput, ToolRegistry};
pub use schema::{parameters_schema, tool_call_schema_json};
pub use search::SearchTool;
