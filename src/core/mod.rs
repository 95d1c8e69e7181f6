//! 核心编排层：错误、会话状态、路由、主控循环、检查点、组装

pub mod builder;
pub mod checkpoint;
pub mod error;
pub mod orchestrator;
pub mod router;
pub mod state;

pub use builder::{create_controller, create_llm_from_config};
pub use checkpoint::{CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore};
pub use error::AgentError;
pub use orchestrator::{Controller, RunReport, TokenCounts, WorkflowSettings};
pub use router::{next_stage, Stage};
pub use state::{AgentRole, Answer, Outcome, Reflection, SessionState, Termination};
