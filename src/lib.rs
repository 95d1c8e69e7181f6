//! Triage - 多角色临床诊断智能体
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、会话状态、路由、主控循环、检查点
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）与嵌入提供方
//! - **memory**: 对话消息
//! - **react**: 计划、Action 解析、Planner / Oracle / Critic / Refiner
//! - **retrieval**: 混合检索（稠密 + BM25 融合 + 交叉编码器重排）
//! - **tools**: 工具（search、final_answer、detect_chest_xray）与执行器
//! - **observability**: 日志初始化

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod retrieval;
pub mod tools;

pub use crate::core::{Controller, RunReport, SessionState};
