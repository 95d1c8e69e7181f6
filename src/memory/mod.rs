//! 记忆层：会话内对话历史的消息类型

pub mod conversation;

pub use conversation::{Message, Role};
