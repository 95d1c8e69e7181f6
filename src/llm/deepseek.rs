//! DeepSeek API 客户端（OpenAI 兼容格式）
//!
//! DeepSeek 提供与 OpenAI 完全兼容的 API 接口，诊断流程的各角色共用同一个客户端。
//! - Base URL: https://api.deepseek.com
//! - 模型: deepseek-chat (常规对话), deepseek-reasoner (思考模式)

use crate::llm::OpenAiClient;

/// DeepSeek API 常量
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 模型解析顺序：显式参数 > `DEEPSEEK_MODEL` > deepseek-chat
fn resolve_model(model: Option<&str>, env_model: Option<String>) -> String {
    model
        .map(String::from)
        .or(env_model)
        .unwrap_or_else(|| DEEPSEEK_CHAT.to_string())
}

/// 创建 DeepSeek 客户端
///
/// - 优先使用环境变量 `DEEPSEEK_API_KEY`，其次 `OPENAI_API_KEY`
/// - 模型可通过 `model` 参数（来自 `[llm.deepseek] model` 或 `[llm] model`）或 `DEEPSEEK_MODEL` 环境变量指定
///   - `deepseek-chat`: 常规对话，响应快
///   - `deepseek-reasoner`: 思考模式，计划与评审更稳，但单次调用更慢，需相应调大 `llm.timeouts.request`
pub fn create_deepseek_client(model: Option<&str>) -> OpenAiClient {
    let api_key = std::env::var("DEEPSEEK_API_KEY")
        .ok()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .unwrap_or_else(|| "sk-placeholder".to_string());

    let model = resolve_model(model, std::env::var("DEEPSEEK_MODEL").ok());
    tracing::debug!(model = %model, "deepseek client");

    OpenAiClient::new(Some(DEEPSEEK_BASE_URL), &model, Some(api_key.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_resolution_order() {
        assert_eq!(resolve_model(Some("deepseek-reasoner"), Some("x".into())), "deepseek-reasoner");
        assert_eq!(resolve_model(None, Some("deepseek-reasoner".into())), "deepseek-reasoner");
        assert_eq!(resolve_model(None, None), DEEPSEEK_CHAT);
    }
}
