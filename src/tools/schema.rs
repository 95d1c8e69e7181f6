//! 工具相关 JSON Schema 生成（schemars）
//!
//! - 合法 tool call 的整体格式，拼入 executor 的 system prompt
//! - 各工具参数结构体的 schema，供注册表渲染工具列表

use schemars::{schema_for, JsonSchema};
use serde_json::{Map, Value};

/// 工具调用回复格式：与 parse_model_reply 识别的 `{"name": "...", "parameters": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，如 search、detect_chest_xray
    pub name: String,
    /// 工具参数，键为参数名，值为字符串
    pub parameters: std::collections::HashMap<String, String>,
}

/// 返回工具调用的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// 参数结构体的 schema（去掉 $schema / title，只保留 type / properties / required）
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    match serde_json::to_value(&schema) {
        Ok(Value::Object(mut obj)) => {
            obj.remove("$schema");
            obj.remove("title");
            Value::Object(obj)
        }
        _ => {
            let mut obj = Map::new();
            obj.insert("type".to_string(), Value::String("object".to_string()));
            Value::Object(obj)
        }
    }
}
