//! 工具集合：封闭枚举，未知工具名只会在解析边界出现一次

use serde::{Deserialize, Serialize};

pub const SEARCH: &str = "search";
pub const FINAL_ANSWER: &str = "final_answer";
pub const DETECT_CHEST_XRAY: &str = "detect_chest_xray";

/// 已注册的工具种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Search,
    FinalAnswer,
    DetectChestXray,
}

impl ToolKind {
    /// 固定顺序，用于生成工具 prompt
    pub const ALL: [ToolKind; 3] = [ToolKind::Search, ToolKind::FinalAnswer, ToolKind::DetectChestXray];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Search => SEARCH,
            ToolKind::FinalAnswer => FINAL_ANSWER,
            ToolKind::DetectChestXray => DETECT_CHEST_XRAY,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_lookup() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("shell"), None);
    }
}
