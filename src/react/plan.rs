//! 诊断计划：有序步骤 + 理由 + 进度游标
//!
//! 游标只会在 Executor 完成一步时前移，且永远不会越过最后一步。

use serde::{Deserialize, Serialize};

/// Planner 生成（或回退）的计划
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<String>,
    pub rationale: String,
    /// 从 0 开始的当前步骤下标
    #[serde(default)]
    pub cursor: usize,
}

impl Plan {
    /// 新计划，游标位于第一步
    pub fn new(steps: Vec<String>, rationale: impl Into<String>) -> Self {
        Self {
            steps,
            rationale: rationale.into(),
            cursor: 0,
        }
    }

    /// 当前步骤；游标越界（空计划）时为 None
    pub fn current_step(&self) -> Option<&str> {
        self.steps.get(self.cursor).map(String::as_str)
    }

    /// 前移一步；已在最后一步时返回 false 且游标不变
    pub fn advance(&mut self) -> bool {
        if self.cursor + 1 < self.steps.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// 游标位于最后一步（空计划视为已完成）
    pub fn is_complete(&self) -> bool {
        self.cursor + 1 >= self.steps.len()
    }

    /// 编号列表，拼入 executor 的 system prompt
    pub fn numbered_steps(&self) -> String {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {}", i + 1, s))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(n: usize) -> Plan {
        Plan::new((0..n).map(|i| format!("step {i}")).collect(), "because")
    }

    #[test]
    fn test_advance_stops_at_last_step() {
        let mut p = plan(3);
        assert!(p.advance());
        assert!(p.advance());
        assert!(p.is_complete());
        assert!(!p.advance());
        assert_eq!(p.cursor, 2);
        assert_eq!(p.current_step(), Some("step 2"));
    }

    #[test]
    fn test_advance_never_passes_last_index() {
        for n in 1..6 {
            let mut p = plan(n);
            for _ in 0..10 {
                let before = p.cursor;
                let was_complete = p.is_complete();
                let moved = p.advance();
                assert_eq!(moved, !was_complete);
                if !moved {
                    assert_eq!(p.cursor, before);
                }
                assert!(p.cursor <= n - 1);
            }
        }
    }

    #[test]
    fn test_single_step_plan_is_complete() {
        let mut p = plan(1);
        assert!(p.is_complete());
        assert!(!p.advance());
    }

    #[test]
    fn test_numbered_steps() {
        let p = Plan::new(vec!["a".into(), "b".into()], "r");
        assert_eq!(p.numbered_steps(), "1. a\n2. b");
    }
}
