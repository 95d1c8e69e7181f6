//! Critic：对当前答案做五维评分，按质量门槛决定是否进入精修
//!
//! 解析或调用失败时使用固定的中性评分（全部 0.5）并要求精修；
//! 精修次数达到上限后不再转给 Refiner，答案带着未通过的评分交付。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{AgentError, AgentRole, Reflection, SessionState};
use crate::llm::{complete_within, LlmClient};
use crate::memory::Message;
use crate::react::prompts::{critique_prompt, NO_DIAGNOSIS};
use crate::react::strip_code_fence;

pub const DEFAULT_QUALITY_THRESHOLD: f64 = 0.7;

const FALLBACK_CRITIQUE: &str = "Automated evaluation failed. Using default metrics.";

/// 评审指标：五项分量 + 总分（唯一的门槛信号）+ 改进建议
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub factual_correctness: f64,
    pub completeness: f64,
    pub evidence_basis: f64,
    pub logical_coherence: f64,
    pub alternative_considerations: f64,
    pub overall_score: f64,
    pub improvements: Vec<String>,
}

impl EvaluationMetrics {
    pub fn passed_threshold(&self, threshold: f64) -> bool {
        self.overall_score >= threshold
    }

    /// 评审失败时的中性评分
    pub fn fallback() -> Self {
        Self {
            factual_correctness: 0.5,
            completeness: 0.5,
            evidence_basis: 0.5,
            logical_coherence: 0.5,
            alternative_considerations: 0.5,
            overall_score: 0.5,
            improvements: vec![
                "Improve diagnosis with more detailed evidence.".to_string(),
                "Consider alternative diagnoses more thoroughly.".to_string(),
            ],
        }
    }
}

/// 模型回复的宽松形态：缺失分量按 0 处理
#[derive(Debug, Deserialize)]
struct MetricsReply {
    factual_correctness: Option<f64>,
    completeness: Option<f64>,
    evidence_basis: Option<f64>,
    logical_coherence: Option<f64>,
    alternative_considerations: Option<f64>,
    overall_score: Option<f64>,
    improvements: Option<Vec<String>>,
}

fn score(v: Option<f64>) -> f64 {
    v.filter(|s| s.is_finite()).unwrap_or(0.0).clamp(0.0, 1.0)
}

/// 解析评审回复
pub fn parse_metrics(content: &str) -> Result<EvaluationMetrics, AgentError> {
    let reply: MetricsReply =
        serde_json::from_str(content).map_err(|e| AgentError::JsonParseError(e.to_string()))?;
    Ok(EvaluationMetrics {
        factual_correctness: score(reply.factual_correctness),
        completeness: score(reply.completeness),
        evidence_basis: score(reply.evidence_basis),
        logical_coherence: score(reply.logical_coherence),
        alternative_considerations: score(reply.alternative_considerations),
        overall_score: score(reply.overall_score),
        improvements: reply
            .improvements
            .unwrap_or_else(|| vec!["No specific improvements provided".to_string()]),
    })
}

pub struct Critic {
    llm: Arc<dyn LlmClient>,
    timeout_secs: u64,
    threshold: f64,
    max_refinements: usize,
}

impl Critic {
    pub fn new(llm: Arc<dyn LlmClient>, timeout_secs: u64) -> Self {
        Self {
            llm,
            timeout_secs,
            threshold: DEFAULT_QUALITY_THRESHOLD,
            max_refinements: 3,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_refinements(mut self, max_refinements: usize) -> Self {
        self.max_refinements = max_refinements;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// 评审当前答案，写入 reflection 与下一个角色
    pub async fn run(&self, state: &mut SessionState) -> Reflection {
        let diagnosis = state.answer().unwrap_or(NO_DIAGNOSIS).to_string();
        let prompt = critique_prompt(&diagnosis);
        let messages = vec![
            Message::system(AgentRole::Critic.profile().system_prompt),
            Message::user(prompt.clone()),
        ];

        let attempt = complete_within(self.llm.as_ref(), &messages, self.timeout_secs)
            .await
            .and_then(|raw| {
                let content = strip_code_fence(&raw);
                parse_metrics(&content).map(|m| (m, content))
            });

        let reflection = match attempt {
            Ok((metrics, content)) => {
                state.history.push(Message::user(prompt));
                state.history.push(Message::assistant(content.clone()));
                tracing::info!(
                    overall = metrics.overall_score,
                    factual = metrics.factual_correctness,
                    completeness = metrics.completeness,
                    evidence = metrics.evidence_basis,
                    coherence = metrics.logical_coherence,
                    alternatives = metrics.alternative_considerations,
                    "diagnosis evaluated"
                );
                Reflection {
                    needs_refinement: !metrics.passed_threshold(self.threshold),
                    metrics,
                    critique: content,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "evaluation failed, using default metrics");
                Reflection {
                    metrics: EvaluationMetrics::fallback(),
                    critique: FALLBACK_CRITIQUE.to_string(),
                    needs_refinement: true,
                }
            }
        };

        state.role = if reflection.needs_refinement && state.refinements < self.max_refinements {
            AgentRole::Refiner
        } else {
            if reflection.needs_refinement {
                tracing::warn!(
                    refinements = state.refinements,
                    "refinement budget spent, delivering answer below quality threshold"
                );
            }
            AgentRole::Executor
        };
        state.reflection = Some(reflection.clone());
        reflection
    }
}
