//! 混合检索引擎
//!
//! 1. 规范化查询 -> 清洗词元
//! 2. 两个嵌入模型分别编码并逐元素平均（维度不一致时只用第一个）
//! 3. 稠密检索取前 dense_candidates 个候选
//! 4. fusion_score = -distance + bm25，稳定降序，取前 fused_limit 个
//! 5. 交叉编码器用原始查询重排，取前 rerank_top_k 个
//!
//! 任一步失败都直接返回错误，不产生部分结果。

use std::sync::Arc;

use crate::llm::EmbeddingProvider;
use crate::retrieval::{Corpus, Neighbor, QueryNormalizer, Reranker, RetrievalError};

/// 检索规模参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalSettings {
    pub dense_candidates: usize,
    pub fused_limit: usize,
    pub rerank_top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            dense_candidates: 60,
            fused_limit: 30,
            rerank_top_k: 30,
        }
    }
}

/// 检索结果：换行拼接的上下文 + 有序段落
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub context: String,
    pub passages: Vec<String>,
}

/// 融合后的候选
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedCandidate {
    pub index: usize,
    pub score: f64,
}

/// 融合稠密距离与 BM25 分数：距离取负后相加，稳定降序（同分保持稠密检索顺序），取前 limit 个。
/// 下标超出 lexical 长度的近邻被丢弃。
pub fn fuse(neighbors: &[Neighbor], lexical: &[f64], limit: usize) -> Vec<FusedCandidate> {
    let mut fused: Vec<FusedCandidate> = neighbors
        .iter()
        .filter(|n| n.index < lexical.len())
        .map(|n| FusedCandidate {
            index: n.index,
            score: -(n.distance as f64) + lexical[n.index],
        })
        .collect();
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    fused.truncate(limit);
    fused
}

/// 混合检索器：语料只读，可跨会话共享
pub struct HybridRetriever {
    corpus: Arc<Corpus>,
    normalizer: Arc<dyn QueryNormalizer>,
    primary: Arc<dyn EmbeddingProvider>,
    secondary: Arc<dyn EmbeddingProvider>,
    reranker: Arc<dyn Reranker>,
    settings: RetrievalSettings,
}

impl HybridRetriever {
    pub fn new(
        corpus: Arc<Corpus>,
        normalizer: Arc<dyn QueryNormalizer>,
        primary: Arc<dyn EmbeddingProvider>,
        secondary: Arc<dyn EmbeddingProvider>,
        reranker: Arc<dyn Reranker>,
    ) -> Self {
        Self {
            corpus,
            normalizer,
            primary,
            secondary,
            reranker,
            settings: RetrievalSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RetrievalSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> RetrievalSettings {
        self.settings
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// 两个嵌入模型编码后逐元素平均；维度不一致时退回第一个模型的向量
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let first = self
            .primary
            .embed(text)
            .await
            .map_err(RetrievalError::Embedding)?;
        let second = self
            .secondary
            .embed(text)
            .await
            .map_err(RetrievalError::Embedding)?;
        if first.len() != second.len() {
            tracing::warn!(
                primary = first.len(),
                secondary = second.len(),
                "inconsistent embedding dimensions, using primary model"
            );
            return Ok(first);
        }
        Ok(first
            .iter()
            .zip(&second)
            .map(|(a, b)| (a + b) / 2.0)
            .collect())
    }

    /// 检索查询相关段落
    pub async fn search(&self, query: &str) -> Result<Retrieval, RetrievalError> {
        let tokens = self.normalizer.normalize(query);
        let cleaned = if tokens.is_empty() {
            // 全部是停用词时退回原始查询编码
            query.trim().to_lowercase()
        } else {
            tokens.join(" ")
        };
        let embedding = self.embed_query(&cleaned).await?;

        let neighbors = self
            .corpus
            .dense()
            .search(&embedding, self.settings.dense_candidates)?;
        let lexical = self.corpus.lexical().scores(&tokens);
        let fused = fuse(&neighbors, &lexical, self.settings.fused_limit);

        let candidates: Vec<String> = fused
            .iter()
            .filter_map(|c| self.corpus.chunk(c.index).map(|ch| ch.text.clone()))
            .collect();
        let order = self
            .reranker
            .rerank(query, &candidates, self.settings.rerank_top_k)
            .await?;
        let passages: Vec<String> = order
            .into_iter()
            .filter_map(|i| candidates.get(i).cloned())
            .collect();

        tracing::debug!(
            query = %query,
            cleaned = %cleaned,
            dense = neighbors.len(),
            fused = fused.len(),
            passages = passages.len(),
            "hybrid search"
        );

        Ok(Retrieval {
            context: passages.join("\n"),
            passages,
        })
    }
}
