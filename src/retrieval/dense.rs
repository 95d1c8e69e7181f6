//! 稠密向量索引：精确（暴力）L2 近邻检索
//!
//! 距离为平方欧氏距离，越小越相近；同距离时保持语料顺序。

use crate::retrieval::RetrievalError;

/// 一个近邻：语料下标 + 距离
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// 预构建的稠密近邻索引
pub trait DenseIndex: Send + Sync {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 返回距离升序的前 k 个近邻
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, RetrievalError>;
}

/// 扁平 L2 索引
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatL2Index {
    /// 所有向量维度必须一致且非零
    pub fn new(vectors: Vec<Vec<f32>>) -> Result<Self, RetrievalError> {
        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if vectors.is_empty() || dimension == 0 {
            return Err(RetrievalError::EmptyCorpus);
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(RetrievalError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }
        Ok(Self { dimension, vectors })
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl DenseIndex for FlatL2Index {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, RetrievalError> {
        if query.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, v)| Neighbor {
                index,
                distance: squared_l2(query, v),
            })
            .collect();
        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }
}
