//! 混合检索层：稠密近邻 + BM25 词法打分融合，再经交叉编码器重排
//!
//! 语料与索引在启动时构建一次，运行期只读，可在多个会话间共享。

pub mod bm25;
pub mod corpus;
pub mod dense;
pub mod engine;
pub mod normalize;
pub mod rerank;

use std::path::PathBuf;

use thiserror::Error;

pub use bm25::{Bm25Index, Bm25Params};
pub use corpus::{load_corpus, tokenize_passage, Chunk, Corpus, CHUNKS_FILE, EMBEDDINGS_FILE};
pub use dense::{DenseIndex, FlatL2Index, Neighbor};
pub use engine::{fuse, FusedCandidate, HybridRetriever, Retrieval, RetrievalSettings};
pub use normalize::{QueryNormalizer, StopwordNormalizer};
pub use rerank::{HttpReranker, PassthroughReranker, Reranker};

/// 检索错误：全部对 search 调用是致命的（无部分结果模式）
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Corpus file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corpus parse error: {0}")]
    Parse(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Rerank failed: {0}")]
    Rerank(String),

    #[error("Corpus is empty")]
    EmptyCorpus,
}
