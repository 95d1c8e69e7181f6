//! 检索语料：只读的段落列表 + 稠密索引 + BM25 索引
//!
//! 语料目录包含 chunks.json（段落）与 embeddings.json（与段落一一对应的向量），
//! 任一文件缺失时启动即失败。

use std::path::Path;

use serde::Deserialize;

use crate::retrieval::{Bm25Index, DenseIndex, FlatL2Index, RetrievalError};

pub const CHUNKS_FILE: &str = "chunks.json";
pub const EMBEDDINGS_FILE: &str = "embeddings.json";

/// 语料中的一个段落；index 是它在稠密与词法索引中的稳定下标
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// 只读语料
pub struct Corpus {
    chunks: Vec<Chunk>,
    dense: Box<dyn DenseIndex>,
    lexical: Bm25Index,
}

/// 段落分词（BM25 索引用）：小写，按非字母数字字符切分
pub fn tokenize_passage(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

impl Corpus {
    /// 由段落与已构建的稠密索引组装语料，BM25 索引在此构建
    pub fn new(texts: Vec<String>, dense: Box<dyn DenseIndex>) -> Result<Self, RetrievalError> {
        if texts.is_empty() {
            return Err(RetrievalError::EmptyCorpus);
        }
        if dense.len() != texts.len() {
            return Err(RetrievalError::Index(format!(
                "dense index has {} vectors for {} chunks",
                dense.len(),
                texts.len()
            )));
        }
        let lexical = Bm25Index::new(texts.iter().map(|t| tokenize_passage(t)).collect());
        let chunks = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk { index, text })
            .collect();
        Ok(Self {
            chunks,
            dense,
            lexical,
        })
    }

    /// 段落 + 预计算向量，使用扁平 L2 索引
    pub fn from_embeddings(
        texts: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self, RetrievalError> {
        let dense = FlatL2Index::new(vectors)?;
        Self::new(texts, Box::new(dense))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn dense(&self) -> &dyn DenseIndex {
        self.dense.as_ref()
    }

    pub fn lexical(&self) -> &Bm25Index {
        &self.lexical
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChunkRecord {
    Text(String),
    Object { text: String },
}

impl ChunkRecord {
    fn into_text(self) -> String {
        match self {
            ChunkRecord::Text(t) | ChunkRecord::Object { text: t } => t,
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, RetrievalError> {
    if !path.exists() {
        return Err(RetrievalError::MissingFile(path.to_path_buf()));
    }
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|e| RetrievalError::Parse(format!("{}: {}", path.display(), e)))
}

/// 从语料目录加载：chunks.json + embeddings.json
pub fn load_corpus(dir: impl AsRef<Path>) -> Result<Corpus, RetrievalError> {
    let dir = dir.as_ref();
    let records: Vec<ChunkRecord> = read_json(&dir.join(CHUNKS_FILE))?;
    let vectors: Vec<Vec<f32>> = read_json(&dir.join(EMBEDDINGS_FILE))?;
    let texts: Vec<String> = records.into_iter().map(ChunkRecord::into_text).collect();
    if texts.len() != vectors.len() {
        return Err(RetrievalError::Index(format!(
            "{} chunks but {} embeddings",
            texts.len(),
            vectors.len()
        )));
    }
    let corpus = Corpus::from_embeddings(texts, vectors)?;
    tracing::info!(chunks = corpus.len(), dir = %dir.display(), "corpus loaded");
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        match load_corpus(dir.path()) {
            Err(RetrievalError::MissingFile(p)) => assert!(p.ends_with(CHUNKS_FILE)),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected MissingFile"),
        }
    }

    #[test]
    fn test_load_mixed_chunk_records() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CHUNKS_FILE),
            r#"["Pneumonia is an infection.", {"text": "Angina causes chest pain."}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join(EMBEDDINGS_FILE), "[[0.1, 0.2], [0.3, 0.4]]").unwrap();
        let corpus = load_corpus(dir.path()).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.chunk(1).unwrap().text, "Angina causes chest pain.");
        assert_eq!(corpus.dense().dimension(), 2);
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CHUNKS_FILE), r#"["a", "b"]"#).unwrap();
        std::fs::write(dir.path().join(EMBEDDINGS_FILE), "[[0.1]]").unwrap();
        assert!(matches!(load_corpus(dir.path()), Err(RetrievalError::Index(_))));
    }

    #[test]
    fn test_tokenize_passage() {
        assert_eq!(
            tokenize_passage("Chest X-ray: bilateral opacities."),
            vec!["chest", "x", "ray", "bilateral", "opacities"]
        );
    }
}
