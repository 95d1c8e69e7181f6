//! BM25 (Okapi) 词法索引
//!
//! 对整段语料打分：idf 为负的词用 epsilon * 平均 idf 代替，避免高频词拉低分数。

use std::collections::HashMap;

/// BM25 参数
#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

/// 已分词语料上的 BM25 索引（构建后只读）
#[derive(Debug, Clone)]
pub struct Bm25Index {
    params: Bm25Params,
    doc_freqs: Vec<HashMap<String, usize>>,
    doc_len: Vec<usize>,
    avgdl: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Index {
    pub fn new(corpus: Vec<Vec<String>>) -> Self {
        Self::with_params(corpus, Bm25Params::default())
    }

    pub fn with_params(corpus: Vec<Vec<String>>, params: Bm25Params) -> Self {
        let mut doc_freqs = Vec::with_capacity(corpus.len());
        let mut doc_len = Vec::with_capacity(corpus.len());
        // 词 -> 包含该词的文档数
        let mut nd: HashMap<String, usize> = HashMap::new();

        for doc in corpus {
            doc_len.push(doc.len());
            let mut freqs: HashMap<String, usize> = HashMap::new();
            for token in doc {
                *freqs.entry(token).or_insert(0) += 1;
            }
            for token in freqs.keys() {
                *nd.entry(token.clone()).or_insert(0) += 1;
            }
            doc_freqs.push(freqs);
        }

        let n = doc_len.len() as f64;
        let avgdl = if doc_len.is_empty() {
            0.0
        } else {
            doc_len.iter().sum::<usize>() as f64 / n
        };

        let mut idf = HashMap::with_capacity(nd.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (word, freq) in nd {
            let freq = freq as f64;
            let value = (n - freq + 0.5).ln() - (freq + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(word.clone());
            }
            idf.insert(word, value);
        }
        if !idf.is_empty() {
            let eps = params.epsilon * idf_sum / idf.len() as f64;
            for word in negative {
                idf.insert(word, eps);
            }
        }

        Self {
            params,
            doc_freqs,
            doc_len,
            avgdl,
            idf,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_len.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_len.is_empty()
    }

    /// 查询词元对每个文档的分数（下标与语料一致）；重复词元重复计分
    pub fn scores(&self, query: &[String]) -> Vec<f64> {
        let Bm25Params { k1, b, .. } = self.params;
        let mut scores = vec![0.0; self.len()];
        if self.avgdl <= 0.0 {
            return scores;
        }
        for token in query {
            let Some(idf) = self.idf.get(token) else {
                continue;
            };
            for (i, freqs) in self.doc_freqs.iter().enumerate() {
                let tf = freqs.get(token).copied().unwrap_or(0) as f64;
                if tf == 0.0 {
                    continue;
                }
                let norm = 1.0 - b + b * self.doc_len[i] as f64 / self.avgdl;
                scores[i] += idf * (tf * (k1 + 1.0)) / (tf + k1 * norm);
            }
        }
        scores
    }
}
