//! 查询规范化：小写、去停用词、去掉非字母词元
//!
//! 词形还原依赖外部 NLP 模型，通过 QueryNormalizer trait 接入；默认实现不做还原。

use std::collections::HashSet;

/// 将自由文本查询转换为清洗后的词元序列（同时用于向量化与 BM25 打分）
pub trait QueryNormalizer: Send + Sync {
    fn normalize(&self, text: &str) -> Vec<String>;
}

const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// 默认规范化：按非字母数字字符切分，保留纯字母且不在停用词表中的小写词元
pub struct StopwordNormalizer {
    stopwords: HashSet<String>,
}

impl StopwordNormalizer {
    pub fn new() -> Self {
        Self::with_stopwords(ENGLISH_STOPWORDS.iter().map(|s| s.to_string()))
    }

    pub fn with_stopwords(words: impl IntoIterator<Item = String>) -> Self {
        Self {
            stopwords: words.into_iter().map(|w| w.to_lowercase()).collect(),
        }
    }
}

impl Default for StopwordNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryNormalizer for StopwordNormalizer {
    fn normalize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty() && t.chars().all(char::is_alphabetic))
            .filter(|t| !self.stopwords.contains(*t))
            .map(String::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_stopwords_and_numbers() {
        let tokens = StopwordNormalizer::new().normalize("Chest pain for 3 days, worse at night.");
        assert_eq!(tokens, vec!["chest", "pain", "days", "worse", "night"]);
    }

    #[test]
    fn test_empty_query() {
        assert!(StopwordNormalizer::new().normalize("  the of  ").is_empty());
    }
}
