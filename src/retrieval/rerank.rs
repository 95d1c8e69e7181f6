//! 重排边界：对融合后的候选做交叉编码器二次排序
//!
//! HttpReranker 对接 text-embeddings-inference 风格的 /rerank 端点；
//! 未配置端点时使用 PassthroughReranker，保持融合顺序。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::retrieval::RetrievalError;

/// 交叉编码器重排：返回候选下标的新顺序（最多 top_k 个，不重复）
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        passages: &[String],
        top_k: usize,
    ) -> Result<Vec<usize>, RetrievalError>;
}

/// 不重排，保留输入顺序
#[derive(Debug, Default, Clone)]
pub struct PassthroughReranker;

#[async_trait]
impl Reranker for PassthroughReranker {
    async fn rerank(
        &self,
        _query: &str,
        passages: &[String],
        top_k: usize,
    ) -> Result<Vec<usize>, RetrievalError> {
        Ok((0..passages.len().min(top_k)).collect())
    }
}

#[derive(Debug, Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

/// HTTP 交叉编码器：POST {base_url}/rerank，body {"query", "texts"}，返回 [{index, score}]
pub struct HttpReranker {
    client: Client,
    endpoint: String,
}

impl HttpReranker {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: format!("{}/rerank", base_url.trim_end_matches('/')),
        }
    }
}

/// 按分数降序（稳定）取前 top_k，丢弃越界与重复下标
fn order_hits(mut hits: Vec<RerankHit>, len: usize, top_k: usize) -> Vec<usize> {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    let mut seen = vec![false; len];
    hits.into_iter()
        .filter(|h| h.index < len && !std::mem::replace(&mut seen[h.index], true))
        .map(|h| h.index)
        .take(top_k)
        .collect()
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(
        &self,
        query: &str,
        passages: &[String],
        top_k: usize,
    ) -> Result<Vec<usize>, RetrievalError> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({ "query": query, "texts": passages });
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Rerank(format!("Request failed: {}", e)))?;
        if !resp.status().is_success() {
            return Err(RetrievalError::Rerank(format!("HTTP {}", resp.status())));
        }
        let hits: Vec<RerankHit> = resp
            .json()
            .await
            .map_err(|e| RetrievalError::Rerank(format!("Read body: {}", e)))?;
        Ok(order_hits(hits, passages.len(), top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passthrough_keeps_order() {
        let passages = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let order = PassthroughReranker.rerank("q", &passages, 2).await.unwrap();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn test_order_hits() {
        let hits = vec![
            RerankHit { index: 0, score: 0.1 },
            RerankHit { index: 2, score: 0.9 },
            RerankHit { index: 7, score: 0.95 },
            RerankHit { index: 2, score: 0.5 },
            RerankHit { index: 1, score: 0.4 },
        ];
        assert_eq!(order_hits(hits, 3, 30), vec![2, 1, 0]);
    }

    /// 单次应答的本地 HTTP 桩：返回 (base_url, 收到的请求行与 body)
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<(String, serde_json::Value)>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let (head_end, content_length) = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                    let len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    break (pos + 4, len);
                }
            };
            while buf.len() < head_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
            }
            let request_line = String::from_utf8_lossy(&buf[..head_end])
                .lines()
                .next()
                .unwrap_or_default()
                .to_string();
            let json = serde_json::from_slice(&buf[head_end..head_end + content_length]).unwrap();

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            (request_line, json)
        });
        (url, handle)
    }

    #[tokio::test]
    async fn test_http_reranker_posts_query_and_texts() {
        let (url, server) = serve_once(
            "200 OK",
            r#"[{"index": 1, "score": 0.9}, {"index": 0, "score": 0.2}]"#,
        )
        .await;
        let passages = vec!["asthma".to_string(), "pneumonia".to_string()];
        let order = HttpReranker::new(&url, 5)
            .rerank("productive cough", &passages, 30)
            .await
            .unwrap();
        assert_eq!(order, vec![1, 0]);

        let (request_line, body) = server.await.unwrap();
        assert!(request_line.starts_with("POST /rerank "));
        assert_eq!(
            body,
            serde_json::json!({"query": "productive cough", "texts": ["asthma", "pneumonia"]})
        );
    }

    #[tokio::test]
    async fn test_http_reranker_error_status() {
        let (url, _server) = serve_once("503 Service Unavailable", "{}").await;
        let passages = vec!["asthma".to_string()];
        let err = HttpReranker::new(&url, 5)
            .rerank("q", &passages, 30)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Rerank(msg) if msg.contains("503")));
    }
}
