//! 工作流集成测试：主控 + 工具层 + 混合检索，全部使用脚本化 / 假的外部依赖

use std::sync::Arc;

use async_trait::async_trait;
use triage::core::{
    CheckpointStore, Controller, FileCheckpointStore, Termination, WorkflowSettings,
};
use triage::llm::{EmbeddingProvider, MockLlmClient, ScriptedLlmClient};
use triage::memory::Role;
use triage::react::TOOL_ERROR_MESSAGE;
use triage::retrieval::{
    Corpus, HybridRetriever, PassthroughReranker, Reranker, RetrievalError, StopwordNormalizer,
};
use triage::tools::{DetectChestXrayTool, FinalAnswerTool, SearchTool, ToolExecutor, ToolRegistry};

const PLAN: &str = r#"{"steps": ["gather history", "search literature", "form diagnosis"], "reasoning": "work-up"}"#;
const PASS: &str = r#"{"factual_correctness": 0.9, "completeness": 0.8, "evidence_basis": 0.9, "logical_coherence": 0.9, "alternative_considerations": 0.7, "overall_score": 0.86, "improvements": []}"#;

/// 关键词出现与否构成的向量，语料与查询用同一函数编码
fn keyword_vector(text: &str) -> Vec<f32> {
    let text = text.to_lowercase();
    ["chest", "cough", "pleuritic", "wheez", "edema"]
        .iter()
        .map(|k| if text.contains(k) { 1.0 } else { 0.0 })
        .collect()
}

struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, String> {
        Ok(keyword_vector(text))
    }
}

struct DownEmbedder;

#[async_trait]
impl EmbeddingProvider for DownEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, String> {
        Err("embedding service unavailable".to_string())
    }
}

/// 把融合顺序整体反转
struct ReversingReranker;

#[async_trait]
impl Reranker for ReversingReranker {
    async fn rerank(
        &self,
        _query: &str,
        passages: &[String],
        top_k: usize,
    ) -> Result<Vec<usize>, RetrievalError> {
        Ok((0..passages.len()).rev().take(top_k).collect())
    }
}

const TOPICS: [&str; 5] = [
    "chest pain radiating to the left arm suggests acute coronary syndrome",
    "fever with productive cough and crackles suggests pneumonia",
    "pleuritic chest pain with tachycardia raises concern for pulmonary embolism",
    "wheezing and nocturnal cough are typical of asthma",
    "dependent edema and orthopnea point to heart failure",
];

fn corpus(size: usize) -> Arc<Corpus> {
    let texts: Vec<String> = (0..size)
        .map(|i| format!("Passage {}: {}", i, TOPICS[i % TOPICS.len()]))
        .collect();
    let vectors = texts.iter().map(|t| keyword_vector(t)).collect();
    Arc::new(Corpus::from_embeddings(texts, vectors).unwrap())
}

fn retriever(size: usize, reranker: Arc<dyn Reranker>) -> HybridRetriever {
    HybridRetriever::new(
        corpus(size),
        Arc::new(StopwordNormalizer::new()),
        Arc::new(KeywordEmbedder),
        Arc::new(KeywordEmbedder),
        reranker,
    )
}

fn tools(retriever: HybridRetriever) -> Arc<ToolExecutor> {
    let mut registry = ToolRegistry::new();
    registry.register(SearchTool::new(Arc::new(retriever)));
    registry.register(FinalAnswerTool);
    registry.register(DetectChestXrayTool);
    Arc::new(ToolExecutor::new(registry, 5))
}

#[tokio::test]
async fn test_search_returns_min_of_30_and_corpus_size() {
    for size in [100, 45, 12, 1] {
        let r = retriever(size, Arc::new(PassthroughReranker));
        let result = r.search("chest pain for 3 days").await.unwrap();
        assert_eq!(result.passages.len(), size.min(30), "corpus of {size}");
        for p in &result.passages {
            assert!(r.corpus().chunks().iter().any(|c| &c.text == p));
        }
        assert_eq!(result.context, result.passages.join("\n"));
    }
}

#[tokio::test]
async fn test_reranker_decides_final_order() {
    let fused = retriever(100, Arc::new(PassthroughReranker))
        .search("pleuritic chest pain")
        .await
        .unwrap();
    let reranked = retriever(100, Arc::new(ReversingReranker))
        .search("pleuritic chest pain")
        .await
        .unwrap();
    let mut reversed = fused.passages.clone();
    reversed.reverse();
    assert_eq!(reranked.passages, reversed);
}

#[tokio::test]
async fn test_search_observation_reaches_next_oracle_turn() {
    let llm = Arc::new(ScriptedLlmClient::new([
        PLAN,
        r#"```json
{"name": "search", "parameters": {"query": "fever productive cough"}}
```"#,
        "Diagnosis: community-acquired pneumonia",
        PASS,
    ]));
    let controller = Controller::new(
        llm.clone(),
        tools(retriever(100, Arc::new(PassthroughReranker))),
        WorkflowSettings::default(),
    );
    let report = controller.run("fever and cough for a week").await.unwrap();

    assert_eq!(report.termination, Termination::Accepted);
    assert!(report.passed);
    assert_eq!(report.answer.as_deref(), Some("Diagnosis: community-acquired pneumonia"));

    let second_turn = &llm.calls()[2];
    let observation = second_turn
        .iter()
        .find(|m| m.role == Role::User && m.content.starts_with("Passage "))
        .expect("search result in scratchpad");
    assert!(observation.content.contains("pneumonia"));
    let last = second_turn.last().unwrap();
    assert!(last.content.contains("My original query was: 'fever and cough for a week'"));
}

#[tokio::test]
async fn test_embedding_failure_does_not_stop_the_run() {
    let retriever = HybridRetriever::new(
        corpus(20),
        Arc::new(StopwordNormalizer::new()),
        Arc::new(KeywordEmbedder),
        Arc::new(DownEmbedder),
        Arc::new(PassthroughReranker),
    );
    let llm = Arc::new(ScriptedLlmClient::new([
        PLAN,
        r#"{"name": "search", "parameters": {"query": "wheezing"}}"#,
        PASS,
    ]));
    let report = Controller::new(llm, tools(retriever), WorkflowSettings::default())
        .run("wheezing at night")
        .await
        .unwrap();
    assert_eq!(report.termination, Termination::Accepted);
    assert_eq!(report.answer.as_deref(), Some(TOOL_ERROR_MESSAGE));
}

#[tokio::test]
async fn test_mock_llm_runs_to_completion() {
    let controller = Controller::new(
        Arc::new(MockLlmClient),
        tools(retriever(100, Arc::new(PassthroughReranker))),
        WorkflowSettings::default(),
    );
    let report = controller.run("chest pain radiating to the left arm").await.unwrap();
    assert_eq!(report.termination, Termination::Accepted);
    assert!(report.passed);
    let answer = report.answer.unwrap();
    assert!(answer.starts_with("Preliminary diagnosis (mock)"));
    assert!(answer.contains("Passage"));
    assert_eq!(report.plan.unwrap().steps.len(), 3);
}

#[tokio::test]
async fn test_file_checkpoints_allow_resume() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileCheckpointStore::new(dir.path()));
    let llm = Arc::new(ScriptedLlmClient::new([PLAN, "Diagnosis: asthma", PASS]));
    let controller = Controller::new(
        llm.clone(),
        tools(retriever(10, Arc::new(PassthroughReranker))),
        WorkflowSettings::default(),
    )
    .with_checkpoints(store.clone());

    let report = controller.run("nocturnal wheeze").await.unwrap();
    let saved = store.load(&report.run_id).unwrap().unwrap();
    assert!(saved.is_finished());
    assert_eq!(saved.answer(), Some("Diagnosis: asthma"));

    let resumed = controller.resume(&report.run_id).await.unwrap();
    assert_eq!(resumed.answer, report.answer);
    assert_eq!(llm.call_count(), 3);
}
