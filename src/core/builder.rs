//! 构建器：由配置组装 LLM、检索器、工具层、检查点与主控
//!
//! CLI 与测试共用同一套组装逻辑。

use std::sync::Arc;

use anyhow::Context;

use crate::config::AppConfig;
use crate::core::{CheckpointStore, Controller, FileCheckpointStore, InMemoryCheckpointStore, WorkflowSettings};
use crate::llm::{create_deepseek_client, create_embedders_from_config, LlmClient, MockLlmClient, OpenAiClient};
use crate::retrieval::{
    load_corpus, HttpReranker, HybridRetriever, PassthroughReranker, Reranker, StopwordNormalizer,
};
use crate::tools::{DetectChestXrayTool, FinalAnswerTool, SearchTool, ToolExecutor, ToolRegistry};

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    if provider == "mock" {
        tracing::info!("Using Mock LLM");
        return Arc::new(MockLlmClient);
    }
    // 有 DeepSeek Key 或（配置为 deepseek 且仅有 OpenAI Key 时也走 DeepSeek 兼容端点）
    let use_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok()
        || (provider == "deepseek" && std::env::var("OPENAI_API_KEY").is_ok());
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok() && provider != "deepseek";

    if use_deepseek {
        let model = cfg
            .llm
            .deepseek
            .model
            .clone()
            .unwrap_or_else(|| cfg.llm.model.clone());
        tracing::info!("Using DeepSeek LLM ({})", model);
        Arc::new(create_deepseek_client(Some(&model)))
    } else if use_openai {
        let model = cfg
            .llm
            .openai
            .model
            .clone()
            .unwrap_or_else(|| "gpt-4o-mini".to_string());
        let base = cfg.llm.base_url.as_deref();
        tracing::info!("Using OpenAI LLM ({})", model);
        Arc::new(OpenAiClient::new(
            base,
            &model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        ))
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient)
    }
}

/// 加载语料并创建混合检索器；未配置语料目录时返回 None（不注册 search 工具）
pub fn build_retriever(cfg: &AppConfig) -> anyhow::Result<Option<Arc<HybridRetriever>>> {
    let Some(dir) = cfg.retrieval.corpus_dir.as_ref() else {
        tracing::warn!("retrieval.corpus_dir not set, search tool disabled");
        return Ok(None);
    };
    let corpus = load_corpus(dir).with_context(|| format!("Failed to load corpus from {}", dir.display()))?;

    let embedding = &cfg.retrieval.embedding;
    let api_key = std::env::var("EMBEDDING_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .ok();
    let (primary, secondary) = create_embedders_from_config(
        embedding.base_url.as_deref(),
        &embedding.primary_model,
        &embedding.secondary_model,
        api_key.as_deref(),
    );

    let reranker: Arc<dyn Reranker> = match cfg.retrieval.reranker.url.as_deref() {
        Some(url) => Arc::new(HttpReranker::new(url, cfg.retrieval.reranker.timeout_secs)),
        None => {
            tracing::info!("no reranker url, keeping fused order");
            Arc::new(PassthroughReranker)
        }
    };

    let retriever = HybridRetriever::new(
        Arc::new(corpus),
        Arc::new(StopwordNormalizer::new()),
        primary,
        secondary,
        reranker,
    )
    .with_settings(cfg.retrieval.settings());
    Ok(Some(Arc::new(retriever)))
}

/// 构建工具注册表
pub fn build_tool_registry(retriever: Option<Arc<HybridRetriever>>) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    if let Some(retriever) = retriever {
        tools.register(SearchTool::new(retriever));
    }
    tools.register(FinalAnswerTool);
    tools.register(DetectChestXrayTool);
    tools
}

pub fn workflow_settings(cfg: &AppConfig) -> WorkflowSettings {
    WorkflowSettings {
        llm_timeout_secs: cfg.llm.timeouts.request,
        max_steps: cfg.workflow.max_steps,
        max_refinements: cfg.workflow.max_refinements,
        quality_threshold: cfg.workflow.quality_threshold,
    }
}

/// 由配置创建主控（含检查点存储）
pub fn create_controller(cfg: &AppConfig) -> anyhow::Result<Controller> {
    let llm = create_llm_from_config(cfg);
    let retriever = build_retriever(cfg)?;
    let tools = Arc::new(ToolExecutor::new(
        build_tool_registry(retriever),
        cfg.tools.tool_timeout_secs,
    ));
    let checkpoints: Arc<dyn CheckpointStore> = match cfg.app.checkpoint_dir.as_ref() {
        Some(dir) => Arc::new(FileCheckpointStore::new(dir)),
        None => Arc::new(InMemoryCheckpointStore::new()),
    };
    Ok(Controller::new(llm, tools, workflow_settings(cfg)).with_checkpoints(checkpoints))
}
