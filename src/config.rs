//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `TRIAGE__*` 覆盖（双下划线表示嵌套，如 `TRIAGE__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::retrieval::RetrievalSettings;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub workflow: WorkflowSection,
    pub retrieval: RetrievalSection,
    pub tools: ToolsSection,
}

/// [app] 段：应用名、检查点目录
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 检查点目录；未设置时检查点只保存在内存中
    pub checkpoint_dir: Option<PathBuf>,
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock；优先级由 API Key 与 provider 共同决定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub deepseek: LlmDeepSeekSection,
    #[serde(default)]
    pub openai: LlmOpenAiSection,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            deepseek: LlmDeepSeekSection::default(),
            openai: LlmOpenAiSection::default(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmDeepSeekSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次模型调用超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [workflow] 段：状态机的步数与精修上限、质量门槛
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSection {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_max_refinements")]
    pub max_refinements: usize,
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_refinements: default_max_refinements(),
            quality_threshold: default_quality_threshold(),
        }
    }
}

fn default_max_steps() -> usize {
    20
}

fn default_max_refinements() -> usize {
    3
}

fn default_quality_threshold() -> f64 {
    0.7
}

/// [retrieval] 段：语料目录与各阶段候选数
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalSection {
    /// 含 chunks.json / embeddings.json 的目录；未设置时不注册 search 工具
    pub corpus_dir: Option<PathBuf>,
    #[serde(default = "default_dense_candidates")]
    pub dense_candidates: usize,
    #[serde(default = "default_fused_limit")]
    pub fused_limit: usize,
    #[serde(default = "default_rerank_top_k")]
    pub rerank_top_k: usize,
    #[serde(default)]
    pub embedding: EmbeddingSection,
    #[serde(default)]
    pub reranker: RerankerSection,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            corpus_dir: None,
            dense_candidates: default_dense_candidates(),
            fused_limit: default_fused_limit(),
            rerank_top_k: default_rerank_top_k(),
            embedding: EmbeddingSection::default(),
            reranker: RerankerSection::default(),
        }
    }
}

impl RetrievalSection {
    pub fn settings(&self) -> RetrievalSettings {
        RetrievalSettings {
            dense_candidates: self.dense_candidates,
            fused_limit: self.fused_limit,
            rerank_top_k: self.rerank_top_k,
        }
    }
}

fn default_dense_candidates() -> usize {
    60
}

fn default_fused_limit() -> usize {
    30
}

fn default_rerank_top_k() -> usize {
    30
}

/// [retrieval.embedding] 段：OpenAI 兼容的嵌入端点与两个模型名
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSection {
    pub base_url: Option<String>,
    #[serde(default = "default_primary_model")]
    pub primary_model: String,
    #[serde(default = "default_secondary_model")]
    pub secondary_model: String,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            base_url: None,
            primary_model: default_primary_model(),
            secondary_model: default_secondary_model(),
        }
    }
}

fn default_primary_model() -> String {
    "BAAI/bge-base-en-v1.5".to_string()
}

fn default_secondary_model() -> String {
    "sentence-transformers/all-mpnet-base-v2".to_string()
}

/// [retrieval.reranker] 段：交叉编码器服务地址；未设置时保持融合顺序
#[derive(Debug, Clone, Deserialize)]
pub struct RerankerSection {
    pub url: Option<String>,
    #[serde(default = "default_rerank_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RerankerSection {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_rerank_timeout_secs(),
        }
    }
}

fn default_rerank_timeout_secs() -> u64 {
    30
}

/// [tools] 段：工具超时
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

/// 从 config 目录加载配置，环境变量 TRIAGE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 TRIAGE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TRIAGE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
