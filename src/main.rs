//! Triage 命令行入口
//!
//! 用法：`triage <症状描述...>`，或不带参数从标准输入读一行；`triage --resume <run_id>` 继续中断的运行。
//! 结束后把运行报告以 JSON 打印到标准输出。

use std::path::PathBuf;

use anyhow::Context;
use triage::config::{load_config, AppConfig};
use triage::core::create_controller;

enum Request {
    Query(String),
    Resume(String),
}

fn parse_args() -> anyhow::Result<(Option<PathBuf>, Request)> {
    let mut config_path = None;
    let mut resume = None;
    let mut words = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = Some(PathBuf::from(args.next().context("--config needs a path")?)),
            "--resume" => resume = Some(args.next().context("--resume needs a run id")?),
            _ => words.push(arg),
        }
    }
    if let Some(run_id) = resume {
        return Ok((config_path, Request::Resume(run_id)));
    }
    let query = if words.is_empty() {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).context("Failed to read query from stdin")?;
        line.trim().to_string()
    } else {
        words.join(" ")
    };
    anyhow::ensure!(!query.is_empty(), "empty query");
    Ok((config_path, Request::Query(query)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    triage::observability::init();

    let (config_path, request) = parse_args()?;
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let controller = create_controller(&cfg).context("Failed to create controller")?;
    let report = match request {
        Request::Query(query) => controller.run(&query).await,
        Request::Resume(run_id) => controller.resume(&run_id).await,
    }
    .context("Diagnosis run failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
