//! Research Agent 演示入口
//!
//! 初始化日志、加载配置、构建 Agent，跑一轮 ask 与一次 critique，最后打印 export_state。
//! 未配置 API Key 时使用 Mock LLM。

use std::path::PathBuf;

use anyhow::Context;
use research_agent::{config::load_config, observability, AgentBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    // 可选：第一个参数为额外的配置文件
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path).context("Failed to load config")?;

    let mut agent = AgentBuilder::new(config)
        .build()
        .context("Failed to build research agent")?;

    let report = agent
        .ask("What are the main approaches to long-context compression for LLM agents?")
        .await
        .context("ask failed")?;
    println!("{}\n", report.answer_markdown);

    let critique = agent
        .critique("Please compare the approaches on latency and cost as well.")
        .await
        .context("critique failed")?;
    println!("{}\n", critique.critique_result.value().improved_answer);

    let state = serde_json::to_string_pretty(&agent.export_state())
        .context("Failed to serialize session state")?;
    println!("{}", state);

    Ok(())
}
