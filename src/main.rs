//! pilot - 对话式测试编排命令行
//!
//! 用法：
//!   pilot [--config <file>]               交互会话
//!   pilot [--config <file>] <request...>  执行单个请求后退出

use std::path::PathBuf;

use agent_pilot::config::load_config;
use agent_pilot::ui::{run_once, run_session};
use agent_pilot::{observability, AgentBuilder};
use anyhow::Context;

struct Args {
    config: Option<PathBuf>,
    request: Vec<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut config = None;
    let mut request = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config needs a file path")?;
                config = Some(PathBuf::from(path));
            }
            _ => request.push(arg),
        }
    }
    Ok(Args { config, request })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;
    let cfg = load_config(args.config).context("Failed to load configuration")?;
    observability::init(&cfg.logging);

    let provider = cfg.llm.provider.to_lowercase();
    let mut agent = AgentBuilder::new(cfg)
        .build()
        .context("Failed to create agent")?;
    tracing::info!(conversation = %agent.id(), "agent ready");

    if args.request.is_empty() {
        run_session(&mut agent, &provider).await?;
    } else {
        let request = args.request.join(" ");
        run_once(&mut agent, &provider, &request).await?;
    }
    Ok(())
}
