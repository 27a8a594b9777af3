//! Chorus - 多模型生成编排器
//!
//! 入口：初始化日志、加载配置、探测提供方；若给出 `<task> <prompt...>` 则分派一次并打印结果。

use std::sync::Arc;

use anyhow::Context;
use chorus::config::load_config;
use chorus::{observability, DispatchOutcome, GenerationRequest, Orchestrator, ProviderRegistry, TaskCategory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    observability::init();

    let config = load_config(None).context("Failed to load config")?;
    let registry = Arc::new(ProviderRegistry::from_env(&config));
    let orchestrator = Orchestrator::from_config(&config, registry);

    for (provider, available) in orchestrator.probe() {
        let status = if available { "available" } else { "unavailable" };
        println!("{:<10} {}", provider, status);
    }

    let mut args = std::env::args().skip(1);
    let Some(task) = args.next() else {
        return Ok(());
    };
    let task: TaskCategory = task.parse().map_err(anyhow::Error::msg)?;
    let prompt = args.collect::<Vec<_>>().join(" ");
    if prompt.trim().is_empty() {
        anyhow::bail!("usage: chorus <task> <prompt...>");
    }

    let outcome = orchestrator
        .dispatch(GenerationRequest::new(task, prompt))
        .await
        .context("Generation failed")?;

    match outcome {
        DispatchOutcome::Single(result) => {
            println!(
                "\n[{}] {} ms{}",
                result.provider,
                result.elapsed.as_millis(),
                if result.fallback_used { " (fallback)" } else { "" }
            );
            println!("{}", result.text);
        }
        DispatchOutcome::Consensus(result) => {
            let providers: Vec<String> = result
                .contributing_providers
                .iter()
                .map(|p| p.to_string())
                .collect();
            println!(
                "\n[consensus: {}] agreement {:.2}",
                providers.join(", "),
                result.agreement_score
            );
            println!("{}", result.text);
        }
    }

    Ok(())
}
