// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use dagwood_task_runner::bundle::DataBundle;
use dagwood_task_runner::config::load_config;
use dagwood_task_runner::engine::TaskExecutor;
use dagwood_task_runner::orchestrator::LocalOrchestrator;
use dagwood_task_runner::task::Task;

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the result; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: {} <config.yaml|config.toml> <task.json> <bundle.json>", args[0]);
        eprintln!("Example: {} configs/runner.yaml task.json bundle.json", args[0]);
        std::process::exit(2);
    }

    let config = load_config(&args[1])
        .with_context(|| format!("loading config {}", args[1]))?
        .with_env_overrides();
    let task: Task = read_json(Path::new(&args[2]))?;
    let bundle: DataBundle = read_json(Path::new(&args[3]))?;

    let orchestrator = Arc::new(LocalOrchestrator::new().with_bundle(&task.task_id, bundle));
    let executor = TaskExecutor::from_config(orchestrator, &config)?;

    match executor.execute(&task).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(error) => {
            println!("{}", serde_json::to_string_pretty(&error)?);
            std::process::exit(1);
        }
    }
}
