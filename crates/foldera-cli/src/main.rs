use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use foldera_core::{load_config, ConflictSolver, FolderaConfig, LlmRouter, ModelPolicy};
use foldera_provider::{
    custom, register_builtin_providers, AnthropicProvider, ProviderRegistry,
};
use foldera_schema::WorkSignal;

#[derive(Parser)]
#[command(name = "foldera", version, about = "Foldera work-signal conflict detection")]
struct Cli {
    #[arg(
        long,
        default_value = ".",
        help = "Config root directory (contains config/)"
    )]
    config_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Detect conflicts in a JSON batch of work signals")]
    Detect {
        #[arg(long, help = "Path to a JSON array of work signals")]
        signals: PathBuf,
        #[arg(long, help = "Skip the reasoning model, deterministic pass only")]
        offline: bool,
    },
    #[command(about = "Validate config files")]
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate => {
            let config = load_config(&cli.config_root.join("config"))?;
            println!(
                "Config valid. {} providers, primary model {}, {} fallbacks.",
                config.providers.len(),
                config.main.detection.model_policy.primary,
                config.main.detection.model_policy.fallbacks.len()
            );
        }
        Commands::Detect { signals, offline } => {
            run_detect(&cli.config_root, &signals, offline).await?;
        }
    }

    Ok(())
}

async fn run_detect(root: &Path, signals_path: &Path, offline: bool) -> Result<()> {
    let config = load_config(&root.join("config"))?;

    let content = std::fs::read_to_string(signals_path)
        .with_context(|| format!("failed to read signals file: {}", signals_path.display()))?;
    let signals: Vec<WorkSignal> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse signals file: {}", signals_path.display()))?;

    let router = Arc::new(build_router_from_config(&config, offline));
    let model_policy = if offline {
        ModelPolicy {
            primary: "stub/offline".to_string(),
            fallbacks: vec![],
        }
    } else {
        config.main.detection.model_policy.clone()
    };
    let solver = ConflictSolver::new(router, model_policy, config.main.detection.max_tokens);

    let conflicts = solver.detect(&signals).await;
    tracing::info!(
        "{} conflicts detected across {} signals",
        conflicts.len(),
        signals.len()
    );
    println!("{}", serde_json::to_string_pretty(&conflicts)?);
    Ok(())
}

fn build_router_from_config(config: &FolderaConfig, offline: bool) -> LlmRouter {
    let mut registry = ProviderRegistry::new();

    if !offline {
        for provider_config in &config.providers {
            if !provider_config.enabled {
                continue;
            }
            let api_key = std::env::var(&provider_config.api_key_env).unwrap_or_default();
            match provider_config.provider_id.as_str() {
                "anthropic" => {
                    if api_key.is_empty() {
                        tracing::warn!(
                            "{} not set, skipping anthropic provider",
                            provider_config.api_key_env
                        );
                    } else {
                        registry.register(
                            "anthropic",
                            Arc::new(AnthropicProvider::new(
                                api_key,
                                provider_config.api_base.clone(),
                            )),
                        );
                    }
                }
                other => {
                    // Everything else speaks the OpenAI chat-completions shape.
                    if api_key.is_empty() {
                        tracing::warn!(
                            "{} not set, skipping provider {other}",
                            provider_config.api_key_env
                        );
                    } else {
                        registry.register(
                            other,
                            Arc::new(custom(api_key, provider_config.api_base.clone())),
                        );
                    }
                }
            }
        }
    }

    register_builtin_providers(&mut registry);

    let mut aliases = HashMap::new();
    aliases.insert(
        "sonnet".to_string(),
        "anthropic/claude-sonnet-4-5".to_string(),
    );
    aliases.insert(
        "haiku".to_string(),
        "anthropic/claude-3-5-haiku-latest".to_string(),
    );

    LlmRouter::new(registry, aliases, vec!["stub/offline".to_string()])
}
