use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use foldera_provider::{LlmMessage, LlmProvider, LlmRequest, LlmResponse, ProviderRegistry};

/// Resolves `provider/model` strings and short aliases through the registry,
/// trying the primary then each fallback until one succeeds.
///
/// A candidate that cannot be resolved (unknown alias, bad format, provider
/// not registered) is skipped like any other failed candidate. Skipping a
/// provider at registration time must not take its fallbacks down with it.
pub struct LlmRouter {
    registry: ProviderRegistry,
    aliases: HashMap<String, String>,
    global_fallbacks: Vec<String>,
}

impl LlmRouter {
    pub fn new(
        registry: ProviderRegistry,
        aliases: HashMap<String, String>,
        global_fallbacks: Vec<String>,
    ) -> Self {
        Self {
            registry,
            aliases,
            global_fallbacks,
        }
    }

    pub async fn chat(
        &self,
        primary: &str,
        fallbacks: &[String],
        system: Option<String>,
        messages: Vec<LlmMessage>,
        max_tokens: u32,
    ) -> Result<LlmResponse> {
        let candidates = std::iter::once(primary)
            .chain(fallbacks.iter().map(String::as_str))
            .chain(self.global_fallbacks.iter().map(String::as_str));

        let mut last_err: Option<anyhow::Error> = None;

        for candidate in candidates {
            let (provider, model_id) = match self.resolve_candidate(candidate) {
                Ok(resolved) => resolved,
                Err(err) => {
                    tracing::warn!("skipping model candidate {candidate}: {err}");
                    last_err = Some(err);
                    continue;
                }
            };

            let req = LlmRequest {
                model: model_id,
                system: system.clone(),
                messages: messages.clone(),
                max_tokens,
            };

            match provider.chat(req).await {
                Ok(resp) => return Ok(resp),
                Err(err) => {
                    tracing::warn!("model candidate {candidate} failed: {err}");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("no model candidate available")))
    }

    /// Expand an alias if needed, then look up the provider for the
    /// `provider/model` form and return it with the bare model id.
    fn resolve_candidate(&self, raw: &str) -> Result<(Arc<dyn LlmProvider>, String)> {
        let resolved = if raw.contains('/') {
            raw.to_string()
        } else {
            self.aliases
                .get(raw)
                .cloned()
                .ok_or_else(|| anyhow!("unknown model alias: {raw}"))?
        };

        let (provider_id, model_id) = resolved
            .split_once('/')
            .ok_or_else(|| anyhow!("invalid model format: {resolved}"))?;
        let provider = self.registry.get(provider_id)?;
        Ok((provider, model_id.to_string()))
    }
}
