//! Model alias table
//!
//! Maps the model ids clients send to the upstream driver/model pair that
//! serves them. Lookup order matters: the table is scanned front to back and
//! the first hit wins.

use tracing::{debug, warn};

/// One row of the alias table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelAlias {
    /// Model id exposed to clients
    pub id: &'static str,
    /// Upstream driver that services the model
    pub driver: &'static str,
    /// Upstream model name
    pub model: &'static str,
    /// Provider label reported by `/v1/models`
    pub provider: &'static str,
}

/// Upstream target for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub driver: String,
    pub model: String,
}

impl ResolvedModel {
    fn from_alias(alias: &ModelAlias) -> Self {
        Self {
            driver: alias.driver.to_string(),
            model: alias.model.to_string(),
        }
    }
}

/// Target used when nothing in the table matches
pub const FALLBACK_DRIVER: &str = "openai-completion";
pub const FALLBACK_MODEL: &str = "gpt-4o";

const fn alias(
    id: &'static str,
    driver: &'static str,
    model: &'static str,
    provider: &'static str,
) -> ModelAlias {
    ModelAlias {
        id,
        driver,
        model,
        provider,
    }
}

static MODEL_ALIASES: &[ModelAlias] = &[
    // OpenAI
    alias("gpt-5.1-codex-maxs", "openai-completion", "gpt-4o", "openai"),
    alias("gpt-5.1-codex", "openai-completion", "gpt-4o-mini", "openai"),
    alias("gpt-5.1", "openai-completion", "gpt-4", "openai"),
    alias("gpt-5.1-chat-latest", "openai-completion", "gpt-4-turbo", "openai"),
    alias("gpt-3.5-turbo", "openai-completion", "gpt-3.5-turbo", "openai"),
    // Anthropic
    alias("claude-opus-45", "claude", "claude-opus-4-20250514", "anthropic"),
    alias("claude-3-sonnet", "claude", "claude-sonnet-4-20250514", "anthropic"),
    alias("claude-opus-4.1", "claude", "claude-3-5-sonnet-latest", "anthropic"),
    alias("claude-opus-4-5-20251101", "claude", "claude-3-7-sonnet-latest", "anthropic"),
    alias("claude-opus-4.5", "claude", "claude-opus-4.5", "anthropic"),
    alias("claude-opus-4", "claude", "claude-opus-4-20250514", "anthropic"),
    // Google
    alias("gemini-3-pro-preview", "gemini", "gemini-3-pro-preview", "google"),
    alias("claude-opus-4-5", "gemini", "claude-opus-4-5", "google"),
    alias("gpt-5.1-codex-max", "gemini", "gpt-5.1-codex-max", "google"),
    alias("gemini-2.5-pro", "gemini", "gemini-2.5-pro", "google"),
    alias("gemini-2.5-flash", "gemini", "gemini-2.5-flash", "google"),
    // Mistral
    alias("mistral-large", "mistral", "mistral-large-latest", "mistral"),
    alias("mistral-medium", "mistral", "mistral-medium-latest", "mistral"),
    alias("codestral", "mistral", "codestral-latest", "mistral"),
    // DeepSeek
    alias("deepseek", "deepseek", "deepseek-chat", "deepseek"),
    alias("deepseek-chat", "deepseek", "deepseek-chat", "deepseek"),
    alias("deepseek-reasoner", "deepseek", "deepseek-reasoner", "deepseek"),
    // Groq
    alias("llama3-70b", "groq", "llama3-70b-8192", "groq"),
    alias("llama3-8b", "groq", "llama3-8b-8192", "groq"),
    alias("llama-3.1-70b", "groq", "llama-3.1-70b-versatile", "groq"),
    alias("llama-3.1-8b", "groq", "llama-3.1-8b-instant", "groq"),
    alias("mixtral-8x7b", "groq", "mixtral-8x7b-32768", "groq"),
];

/// All known aliases in table order
pub fn all() -> &'static [ModelAlias] {
    MODEL_ALIASES
}

/// Resolve a client model id to its upstream target.
///
/// Tried in order, first hit wins:
/// 1. exact alias id
/// 2. exact upstream model name
/// 3. case-insensitive alias id
/// 4. substring containment in either direction (case-insensitive)
///
/// Anything else falls back to `openai-completion` / `gpt-4o`.
pub fn resolve(requested: &str) -> ResolvedModel {
    if requested.is_empty() {
        return fallback();
    }

    if let Some(found) = MODEL_ALIASES.iter().find(|a| a.id == requested) {
        return ResolvedModel::from_alias(found);
    }
    if let Some(found) = MODEL_ALIASES.iter().find(|a| a.model == requested) {
        return ResolvedModel::from_alias(found);
    }
    if let Some(found) = MODEL_ALIASES
        .iter()
        .find(|a| a.id.eq_ignore_ascii_case(requested))
    {
        return ResolvedModel::from_alias(found);
    }

    let lowered = requested.to_lowercase();
    if let Some(found) = MODEL_ALIASES.iter().find(|a| {
        let id = a.id.to_lowercase();
        lowered.contains(&id) || id.contains(&lowered)
    }) {
        debug!(requested = %requested, model = %found.model, "Mapped model by partial match");
        return ResolvedModel::from_alias(found);
    }

    warn!(requested = %requested, "Unknown model, using fallback");
    fallback()
}

fn fallback() -> ResolvedModel {
    ResolvedModel {
        driver: FALLBACK_DRIVER.to_string(),
        model: FALLBACK_MODEL.to_string(),
    }
}
