pub mod providers;
pub mod retry;
pub mod streaming;

use tracing::{debug, warn};

use wayfarer_core::config::{AppConfig, ModelConfig, RetryConfig};
use wayfarer_core::traits::LlmClient;

pub use providers::OpenAiClient;
pub use retry::RetryingClient;

/// Create an LLM client for a single model config.
///
/// Every supported provider speaks the OpenAI chat-completions protocol;
/// the provider name only selects the endpoint preset.
pub fn create_client(config: &ModelConfig) -> Box<dyn LlmClient> {
    if falls_back_to_openai(config) {
        warn!(
            provider = %config.provider,
            "Unknown provider and no base_url; sending requests to the OpenAI endpoint"
        );
    }
    debug!(provider = %config.provider, model = %config.model_id, "Creating LLM client");
    Box::new(OpenAiClient::new())
}

/// True when neither `base_url` nor a provider preset names an endpoint.
fn falls_back_to_openai(config: &ModelConfig) -> bool {
    config.base_url.is_none() && providers::presets::get_preset(&config.provider).is_none()
}

/// Build the client for a whole app config, wrapping it with retry and
/// fallback models when either is configured.
pub fn client_for(config: &AppConfig) -> Box<dyn LlmClient> {
    let primary = create_client(&config.model);
    if config.fallback_models.is_empty() && config.model.retry.is_none() {
        return primary;
    }

    let retry_config = config.model.retry.clone().unwrap_or_else(RetryConfig::default);
    let fallbacks = config
        .fallback_models
        .iter()
        .map(|mc| (mc.clone(), create_client(mc)))
        .collect();
    Box::new(RetryingClient::new(primary, fallbacks, retry_config))
}
