//! Bundled adapters and their construction from configuration.

pub mod console;
pub mod irc;
pub mod webhook;

use std::sync::Arc;

use vigil_core::errors::VgError;
use vigil_store::config::{AdapterConfig, AdapterKindConfig, Config};

use crate::adapter::ChannelAdapter;
use crate::orchestrator::Registration;

pub use console::ConsoleAdapter;
pub use irc::IrcAdapter;
pub use webhook::WebhookAdapter;

/// Build the adapter described by `config`.
///
/// # Errors
///
/// `AdapterConnection` when the backend cannot be constructed.
pub fn build_adapter(config: &AdapterConfig) -> Result<Arc<dyn ChannelAdapter>, VgError> {
    let adapter: Arc<dyn ChannelAdapter> = match &config.kind {
        AdapterKindConfig::Console {} => Arc::new(ConsoleAdapter::new(&config.name)),
        AdapterKindConfig::Webhook(webhook) => Arc::new(
            WebhookAdapter::new(&config.name, webhook)
                .map_err(|e| VgError::from(e).with_adapter(&config.name))?,
        ),
        AdapterKindConfig::Irc(irc) => Arc::new(IrcAdapter::new(
            &config.name,
            irc.clone(),
            config.destinations.clone(),
        )),
    };
    Ok(adapter)
}

/// Registrations for every enabled adapter that could be built.
///
/// Disabled adapters are skipped; adapters that fail to build are logged
/// and skipped.
pub fn build_registrations(config: &Config) -> Vec<Registration> {
    let mut registrations = Vec::new();
    for adapter_config in &config.adapters {
        if !adapter_config.enabled {
            tracing::info!(adapter = %adapter_config.name, "Adapter disabled, skipping");
            continue;
        }
        match build_adapter(adapter_config) {
            Ok(adapter) => {
                tracing::info!(
                    adapter = %adapter_config.name,
                    kind = adapter_config.kind.as_str(),
                    mode = adapter_config.mode.as_str(),
                    destinations = adapter_config.destinations.len() as u64,
                    "Adapter registered"
                );
                registrations.push(Registration::new(
                    adapter,
                    adapter_config.mode,
                    adapter_config.destinations.clone(),
                ));
            }
            Err(err) => tracing::error!(
                adapter = %adapter_config.name,
                error = %err,
                err.code = err.code(),
                "Adapter registration failed"
            ),
        }
    }
    registrations
}
