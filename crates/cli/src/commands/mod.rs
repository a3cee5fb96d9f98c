//! Subcommand implementations and the shared runtime wiring.

pub mod ask;
pub mod classify;
pub mod onboard;
pub mod status;
pub mod tools;

use rustedtutor_agent::{Tutor, TutorBuilder};
use rustedtutor_config::AppConfig;
use rustedtutor_core::provider::Provider;
use rustedtutor_providers::router::{build_from_config, is_local};
use rustedtutor_tools::{ConstantEntry, ConstantTable, default_registry};
use std::sync::Arc;
use tracing::warn;

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn load_config() -> CmdResult<AppConfig> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// The built-in constants plus any configured ones.
pub fn constant_table(config: &AppConfig) -> CmdResult<Arc<ConstantTable>> {
    let extra = config
        .constants
        .iter()
        .map(|c| ConstantEntry::new(&c.name, c.value, &c.unit, &c.symbol));
    Ok(Arc::new(ConstantTable::with_entries(extra)?))
}

/// Whether the default provider can be called with the current settings.
pub fn provider_ready(config: &AppConfig) -> bool {
    let name = &config.default_provider;
    is_local(name) || config.api_key_for(name).is_some()
}

/// The provider for language-model components, or `None` to run offline.
pub fn select_provider(config: &AppConfig, offline: bool) -> Option<Arc<dyn Provider>> {
    if offline || !config.wants_llm() {
        return None;
    }
    if !provider_ready(config) {
        warn!(
            provider = %config.default_provider,
            "No API key configured, falling back to the offline classifier and handler"
        );
        return None;
    }
    build_from_config(config).default()
}

pub fn build_tutor(config: &AppConfig, offline: bool) -> CmdResult<Tutor> {
    let table = constant_table(config)?;
    let names = table.names().into_iter().map(String::from).collect();
    let tools = Arc::new(default_registry(table));

    Ok(TutorBuilder::new(config, tools)
        .with_provider(select_provider(config, offline))
        .with_constant_names(names)
        .build())
}
