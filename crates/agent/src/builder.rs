//! Assemble a [`Tutor`] from configuration.

use rustedtutor_config::{AppConfig, ClassifierKind, HandlerKind};
use rustedtutor_core::classifier::Classifier;
use rustedtutor_core::event::EventBus;
use rustedtutor_core::handler::Handler;
use rustedtutor_core::provider::Provider;
use rustedtutor_core::tool::ToolRegistry;
use std::sync::Arc;
use tracing::{info, warn};

use crate::classifier::{KeywordClassifier, LlmClassifier};
use crate::dispatcher::Dispatcher;
use crate::handlers::{LlmHandler, ReferenceHandler};
use crate::tutor::Tutor;

/// Picks classifier and handler implementations from [`AppConfig`].
///
/// Language-model components are only used when a provider is supplied;
/// otherwise the deterministic ones stand in.
pub struct TutorBuilder<'a> {
    config: &'a AppConfig,
    tools: Arc<ToolRegistry>,
    provider: Option<Arc<dyn Provider>>,
    constant_names: Vec<String>,
    event_bus: Arc<EventBus>,
}

impl<'a> TutorBuilder<'a> {
    pub fn new(config: &'a AppConfig, tools: Arc<ToolRegistry>) -> Self {
        Self {
            config,
            tools,
            provider: None,
            constant_names: Vec::new(),
            event_bus: Arc::new(EventBus::default()),
        }
    }

    pub fn with_provider(mut self, provider: Option<Arc<dyn Provider>>) -> Self {
        self.provider = provider;
        self
    }

    /// Constant names the reference handler should recognize in questions.
    pub fn with_constant_names(mut self, names: Vec<String>) -> Self {
        self.constant_names = names;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn build(self) -> Tutor {
        let config = self.config;
        let keyword: Arc<dyn Classifier> = Arc::new(KeywordClassifier::with_keywords(
            &config.keywords,
            config.tutor.tie_break,
        ));

        if self.provider.is_none() && config.wants_llm() {
            warn!("Language-model components requested but no provider available, running offline");
        }

        let classifier: Arc<dyn Classifier> = match (&self.provider, config.tutor.classifier) {
            (Some(provider), ClassifierKind::Llm) => Arc::new(LlmClassifier::new(
                provider.clone(),
                config.model(),
                keyword,
            )),
            _ => keyword,
        };

        let handler: Arc<dyn Handler> = match (&self.provider, config.tutor.handler) {
            (Some(provider), HandlerKind::Llm) => Arc::new(
                LlmHandler::new(provider.clone(), config.model(), config.default_temperature)
                    .with_max_iterations(config.tutor.max_tool_iterations)
                    .with_max_tokens(config.default_max_tokens),
            ),
            _ => Arc::new(ReferenceHandler::new().with_constant_names(self.constant_names)),
        };

        info!(
            classifier = classifier.name(),
            handler = handler.name(),
            tools = self.tools.len(),
            "Tutor assembled"
        );

        let dispatcher = Dispatcher::new(handler.clone(), self.tools, self.event_bus.clone())
            .with_all_specialists(handler);
        Tutor::new(classifier, dispatcher, self.event_bus)
    }
}
