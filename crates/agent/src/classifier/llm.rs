//! Language-model classifier with a deterministic fallback.

use async_trait::async_trait;
use rustedtutor_core::classifier::Classifier;
use rustedtutor_core::message::Message;
use rustedtutor_core::provider::{Provider, ProviderRequest};
use rustedtutor_core::subject::{Query, SubjectLabel};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::prompts::CLASSIFIER_SYSTEM;

/// Asks a provider for the subject label.
///
/// The model's reply is parsed leniently (any word that names a label).
/// When the provider fails or the reply names no label, the query goes to
/// the inner fallback classifier, so classification stays total.
pub struct LlmClassifier {
    provider: Arc<dyn Provider>,
    model: String,
    fallback: Arc<dyn Classifier>,
}

impl LlmClassifier {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        fallback: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            fallback,
        }
    }

    /// Extract a label from a free-form model reply.
    pub fn parse_reply(reply: &str) -> Option<SubjectLabel> {
        if let Ok(label) = reply.parse() {
            return Some(label);
        }
        reply.split_whitespace().find_map(|word| word.parse().ok())
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn name(&self) -> &str {
        "llm"
    }

    async fn classify(&self, query: &Query) -> SubjectLabel {
        let request = ProviderRequest::new(&self.model, Message::exchange(CLASSIFIER_SYSTEM, query.text()))
            .temperature(0.0)
            .max_tokens(Some(8));

        match self.provider.complete(request).await {
            Ok(response) => {
                let reply = response.message.content;
                if let Some(label) = Self::parse_reply(&reply) {
                    debug!(provider = self.provider.name(), %label, "Model classified query");
                    return label;
                }
                warn!(reply = %reply, fallback = self.fallback.name(), "Unrecognized classifier reply");
            }
            Err(e) => {
                warn!(error = %e, fallback = self.fallback.name(), "Classifier provider failed");
            }
        }

        self.fallback.classify(query).await
    }
}
