//! The tutor pipeline: classify, then dispatch.

use futures::future::join_all;
use rustedtutor_core::classifier::Classifier;
use rustedtutor_core::error::Result;
use rustedtutor_core::event::{DomainEvent, EventBus, preview};
use rustedtutor_core::handler::TutorResponse;
use rustedtutor_core::subject::{Query, SubjectLabel};
use std::sync::Arc;
use tracing::info;

use crate::dispatcher::Dispatcher;

/// Answers free-form questions end to end.
///
/// Holds no per-query state, so one `Tutor` serves any number of
/// concurrent queries.
pub struct Tutor {
    classifier: Arc<dyn Classifier>,
    dispatcher: Dispatcher,
    event_bus: Arc<EventBus>,
}

impl Tutor {
    pub fn new(classifier: Arc<dyn Classifier>, dispatcher: Dispatcher, event_bus: Arc<EventBus>) -> Self {
        Self {
            classifier,
            dispatcher,
            event_bus,
        }
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Assign the query its one label and announce it.
    pub async fn classify(&self, query: &Query) -> SubjectLabel {
        let label = self.classifier.classify(query).await;
        info!(classifier = self.classifier.name(), %label, "Query classified");
        self.event_bus.publish(DomainEvent::QueryClassified {
            classifier: self.classifier.name().to_string(),
            label,
            query: preview(query.text(), 60),
        });
        label
    }

    /// Answer one question.
    pub async fn ask(&self, text: &str) -> Result<TutorResponse> {
        let query = Query::new(text)?;
        let label = self.classify(&query).await;
        self.dispatcher.dispatch(query, label).await
    }

    /// Answer independent questions concurrently. Results keep input order.
    pub async fn ask_many<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Result<TutorResponse>> {
        join_all(texts.iter().map(|t| self.ask(t.as_ref()))).await
    }
}
