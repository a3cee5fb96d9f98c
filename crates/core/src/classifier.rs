//! Classifier trait: assigns every query exactly one subject.

use async_trait::async_trait;
use crate::subject::{Query, SubjectLabel};

/// Maps a query to one [`SubjectLabel`].
///
/// Implementations must be total: a query they cannot place, or cannot
/// decide between subjects for, maps to [`SubjectLabel::Other`] or to the
/// single label picked by their documented tie-break policy. Classification
/// never fails and never yields more than one label.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// A short name for logs (e.g. "keyword", "llm").
    fn name(&self) -> &str;

    async fn classify(&self, query: &Query) -> SubjectLabel;
}
