//! Query and subject domain types.
//!
//! A [`Query`] comes in, a [`Classifier`](crate::classifier::Classifier)
//! assigns it exactly one [`SubjectLabel`], and the dispatcher turns the
//! label into a [`Route`]: one [`Specialist`] or the fallback path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Tool names, shared by the tools crate and the dispatcher's grants.
pub const CALCULATOR: &str = "calculator";
pub const EQUATION_SOLVER: &str = "equation_solver";
pub const PHYSICS_CONSTANTS: &str = "physics_constants";

/// Whether `name` is a canonical physics-constant key: non-empty, lowercase
/// ASCII letters, digits, and underscores.
pub fn is_canonical_constant_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// A single user question. Immutable, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Query(String);

impl Query {
    /// Create a query, rejecting empty or whitespace-only text.
    pub fn new(text: impl Into<String>) -> Result<Self, Error> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::InvalidQuery("query text is empty".into()));
        }
        Ok(Self(text))
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Query {
    type Error = Error;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Query::new(text)
    }
}

impl From<Query> for String {
    fn from(query: Query) -> Self {
        query.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The classification outcome. Always exactly one of four variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubjectLabel {
    Physics,
    Math,
    Cs,
    Other,
}

impl SubjectLabel {
    /// All labels, in declaration order.
    pub const ALL: [SubjectLabel; 4] = [
        SubjectLabel::Physics,
        SubjectLabel::Math,
        SubjectLabel::Cs,
        SubjectLabel::Other,
    ];

    /// The specialist this label delegates to, or `None` for `Other`.
    pub fn specialist(self) -> Option<Specialist> {
        match self {
            SubjectLabel::Physics => Some(Specialist::Physics),
            SubjectLabel::Math => Some(Specialist::Math),
            SubjectLabel::Cs => Some(Specialist::Cs),
            SubjectLabel::Other => None,
        }
    }

    /// The symbolic wire name (`PHYSICS`, `MATH`, `CS`, `OTHER`).
    pub fn as_str(self) -> &'static str {
        match self {
            SubjectLabel::Physics => "PHYSICS",
            SubjectLabel::Math => "MATH",
            SubjectLabel::Cs => "CS",
            SubjectLabel::Other => "OTHER",
        }
    }
}

impl fmt::Display for SubjectLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectLabel {
    type Err = Error;

    /// Parse a label case-insensitively, accepting common synonyms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .trim_matches(|c: char| !c.is_ascii_alphanumeric())
            .to_ascii_lowercase()
            .replace(['_', '-'], " ");
        match normalized.as_str() {
            "physics" => Ok(SubjectLabel::Physics),
            "math" | "maths" | "mathematics" => Ok(SubjectLabel::Math),
            "cs" | "computer science" | "computing" => Ok(SubjectLabel::Cs),
            "other" | "none" | "general" => Ok(SubjectLabel::Other),
            _ => Err(Error::InvalidQuery(format!("unknown subject label: {s}"))),
        }
    }
}

/// A subject specialist. `Other` has no specialist by definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialist {
    Physics,
    Math,
    Cs,
}

impl Specialist {
    pub const ALL: [Specialist; 3] = [Specialist::Physics, Specialist::Math, Specialist::Cs];

    /// The deterministic tools this specialist may invoke. Nothing else is
    /// ever exposed to it.
    pub fn granted_tools(self) -> &'static [&'static str] {
        match self {
            Specialist::Math => &[CALCULATOR, EQUATION_SOLVER],
            Specialist::Physics => &[PHYSICS_CONSTANTS],
            Specialist::Cs => &[],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Specialist::Physics => "physics",
            Specialist::Math => "math",
            Specialist::Cs => "cs",
        }
    }

    /// Human-readable subject name.
    pub fn subject(self) -> &'static str {
        match self {
            Specialist::Physics => "Physics",
            Specialist::Math => "Mathematics",
            Specialist::Cs => "Computer Science",
        }
    }

    pub fn label(self) -> SubjectLabel {
        match self {
            Specialist::Physics => SubjectLabel::Physics,
            Specialist::Math => SubjectLabel::Math,
            Specialist::Cs => SubjectLabel::Cs,
        }
    }
}

impl fmt::Display for Specialist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The selected downstream path for a classified query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Specialist(Specialist),
    Fallback,
}

impl Route {
    /// Tools exposed on this route. The fallback path gets none.
    pub fn granted_tools(self) -> &'static [&'static str] {
        match self {
            Route::Specialist(s) => s.granted_tools(),
            Route::Fallback => &[],
        }
    }
}

impl From<SubjectLabel> for Route {
    fn from(label: SubjectLabel) -> Self {
        label.specialist().map_or(Route::Fallback, Route::Specialist)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Specialist(s) => write!(f, "{s}_specialist"),
            Route::Fallback => f.write_str("fallback"),
        }
    }
}
