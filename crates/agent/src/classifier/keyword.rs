//! Deterministic keyword classifier.
//!
//! Each subject has a vocabulary compiled into one case-insensitive regex.
//! A query's score for a subject is the number of keyword occurrences, plus
//! (for mathematics) the number of arithmetic and equation patterns. The
//! highest score wins; see [`TieBreak`] for how equal scores are resolved.

use async_trait::async_trait;
use regex::Regex;
use rustedtutor_config::{KeywordConfig, TieBreak};
use rustedtutor_core::classifier::Classifier;
use rustedtutor_core::subject::{Query, SubjectLabel};
use std::sync::LazyLock;
use tracing::{debug, warn};

const PHYSICS_KEYWORDS: &[&str] = &[
    "physics", "motion", "force", "energy", "kinetic energy", "potential energy", "wave",
    "velocity", "acceleration", "speed", "momentum", "gravity", "gravitational", "mass",
    "friction", "electricity", "magnetism", "magnetic field", "electric field", "voltage",
    "resistance", "circuit", "ohm", "newton", "joule", "watt", "thermodynamics", "heat",
    "temperature", "optics", "light", "speed of light", "quantum", "relativity", "photon",
    "electron", "proton", "neutron", "planck", "boltzmann", "avogadro", "pressure", "torque",
    "frequency", "wavelength", "displacement", "projectile", "inertia", "orbit", "pendulum",
];

const MATH_KEYWORDS: &[&str] = &[
    "math", "maths", "mathematics", "equation", "solve", "calculate", "calculation", "compute",
    "algebra", "geometry", "calculus", "statistics", "derivative", "integral", "differentiate",
    "integrate", "polynomial", "quadratic", "fraction", "percentage", "probability", "matrix",
    "triangle", "circle", "area", "perimeter", "angle", "theorem", "proof", "prime number",
    "factor", "square root", "logarithm", "trigonometry", "sine", "cosine", "arithmetic",
    "multiply", "divide", "sum", "product", "mean", "median",
];

const CS_KEYWORDS: &[&str] = &[
    "computer science", "programming", "program", "code", "coding", "algorithm",
    "data structure", "software", "python", "javascript", "java", "rust", "c++", "c#", "sql",
    "html", "css", "recursion", "sorting", "binary search", "linked list", "stack", "queue",
    "hash table", "hash map", "compiler", "database", "operating system", "network", "git",
    "api", "array", "loop", "class", "object-oriented", "oop", "big o", "complexity",
    "debugging", "bug", "function call", "pointer",
];

static ARITHMETIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d\s*(?:\*\*|//|[-+*/^×÷])\s*\(?\s*\d").expect("static regex")
});

static EQUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w)]\s*=\s*[\w(\-]").expect("static regex"));

/// Classification order; equal scores go to the earliest subject.
const ORDER: [SubjectLabel; 3] = [SubjectLabel::Physics, SubjectLabel::Math, SubjectLabel::Cs];

struct Vocabulary {
    label: SubjectLabel,
    pattern: Option<Regex>,
    keywords: usize,
}

impl Vocabulary {
    fn build(label: SubjectLabel, keywords: &[String]) -> Self {
        let mut keywords: Vec<&str> = keywords
            .iter()
            .map(|k| k.as_str())
            .filter(|k| !k.is_empty())
            .collect();
        keywords.sort_unstable();
        keywords.dedup();
        // Longest first so "speed of light" is one occurrence, not three.
        keywords.sort_by_key(|k| std::cmp::Reverse(k.len()));

        let branches: Vec<String> = keywords.iter().map(|k| keyword_pattern(k)).collect();
        let pattern = if branches.is_empty() {
            None
        } else {
            match Regex::new(&format!("(?i){}", branches.join("|"))) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(subject = %label, error = %e, "Keyword vocabulary failed to compile");
                    None
                }
            }
        };

        Self {
            label,
            pattern,
            keywords: keywords.len(),
        }
    }

    fn count(&self, text: &str) -> usize {
        self.pattern
            .as_ref()
            .map_or(0, |re| re.find_iter(text).count())
    }
}

/// Regex branch for one keyword.
///
/// Word-like keywords match on word boundaries with an optional plural
/// `s`/`es`; keywords ending in a symbol (`c++`, `c#`) must be followed by a
/// non-word character or the end of the text.
fn keyword_pattern(keyword: &str) -> String {
    let escaped = regex::escape(keyword).replace(' ', r"\s+");
    let starts_word = keyword.chars().next().is_some_and(|c| c.is_alphanumeric());
    let ends_word = keyword.chars().last().is_some_and(|c| c.is_alphanumeric());
    let lead = if starts_word { r"\b" } else { "" };
    if ends_word {
        format!(r"(?:{lead}{escaped}(?:e?s)?\b)")
    } else {
        format!(r"(?:{lead}{escaped}(?:\W|$))")
    }
}

fn normalize(keywords: &[&str], extra: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.to_string())
        .chain(extra.iter().map(|k| k.trim().to_lowercase()))
        .collect()
}

/// Keyword-matching classifier. Deterministic, no I/O.
pub struct KeywordClassifier {
    vocabularies: Vec<Vocabulary>,
    tie_break: TieBreak,
}

impl KeywordClassifier {
    /// Built-in vocabularies with the `most_matches` policy.
    pub fn new() -> Self {
        Self::with_keywords(&KeywordConfig::default(), TieBreak::default())
    }

    /// Built-in vocabularies extended with configured keywords.
    pub fn with_keywords(extra: &KeywordConfig, tie_break: TieBreak) -> Self {
        let vocabularies = vec![
            Vocabulary::build(SubjectLabel::Physics, &normalize(PHYSICS_KEYWORDS, &extra.physics)),
            Vocabulary::build(SubjectLabel::Math, &normalize(MATH_KEYWORDS, &extra.math)),
            Vocabulary::build(SubjectLabel::Cs, &normalize(CS_KEYWORDS, &extra.cs)),
        ];
        debug!(
            physics = vocabularies[0].keywords,
            math = vocabularies[1].keywords,
            cs = vocabularies[2].keywords,
            ?tie_break,
            "Keyword classifier ready"
        );
        Self {
            vocabularies,
            tie_break,
        }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Per-subject scores in classification order.
    pub fn scores(&self, text: &str) -> Vec<(SubjectLabel, usize)> {
        self.vocabularies
            .iter()
            .map(|v| {
                let mut score = v.count(text);
                if v.label == SubjectLabel::Math {
                    score += ARITHMETIC.find_iter(text).count();
                    score += EQUATION.find_iter(text).count();
                }
                (v.label, score)
            })
            .collect()
    }

    /// Pick one label from scores, following the tie-break policy.
    pub fn decide(&self, scores: &[(SubjectLabel, usize)]) -> SubjectLabel {
        let ordered = ORDER
            .iter()
            .filter_map(|label| scores.iter().find(|(l, _)| l == label));

        let winner = match self.tie_break {
            TieBreak::FirstMatch => ordered.filter(|(_, s)| *s > 0).map(|(l, _)| *l).next(),
            TieBreak::MostMatches => {
                let mut best: Option<(SubjectLabel, usize)> = None;
                for &(label, score) in ordered {
                    if score > 0 && best.is_none_or(|(_, b)| score > b) {
                        best = Some((label, score));
                    }
                }
                best.map(|(l, _)| l)
            }
        };

        winner.unwrap_or(SubjectLabel::Other)
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn classify(&self, query: &Query) -> SubjectLabel {
        let scores = self.scores(query.text());
        let label = self.decide(&scores);
        debug!(?scores, %label, "Keyword scores");
        label
    }
}
