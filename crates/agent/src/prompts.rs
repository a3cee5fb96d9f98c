//! Prompt text for the language-model adapters, and the fallback notice.

use rustedtutor_core::subject::{Route, Specialist};

/// Phrase every fallback answer must contain.
pub const NO_SPECIALIST_MARKER: &str = "no specialist";

/// Standard disclosure put in front of fallback answers.
pub const FALLBACK_NOTICE: &str = "Note: there is no specialist available for this subject, \
so this answer comes directly from the general tutor.";

/// Returned when the model keeps calling tools past the iteration limit.
pub const MAX_ITERATIONS_MESSAGE: &str =
    "I've reached the maximum number of tool call iterations without a final answer.";

pub const CLASSIFIER_SYSTEM: &str = "\
You classify student questions by subject. Reply with exactly one word:
PHYSICS for motion, forces, energy, waves, electricity and other physical phenomena;
MATH for equations, calculations, geometry, algebra, calculus and statistics;
CS for programming, algorithms, code, software and data structures;
OTHER for anything else.
Base the decision only on the question itself.";

const TUTOR_PREAMBLE: &str = "You are a patient tutor. Explain step by step and format the answer in Markdown.";

const PHYSICS_PROMPT: &str = "\
You are a Physics tutor. Explain the underlying principles, give the relevant formulas \
and define every variable in them. When a problem needs the value of a physical constant, \
call the `physics_constants` tool with the constant's name and state its value, unit and \
symbol exactly as returned. Never guess a constant's value.";

const MATH_PROMPT: &str = "\
You are a Mathematics tutor. Use the `calculator` tool for arithmetic \
(+, -, *, /, ** and parentheses, digits only) and the `equation_solver` tool with \
`equation` and `solve_for` to solve equations; write powers as `**` or `^` and \
multiplication explicitly (`2*x`). Report tool results faithfully, and if a tool \
returns an error, explain the problem instead of inventing an answer.";

const CS_PROMPT: &str = "\
You are a Computer Science tutor. Explain concepts in programming, algorithms, data \
structures and systems. Code examples go in fenced blocks with a lowercase language \
identifier (```python) and carry brief comments.";

const FALLBACK_PROMPT: &str = "\
No subject specialist covers this question. Begin the answer by stating that no \
specialist is available for its subject, then answer it directly in a clear, \
structured form and say where the information comes from.";

/// The system prompt for a route.
pub fn system_prompt(route: Route) -> String {
    let body = match route {
        Route::Specialist(Specialist::Physics) => PHYSICS_PROMPT,
        Route::Specialist(Specialist::Math) => MATH_PROMPT,
        Route::Specialist(Specialist::Cs) => CS_PROMPT,
        Route::Fallback => FALLBACK_PROMPT,
    };
    format!("{TUTOR_PREAMBLE}\n\n{body}")
}

/// Whether a fallback answer opens with the disclosure.
///
/// Only the first sentence counts; a later mention of the marker does not.
pub fn has_disclosure(text: &str) -> bool {
    let opening = text
        .trim_start()
        .split(['.', '!', '?', '\n'])
        .next()
        .unwrap_or_default();
    opening.to_lowercase().contains(NO_SPECIALIST_MARKER)
}
