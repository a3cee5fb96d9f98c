//! Built-in tool implementations for RustedTutor.
//!
//! Tools are the deterministic half of every specialist answer: evaluate
//! arithmetic, solve equations, look up physical constants. They are pure
//! or read-only, and report failures inside their result payload instead of
//! raising errors.

pub mod calculator;
pub mod equation_solver;
pub mod physics_constants;

use rustedtutor_core::tool::ToolRegistry;
use std::sync::Arc;

pub use calculator::{CalcError, CalculatorTool};
pub use equation_solver::{EqError, EquationSolverTool, EquationSpec, Solved};
pub use physics_constants::{
    ConstantEntry, ConstantTable, LookupError, PhysicsConstantsTool, TableError,
};

/// Create a registry holding every built-in tool.
///
/// The dispatcher scopes this down per route; nothing outside it decides
/// which handler sees which tool.
pub fn default_registry(table: Arc<ConstantTable>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CalculatorTool));
    registry.register(Arc::new(EquationSolverTool));
    registry.register(Arc::new(PhysicsConstantsTool::new(table)));
    registry
}
