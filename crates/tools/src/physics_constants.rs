//! Physical constants table and the `physics_constants` lookup tool.
//!
//! The table is built once at startup (the eight built-in constants plus any
//! configured extras) and shared read-only through an `Arc`.

use async_trait::async_trait;
use rustedtutor_core::error::ToolError;
use rustedtutor_core::subject::{PHYSICS_CONSTANTS, is_canonical_constant_name};
use rustedtutor_core::tool::{Tool, ToolResult};
use serde::Serialize;
use std::sync::Arc;

/// One constant. Immutable once the table is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstantEntry {
    pub canonical_name: String,
    pub value: f64,
    pub unit: String,
    pub symbol: String,
}

impl ConstantEntry {
    pub fn new(
        canonical_name: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            value,
            unit: unit.into(),
            symbol: symbol.into(),
        }
    }

    /// `speed_of_light` → `speed of light`
    pub fn display_name(&self) -> String {
        self.canonical_name.replace('_', " ")
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("Constant '{name}' not found. Available constants: {}", available.join(", "))]
    NotFound { name: String, available: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("Constant '{0}' is already defined")]
    Duplicate(String),

    #[error("Constant name '{0}' must be lowercase with underscores")]
    InvalidName(String),
}

/// An ordered mapping from canonical name to constant.
///
/// Order matters: partial matches resolve to the first entry, in definition
/// order, whose name contains the query.
#[derive(Debug, Clone)]
pub struct ConstantTable {
    entries: Vec<ConstantEntry>,
}

impl ConstantTable {
    /// The built-in table of eight constants.
    pub fn builtin() -> Self {
        let entries = vec![
            ConstantEntry::new("speed_of_light", 299_792_458.0, "m/s", "c"),
            ConstantEntry::new("gravitational_constant", 6.67430e-11, "m³/(kg⋅s²)", "G"),
            ConstantEntry::new("planck_constant", 6.62607015e-34, "J⋅s", "h"),
            ConstantEntry::new("electron_charge", 1.602176634e-19, "C", "e"),
            ConstantEntry::new("avogadro_number", 6.02214076e23, "mol⁻¹", "Nₐ"),
            ConstantEntry::new("boltzmann_constant", 1.380649e-23, "J/K", "k"),
            ConstantEntry::new("gas_constant", 8.314462618, "J/(mol⋅K)", "R"),
            ConstantEntry::new("acceleration_due_to_gravity", 9.80665, "m/s²", "g"),
        ];
        Self { entries }
    }

    /// The built-in table with `extra` appended after it.
    pub fn with_entries(extra: impl IntoIterator<Item = ConstantEntry>) -> Result<Self, TableError> {
        let mut table = Self::builtin();
        for entry in extra {
            let name = &entry.canonical_name;
            if !is_canonical_constant_name(name) {
                return Err(TableError::InvalidName(name.clone()));
            }
            if table.get(name).is_some() {
                return Err(TableError::Duplicate(name.clone()));
            }
            table.entries.push(entry);
        }
        Ok(table)
    }

    /// Exact lookup by canonical name.
    pub fn get(&self, canonical_name: &str) -> Option<&ConstantEntry> {
        self.entries.iter().find(|e| e.canonical_name == canonical_name)
    }

    /// Resolve a free-form name: exact match first, then the first entry
    /// whose canonical name contains the normalized input.
    pub fn lookup(&self, name: &str) -> Result<&ConstantEntry, LookupError> {
        let normalized = normalize(name);
        if !normalized.is_empty() {
            if let Some(entry) = self.get(&normalized) {
                return Ok(entry);
            }
            if let Some(entry) = self
                .entries
                .iter()
                .find(|e| e.canonical_name.contains(&normalized))
            {
                return Ok(entry);
            }
        }

        Err(LookupError::NotFound {
            name: name.to_string(),
            available: self.names().into_iter().map(String::from).collect(),
        })
    }

    /// Canonical names in definition order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.canonical_name.as_str()).collect()
    }

    pub fn entries(&self) -> &[ConstantEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ConstantTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Looks up physical constants by name.
pub struct PhysicsConstantsTool {
    table: Arc<ConstantTable>,
}

impl PhysicsConstantsTool {
    pub fn new(table: Arc<ConstantTable>) -> Self {
        Self { table }
    }
}

#[async_trait]
impl Tool for PhysicsConstantsTool {
    fn name(&self) -> &str {
        PHYSICS_CONSTANTS
    }

    fn description(&self) -> &str {
        "Look up the value, unit and symbol of a physical constant by name, e.g. 'speed of light' or 'planck_constant'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "constant_name": {
                    "type": "string",
                    "description": format!("Name of the constant. Known: {}", self.table.names().join(", "))
                }
            },
            "required": ["constant_name"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let name = arguments["constant_name"].as_str().unwrap_or_default();

        match self.table.lookup(name) {
            Ok(entry) => {
                tracing::debug!(query = name, constant = %entry.canonical_name, "Constant resolved");
                Ok(ToolResult::success(
                    format!("{} = {} {}", entry.symbol, entry.value, entry.unit),
                    serde_json::json!({
                        "name": entry.canonical_name,
                        "value": entry.value,
                        "unit": entry.unit,
                        "symbol": entry.symbol,
                    }),
                ))
            }
            Err(e) => {
                let LookupError::NotFound { available, .. } = &e;
                tracing::warn!(query = name, "Unknown constant requested");
                Ok(ToolResult::failure_with(
                    e.to_string(),
                    serde_json::json!({ "available": available }),
                ))
            }
        }
    }
}
