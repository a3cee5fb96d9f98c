//! `rustedtutor calc | solve | constant | constants`: call one tool directly.
//!
//! Prints the tool's wire payload as JSON. A failed tool call exits with
//! status 1.

use rustedtutor_core::tool::{Tool, ToolResult};
use rustedtutor_tools::{CalculatorTool, EquationSolverTool, PhysicsConstantsTool};

use super::{CmdResult, constant_table, load_config};

fn emit(result: ToolResult) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(&result.payload())?);
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

pub async fn calc(expression: &str) -> CmdResult {
    let result = CalculatorTool
        .execute(serde_json::json!({ "expression": expression }))
        .await?;
    emit(result)
}

pub async fn solve(equation: &str, solve_for: &str) -> CmdResult {
    let result = EquationSolverTool
        .execute(serde_json::json!({ "equation": equation, "solve_for": solve_for }))
        .await?;
    emit(result)
}

pub async fn constant(name: &str) -> CmdResult {
    let config = load_config()?;
    let tool = PhysicsConstantsTool::new(constant_table(&config)?);
    let result = tool
        .execute(serde_json::json!({ "constant_name": name }))
        .await?;
    emit(result)
}

pub fn list_constants() -> CmdResult {
    let config = load_config()?;
    let table = constant_table(&config)?;
    let width = table.names().iter().map(|n| n.len()).max().unwrap_or(0);

    for entry in table.entries() {
        println!(
            "  {:<width$}  {:<3} = {} {}",
            entry.canonical_name, entry.symbol, entry.value, entry.unit
        );
    }
    Ok(())
}
