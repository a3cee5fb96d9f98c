//! `rustedtutor ask`: single-question or interactive mode.

use rustedtutor_agent::Tutor;
use rustedtutor_core::event::{EventRecord, drain};
use rustedtutor_core::handler::{RouteState, TutorResponse};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use super::{CmdResult, build_tutor, load_config};

pub async fn run(question: Option<String>, trace: bool, offline: bool) -> CmdResult {
    let config = load_config()?;
    let tutor = build_tutor(&config, offline)?;

    match question {
        Some(question) => answer(&tutor, &question, trace).await,
        None => interactive(&tutor, trace).await,
    }
}

async fn answer(tutor: &Tutor, question: &str, trace: bool) -> CmdResult {
    let mut events = tutor.event_bus().subscribe();
    let response = tutor.ask(question).await?;
    println!("{}", response.text);
    if trace {
        print_trace(&response, &mut events);
    }
    Ok(())
}

async fn interactive(tutor: &Tutor, trace: bool) -> CmdResult {
    println!();
    println!("  RustedTutor — Interactive Mode");
    println!("  Subjects: physics, mathematics, computer science");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut events = tutor.event_bus().subscribe();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        match tutor.ask(line).await {
            Ok(response) => {
                println!();
                for text in response.text.lines() {
                    println!("  Tutor > {text}");
                }
                println!();
                if trace {
                    print_trace(&response, &mut events);
                } else {
                    drain(&mut events);
                }
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => eprintln!("  [Error] {e}"),
        }
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

fn describe(state: &RouteState) -> String {
    match state {
        RouteState::Classifying => "classifying".into(),
        RouteState::Dispatched(label) => format!("dispatched({label})"),
        RouteState::HandlerInvoked(specialist) => format!("{specialist}_specialist"),
        RouteState::FallbackInvoked => "fallback".into(),
        RouteState::ResponseProduced => "response".into(),
    }
}

fn print_trace(response: &TutorResponse, events: &mut broadcast::Receiver<Arc<EventRecord>>) {
    let trail: Vec<String> = response.trail.iter().map(describe).collect();
    eprintln!();
    eprintln!("  Label:  {}", response.delegation.label);
    eprintln!("  Route:  {}", trail.join(" → "));

    if !response.invocations.is_empty() {
        eprintln!("  Tools:");
        for invocation in &response.invocations {
            eprintln!(
                "    {} {} → {} ({} ms)",
                invocation.call.name,
                invocation.call.arguments,
                invocation.result.payload(),
                invocation.duration_ms
            );
        }
    }

    eprintln!("  Events:");
    for record in drain(events) {
        match serde_json::to_string(record.as_ref()) {
            Ok(json) => eprintln!("    {json}"),
            Err(e) => eprintln!("    <unserializable event: {e}>"),
        }
    }
}
