//! End-to-end integration tests for the RustedTutor pipeline.
//!
//! These tests exercise the full path from question text to answer:
//! classification, delegation, tool scoping, tool execution and the
//! fallback disclosure, with both the offline reference handler and a
//! scripted language model.

use std::sync::Arc;

use rustedtutor_agent::{Dispatcher, KeywordClassifier, LlmHandler, ReferenceHandler, Tutor, TutorBuilder};
use rustedtutor_config::{AppConfig, ConstantConfig, HandlerKind};
use rustedtutor_core::classifier::Classifier;
use rustedtutor_core::error::ProviderError;
use rustedtutor_core::event::{DomainEvent, EventBus, drain};
use rustedtutor_core::handler::{Handler, HandlerRequest, HandlerResponse, RouteState};
use rustedtutor_core::message::{Message, MessageToolCall};
use rustedtutor_core::provider::{Provider, ProviderRequest, ProviderResponse};
use rustedtutor_core::subject::{Query, Route, Specialist, SubjectLabel};
use rustedtutor_core::tool::{Tool, ToolRegistry};
use rustedtutor_tools::{
    CalculatorTool, ConstantEntry, ConstantTable, EquationSolverTool, PhysicsConstantsTool,
    default_registry,
};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    responses: std::sync::Mutex<Vec<ProviderResponse>>,
    requests: std::sync::Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn text(response: &str) -> Self {
        Self::new(vec![text_response(response)])
    }

    fn tool_then_text(tool_calls: Vec<MessageToolCall>, answer: &str) -> Self {
        Self::new(vec![tool_response(tool_calls), text_response(answer)])
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn offered_tools(&self, call: usize) -> Vec<String> {
        self.requests.lock().unwrap()[call]
            .tools
            .iter()
            .map(|t| t.name.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let count = requests.len();
        if count >= responses.len() {
            panic!(
                "ScriptedProvider exhausted: call #{count}, have {}",
                responses.len()
            );
        }
        requests.push(request);
        Ok(responses[count].clone())
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        model: "mock".into(),
        total_tokens: Some(15),
    }
}

fn tool_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::tool_request(tool_calls),
        model: "mock".into(),
        total_tokens: None,
    }
}

fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn builtin_tools() -> Arc<ToolRegistry> {
    Arc::new(default_registry(Arc::new(ConstantTable::builtin())))
}

fn offline_tutor() -> Tutor {
    let config = AppConfig::default();
    TutorBuilder::new(&config, builtin_tools()).build()
}

fn llm_tutor(provider: Arc<ScriptedProvider>) -> Tutor {
    let mut config = AppConfig::default();
    config.tutor.handler = HandlerKind::Llm;
    TutorBuilder::new(&config, builtin_tools())
        .with_provider(Some(provider))
        .build()
}

/// Records the tools each route is granted and answers with nothing.
struct GrantRecorder {
    grants: std::sync::Mutex<Vec<(Route, Vec<String>)>>,
}

#[async_trait::async_trait]
impl Handler for GrantRecorder {
    fn name(&self) -> &str {
        "grant_recorder"
    }

    async fn respond(&self, request: HandlerRequest<'_>) -> rustedtutor_core::Result<HandlerResponse> {
        let names = request.tools.names().into_iter().map(String::from).collect();
        self.grants.lock().unwrap().push((request.route, names));
        Ok(HandlerResponse::text("no specialist needed for this stub"))
    }
}

// ── E2E: Offline pipeline ────────────────────────────────────────────────

#[tokio::test]
async fn e2e_offline_linear_equation() {
    let tutor = offline_tutor();

    let response = tutor.ask("Solve 2*x + 5 = 11").await.expect("pipeline should succeed");

    assert_eq!(response.delegation.label, SubjectLabel::Math);
    assert_eq!(response.delegation.route, Route::Specialist(Specialist::Math));
    assert_eq!(response.invocations.len(), 1);

    let invocation = &response.invocations[0];
    assert_eq!(invocation.call.name, "equation_solver");
    assert!(invocation.result.success);
    assert_eq!(
        invocation.result.payload()["solutions"],
        serde_json::json!(["x = 3"])
    );
    assert!(response.text.contains("x = 3"));
}

#[tokio::test]
async fn e2e_offline_arithmetic() {
    let tutor = offline_tutor();

    let response = tutor.ask("Please calculate 10 + 5*3").await.unwrap();

    assert_eq!(response.delegation.label, SubjectLabel::Math);
    let invocation = &response.invocations[0];
    assert_eq!(invocation.call.name, "calculator");
    assert_eq!(invocation.result.payload()["value"], 25.0);
    assert!(response.text.contains("25"));
}

#[tokio::test]
async fn e2e_offline_constant_lookup() {
    let tutor = offline_tutor();

    let response = tutor.ask("What is the speed of light?").await.unwrap();

    assert_eq!(response.delegation.label, SubjectLabel::Physics);
    assert_eq!(response.invocations.len(), 1);
    let payload = response.invocations[0].result.payload();
    assert_eq!(payload["name"], "speed_of_light");
    assert_eq!(payload["value"], 299_792_458.0);
    assert_eq!(payload["unit"], "m/s");
    assert_eq!(payload["symbol"], "c");
    assert!(response.text.contains("c = 299792458 m/s"));
}

#[tokio::test]
async fn e2e_offline_cs_question_uses_no_tools() {
    let tutor = offline_tutor();

    let response = tutor
        .ask("How does recursion work in Python?")
        .await
        .unwrap();

    assert_eq!(response.delegation.label, SubjectLabel::Cs);
    assert!(response.invocations.is_empty());
    assert!(!response.text.is_empty());
    assert!(response.trail.contains(&RouteState::HandlerInvoked(Specialist::Cs)));
}

#[tokio::test]
async fn e2e_offline_other_goes_to_fallback_with_disclosure() {
    let tutor = offline_tutor();

    let response = tutor.ask("Who wrote Hamlet?").await.unwrap();

    assert_eq!(response.delegation.label, SubjectLabel::Other);
    assert_eq!(response.delegation.route, Route::Fallback);
    assert!(response.invocations.is_empty());
    assert!(response.text.to_lowercase().contains("no specialist"));
    assert_eq!(
        response.trail,
        vec![
            RouteState::Classifying,
            RouteState::Dispatched(SubjectLabel::Other),
            RouteState::FallbackInvoked,
            RouteState::ResponseProduced,
        ]
    );
}

#[tokio::test]
async fn e2e_offline_invalid_expression_still_answers() {
    let tutor = offline_tutor();

    let response = tutor.ask("Solve 2*x + = 11").await.unwrap();

    assert_eq!(response.delegation.label, SubjectLabel::Math);
    assert_eq!(response.invocations.len(), 1);
    assert!(!response.invocations[0].result.success);
    assert!(response.text.contains("could not solve"));
}

// ── E2E: Language-model handler ──────────────────────────────────────────

#[tokio::test]
async fn e2e_llm_math_calls_calculator() {
    let provider = Arc::new(ScriptedProvider::tool_then_text(
        vec![make_tool_call(
            "calculator",
            serde_json::json!({"expression": "(100-20)/4"}),
        )],
        "(100 - 20) / 4 = 20.",
    ));
    let tutor = llm_tutor(provider.clone());

    let response = tutor.ask("Calculate (100-20)/4 for me").await.unwrap();

    assert_eq!(response.text, "(100 - 20) / 4 = 20.");
    assert_eq!(provider.calls(), 2);
    assert_eq!(provider.offered_tools(0), vec!["calculator", "equation_solver"]);
    assert_eq!(response.invocations.len(), 1);
    assert_eq!(response.invocations[0].result.payload()["value"], 20.0);
}

#[tokio::test]
async fn e2e_llm_physics_cannot_reach_math_tools() {
    let provider = Arc::new(ScriptedProvider::tool_then_text(
        vec![make_tool_call(
            "calculator",
            serde_json::json!({"expression": "2*3"}),
        )],
        "Momentum is mass times velocity.",
    ));
    let tutor = llm_tutor(provider.clone());

    let response = tutor
        .ask("What is the momentum of a 2 kg mass at 3 m/s velocity?")
        .await
        .unwrap();

    assert_eq!(response.delegation.label, SubjectLabel::Physics);
    assert_eq!(provider.offered_tools(0), vec!["physics_constants"]);

    let invocation = &response.invocations[0];
    assert!(!invocation.result.success);
    assert_eq!(
        invocation.result.error_message().as_deref(),
        Some("Tool not found: calculator")
    );
    assert_eq!(response.text, "Momentum is mass times velocity.");
}

#[tokio::test]
async fn e2e_llm_fallback_without_disclosure_gets_notice() {
    let provider = Arc::new(ScriptedProvider::text("Hamlet was written by Shakespeare."));
    let tutor = llm_tutor(provider.clone());

    let response = tutor.ask("Who wrote Hamlet?").await.unwrap();

    assert_eq!(response.delegation.route, Route::Fallback);
    assert!(provider.offered_tools(0).is_empty());
    assert!(response.text.to_lowercase().contains("no specialist"));
    assert!(response.text.ends_with("Hamlet was written by Shakespeare."));
}

#[tokio::test]
async fn e2e_llm_handler_on_explicit_dispatcher() {
    let provider = Arc::new(ScriptedProvider::tool_then_text(
        vec![make_tool_call(
            "equation_solver",
            serde_json::json!({"equation": "x^2 - 4 = 0", "solve_for": "x"}),
        )],
        "x = -2 or x = 2",
    ));
    let handler: Arc<dyn Handler> = Arc::new(LlmHandler::new(provider.clone(), "mock", 0.2));
    let bus = Arc::new(EventBus::default());
    let dispatcher = Dispatcher::new(handler.clone(), builtin_tools(), bus.clone())
        .with_all_specialists(handler);
    let tutor = Tutor::new(Arc::new(KeywordClassifier::new()), dispatcher, bus);

    let response = tutor.ask("Solve the quadratic x^2 - 4 = 0").await.unwrap();

    let payload = response.invocations[0].result.payload();
    let solutions: Vec<&str> = payload["solutions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s.as_str())
        .collect();
    assert_eq!(solutions.len(), 2);
    assert!(solutions.contains(&"x = 2"));
    assert!(solutions.contains(&"x = -2"));
}

// ── E2E: Routing guarantees ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_tool_grants_per_route() {
    let recorder = Arc::new(GrantRecorder {
        grants: std::sync::Mutex::new(Vec::new()),
    });
    let dispatcher = Dispatcher::new(recorder.clone(), builtin_tools(), Arc::new(EventBus::default()))
        .with_all_specialists(recorder.clone());

    for label in [
        SubjectLabel::Physics,
        SubjectLabel::Math,
        SubjectLabel::Cs,
        SubjectLabel::Other,
    ] {
        dispatcher
            .dispatch(Query::new("anything").unwrap(), label)
            .await
            .unwrap();
    }

    let grants = recorder.grants.lock().unwrap();
    assert_eq!(grants.len(), 4);
    for (route, tools) in grants.iter() {
        match route {
            Route::Specialist(Specialist::Physics) => assert_eq!(tools, &["physics_constants"]),
            Route::Specialist(Specialist::Math) => {
                assert_eq!(tools, &["calculator", "equation_solver"])
            }
            Route::Specialist(Specialist::Cs) | Route::Fallback => assert!(tools.is_empty()),
        }
    }
}

#[tokio::test]
async fn e2e_missing_specialist_is_fatal_not_fallback() {
    let fallback: Arc<dyn Handler> = Arc::new(ReferenceHandler::new());
    let dispatcher = Dispatcher::new(fallback.clone(), builtin_tools(), Arc::new(EventBus::default()))
        .with_handler(Specialist::Math, fallback);

    let err = dispatcher
        .dispatch(Query::new("What is a photon?").unwrap(), SubjectLabel::Physics)
        .await
        .unwrap_err();
    assert!(err.is_fatal());

    let ok = dispatcher
        .dispatch(Query::new("Who wrote Hamlet?").unwrap(), SubjectLabel::Other)
        .await
        .unwrap();
    assert_eq!(ok.delegation.route, Route::Fallback);
}

#[tokio::test]
async fn e2e_classification_is_total() {
    let classifier = KeywordClassifier::new();
    let inputs = [
        "",
        "   ",
        "?!?",
        "physics math code",
        "force = mass * acceleration",
        "ünïcödé 漢字",
        "Explain the algorithm",
        "How much energy does a 2 + 2 circuit use?",
    ];

    for text in inputs {
        let Ok(query) = Query::new(text) else {
            continue;
        };
        let label = classifier.classify(&query).await;
        assert!(matches!(
            label,
            SubjectLabel::Physics | SubjectLabel::Math | SubjectLabel::Cs | SubjectLabel::Other
        ));
    }
}

#[tokio::test]
async fn e2e_ask_many_answers_each_query_independently() {
    let tutor = offline_tutor();

    let results = tutor
        .ask_many(&["Solve x**2 - 4*x + 3 = 0", "What is Planck's constant?", "Who wrote Hamlet?"])
        .await;

    assert_eq!(results.len(), 3);
    let responses: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(responses[0].delegation.label, SubjectLabel::Math);
    assert_eq!(
        responses[0].invocations[0].result.payload()["solutions"],
        serde_json::json!(["x = 1", "x = 3"])
    );
    assert_eq!(responses[1].delegation.label, SubjectLabel::Physics);
    assert_eq!(responses[1].invocations[0].result.payload()["name"], "planck_constant");
    assert_eq!(responses[2].delegation.route, Route::Fallback);
}

// ── E2E: Tools called directly ───────────────────────────────────────────

#[tokio::test]
async fn e2e_calculator_contract() {
    let ok = CalculatorTool
        .execute(serde_json::json!({"expression": "(100-20)/4"}))
        .await
        .unwrap();
    assert_eq!(ok.payload()["value"], 20.0);

    let bad = CalculatorTool
        .execute(serde_json::json!({"expression": "10 + x"}))
        .await
        .unwrap();
    assert!(!bad.success);
    assert!(bad.payload().get("value").is_none());
    assert!(bad.error_message().unwrap().contains("Invalid characters"));
}

#[tokio::test]
async fn e2e_equation_solver_contract() {
    let no_equals = EquationSolverTool
        .execute(serde_json::json!({"equation": "2*x + 5", "solve_for": "x"}))
        .await
        .unwrap();
    assert!(!no_equals.success);

    let missing = EquationSolverTool
        .execute(serde_json::json!({"equation": "x = 1"}))
        .await
        .unwrap();
    assert!(!missing.success);

    let contradiction = EquationSolverTool
        .execute(serde_json::json!({"equation": "x + 1 = x + 2", "solve_for": "x"}))
        .await
        .unwrap();
    assert!(contradiction.success);
    assert_eq!(contradiction.payload()["solutions"], serde_json::json!([]));
    assert!(contradiction.payload()["message"].is_string());
}

#[tokio::test]
async fn e2e_constant_lookup_contract() {
    let tool = PhysicsConstantsTool::new(Arc::new(ConstantTable::builtin()));

    for name in ["speed of light", "Speed_Of_Light"] {
        let result = tool
            .execute(serde_json::json!({"constant_name": name}))
            .await
            .unwrap();
        assert_eq!(result.payload()["value"], 299_792_458.0);
        assert_eq!(result.payload()["symbol"], "c");
    }

    let gravity = tool
        .execute(serde_json::json!({"constant_name": "gravity"}))
        .await
        .unwrap();
    assert_eq!(gravity.payload()["name"], "acceleration_due_to_gravity");

    // Partial matches take the first entry in table order containing the
    // query, so "constant" lands on the gravitational constant.
    let ambiguous = tool
        .execute(serde_json::json!({"constant_name": "constant"}))
        .await
        .unwrap();
    assert_eq!(ambiguous.payload()["name"], "gravitational_constant");

    let missing = tool
        .execute(serde_json::json!({"constant_name": "unobtainium"}))
        .await
        .unwrap();
    assert!(!missing.success);
    let available = missing.payload()["available"].as_array().unwrap().len();
    assert_eq!(available, 8);
}

// ── E2E: Configuration and events ────────────────────────────────────────

#[tokio::test]
async fn e2e_configured_constant_and_keyword() {
    let mut config = AppConfig::default();
    config.keywords.physics.push("hubble".into());
    config.constants.push(ConstantConfig {
        name: "hubble_constant".into(),
        value: 70.0,
        unit: "km/s/Mpc".into(),
        symbol: "H₀".into(),
    });
    config.validate().unwrap();

    let table = ConstantTable::with_entries(
        config
            .constants
            .iter()
            .map(|c| ConstantEntry::new(&c.name, c.value, &c.unit, &c.symbol)),
    )
    .unwrap();
    let names = table.names().into_iter().map(String::from).collect();
    let tutor = TutorBuilder::new(&config, Arc::new(default_registry(Arc::new(table))))
        .with_constant_names(names)
        .build();

    let response = tutor.ask("What is the Hubble constant today?").await.unwrap();

    assert_eq!(response.delegation.label, SubjectLabel::Physics);
    assert_eq!(response.invocations[0].result.payload()["name"], "hubble_constant");
    assert!(response.text.contains("H₀ = 70 km/s/Mpc"));
}

#[tokio::test]
async fn e2e_event_sequence_for_one_query() {
    let tutor = offline_tutor();
    let mut rx = tutor.event_bus().subscribe();

    tutor.ask("Solve 3*y = 2 for y").await.unwrap();

    let mut kinds = Vec::new();
    for record in drain(&mut rx) {
        kinds.push(match &record.event {
            DomainEvent::QueryClassified { label, .. } => {
                assert_eq!(*label, SubjectLabel::Math);
                "classified"
            }
            DomainEvent::QueryDelegated { granted_tools, .. } => {
                assert_eq!(granted_tools, &["calculator", "equation_solver"]);
                "delegated"
            }
            DomainEvent::ToolExecuted { tool, success, .. } => {
                assert_eq!(tool, "equation_solver");
                assert!(success);
                "tool"
            }
            DomainEvent::ResponseGenerated { tool_calls, .. } => {
                assert_eq!(*tool_calls, 1);
                "response"
            }
            DomainEvent::ErrorOccurred { .. } => "error",
        });
    }
    assert_eq!(kinds, vec!["classified", "delegated", "tool", "response"]);
}

#[tokio::test]
async fn e2e_config_defaults_and_validation() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());
    assert!(!config.wants_llm());
    assert_eq!(config.tutor.max_tool_iterations, 5);
    assert!(config.constants.is_empty());
}
