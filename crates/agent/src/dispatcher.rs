//! The dispatcher: turns a subject label into exactly one handler call.
//!
//! `OTHER` always goes to the fallback handler. Every other label goes to
//! its specialist, which only ever sees the tools granted to its route.
//! A specialist label with no registered handler is a configuration error,
//! not a fallback.

use rustedtutor_core::error::{Error, Result, RouteError};
use rustedtutor_core::event::{DomainEvent, EventBus};
use rustedtutor_core::handler::{Delegation, Handler, HandlerRequest, RouteState, TutorResponse};
use rustedtutor_core::subject::{Query, Route, Specialist, SubjectLabel};
use rustedtutor_core::tool::ToolRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::prompts::{FALLBACK_NOTICE, has_disclosure};

pub struct Dispatcher {
    handlers: HashMap<Specialist, Arc<dyn Handler>>,
    fallback: Arc<dyn Handler>,
    tools: Arc<ToolRegistry>,
    event_bus: Arc<EventBus>,
}

impl Dispatcher {
    /// A dispatcher with only a fallback handler. Add specialists with
    /// [`with_handler`](Self::with_handler).
    pub fn new(fallback: Arc<dyn Handler>, tools: Arc<ToolRegistry>, event_bus: Arc<EventBus>) -> Self {
        Self {
            handlers: HashMap::new(),
            fallback,
            tools,
            event_bus,
        }
    }

    /// Register the handler for one specialist.
    pub fn with_handler(mut self, specialist: Specialist, handler: Arc<dyn Handler>) -> Self {
        self.handlers.insert(specialist, handler);
        self
    }

    /// Use one handler for every specialist.
    pub fn with_all_specialists(mut self, handler: Arc<dyn Handler>) -> Self {
        for specialist in Specialist::ALL {
            self.handlers.insert(specialist, handler.clone());
        }
        self
    }

    /// The tools a route may call.
    pub fn scoped_tools(&self, route: Route) -> ToolRegistry {
        self.tools.scoped(route.granted_tools())
    }

    fn handler_for(&self, route: Route) -> Result<Arc<dyn Handler>> {
        match route {
            Route::Specialist(s) => self
                .handlers
                .get(&s)
                .cloned()
                .ok_or(Error::Route(RouteError::HandlerNotConfigured(s))),
            Route::Fallback => Ok(self.fallback.clone()),
        }
    }

    /// Route a classified query to its handler and collect the response.
    pub async fn dispatch(&self, query: Query, label: SubjectLabel) -> Result<TutorResponse> {
        let delegation = Delegation::new(query, label);
        let route = delegation.route;
        let mut trail = vec![RouteState::Classifying, RouteState::Dispatched(label)];

        let handler = match self.handler_for(route) {
            Ok(handler) => handler,
            Err(e) => {
                error!(%label, error = %e, "No handler for route");
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    route,
                    handler: None,
                    error_message: e.to_string(),
                });
                return Err(e);
            }
        };

        trail.push(match route {
            Route::Specialist(s) => RouteState::HandlerInvoked(s),
            Route::Fallback => RouteState::FallbackInvoked,
        });

        let tools = self.scoped_tools(route);
        info!(%label, %route, handler = handler.name(), tools = ?tools.names(), "Query delegated");
        self.event_bus.publish(DomainEvent::QueryDelegated {
            label,
            route,
            handler: handler.name().to_string(),
            granted_tools: tools.names().into_iter().map(String::from).collect(),
        });

        let response = handler
            .respond(HandlerRequest {
                query: &delegation.query,
                route,
                tools: &tools,
            })
            .await
            .inspect_err(|e| {
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    route,
                    handler: Some(handler.name().to_string()),
                    error_message: e.to_string(),
                });
            })?;

        for invocation in &response.invocations {
            self.event_bus.publish(DomainEvent::ToolExecuted {
                tool: invocation.call.name.clone(),
                success: invocation.result.success,
                duration_ms: invocation.duration_ms,
            });
        }

        let text = if route == Route::Fallback && !has_disclosure(&response.text) {
            format!("{FALLBACK_NOTICE}\n\n{}", response.text)
        } else {
            response.text
        };

        trail.push(RouteState::ResponseProduced);
        info!(%route, tool_calls = response.invocations.len(), chars = text.len(), "Response produced");
        self.event_bus.publish(DomainEvent::ResponseGenerated {
            route,
            tool_calls: response.invocations.len(),
            chars: text.chars().count(),
        });

        Ok(TutorResponse {
            delegation,
            text,
            invocations: response.invocations,
            trail,
        })
    }
}
