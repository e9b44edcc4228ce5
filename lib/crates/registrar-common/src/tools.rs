//! Function-calling surface for chat assistants.
//!
//! [`tool_definitions`] describes the tools in the JSON shape chat
//! completion APIs expect, and [`ToolDispatcher`] executes a tool call by
//! name, returning the same text report the other front-ends produce.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::report::{add_report, list_report, search_report};
use crate::store::RegistrationStore;

pub const ADD_REGISTRATION: &str = "add_registration";
pub const GET_ALL_REGISTRATIONS: &str = "get_all_registrations";
pub const SEARCH_REGISTRATIONS: &str = "search_registrations";

/// Older clients call the listing tool by its singular name.
const GET_ALL_REGISTRATIONS_ALIAS: &str = "get_all_registration";

/// Errors that prevent a tool call from reaching the store.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Arguments of `add_registration`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddRegistrationArgs {
    pub name: String,
    pub email: String,
    /// Date of birth in `YYYY-MM-DD` format.
    pub dob: String,
}

/// Arguments of `search_registrations`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRegistrationsArgs {
    pub query: String,
}

/// Tool schema in chat-completions `tools` format.
#[must_use]
pub fn tool_definitions() -> Value {
    json!([
        {
            "type": "function",
            "function": {
                "name": ADD_REGISTRATION,
                "description": "Add a new user registration with name, email, and date of birth",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Full name of the person" },
                        "email": { "type": "string", "description": "Email address" },
                        "dob": { "type": "string", "description": "Date of birth in YYYY-MM-DD format" }
                    },
                    "required": ["name", "email", "dob"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": GET_ALL_REGISTRATIONS,
                "description": "Get all user registrations",
                "parameters": { "type": "object", "properties": {} }
            }
        },
        {
            "type": "function",
            "function": {
                "name": SEARCH_REGISTRATIONS,
                "description": "Search registrations by a case-insensitive name or email fragment",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Text to look for in names and emails" }
                    },
                    "required": ["query"]
                }
            }
        }
    ])
}

/// Executes tool calls against a shared store.
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    store: Arc<RegistrationStore>,
}

impl ToolDispatcher {
    #[must_use]
    pub fn new(store: Arc<RegistrationStore>) -> Self {
        Self { store }
    }

    /// Run tool `name` with JSON `arguments` and return its text report.
    ///
    /// Store failures come back as `ERROR:` report text; only an unknown
    /// tool or undecodable arguments produce a [`ToolError`].
    pub fn call(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        debug!(tool = name, "dispatching tool call");
        match name {
            ADD_REGISTRATION => {
                let args: AddRegistrationArgs = parse_args(name, arguments)?;
                Ok(add_report(&self.store.add(&args.name, &args.email, &args.dob)))
            }
            GET_ALL_REGISTRATIONS | GET_ALL_REGISTRATIONS_ALIAS => {
                Ok(list_report(&self.store.list()))
            }
            SEARCH_REGISTRATIONS => {
                let args: SearchRegistrationsArgs = parse_args(name, arguments)?;
                Ok(search_report(&args.query, &self.store.search(&args.query)))
            }
            other => {
                warn!(tool = other, "unknown tool requested");
                Err(ToolError::UnknownTool(other.to_string()))
            }
        }
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|source| ToolError::InvalidArguments {
        tool: tool.to_string(),
        source,
    })
}
