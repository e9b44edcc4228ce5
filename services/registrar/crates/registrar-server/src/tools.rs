//! MCP tool implementations for the registration server.
//!
//! Exposes three tools via the `rmcp` `#[tool]` macro:
//!   - `add_registration`
//!   - `get_all_registrations` (also answered as `get_all_registration`)
//!   - `search_registrations`
//!
//! Each tool answers with the same text report as the HTTP API. Rejected
//! input is a normal tool result; only storage faults are tool errors.

use std::sync::Arc;

use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::Deserialize;

use registrar_common::RegistrationError;
use registrar_common::report::{add_report, list_report, search_report};

use crate::state::AppState;

// ===================================================================
// Input structs
// ===================================================================

/// Input parameters for the `add_registration` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddRegistrationInput {
    /// Full name of the person.
    pub name: String,
    /// Email address; must not already be registered (case-insensitive).
    pub email: String,
    /// Date of birth in `YYYY-MM-DD` format.
    pub dob: String,
}

/// Input parameters for the `search_registrations` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchRegistrationsInput {
    /// Case-insensitive fragment of a name or email.
    pub query: String,
}

// ===================================================================
// RegistrarTools: the MCP server handler
// ===================================================================

#[derive(Clone)]
pub struct RegistrarTools {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for RegistrarTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrarTools")
            .field("store", &self.state.store_path())
            .finish_non_exhaustive()
    }
}

impl RegistrarTools {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl RegistrarTools {
    /// Register a person. Every invalid field is reported in one response.
    #[tool(description = "Add a new registration with name, email, and \
        date of birth (YYYY-MM-DD).")]
    async fn add_registration(
        &self,
        params: Parameters<AddRegistrationInput>,
    ) -> Result<String, String> {
        let input = params.0;
        let outcome = self
            .state
            .add(input.name, input.email, input.dob)
            .await
            .map_err(|e| format!("Registration failed: {e:#}"))?;
        as_tool_result(add_report(&outcome), outcome.as_ref().err())
    }

    /// List every registration in insertion order.
    #[tool(description = "Get all registrations.")]
    async fn get_all_registrations(&self) -> Result<String, String> {
        let outcome = self
            .state
            .list()
            .await
            .map_err(|e| format!("Failed to fetch registrations: {e:#}"))?;
        as_tool_result(list_report(&outcome), outcome.as_ref().err())
    }

    /// Singular name used by older chat clients.
    #[tool(description = "Alias of get_all_registrations.")]
    async fn get_all_registration(&self) -> Result<String, String> {
        self.get_all_registrations().await
    }

    /// Case-insensitive substring search over names and emails.
    #[tool(description = "Search registrations by a name or email fragment \
        (case-insensitive).")]
    async fn search_registrations(
        &self,
        params: Parameters<SearchRegistrationsInput>,
    ) -> Result<String, String> {
        let query = params.0.query;
        let outcome = self
            .state
            .search(query.clone())
            .await
            .map_err(|e| format!("Search failed: {e:#}"))?;
        as_tool_result(search_report(&query, &outcome), outcome.as_ref().err())
    }
}

#[tool_handler]
impl ServerHandler for RegistrarTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Registration server. Use add_registration to register a person \
                 (date of birth as YYYY-MM-DD), get_all_registrations to list \
                 them, and search_registrations to find by name or email."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Storage faults become tool errors; every other outcome is report text.
fn as_tool_result(report: String, err: Option<&RegistrationError>) -> Result<String, String> {
    match err {
        Some(e) if !e.is_user_correctable() => {
            tracing::error!(error = %e, "registration store unavailable");
            Err(report)
        }
        _ => Ok(report),
    }
}
