//! Shared application state: the registration store plus the tool
//! dispatcher, with async wrappers that run store I/O on the blocking pool.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;

use registrar_common::{
    Registration, RegistrationError, RegistrationStore, SearchResults, ToolDispatcher, ToolError,
};

#[derive(Debug, Clone)]
pub struct AppState {
    store: Arc<RegistrationStore>,
    tools: ToolDispatcher,
}

impl AppState {
    /// Open the store at `path` and wrap it for sharing across handlers.
    pub fn open(path: &Path) -> Result<Self> {
        let store = RegistrationStore::open(path)
            .with_context(|| format!("failed to open registrations file {}", path.display()))?;
        Ok(Self::new(Arc::new(store)))
    }

    pub fn new(store: Arc<RegistrationStore>) -> Self {
        let tools = ToolDispatcher::new(Arc::clone(&store));
        Self { store, tools }
    }

    pub fn store_path(&self) -> &Path {
        self.store.path()
    }

    pub async fn add(
        &self,
        name: String,
        email: String,
        dob: String,
    ) -> Result<Result<Registration, RegistrationError>> {
        self.with_store(move |store| store.add(&name, &email, &dob))
            .await
    }

    pub async fn list(&self) -> Result<Result<Vec<Registration>, RegistrationError>> {
        self.with_store(RegistrationStore::list).await
    }

    pub async fn search(&self, query: String) -> Result<Result<SearchResults, RegistrationError>> {
        self.with_store(move |store| store.search(&query)).await
    }

    pub async fn call_tool(
        &self,
        name: String,
        arguments: Value,
    ) -> Result<Result<String, ToolError>> {
        let tools = self.tools.clone();
        tokio::task::spawn_blocking(move || tools.call(&name, arguments))
            .await
            .context("tool call task panicked")
    }

    /// Run a synchronous store operation on the blocking thread pool.
    async fn with_store<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&RegistrationStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .context("registration store task panicked")
    }
}
