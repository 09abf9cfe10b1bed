//! Shared application state.
use std::sync::Arc;

use ibn_console::{ConsoleConnector, ConsoleOptions, TcpConsoleConnector};
use ibn_core::{Result, Settings};
use ibn_inventory::{ControllerClient, TopologyController};
use ibn_policy::PolicyStore;

pub struct AppState {
    pub settings: Settings,
    pub store: PolicyStore,
    pub controller: Arc<dyn TopologyController>,
    pub connector: Arc<dyn ConsoleConnector>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        settings: Settings,
        controller: Arc<dyn TopologyController>,
        connector: Arc<dyn ConsoleConnector>,
    ) -> Result<Self> {
        let store = PolicyStore::open(&settings.paths.policy_store)?;
        Ok(Self {
            settings,
            store,
            controller,
            connector,
        })
    }

    /// Real controller and TCP consoles from `settings`.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let controller = Arc::new(ControllerClient::new(&settings.controller)?);
        let connector = Arc::new(TcpConsoleConnector::new(
            ConsoleOptions::default().with_timeout(settings.console_timeout),
        ));
        Self::new(settings, controller, connector)
    }
}
