//! Main server implementation
//!
//! Wires the workflow engine to the HTTP surface and owns the background
//! SLA sweep and license expiry loops.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info};

use tollgate_core::domain::events::{TracingEventHandler, WorkflowEventHandler};
use tollgate_core::{
    ProvisioningService, ReviewQueueService, SlaSweeper, WorkflowConfig, WorkflowService,
};
use tollgate_state_inmemory::{InMemoryStateProvider, StaticReviewerDirectory};

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Main server implementation
pub struct TollgateServer {
    /// Configuration
    pub config: ServerConfig,

    /// Workflow engine
    pub workflow: WorkflowService,

    /// Review queue read model
    pub review_queue: ReviewQueueService,

    /// License and credential lifecycle
    pub provisioning: Arc<ProvisioningService>,

    /// Background sweep over open stage deadlines
    sweeper: SlaSweeper,
}

impl std::fmt::Debug for TollgateServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TollgateServer")
            .field("config", &self.config)
            .finish()
    }
}

impl TollgateServer {
    /// Create a server over the given state provider
    pub fn new(config: ServerConfig, state: &InMemoryStateProvider) -> Self {
        let event_handler: Arc<dyn WorkflowEventHandler> = Arc::new(TracingEventHandler);

        let provisioning = Arc::new(ProvisioningService::new(
            state.licenses(),
            state.credentials(),
            state.provisioning(),
            state.sequences(),
        ));

        let workflow = WorkflowService::new(
            state.applications(),
            state.stages(),
            state.feedbacks(),
            state.sequences(),
            Arc::new(StaticReviewerDirectory::with_defaults()),
            provisioning.clone(),
            event_handler.clone(),
            WorkflowConfig {
                sla_deadline_days: config.sla_deadline_days,
            },
        );

        let review_queue = ReviewQueueService::new(state.applications(), state.stages());
        let sweeper = SlaSweeper::new(state.stages(), event_handler);

        Self {
            config,
            workflow,
            review_queue,
            provisioning,
            sweeper,
        }
    }

    /// Run the server
    pub async fn run(self) -> ServerResult<()> {
        info!("Starting Tollgate Server");

        let server = Arc::new(self);
        server.clone().spawn_background_loops();

        // Build the API router
        let app = crate::api::build_router(server.clone());

        // Create and bind the TCP listener
        let addr = SocketAddr::new(
            server.config.bind_address.parse().map_err(|_| {
                crate::error::ServerError::ConfigError(format!(
                    "invalid bind address: {}",
                    server.config.bind_address
                ))
            })?,
            server.config.port,
        );
        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);

        // Run the server
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Spawn the periodic SLA sweep and license expiry loops
    fn spawn_background_loops(self: Arc<Self>) {
        let interval = Duration::from_secs(self.config.sla_sweep_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately; skip it so a fresh start
            // does not sweep an empty store.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let today = chrono::Utc::now().date_naive();

                if let Err(err) = self.sweeper.sweep(today).await {
                    error!(%err, "sla sweep failed");
                }
                match self.provisioning.expire_due_licenses(today).await {
                    Ok(0) => {}
                    Ok(count) => info!(count, "licenses expired"),
                    Err(err) => error!(%err, "license expiry sweep failed"),
                }
            }
        });
    }
}
