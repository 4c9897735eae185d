//! Shared application state for the duolink gateway.

use std::sync::Arc;

use crate::auth::{Authenticator, StaticTokenAuthenticator};
use crate::config::GatewayConfig;
use crate::hub::Hub;
use crate::obs::HubMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    hub: Arc<Hub>,
    auth: Arc<dyn Authenticator>,
    metrics: Arc<HubMetrics>,
}

impl AppState {
    /// Build application state and start the hub's dispatch task. Must be
    /// called from within a tokio runtime.
    pub fn new(cfg: GatewayConfig) -> Self {
        let auth: Arc<dyn Authenticator> =
            Arc::new(StaticTokenAuthenticator::from_config(&cfg.auth));
        let metrics = Arc::new(HubMetrics::default());
        let hub = Hub::spawn(Arc::clone(&metrics));
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                hub,
                auth,
                metrics,
            }),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn hub(&self) -> Arc<Hub> {
        Arc::clone(&self.inner.hub)
    }

    pub fn authenticator(&self) -> Arc<dyn Authenticator> {
        Arc::clone(&self.inner.auth)
    }

    pub fn metrics(&self) -> Arc<HubMetrics> {
        Arc::clone(&self.inner.metrics)
    }
}
