use std::sync::Arc;

use async_trait::async_trait;

use super::{HttpResponse, PreparedRequest};
use crate::domain::ExecutionMode;
use crate::error::TransportError;

/// Carries one prepared request and normalizes the reply.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &PreparedRequest) -> Result<HttpResponse, TransportError>;
}

/// The transports available to a run, selected per request by its mode.
#[derive(Clone)]
pub struct TransportSet {
    direct: Arc<dyn Transport>,
    proxy: Option<Arc<dyn Transport>>,
    agent: Option<Arc<dyn Transport>>,
}

impl TransportSet {
    #[must_use]
    pub fn new(direct: Arc<dyn Transport>) -> Self {
        Self {
            direct,
            proxy: None,
            agent: None,
        }
    }

    #[must_use]
    pub fn with_proxy(mut self, proxy: Arc<dyn Transport>) -> Self {
        self.proxy = Some(proxy);
        self
    }

    #[must_use]
    pub fn with_agent(mut self, agent: Arc<dyn Transport>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// `None` when the mode's relay was never configured.
    #[must_use]
    pub fn for_mode(&self, mode: ExecutionMode) -> Option<&dyn Transport> {
        match mode {
            ExecutionMode::Direct => Some(self.direct.as_ref()),
            ExecutionMode::Proxy => self.proxy.as_deref(),
            ExecutionMode::Agent => self.agent.as_deref(),
        }
    }
}

impl std::fmt::Debug for TransportSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSet")
            .field("proxy", &self.proxy.is_some())
            .field("agent", &self.agent.is_some())
            .finish_non_exhaustive()
    }
}
