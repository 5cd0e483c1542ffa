use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::Settings;
use crate::error::AppResult;
use crate::http::{AgentTransport, DirectTransport, ProxyTransport, TransportSet};

/// Network timeout when neither the CLI nor the settings set one.
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Direct transport always; relays only for the endpoints configured.
pub(crate) fn build_transports(
    settings: &Settings,
    request_timeout: Duration,
) -> AppResult<TransportSet> {
    let mut transports = TransportSet::new(Arc::new(DirectTransport::new(request_timeout)?));

    if let Some(endpoint) = non_empty(settings.proxy_url.as_deref()) {
        transports =
            transports.with_proxy(Arc::new(ProxyTransport::new(endpoint, request_timeout)?));
    }

    if let Some(endpoint) = non_empty(settings.agent_url.as_deref()) {
        let token = settings.agent_token.as_deref().unwrap_or_default();
        if token.is_empty() {
            warn!("settings.agent_url is set without settings.agent_token.");
        }
        transports = transports.with_agent(Arc::new(AgentTransport::new(
            endpoint,
            token,
            request_timeout,
        )?));
    }

    Ok(transports)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
