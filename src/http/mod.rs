//! Request preparation and the transports that carry a prepared request.
mod agent;
mod direct;
mod prepare;
mod proxy;
mod response;
mod transport;

#[cfg(test)]
mod tests;

pub use agent::AgentTransport;
pub use direct::DirectTransport;
pub use prepare::{PreparedRequest, prepare_request};
pub use proxy::ProxyTransport;
pub use response::HttpResponse;
pub use transport::{Transport, TransportSet};
