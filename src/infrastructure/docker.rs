//! Event source reading the container runtime's `/events` API directly.

use crate::application::ports::{EventSource, EventSourceError};
use crate::domain::event::{ContainerEvent, CONTAINER_EVENT_TYPE};
use async_trait::async_trait;
use bollard::models::EventMessage;
use bollard::system::EventsOptions;
use bollard::{Docker, API_DEFAULT_VERSION};
use futures::stream::{BoxStream, StreamExt};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_DOCKER_SOCKET: &str = "unix:///var/run/docker.sock";

/// Request timeout handed to the API client, in seconds.
const CLIENT_TIMEOUT_SECS: u64 = 120;

/// Errors raised while connecting to the runtime.
#[derive(Debug, Error)]
pub enum DockerError {
    #[error("invalid socket path {0:?}: must start with unix:// or tcp://")]
    InvalidEndpoint(String),

    #[error("failed to connect to container runtime: {0}")]
    Connect(#[source] bollard::errors::Error),
}

/// Where the runtime's API listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerEndpoint {
    /// Path of a unix domain socket
    Unix(String),
    /// `host:port` of a plain TCP listener
    Tcp(String),
}

impl DockerEndpoint {
    /// Parse a `unix://` or `tcp://` address.
    pub fn parse(value: &str) -> Result<Self, DockerError> {
        let endpoint = if let Some(path) = value.strip_prefix("unix://") {
            DockerEndpoint::Unix(path.to_string())
        } else if let Some(addr) = value.strip_prefix("tcp://") {
            DockerEndpoint::Tcp(addr.to_string())
        } else {
            return Err(DockerError::InvalidEndpoint(value.to_string()));
        };

        match &endpoint {
            DockerEndpoint::Unix(rest) | DockerEndpoint::Tcp(rest) if rest.is_empty() => {
                Err(DockerError::InvalidEndpoint(value.to_string()))
            }
            _ => Ok(endpoint),
        }
    }
}

impl Default for DockerEndpoint {
    fn default() -> Self {
        DockerEndpoint::Unix("/var/run/docker.sock".to_string())
    }
}

impl fmt::Display for DockerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DockerEndpoint::Unix(path) => write!(f, "unix://{path}"),
            DockerEndpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
        }
    }
}

/// Streams container events from the runtime API.
///
/// Only `type=container` events are requested. An event the API delivers
/// but that cannot be mapped yields `EventSourceError::Decode`; a transport
/// failure yields `EventSourceError::Runtime`.
pub struct DockerEventSource {
    events: BoxStream<'static, Result<EventMessage, bollard::errors::Error>>,
}

impl DockerEventSource {
    /// Connect to `endpoint` and check that the runtime answers.
    ///
    /// # Errors
    /// Returns `DockerError::Connect` if the client cannot be created or the
    /// runtime does not answer a ping.
    pub async fn connect(endpoint: &DockerEndpoint) -> Result<Self, DockerError> {
        let docker = match endpoint {
            #[cfg(unix)]
            DockerEndpoint::Unix(path) => {
                Docker::connect_with_unix(path, CLIENT_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
            #[cfg(not(unix))]
            DockerEndpoint::Unix(_) => {
                return Err(DockerError::InvalidEndpoint(endpoint.to_string()));
            }
            DockerEndpoint::Tcp(_) => Docker::connect_with_http(
                &endpoint.to_string(),
                CLIENT_TIMEOUT_SECS,
                API_DEFAULT_VERSION,
            ),
        }
        .map_err(DockerError::Connect)?;

        docker.ping().await.map_err(DockerError::Connect)?;
        info!(%endpoint, "connected to container runtime");

        Ok(Self::from_client(&docker))
    }

    /// Subscribe to container events on an existing client.
    pub fn from_client(docker: &Docker) -> Self {
        let options = EventsOptions::<String> {
            filters: HashMap::from([(
                "type".to_string(),
                vec![CONTAINER_EVENT_TYPE.to_string()],
            )]),
            ..Default::default()
        };
        Self {
            events: docker.events(Some(options)).boxed(),
        }
    }
}

impl fmt::Debug for DockerEventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DockerEventSource").finish_non_exhaustive()
    }
}

/// Map an API event onto the wire model used everywhere else.
///
/// Both share the API's JSON field names, so the mapping goes through JSON.
fn to_container_event(message: EventMessage) -> Result<ContainerEvent, serde_json::Error> {
    serde_json::to_value(message).and_then(serde_json::from_value)
}

#[async_trait]
impl EventSource for DockerEventSource {
    async fn next_event(&mut self) -> Option<Result<ContainerEvent, EventSourceError>> {
        // `StreamExt::next` is cancel safe.
        let event = match self.events.next().await? {
            Ok(message) => to_container_event(message).map_err(EventSourceError::from),
            Err(e) => Err(EventSourceError::Runtime(e)),
        };
        Some(event)
    }
}
