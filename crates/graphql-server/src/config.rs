use std::{
    net::{Ipv4Addr, SocketAddr},
    path::Path,
    str::FromStr,
    time::Duration,
};

use engine_websocket::ConnectionSettings;

use crate::Error;

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Configuration of the GraphQL server.
pub struct Config {
    /// Server bind settings
    pub network: NetworkConfig,
    /// Where the graph is exposed
    pub graph: GraphConfig,
    /// Settings of the websocket connections
    pub websockets: WebsocketConfig,
}

impl Config {
    /// Reads the configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        contents.parse()
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// The address the server listens on. Default: `127.0.0.1:5000`.
    pub listen_address: SocketAddr,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 5000)),
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Path of the HTTP endpoint. Default: `/graphql`.
    pub path: String,
    /// Path of the websocket endpoint. Default: `/ws`.
    pub websocket_path: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            path: "/graphql".to_string(),
            websocket_path: "/ws".to_string(),
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebsocketConfig {
    /// Period of the keep-alive messages. Default: 10 seconds.
    #[serde(deserialize_with = "duration_str::deserialize_option_duration")]
    pub keep_alive_interval: Option<Duration>,
    /// Messages buffered per connection before the producers wait. Default: 16.
    pub outbound_buffer: usize,
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        let settings = ConnectionSettings::default();
        Self {
            keep_alive_interval: settings.keep_alive_interval,
            outbound_buffer: settings.outbound_buffer,
        }
    }
}

impl From<&WebsocketConfig> for ConnectionSettings {
    fn from(config: &WebsocketConfig) -> Self {
        ConnectionSettings {
            keep_alive_interval: config.keep_alive_interval,
            outbound_buffer: config.outbound_buffer,
        }
    }
}
