//! Service environments and addresses.

use std::fmt;

use url::Url;

use crate::{GatewayError, GatewayResult};

/// Hostname of the token issuer used for impersonation in non-secure
/// environments.
pub const IMPERSONATION_HOST: &str = "jwt-public-prod.aws.barchart.com";

/// A deployment of the watchlist service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Internal development deployment.
    Development,
    /// Public test deployment.
    Test,
    /// Public staging deployment.
    Staging,
    /// Internal demo deployment.
    Demo,
    /// Production deployment.
    Production,
}

impl Environment {
    /// Get the short environment code used in issuer paths.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Development => "dev",
            Self::Test => "test",
            Self::Staging => "stage",
            Self::Demo => "demo",
            Self::Production => "prod",
        }
    }

    /// Get the REST hostname of this environment.
    #[must_use]
    pub const fn rest_host(self) -> &'static str {
        match self {
            Self::Development => "watchlist-dev.aws.barchart.com",
            Self::Test => "watchlist-test.aws.barchart.com",
            Self::Staging => "watchlist-stage.aws.barchart.com",
            Self::Demo => "watchlist-demo.aws.barchart.com",
            Self::Production => "watchlist.aws.barchart.com",
        }
    }

    /// Get the WebSocket hostname of this environment.
    ///
    /// Test, staging, and demo share one socket deployment.
    #[must_use]
    pub const fn websocket_host(self) -> &'static str {
        match self {
            Self::Development => "watchlist-dev-websockets.aws.barchart.com",
            Self::Test | Self::Staging | Self::Demo => {
                "watchlist-stage-websockets.aws.barchart.com"
            }
            Self::Production => "watchlist-websockets.aws.barchart.com",
        }
    }

    /// Get the REST address of this environment.
    #[must_use]
    pub fn rest_address(self) -> ServiceAddress {
        ServiceAddress {
            protocol: Protocol::Https,
            host: self.rest_host().to_string(),
            port: Protocol::Https.default_port(),
        }
    }

    /// Get the WebSocket endpoint of this environment, without the token
    /// query parameter.
    ///
    /// # Panics
    /// Does not panic; every environment hostname parses.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn websocket_endpoint(self) -> Url {
        let raw = format!("wss://{}/v1/", self.websocket_host());

        match Url::parse(&raw) {
            Ok(url) => url,
            Err(_) => unreachable!("static websocket hostnames always parse"),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Wire protocol for REST calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Plain HTTP (local testing only).
    Http,
    /// HTTPS.
    Https,
}

impl Protocol {
    /// Get the URL scheme.
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Get the conventional port for the protocol.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

/// Instructions for reaching a watchlist REST deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAddress {
    protocol: Protocol,
    host: String,
    port: u16,
}

impl ServiceAddress {
    /// Create an address.
    ///
    /// # Errors
    /// Returns [`GatewayError::Validation`] when the host is empty or the
    /// port is zero.
    pub fn new(protocol: Protocol, host: impl Into<String>, port: u16) -> GatewayResult<Self> {
        let host = host.into();

        if host.is_empty() {
            return Err(GatewayError::Validation(
                "the host cannot be a zero-length string".to_string(),
            ));
        }

        if port == 0 {
            return Err(GatewayError::Validation("the port is invalid".to_string()));
        }

        Ok(Self {
            protocol,
            host,
            port,
        })
    }

    /// Get the protocol.
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Get the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Build the absolute URL for a service path (the path starts with `/`).
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}://{}:{}{path}",
            self.protocol.scheme(),
            self.host,
            self.port
        )
    }
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}",
            self.protocol.scheme(),
            self.host,
            self.port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_hosts() {
        assert_eq!(
            Environment::Production.rest_host(),
            "watchlist.aws.barchart.com"
        );
        assert_eq!(
            Environment::Test.websocket_host(),
            "watchlist-stage-websockets.aws.barchart.com"
        );
        assert_eq!(Environment::Staging.code(), "stage");
    }

    #[test]
    fn websocket_endpoint_is_versioned() {
        let endpoint = Environment::Production.websocket_endpoint();
        assert_eq!(
            endpoint.as_str(),
            "wss://watchlist-websockets.aws.barchart.com/v1/"
        );
    }

    #[test]
    fn address_builds_urls() {
        let address = ServiceAddress::new(Protocol::Https, "watchlist.aws.barchart.com", 443)
            .unwrap();
        assert_eq!(
            address.url_for("/v1/watchlists"),
            "https://watchlist.aws.barchart.com:443/v1/watchlists"
        );
    }

    #[test]
    fn address_rejects_bad_input() {
        assert!(ServiceAddress::new(Protocol::Https, "", 443).is_err());
        assert!(ServiceAddress::new(Protocol::Https, "localhost", 0).is_err());
    }
}
