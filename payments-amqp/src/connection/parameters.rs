use std::fmt;

use lapin::uri::{AMQPAuthority, AMQPScheme, AMQPUri, AMQPUserInfo};

use crate::BrokerConfiguration;

/// Default virtual host
const DEFAULT_VIRTUAL_HOST: &str = "/";

/// Where and how to connect to the broker
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    host: String,
    port: u16,
    username: String,
    password: String,
    virtual_host: String,
}

impl ConnectionParameters {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            virtual_host: DEFAULT_VIRTUAL_HOST.to_string(),
        }
    }

    pub fn with_virtual_host(mut self, virtual_host: impl Into<String>) -> Self {
        self.virtual_host = virtual_host.into();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn virtual_host(&self) -> &str {
        &self.virtual_host
    }

    /// `host:port`, used to identify the broker in logs and errors
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The AMQP uri to connect to.
    /// Credentials are kept as structured fields so they never need to be percent-encoded
    pub fn uri(&self) -> AMQPUri {
        AMQPUri {
            scheme: AMQPScheme::AMQP,
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: self.username.clone(),
                    password: self.password.clone(),
                },
                host: self.host.clone(),
                port: self.port,
            },
            vhost: self.virtual_host.clone(),
            ..Default::default()
        }
    }
}

impl From<&BrokerConfiguration> for ConnectionParameters {
    fn from(configuration: &BrokerConfiguration) -> Self {
        Self::new(
            &configuration.host,
            configuration.port,
            &configuration.username,
            &configuration.password,
        )
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("virtual_host", &self.virtual_host)
            .finish()
    }
}

impl fmt::Display for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vhost = self.virtual_host.trim_start_matches('/');
        write!(f, "amqp://{}@{}/{vhost}", self.username, self.endpoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_broker_configuration() {
        let configuration = BrokerConfiguration::new("rabbitmq", 5673, "payments", "s3cr3t");
        let parameters = ConnectionParameters::from(&configuration);

        assert_eq!(parameters.host(), "rabbitmq");
        assert_eq!(parameters.port(), 5673);
        assert_eq!(parameters.username(), "payments");
        assert_eq!(parameters.password(), "s3cr3t");
        assert_eq!(parameters.virtual_host(), "/");
        assert_eq!(parameters.endpoint(), "rabbitmq:5673");
    }

    #[test]
    fn uri_carries_credentials() {
        let parameters = ConnectionParameters::new("rabbitmq", 5673, "pay@ments", "p:ss/w0rd")
            .with_virtual_host("payments");
        let uri = parameters.uri();

        assert_eq!(uri.authority.host, "rabbitmq");
        assert_eq!(uri.authority.port, 5673);
        assert_eq!(uri.authority.userinfo.username, "pay@ments");
        assert_eq!(uri.authority.userinfo.password, "p:ss/w0rd");
        assert_eq!(uri.vhost, "payments");
    }

    #[test]
    fn password_is_never_printed() {
        let parameters = ConnectionParameters::new("rabbitmq", 5672, "payments", "s3cr3t");

        assert!(!format!("{parameters:?}").contains("s3cr3t"));
        assert_eq!(parameters.to_string(), "amqp://payments@rabbitmq:5672/");
    }
}
