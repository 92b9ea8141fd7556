/// Cluster connection configuration
use crate::error::{ClientError, Result};
use crate::transcoder::{DefaultJsonSerializer, JsonTranscoder, Serializer, Transcoder};
use std::sync::Arc;
use std::time::Duration;

/// Default port of the Stellar gRPC gateway
pub const DEFAULT_PORT: u16 = 18098;

/// Username/password credentials sent with every request
#[derive(Clone)]
pub struct PasswordAuthenticator {
    pub username: String,
    pub password: String,
}

impl PasswordAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for PasswordAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordAuthenticator")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Per-service default timeouts, used when an operation sets none
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Document operations (get, upsert, lookup_in, ...)
    pub kv_timeout: Duration,

    /// Whole query execution, first chunk to last
    pub query_timeout: Duration,

    /// Bucket management calls
    pub management_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            kv_timeout: Duration::from_millis(2500),
            query_timeout: Duration::from_secs(75),
            management_timeout: Duration::from_secs(75),
        }
    }
}

/// Options supplied when connecting to a cluster
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    /// Credentials (None = unauthenticated)
    pub authenticator: Option<PasswordAuthenticator>,

    pub timeouts: TimeoutConfig,

    /// Transcoder used when neither the call nor the collection sets one
    pub transcoder: Arc<dyn Transcoder>,

    /// Serializer used to decode query rows
    pub serializer: Arc<dyn Serializer>,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            authenticator: None,
            timeouts: TimeoutConfig::default(),
            transcoder: Arc::new(JsonTranscoder::default()),
            serializer: Arc::new(DefaultJsonSerializer),
        }
    }
}

impl ClusterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticate with a username and password
    pub fn with_authenticator(mut self, authenticator: PasswordAuthenticator) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn with_kv_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.kv_timeout = timeout;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.query_timeout = timeout;
        self
    }

    pub fn with_management_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.management_timeout = timeout;
        self
    }

    /// Set the cluster-wide default transcoder
    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    /// Set the serializer used for query rows
    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("kv_timeout", self.timeouts.kv_timeout),
            ("query_timeout", self.timeouts.query_timeout),
            ("management_timeout", self.timeouts.management_timeout),
        ];
        for (name, timeout) in timeouts {
            if timeout.is_zero() {
                return Err(ClientError::InvalidArgument(format!("{} must be positive", name)));
            }
        }

        if let Some(auth) = &self.authenticator {
            if auth.username.is_empty() {
                return Err(ClientError::InvalidArgument(
                    "username must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Translate a connection string into a gRPC endpoint URI
///
/// `stellar://host[:port]` becomes `http://host:port` (port defaults to
/// [`DEFAULT_PORT`]); `http://` and `https://` URIs pass through.
pub fn endpoint_from_connection_string(conn_str: &str) -> Result<String> {
    let conn_str = conn_str.trim();
    if conn_str.starts_with("http://") || conn_str.starts_with("https://") {
        return Ok(conn_str.to_string());
    }

    let rest = conn_str.strip_prefix("stellar://").ok_or_else(|| {
        ClientError::InvalidArgument(format!("unsupported connection string '{}'", conn_str))
    })?;

    // Only the first seed host is dialled; anything after '/' or '?' is ignored
    let authority = rest
        .split(['/', '?'])
        .next()
        .unwrap_or_default()
        .split(',')
        .next()
        .unwrap_or_default();
    if authority.is_empty() {
        return Err(ClientError::InvalidArgument(format!(
            "connection string '{}' has no host",
            conn_str
        )));
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => {
            if host.is_empty() {
                return Err(ClientError::InvalidArgument(format!(
                    "connection string '{}' has no host",
                    conn_str
                )));
            }
            if port.parse::<u16>().is_err() {
                // bare IPv6 literal without port, e.g. "[::1]"
                if authority.starts_with('[') && authority.ends_with(']') {
                    return Ok(format!("http://{}:{}", authority, DEFAULT_PORT));
                }
                return Err(ClientError::InvalidArgument(format!(
                    "invalid port '{}' in connection string",
                    port
                )));
            }
            Ok(format!("http://{}", authority))
        }
        None => Ok(format!("http://{}:{}", authority, DEFAULT_PORT)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let options = ClusterOptions::default();
        assert_eq!(options.timeouts.kv_timeout, Duration::from_millis(2500));
        assert_eq!(options.timeouts.query_timeout, Duration::from_secs(75));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let options = ClusterOptions::new().with_kv_timeout(Duration::ZERO);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_username() {
        let options = ClusterOptions::new().with_authenticator(PasswordAuthenticator::new("", "pw"));
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_password_is_redacted() {
        let auth = PasswordAuthenticator::new("admin", "hunter2");
        let printed = format!("{:?}", auth);
        assert!(printed.contains("admin"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_connection_strings() {
        assert_eq!(
            endpoint_from_connection_string("stellar://localhost").unwrap(),
            "http://localhost:18098"
        );
        assert_eq!(
            endpoint_from_connection_string("stellar://db.example.com:9000").unwrap(),
            "http://db.example.com:9000"
        );
        assert_eq!(
            endpoint_from_connection_string("stellar://a,b,c?network=external").unwrap(),
            "http://a:18098"
        );
        assert_eq!(
            endpoint_from_connection_string("stellar://[::1]").unwrap(),
            "http://[::1]:18098"
        );
        assert_eq!(
            endpoint_from_connection_string("stellar://[::1]:7000").unwrap(),
            "http://[::1]:7000"
        );
        assert_eq!(
            endpoint_from_connection_string("https://gateway:443").unwrap(),
            "https://gateway:443"
        );
    }

    #[test]
    fn test_bad_connection_strings() {
        assert!(endpoint_from_connection_string("couchbase://localhost").is_err());
        assert!(endpoint_from_connection_string("stellar://").is_err());
        assert!(endpoint_from_connection_string("stellar://host:notaport").is_err());
    }
}
