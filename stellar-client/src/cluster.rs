/// Cluster, bucket and scope handles
use crate::bucket_mgmt::BucketManager;
use crate::collection::{Collection, Namespace};
use crate::config::{endpoint_from_connection_string, ClusterOptions};
use crate::error::{ClientError, Result};
use crate::query::{create_query_object, N1qlQuery, N1qlRequest, QueryArg, QueryOptions};
use crate::transcoder::{Serializer, Transcoder};
use crate::transport::{GrpcTransport, StellarTransport};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tonic::{Request, Status};
use tracing::{debug, info};

pub const DEFAULT_SCOPE: &str = "_default";
pub const DEFAULT_COLLECTION: &str = "_default";

/// State shared by every handle derived from one cluster
pub(crate) struct ClientContext {
    pub(crate) transport: Arc<dyn StellarTransport>,
    pub(crate) options: ClusterOptions,
}

impl ClientContext {
    pub(crate) fn default_transcoder(&self) -> Arc<dyn Transcoder> {
        self.options.transcoder.clone()
    }

    pub(crate) fn default_serializer(&self) -> Arc<dyn Serializer> {
        self.options.serializer.clone()
    }

    /// Wrap a message, attaching the deadline the server should honour
    pub(crate) fn request<T>(&self, message: T, timeout: Duration) -> Request<T> {
        let mut request = Request::new(message);
        request.set_timeout(timeout);
        request
    }

    /// Await a transport call, failing with `Timeout` once `timeout` elapses
    pub(crate) async fn execute<T, F>(
        &self,
        operation: impl fmt::Display,
        resource: &str,
        timeout: Duration,
        call: F,
    ) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, Status>>,
    {
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(status)) => {
                debug!(operation = %operation, resource, code = ?status.code(), "request failed");
                Err(ClientError::from(status))
            }
            Err(_) => Err(ClientError::Timeout(format!(
                "{} on '{}' did not complete within {:?}",
                operation, resource, timeout
            ))),
        }
    }
}

/// Entry point: a connection to one Stellar cluster
#[derive(Clone)]
pub struct Cluster {
    context: Arc<ClientContext>,
}

impl Cluster {
    /// Connect to a cluster
    ///
    /// # Arguments
    /// * `conn_str` - e.g. `"stellar://localhost"` or `"http://127.0.0.1:18098"`
    /// * `options` - credentials, timeouts and default transcoder
    ///
    /// # Example
    /// ```no_run
    /// # use stellar_client::{Cluster, ClusterOptions, PasswordAuthenticator};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let options = ClusterOptions::new()
    ///     .with_authenticator(PasswordAuthenticator::new("Administrator", "password"));
    /// let cluster = Cluster::connect("stellar://localhost", options).await?;
    /// let users = cluster.bucket("app").default_collection();
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(conn_str: &str, options: ClusterOptions) -> Result<Self> {
        options.validate()?;
        let endpoint = endpoint_from_connection_string(conn_str)?;
        let transport = GrpcTransport::connect(endpoint.clone(), options.authenticator.as_ref()).await?;
        info!(endpoint = %endpoint, "connected to cluster");
        Self::with_transport(Arc::new(transport), options)
    }

    /// Build a cluster over an already established transport
    pub fn with_transport(transport: Arc<dyn StellarTransport>, options: ClusterOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            context: Arc::new(ClientContext { transport, options }),
        })
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.context.options
    }

    pub fn bucket(&self, name: impl Into<String>) -> Bucket {
        Bucket {
            name: name.into(),
            context: self.context.clone(),
            transcoder: None,
        }
    }

    /// Bucket management API
    pub fn buckets(&self) -> BucketManager {
        BucketManager::new(self.context.clone())
    }

    /// Prepare a cluster-level query; nothing is sent until the first row is read
    pub fn query(&self, statement: impl Into<String>, options: QueryOptions) -> Result<N1qlRequest> {
        let query = N1qlQuery::from_options(statement, options)?;
        Ok(N1qlRequest::new(self.context.clone(), query))
    }

    /// Prepare a query from mixed positional, keyword and options arguments
    pub fn query_with_args(
        &self,
        statement: impl Into<String>,
        args: Vec<QueryArg>,
    ) -> Result<N1qlRequest> {
        let query = create_query_object(None, None, statement, args)?;
        Ok(N1qlRequest::new(self.context.clone(), query))
    }
}

impl fmt::Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cluster")
            .field("options", &self.context.options)
            .finish_non_exhaustive()
    }
}

/// Handle to a bucket
#[derive(Clone)]
pub struct Bucket {
    name: String,
    context: Arc<ClientContext>,
    transcoder: Option<Arc<dyn Transcoder>>,
}

impl Bucket {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default transcoder for every collection opened through this bucket
    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    pub fn scope(&self, name: impl Into<String>) -> Scope {
        Scope {
            bucket: self.name.clone(),
            name: name.into(),
            context: self.context.clone(),
            transcoder: self.transcoder.clone(),
        }
    }

    pub fn default_scope(&self) -> Scope {
        self.scope(DEFAULT_SCOPE)
    }

    pub fn default_collection(&self) -> Collection {
        self.default_scope().collection(DEFAULT_COLLECTION)
    }

    /// Collection in the default scope
    pub fn collection(&self, name: impl Into<String>) -> Collection {
        self.default_scope().collection(name)
    }
}

impl fmt::Debug for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Handle to a scope within a bucket
#[derive(Clone)]
pub struct Scope {
    bucket: String,
    name: String,
    context: Arc<ClientContext>,
    transcoder: Option<Arc<dyn Transcoder>>,
}

impl Scope {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket
    }

    pub fn collection(&self, name: impl Into<String>) -> Collection {
        let namespace = Namespace::new(self.bucket.clone(), self.name.clone(), name);
        Collection::new(namespace, self.context.clone(), self.transcoder.clone())
    }

    /// `default:`bucket`.`scope`` query context for scope-level queries
    pub fn query_context(&self) -> String {
        format!("default:`{}`.`{}`", self.bucket, self.name)
    }

    /// Prepare a query that resolves unqualified keyspaces against this scope
    pub fn query(&self, statement: impl Into<String>, options: QueryOptions) -> Result<N1qlRequest> {
        let mut options = options;
        if options.query_context.is_none() {
            options.query_context = Some(self.query_context());
        }
        let query = N1qlQuery::from_options(statement, options)?;
        Ok(N1qlRequest::new(self.context.clone(), query))
    }

    pub fn query_with_args(
        &self,
        statement: impl Into<String>,
        args: Vec<QueryArg>,
    ) -> Result<N1qlRequest> {
        let query = create_query_object(Some(&self.bucket), Some(&self.name), statement, args)?;
        Ok(N1qlRequest::new(self.context.clone(), query))
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("bucket", &self.bucket)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
