//! Request transport
//!
//! [`StellarTransport`] is the seam between the SDK and the wire. The
//! production implementation, [`GrpcTransport`], talks to a Stellar gateway
//! over a tonic channel; tests substitute scripted transports.

use crate::config::PasswordAuthenticator;
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::stream::{BoxStream, StreamExt};
use stellar_proto::{
    self as proto, bucket_admin_service_client::BucketAdminServiceClient,
    kv_service_client::KvServiceClient, query_service_client::QueryServiceClient,
};
use tonic::metadata::MetadataValue;
use tonic::transport::Channel;
use tonic::{Request, Status};
use tracing::debug;

/// Stream of query response chunks
pub type QueryStream = BoxStream<'static, std::result::Result<proto::QueryResponse, Status>>;

/// Low-level operations understood by a Stellar gateway
///
/// Every method takes a fully built request (timeout already set) and
/// returns the raw response or status.
#[async_trait]
pub trait StellarTransport: Send + Sync {
    async fn get(&self, request: Request<proto::GetRequest>) -> std::result::Result<proto::GetResponse, Status>;

    async fn exists(
        &self,
        request: Request<proto::ExistsRequest>,
    ) -> std::result::Result<proto::ExistsResponse, Status>;

    async fn insert(
        &self,
        request: Request<proto::InsertRequest>,
    ) -> std::result::Result<proto::InsertResponse, Status>;

    async fn upsert(
        &self,
        request: Request<proto::UpsertRequest>,
    ) -> std::result::Result<proto::UpsertResponse, Status>;

    async fn replace(
        &self,
        request: Request<proto::ReplaceRequest>,
    ) -> std::result::Result<proto::ReplaceResponse, Status>;

    async fn remove(
        &self,
        request: Request<proto::RemoveRequest>,
    ) -> std::result::Result<proto::RemoveResponse, Status>;

    async fn lookup_in(
        &self,
        request: Request<proto::LookupInRequest>,
    ) -> std::result::Result<proto::LookupInResponse, Status>;

    async fn mutate_in(
        &self,
        request: Request<proto::MutateInRequest>,
    ) -> std::result::Result<proto::MutateInResponse, Status>;

    /// Start a query; rows and metadata arrive on the returned stream
    async fn query(&self, request: Request<proto::QueryRequest>) -> std::result::Result<QueryStream, Status>;

    async fn create_bucket(
        &self,
        request: Request<proto::CreateBucketRequest>,
    ) -> std::result::Result<proto::CreateBucketResponse, Status>;

    async fn update_bucket(
        &self,
        request: Request<proto::UpdateBucketRequest>,
    ) -> std::result::Result<proto::UpdateBucketResponse, Status>;

    async fn delete_bucket(
        &self,
        request: Request<proto::DeleteBucketRequest>,
    ) -> std::result::Result<proto::DeleteBucketResponse, Status>;

    async fn list_buckets(
        &self,
        request: Request<proto::ListBucketsRequest>,
    ) -> std::result::Result<proto::ListBucketsResponse, Status>;
}

/// tonic-backed transport sharing one channel across all services
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    kv: KvServiceClient<Channel>,
    query: QueryServiceClient<Channel>,
    admin: BucketAdminServiceClient<Channel>,
    authorization: Option<MetadataValue<tonic::metadata::Ascii>>,
}

impl GrpcTransport {
    /// Connect to a gateway endpoint such as `http://127.0.0.1:18098`
    pub async fn connect(
        endpoint: impl Into<String>,
        authenticator: Option<&PasswordAuthenticator>,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        debug!(endpoint = %endpoint, "connecting to gateway");

        let channel = Channel::from_shared(endpoint)
            .map_err(|e| ClientError::ConnectionError(format!("Invalid address: {}", e)))?
            .connect()
            .await
            .map_err(|e| ClientError::ConnectionError(format!("Failed to connect: {}", e)))?;

        Self::from_channel(channel, authenticator)
    }

    /// Build a transport over an existing channel
    pub fn from_channel(channel: Channel, authenticator: Option<&PasswordAuthenticator>) -> Result<Self> {
        let authorization = authenticator.map(basic_auth_header).transpose()?;
        Ok(Self {
            kv: KvServiceClient::new(channel.clone()),
            query: QueryServiceClient::new(channel.clone()),
            admin: BucketAdminServiceClient::new(channel),
            authorization,
        })
    }

    fn authorize<T>(&self, mut request: Request<T>) -> Request<T> {
        if let Some(value) = &self.authorization {
            request.metadata_mut().insert("authorization", value.clone());
        }
        request
    }
}

/// `Basic base64(username:password)` header value
pub fn basic_auth_header(auth: &PasswordAuthenticator) -> Result<MetadataValue<tonic::metadata::Ascii>> {
    let encoded = STANDARD.encode(format!("{}:{}", auth.username, auth.password));
    format!("Basic {}", encoded)
        .parse()
        .map_err(|_| ClientError::InvalidArgument("credentials are not valid header text".to_string()))
}

#[async_trait]
impl StellarTransport for GrpcTransport {
    async fn get(&self, request: Request<proto::GetRequest>) -> std::result::Result<proto::GetResponse, Status> {
        let mut client = self.kv.clone();
        Ok(client.get(self.authorize(request)).await?.into_inner())
    }

    async fn exists(
        &self,
        request: Request<proto::ExistsRequest>,
    ) -> std::result::Result<proto::ExistsResponse, Status> {
        let mut client = self.kv.clone();
        Ok(client.exists(self.authorize(request)).await?.into_inner())
    }

    async fn insert(
        &self,
        request: Request<proto::InsertRequest>,
    ) -> std::result::Result<proto::InsertResponse, Status> {
        let mut client = self.kv.clone();
        Ok(client.insert(self.authorize(request)).await?.into_inner())
    }

    async fn upsert(
        &self,
        request: Request<proto::UpsertRequest>,
    ) -> std::result::Result<proto::UpsertResponse, Status> {
        let mut client = self.kv.clone();
        Ok(client.upsert(self.authorize(request)).await?.into_inner())
    }

    async fn replace(
        &self,
        request: Request<proto::ReplaceRequest>,
    ) -> std::result::Result<proto::ReplaceResponse, Status> {
        let mut client = self.kv.clone();
        Ok(client.replace(self.authorize(request)).await?.into_inner())
    }

    async fn remove(
        &self,
        request: Request<proto::RemoveRequest>,
    ) -> std::result::Result<proto::RemoveResponse, Status> {
        let mut client = self.kv.clone();
        Ok(client.remove(self.authorize(request)).await?.into_inner())
    }

    async fn lookup_in(
        &self,
        request: Request<proto::LookupInRequest>,
    ) -> std::result::Result<proto::LookupInResponse, Status> {
        let mut client = self.kv.clone();
        Ok(client.lookup_in(self.authorize(request)).await?.into_inner())
    }

    async fn mutate_in(
        &self,
        request: Request<proto::MutateInRequest>,
    ) -> std::result::Result<proto::MutateInResponse, Status> {
        let mut client = self.kv.clone();
        Ok(client.mutate_in(self.authorize(request)).await?.into_inner())
    }

    async fn query(&self, request: Request<proto::QueryRequest>) -> std::result::Result<QueryStream, Status> {
        let mut client = self.query.clone();
        let stream = client.query(self.authorize(request)).await?.into_inner();
        Ok(stream.boxed())
    }

    async fn create_bucket(
        &self,
        request: Request<proto::CreateBucketRequest>,
    ) -> std::result::Result<proto::CreateBucketResponse, Status> {
        let mut client = self.admin.clone();
        Ok(client.create_bucket(self.authorize(request)).await?.into_inner())
    }

    async fn update_bucket(
        &self,
        request: Request<proto::UpdateBucketRequest>,
    ) -> std::result::Result<proto::UpdateBucketResponse, Status> {
        let mut client = self.admin.clone();
        Ok(client.update_bucket(self.authorize(request)).await?.into_inner())
    }

    async fn delete_bucket(
        &self,
        request: Request<proto::DeleteBucketRequest>,
    ) -> std::result::Result<proto::DeleteBucketResponse, Status> {
        let mut client = self.admin.clone();
        Ok(client.delete_bucket(self.authorize(request)).await?.into_inner())
    }

    async fn list_buckets(
        &self,
        request: Request<proto::ListBucketsRequest>,
    ) -> std::result::Result<proto::ListBucketsResponse, Status> {
        let mut client = self.admin.clone();
        Ok(client.list_buckets(self.authorize(request)).await?.into_inner())
    }
}
