//! `stellar.admin.bucket.v1` messages and the `BucketAdminService` stub

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BucketSettings {
    #[prost(string, tag = "1")]
    pub bucket_name: String,
    #[prost(enumeration = "BucketType", tag = "2")]
    pub bucket_type: i32,
    #[prost(uint64, tag = "3")]
    pub ram_quota_mb: u64,
    #[prost(uint32, optional, tag = "4")]
    pub num_replicas: Option<u32>,
    #[prost(bool, optional, tag = "5")]
    pub flush_enabled: Option<bool>,
    #[prost(bool, optional, tag = "6")]
    pub replica_indexes: Option<bool>,
    #[prost(enumeration = "EvictionMode", optional, tag = "7")]
    pub eviction_mode: Option<i32>,
    #[prost(uint32, optional, tag = "8")]
    pub max_expiry_secs: Option<u32>,
    #[prost(enumeration = "CompressionMode", optional, tag = "9")]
    pub compression_mode: Option<i32>,
    #[prost(enumeration = "crate::DurabilityLevel", optional, tag = "10")]
    pub minimum_durability_level: Option<i32>,
    #[prost(enumeration = "StorageBackend", optional, tag = "11")]
    pub storage_backend: Option<i32>,
    #[prost(enumeration = "ConflictResolutionType", optional, tag = "12")]
    pub conflict_resolution_type: Option<i32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum BucketType {
    Couchbase = 0,
    Memcached = 1,
    Ephemeral = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EvictionMode {
    Full = 0,
    NotRecentlyUsed = 1,
    ValueOnly = 2,
    None = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CompressionMode {
    Off = 0,
    Passive = 1,
    Active = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StorageBackend {
    Couchstore = 0,
    Magma = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ConflictResolutionType {
    Timestamp = 0,
    SequenceNumber = 1,
    Custom = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateBucketRequest {
    #[prost(message, optional, tag = "1")]
    pub settings: Option<BucketSettings>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateBucketResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateBucketRequest {
    #[prost(message, optional, tag = "1")]
    pub settings: Option<BucketSettings>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateBucketResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteBucketRequest {
    #[prost(string, tag = "1")]
    pub bucket_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteBucketResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListBucketsRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListBucketsResponse {
    #[prost(message, repeated, tag = "1")]
    pub buckets: Vec<BucketSettings>,
}

pub mod bucket_admin_service_client {
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct BucketAdminServiceClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl BucketAdminServiceClient<tonic::transport::Channel> {
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }

    impl<T> BucketAdminServiceClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }

        unary_rpc!(
            create_bucket,
            super::CreateBucketRequest,
            super::CreateBucketResponse,
            "/stellar.admin.bucket.v1.BucketAdminService/CreateBucket"
        );
        unary_rpc!(
            update_bucket,
            super::UpdateBucketRequest,
            super::UpdateBucketResponse,
            "/stellar.admin.bucket.v1.BucketAdminService/UpdateBucket"
        );
        unary_rpc!(
            delete_bucket,
            super::DeleteBucketRequest,
            super::DeleteBucketResponse,
            "/stellar.admin.bucket.v1.BucketAdminService/DeleteBucket"
        );
        unary_rpc!(
            list_buckets,
            super::ListBucketsRequest,
            super::ListBucketsResponse,
            "/stellar.admin.bucket.v1.BucketAdminService/ListBuckets"
        );
    }
}
