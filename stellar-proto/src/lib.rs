//! Protocol Buffers definitions for the Stellar gRPC API
//!
//! Messages are declared with `prost` derives and the service stubs follow
//! the shape `tonic-build` emits, so the crate builds without `protoc`.
//!
//! Three services are exposed:
//! - `stellar.kv.v1.KvService`: point and subdocument operations
//! - `stellar.query.v1.QueryService`: server-streaming N1QL queries
//! - `stellar.admin.bucket.v1.BucketAdminService`: bucket management

/// Expands to a unary gRPC call on `self.inner`.
macro_rules! unary_rpc {
    ($(#[$meta:meta])* $method:ident, $req:ty, $resp:ty, $path:literal) => {
        $(#[$meta])*
        pub async fn $method(
            &mut self,
            request: impl tonic::IntoRequest<$req>,
        ) -> std::result::Result<tonic::Response<$resp>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = tonic::codegen::http::uri::PathAndQuery::from_static($path);
            self.inner.unary(request.into_request(), path, codec).await
        }
    };
}

pub mod admin;
pub mod kv;
pub mod query;

pub use admin::*;
pub use kv::*;
pub use query::*;

/// Position of a mutation in a bucket partition's log
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MutationToken {
    #[prost(string, tag = "1")]
    pub bucket_name: String,
    #[prost(uint32, tag = "2")]
    pub vbucket_id: u32,
    #[prost(uint64, tag = "3")]
    pub vbucket_uuid: u64,
    #[prost(uint64, tag = "4")]
    pub seq_no: u64,
}

/// Replica/persistence counts for the pre-synchronous durability model
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LegacyDurabilitySpec {
    #[prost(uint32, tag = "1")]
    pub num_replicated: u32,
    #[prost(uint32, tag = "2")]
    pub num_persisted: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DurabilityLevel {
    Majority = 0,
    MajorityAndPersistToActive = 1,
    PersistToMajority = 2,
}

/// Mutually exclusive durability requirement carried by every mutation
#[derive(Clone, PartialEq, ::prost::Oneof)]
pub enum DurabilitySpec {
    #[prost(message, tag = "20")]
    LegacyDurabilitySpec(LegacyDurabilitySpec),
    #[prost(enumeration = "DurabilityLevel", tag = "21")]
    DurabilityLevel(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DocumentContentType {
    Unknown = 0,
    Json = 1,
    Binary = 2,
}

/// Payload carried in `tonic::Status::details()` for semantic failures
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorDetails {
    /// Machine readable reason, e.g. `CAS_MISMATCH` or `LOCKED`
    #[prost(string, tag = "1")]
    pub reason: String,
    /// Kind of resource the error refers to: `document`, `path`, `bucket`, ...
    #[prost(string, tag = "2")]
    pub resource_type: String,
    #[prost(string, tag = "3")]
    pub resource_name: String,
}

/// Per-spec outcome of a subdocument lookup
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpecStatus {
    /// gRPC status code, 0 on success
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}
