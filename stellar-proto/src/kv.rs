//! `stellar.kv.v1` messages and the `KvService` client stub

use crate::{DurabilitySpec, MutationToken};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetRequest {
    #[prost(string, tag = "1")]
    pub bucket_name: String,
    #[prost(string, tag = "2")]
    pub scope_name: String,
    #[prost(string, tag = "3")]
    pub collection_name: String,
    #[prost(string, tag = "4")]
    pub key: String,
    #[prost(string, repeated, tag = "5")]
    pub project: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub content: Vec<u8>,
    #[prost(enumeration = "crate::DocumentContentType", tag = "2")]
    pub content_type: i32,
    #[prost(uint32, tag = "3")]
    pub content_flags: u32,
    #[prost(uint64, tag = "4")]
    pub cas: u64,
    /// Absolute expiry in seconds since the Unix epoch
    #[prost(int64, optional, tag = "5")]
    pub expiry_time_secs: Option<i64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExistsRequest {
    #[prost(string, tag = "1")]
    pub bucket_name: String,
    #[prost(string, tag = "2")]
    pub scope_name: String,
    #[prost(string, tag = "3")]
    pub collection_name: String,
    #[prost(string, tag = "4")]
    pub key: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExistsResponse {
    #[prost(bool, tag = "1")]
    pub result: bool,
    #[prost(uint64, tag = "2")]
    pub cas: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InsertRequest {
    #[prost(string, tag = "1")]
    pub bucket_name: String,
    #[prost(string, tag = "2")]
    pub scope_name: String,
    #[prost(string, tag = "3")]
    pub collection_name: String,
    #[prost(string, tag = "4")]
    pub key: String,
    #[prost(bytes = "vec", tag = "5")]
    pub content: Vec<u8>,
    #[prost(enumeration = "crate::DocumentContentType", tag = "6")]
    pub content_type: i32,
    #[prost(uint32, tag = "7")]
    pub content_flags: u32,
    #[prost(uint32, optional, tag = "8")]
    pub expiry_secs: Option<u32>,
    #[prost(oneof = "DurabilitySpec", tags = "20, 21")]
    pub durability_spec: Option<DurabilitySpec>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InsertResponse {
    #[prost(uint64, tag = "1")]
    pub cas: u64,
    #[prost(message, optional, tag = "2")]
    pub mutation_token: Option<MutationToken>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpsertRequest {
    #[prost(string, tag = "1")]
    pub bucket_name: String,
    #[prost(string, tag = "2")]
    pub scope_name: String,
    #[prost(string, tag = "3")]
    pub collection_name: String,
    #[prost(string, tag = "4")]
    pub key: String,
    #[prost(bytes = "vec", tag = "5")]
    pub content: Vec<u8>,
    #[prost(enumeration = "crate::DocumentContentType", tag = "6")]
    pub content_type: i32,
    #[prost(uint32, tag = "7")]
    pub content_flags: u32,
    #[prost(uint32, optional, tag = "8")]
    pub expiry_secs: Option<u32>,
    #[prost(bool, optional, tag = "9")]
    pub preserve_expiry_on_existing: Option<bool>,
    #[prost(oneof = "DurabilitySpec", tags = "20, 21")]
    pub durability_spec: Option<DurabilitySpec>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpsertResponse {
    #[prost(uint64, tag = "1")]
    pub cas: u64,
    #[prost(message, optional, tag = "2")]
    pub mutation_token: Option<MutationToken>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReplaceRequest {
    #[prost(string, tag = "1")]
    pub bucket_name: String,
    #[prost(string, tag = "2")]
    pub scope_name: String,
    #[prost(string, tag = "3")]
    pub collection_name: String,
    #[prost(string, tag = "4")]
    pub key: String,
    #[prost(bytes = "vec", tag = "5")]
    pub content: Vec<u8>,
    #[prost(enumeration = "crate::DocumentContentType", tag = "6")]
    pub content_type: i32,
    #[prost(uint32, tag = "7")]
    pub content_flags: u32,
    #[prost(uint32, optional, tag = "8")]
    pub expiry_secs: Option<u32>,
    #[prost(bool, optional, tag = "9")]
    pub preserve_expiry: Option<bool>,
    #[prost(uint64, optional, tag = "10")]
    pub cas: Option<u64>,
    #[prost(oneof = "DurabilitySpec", tags = "20, 21")]
    pub durability_spec: Option<DurabilitySpec>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReplaceResponse {
    #[prost(uint64, tag = "1")]
    pub cas: u64,
    #[prost(message, optional, tag = "2")]
    pub mutation_token: Option<MutationToken>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoveRequest {
    #[prost(string, tag = "1")]
    pub bucket_name: String,
    #[prost(string, tag = "2")]
    pub scope_name: String,
    #[prost(string, tag = "3")]
    pub collection_name: String,
    #[prost(string, tag = "4")]
    pub key: String,
    #[prost(uint64, optional, tag = "5")]
    pub cas: Option<u64>,
    #[prost(oneof = "DurabilitySpec", tags = "20, 21")]
    pub durability_spec: Option<DurabilitySpec>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoveResponse {
    #[prost(uint64, tag = "1")]
    pub cas: u64,
    #[prost(message, optional, tag = "2")]
    pub mutation_token: Option<MutationToken>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LookupInRequest {
    #[prost(string, tag = "1")]
    pub bucket_name: String,
    #[prost(string, tag = "2")]
    pub scope_name: String,
    #[prost(string, tag = "3")]
    pub collection_name: String,
    #[prost(string, tag = "4")]
    pub key: String,
    #[prost(message, repeated, tag = "5")]
    pub specs: Vec<lookup_in_request::Spec>,
    #[prost(message, optional, tag = "6")]
    pub flags: Option<lookup_in_request::Flags>,
}

pub mod lookup_in_request {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Spec {
        #[prost(enumeration = "spec::Operation", tag = "1")]
        pub operation: i32,
        #[prost(string, tag = "2")]
        pub path: String,
        #[prost(message, optional, tag = "3")]
        pub flags: Option<spec::Flags>,
    }

    pub mod spec {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum Operation {
            Get = 0,
            Exists = 1,
            Count = 2,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Flags {
            #[prost(bool, optional, tag = "1")]
            pub xattr: Option<bool>,
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Flags {
        #[prost(bool, optional, tag = "1")]
        pub access_deleted: Option<bool>,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LookupInResponse {
    #[prost(message, repeated, tag = "1")]
    pub specs: Vec<lookup_in_response::Spec>,
    #[prost(uint64, tag = "2")]
    pub cas: u64,
}

pub mod lookup_in_response {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Spec {
        #[prost(message, optional, tag = "1")]
        pub status: Option<crate::SpecStatus>,
        #[prost(bytes = "vec", tag = "2")]
        pub content: Vec<u8>,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MutateInRequest {
    #[prost(string, tag = "1")]
    pub bucket_name: String,
    #[prost(string, tag = "2")]
    pub scope_name: String,
    #[prost(string, tag = "3")]
    pub collection_name: String,
    #[prost(string, tag = "4")]
    pub key: String,
    #[prost(message, repeated, tag = "5")]
    pub specs: Vec<mutate_in_request::Spec>,
    #[prost(enumeration = "mutate_in_request::StoreSemantic", optional, tag = "6")]
    pub store_semantic: Option<i32>,
    #[prost(uint64, optional, tag = "7")]
    pub cas: Option<u64>,
    #[prost(bool, optional, tag = "8")]
    pub access_deleted: Option<bool>,
    #[prost(uint32, optional, tag = "9")]
    pub expiry_secs: Option<u32>,
    #[prost(bool, optional, tag = "10")]
    pub preserve_expiry: Option<bool>,
    #[prost(oneof = "DurabilitySpec", tags = "20, 21")]
    pub durability_spec: Option<DurabilitySpec>,
}

pub mod mutate_in_request {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Spec {
        #[prost(enumeration = "spec::Operation", tag = "1")]
        pub operation: i32,
        #[prost(string, tag = "2")]
        pub path: String,
        #[prost(bytes = "vec", tag = "3")]
        pub content: Vec<u8>,
        #[prost(message, optional, tag = "4")]
        pub flags: Option<spec::Flags>,
    }

    pub mod spec {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum Operation {
            Insert = 0,
            Upsert = 1,
            Replace = 2,
            Remove = 3,
            ArrayAppend = 4,
            ArrayPrepend = 5,
            ArrayInsert = 6,
            ArrayAddUnique = 7,
            Counter = 8,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Flags {
            #[prost(bool, optional, tag = "1")]
            pub create_path: Option<bool>,
            #[prost(bool, optional, tag = "2")]
            pub xattr: Option<bool>,
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum StoreSemantic {
        Replace = 0,
        Upsert = 1,
        Insert = 2,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MutateInResponse {
    #[prost(message, repeated, tag = "1")]
    pub specs: Vec<mutate_in_response::Spec>,
    #[prost(uint64, tag = "2")]
    pub cas: u64,
    #[prost(message, optional, tag = "3")]
    pub mutation_token: Option<MutationToken>,
}

pub mod mutate_in_response {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Spec {
        /// Unset for operations that do not return a value
        #[prost(bytes = "vec", optional, tag = "1")]
        pub content: Option<Vec<u8>>,
    }
}

pub mod kv_service_client {
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct KvServiceClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl KvServiceClient<tonic::transport::Channel> {
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }

    impl<T> KvServiceClient<T>
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

        unary_rpc!(get, super::GetRequest, super::GetResponse, "/stellar.kv.v1.KvService/Get");
        unary_rpc!(exists, super::ExistsRequest, super::ExistsResponse, "/stellar.kv.v1.KvService/Exists");
        unary_rpc!(insert, super::InsertRequest, super::InsertResponse, "/stellar.kv.v1.KvService/Insert");
        unary_rpc!(upsert, super::UpsertRequest, super::UpsertResponse, "/stellar.kv.v1.KvService/Upsert");
        unary_rpc!(replace, super::ReplaceRequest, super::ReplaceResponse, "/stellar.kv.v1.KvService/Replace");
        unary_rpc!(remove, super::RemoveRequest, super::RemoveResponse, "/stellar.kv.v1.KvService/Remove");
        unary_rpc!(lookup_in, super::LookupInRequest, super::LookupInResponse, "/stellar.kv.v1.KvService/LookupIn");
        unary_rpc!(mutate_in, super::MutateInRequest, super::MutateInResponse, "/stellar.kv.v1.KvService/MutateIn");
    }
}
