//! `stellar.query.v1` messages and the server-streaming `QueryService` stub

use crate::MutationToken;
use std::collections::HashMap;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryRequest {
    #[prost(string, tag = "1")]
    pub statement: String,
    #[prost(string, optional, tag = "2")]
    pub query_context: Option<String>,
    #[prost(bool, optional, tag = "3")]
    pub read_only: Option<bool>,
    /// Inverse of the client-side `adhoc` flag
    #[prost(bool, optional, tag = "4")]
    pub prepared: Option<bool>,
    #[prost(message, optional, tag = "5")]
    pub tuning_options: Option<query_request::TuningOptions>,
    #[prost(string, optional, tag = "6")]
    pub client_context_id: Option<String>,
    #[prost(enumeration = "query_request::ScanConsistency", optional, tag = "7")]
    pub scan_consistency: Option<i32>,
    /// JSON encoded positional parameters
    #[prost(bytes = "vec", repeated, tag = "8")]
    pub positional_parameters: Vec<Vec<u8>>,
    /// JSON encoded named parameters, keys carry the `$` prefix
    #[prost(map = "string, bytes", tag = "9")]
    pub named_parameters: HashMap<String, Vec<u8>>,
    #[prost(bool, optional, tag = "10")]
    pub flex_index: Option<bool>,
    #[prost(bool, optional, tag = "11")]
    pub preserve_expiry: Option<bool>,
    #[prost(message, repeated, tag = "12")]
    pub consistent_with: Vec<MutationToken>,
    #[prost(enumeration = "query_request::ProfileMode", optional, tag = "13")]
    pub profile_mode: Option<i32>,
    /// JSON encoded passthrough options
    #[prost(map = "string, bytes", tag = "14")]
    pub raw: HashMap<String, Vec<u8>>,
}

pub mod query_request {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TuningOptions {
        #[prost(uint32, optional, tag = "1")]
        pub max_parallelism: Option<u32>,
        #[prost(uint32, optional, tag = "2")]
        pub pipeline_batch: Option<u32>,
        #[prost(uint32, optional, tag = "3")]
        pub pipeline_cap: Option<u32>,
        #[prost(uint64, optional, tag = "4")]
        pub scan_wait_micros: Option<u64>,
        #[prost(uint32, optional, tag = "5")]
        pub scan_cap: Option<u32>,
        #[prost(bool, optional, tag = "6")]
        pub disable_metrics: Option<bool>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum ScanConsistency {
        NotBounded = 0,
        RequestPlus = 1,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum ProfileMode {
        Off = 0,
        Phases = 1,
        Timings = 2,
    }
}

/// One chunk of a query response stream
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResponse {
    /// JSON encoded rows
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub rows: Vec<Vec<u8>>,
    /// Present once, normally on the final chunk
    #[prost(message, optional, tag = "2")]
    pub meta_data: Option<query_response::MetaData>,
}

pub mod query_response {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct MetaData {
        #[prost(string, tag = "1")]
        pub request_id: String,
        #[prost(string, tag = "2")]
        pub client_context_id: String,
        #[prost(enumeration = "meta_data::Status", tag = "3")]
        pub status: i32,
        #[prost(bytes = "vec", tag = "4")]
        pub signature: Vec<u8>,
        #[prost(message, optional, tag = "5")]
        pub metrics: Option<meta_data::Metrics>,
        #[prost(message, repeated, tag = "6")]
        pub warnings: Vec<meta_data::Warning>,
        #[prost(bytes = "vec", optional, tag = "7")]
        pub profile: Option<Vec<u8>>,
    }

    pub mod meta_data {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum Status {
            Running = 0,
            Success = 1,
            Errors = 2,
            Completed = 3,
            Stopped = 4,
            Timeout = 5,
            Closed = 6,
            Fatal = 7,
            Aborted = 8,
            Unknown = 9,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Metrics {
            #[prost(uint64, tag = "1")]
            pub elapsed_time_micros: u64,
            #[prost(uint64, tag = "2")]
            pub execution_time_micros: u64,
            #[prost(uint64, tag = "3")]
            pub result_count: u64,
            #[prost(uint64, tag = "4")]
            pub result_size: u64,
            #[prost(uint64, tag = "5")]
            pub mutation_count: u64,
            #[prost(uint64, tag = "6")]
            pub sort_count: u64,
            #[prost(uint64, tag = "7")]
            pub error_count: u64,
            #[prost(uint64, tag = "8")]
            pub warning_count: u64,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Warning {
            #[prost(uint32, tag = "1")]
            pub code: u32,
            #[prost(string, tag = "2")]
            pub message: String,
        }
    }
}

pub mod query_service_client {
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct QueryServiceClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl QueryServiceClient<tonic::transport::Channel> {
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }

    impl<T> QueryServiceClient<T>
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

        /// Execute a statement, streaming rows back in chunks
        pub async fn query(
            &mut self,
            request: impl tonic::IntoRequest<super::QueryRequest>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::QueryResponse>>,
            tonic::Status,
        > {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/stellar.query.v1.QueryService/Query");
            self.inner
                .server_streaming(request.into_request(), path, codec)
                .await
        }
    }
}
