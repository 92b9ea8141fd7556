//! Test utilities for the Stellar client
//!
//! [`ScriptedTransport`] stands in for a cluster: every RPC pops the next
//! scripted response for that method and records the request it was given,
//! so tests can assert on exactly what went over the wire.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use prost::Message;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use stellar_client::transport::QueryStream;
use stellar_client::{Cluster, ClusterOptions, StellarTransport};
use stellar_proto as proto;
use tonic::{Request, Status};

/// Scripted outcome of one `query` call
enum QueryScript {
    Chunks(Vec<Result<proto::QueryResponse, Status>>),
    /// Yields the chunks, then never ends
    Stalled(Vec<Result<proto::QueryResponse, Status>>),
    Fail(Status),
}

#[derive(Default)]
struct Responses {
    get: VecDeque<Result<proto::GetResponse, Status>>,
    exists: VecDeque<Result<proto::ExistsResponse, Status>>,
    insert: VecDeque<Result<proto::InsertResponse, Status>>,
    upsert: VecDeque<Result<proto::UpsertResponse, Status>>,
    replace: VecDeque<Result<proto::ReplaceResponse, Status>>,
    remove: VecDeque<Result<proto::RemoveResponse, Status>>,
    lookup_in: VecDeque<Result<proto::LookupInResponse, Status>>,
    mutate_in: VecDeque<Result<proto::MutateInResponse, Status>>,
    query: VecDeque<QueryScript>,
    create_bucket: VecDeque<Result<proto::CreateBucketResponse, Status>>,
    update_bucket: VecDeque<Result<proto::UpdateBucketResponse, Status>>,
    delete_bucket: VecDeque<Result<proto::DeleteBucketResponse, Status>>,
    list_buckets: VecDeque<Result<proto::ListBucketsResponse, Status>>,
}

/// Every request the transport has received, per method
#[derive(Debug, Clone, Default)]
pub struct Requests {
    pub get: Vec<proto::GetRequest>,
    pub exists: Vec<proto::ExistsRequest>,
    pub insert: Vec<proto::InsertRequest>,
    pub upsert: Vec<proto::UpsertRequest>,
    pub replace: Vec<proto::ReplaceRequest>,
    pub remove: Vec<proto::RemoveRequest>,
    pub lookup_in: Vec<proto::LookupInRequest>,
    pub mutate_in: Vec<proto::MutateInRequest>,
    pub query: Vec<proto::QueryRequest>,
    pub create_bucket: Vec<proto::CreateBucketRequest>,
    pub update_bucket: Vec<proto::UpdateBucketRequest>,
    pub delete_bucket: Vec<proto::DeleteBucketRequest>,
    pub list_buckets: Vec<proto::ListBucketsRequest>,
}

/// Method name and deadline of one received call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub timeout: Option<Duration>,
}

#[derive(Default)]
struct State {
    responses: Responses,
    requests: Requests,
    calls: Vec<RecordedCall>,
}

/// In-memory transport that replays scripted responses
#[derive(Default)]
pub struct ScriptedTransport {
    state: Mutex<State>,
    delay: Mutex<Option<Duration>>,
}

macro_rules! push_fn {
    ($($(#[$meta:meta])* $name:ident: $field:ident => $resp:ty),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(&self, response: Result<$resp, Status>) -> &Self {
                self.state.lock().responses.$field.push_back(response);
                self
            }
        )*
    };
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every call wait this long before answering
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    push_fn! {
        push_get: get => proto::GetResponse,
        push_exists: exists => proto::ExistsResponse,
        push_insert: insert => proto::InsertResponse,
        push_upsert: upsert => proto::UpsertResponse,
        push_replace: replace => proto::ReplaceResponse,
        push_remove: remove => proto::RemoveResponse,
        push_lookup_in: lookup_in => proto::LookupInResponse,
        push_mutate_in: mutate_in => proto::MutateInResponse,
        push_create_bucket: create_bucket => proto::CreateBucketResponse,
        push_update_bucket: update_bucket => proto::UpdateBucketResponse,
        push_delete_bucket: delete_bucket => proto::DeleteBucketResponse,
        push_list_buckets: list_buckets => proto::ListBucketsResponse,
    }

    /// Script a query whose stream yields `chunks` and then ends
    pub fn push_query(&self, chunks: Vec<proto::QueryResponse>) -> &Self {
        let chunks = chunks.into_iter().map(Ok).collect();
        self.state.lock().responses.query.push_back(QueryScript::Chunks(chunks));
        self
    }

    /// Script a query stream that may fail part way through
    pub fn push_query_results(&self, chunks: Vec<Result<proto::QueryResponse, Status>>) -> &Self {
        self.state.lock().responses.query.push_back(QueryScript::Chunks(chunks));
        self
    }

    /// Script a query stream that stops producing after `chunks`
    pub fn push_query_stalled(&self, chunks: Vec<proto::QueryResponse>) -> &Self {
        let chunks = chunks.into_iter().map(Ok).collect();
        self.state.lock().responses.query.push_back(QueryScript::Stalled(chunks));
        self
    }

    /// Script a query rejected before any row is streamed
    pub fn push_query_error(&self, status: Status) -> &Self {
        self.state.lock().responses.query.push_back(QueryScript::Fail(status));
        self
    }

    pub fn requests(&self) -> Requests {
        self.state.lock().requests.clone()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Deadline attached to the most recent call
    pub fn last_timeout(&self) -> Option<Duration> {
        self.state.lock().calls.last().and_then(|call| call.timeout)
    }

    async fn pause(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn record<Req>(&self, method: &'static str, request: Request<Req>, state: &mut State) -> Req {
        let timeout = request
            .metadata()
            .get("grpc-timeout")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_grpc_timeout);
        state.calls.push(RecordedCall { method, timeout });
        request.into_inner()
    }

    fn respond<Req, Resp>(
        &self,
        method: &'static str,
        request: Request<Req>,
        requests: impl FnOnce(&mut Requests) -> &mut Vec<Req>,
        responses: impl FnOnce(&mut Responses) -> &mut VecDeque<Result<Resp, Status>>,
    ) -> Result<Resp, Status> {
        let mut state = self.state.lock();
        let message = self.record(method, request, &mut state);
        requests(&mut state.requests).push(message);
        responses(&mut state.responses)
            .pop_front()
            .unwrap_or_else(|| Err(Status::unavailable(format!("no scripted response for {}", method))))
    }
}

#[async_trait]
impl StellarTransport for ScriptedTransport {
    async fn get(&self, request: Request<proto::GetRequest>) -> Result<proto::GetResponse, Status> {
        self.pause().await;
        self.respond("get", request, |r| &mut r.get, |s| &mut s.get)
    }

    async fn exists(
        &self,
        request: Request<proto::ExistsRequest>,
    ) -> Result<proto::ExistsResponse, Status> {
        self.pause().await;
        self.respond("exists", request, |r| &mut r.exists, |s| &mut s.exists)
    }

    async fn insert(
        &self,
        request: Request<proto::InsertRequest>,
    ) -> Result<proto::InsertResponse, Status> {
        self.pause().await;
        self.respond("insert", request, |r| &mut r.insert, |s| &mut s.insert)
    }

    async fn upsert(
        &self,
        request: Request<proto::UpsertRequest>,
    ) -> Result<proto::UpsertResponse, Status> {
        self.pause().await;
        self.respond("upsert", request, |r| &mut r.upsert, |s| &mut s.upsert)
    }

    async fn replace(
        &self,
        request: Request<proto::ReplaceRequest>,
    ) -> Result<proto::ReplaceResponse, Status> {
        self.pause().await;
        self.respond("replace", request, |r| &mut r.replace, |s| &mut s.replace)
    }

    async fn remove(
        &self,
        request: Request<proto::RemoveRequest>,
    ) -> Result<proto::RemoveResponse, Status> {
        self.pause().await;
        self.respond("remove", request, |r| &mut r.remove, |s| &mut s.remove)
    }

    async fn lookup_in(
        &self,
        request: Request<proto::LookupInRequest>,
    ) -> Result<proto::LookupInResponse, Status> {
        self.pause().await;
        self.respond("lookup_in", request, |r| &mut r.lookup_in, |s| &mut s.lookup_in)
    }

    async fn mutate_in(
        &self,
        request: Request<proto::MutateInRequest>,
    ) -> Result<proto::MutateInResponse, Status> {
        self.pause().await;
        self.respond("mutate_in", request, |r| &mut r.mutate_in, |s| &mut s.mutate_in)
    }

    async fn query(&self, request: Request<proto::QueryRequest>) -> Result<QueryStream, Status> {
        self.pause().await;
        let script = {
            let mut state = self.state.lock();
            let message = self.record("query", request, &mut state);
            state.requests.query.push(message);
            state.responses.query.pop_front()
        };

        match script {
            Some(QueryScript::Chunks(chunks)) => Ok(stream::iter(chunks).boxed()),
            Some(QueryScript::Stalled(chunks)) => {
                Ok(stream::iter(chunks).chain(stream::pending()).boxed())
            }
            Some(QueryScript::Fail(status)) => Err(status),
            None => Err(Status::unavailable("no scripted response for query")),
        }
    }

    async fn create_bucket(
        &self,
        request: Request<proto::CreateBucketRequest>,
    ) -> Result<proto::CreateBucketResponse, Status> {
        self.pause().await;
        self.respond("create_bucket", request, |r| &mut r.create_bucket, |s| &mut s.create_bucket)
    }

    async fn update_bucket(
        &self,
        request: Request<proto::UpdateBucketRequest>,
    ) -> Result<proto::UpdateBucketResponse, Status> {
        self.pause().await;
        self.respond("update_bucket", request, |r| &mut r.update_bucket, |s| &mut s.update_bucket)
    }

    async fn delete_bucket(
        &self,
        request: Request<proto::DeleteBucketRequest>,
    ) -> Result<proto::DeleteBucketResponse, Status> {
        self.pause().await;
        self.respond("delete_bucket", request, |r| &mut r.delete_bucket, |s| &mut s.delete_bucket)
    }

    async fn list_buckets(
        &self,
        request: Request<proto::ListBucketsRequest>,
    ) -> Result<proto::ListBucketsResponse, Status> {
        self.pause().await;
        self.respond("list_buckets", request, |r| &mut r.list_buckets, |s| &mut s.list_buckets)
    }
}

/// Parse a `grpc-timeout` header value such as `2500000u`
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 {
        return None;
    }
    let (amount, unit) = value.split_at(value.len() - 1);
    let amount: u64 = amount.parse().ok()?;
    match unit {
        "H" => Some(Duration::from_secs(amount * 3600)),
        "M" => Some(Duration::from_secs(amount * 60)),
        "S" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_millis(amount)),
        "u" => Some(Duration::from_micros(amount)),
        "n" => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}

/// Cluster wired to `transport` with default options
pub fn test_cluster(transport: &Arc<ScriptedTransport>) -> Cluster {
    test_cluster_with(transport, ClusterOptions::new())
}

pub fn test_cluster_with(transport: &Arc<ScriptedTransport>, options: ClusterOptions) -> Cluster {
    let transport: Arc<dyn StellarTransport> = transport.clone();
    Cluster::with_transport(transport, options).expect("Failed to build cluster")
}

/// JSON document as the KV service returns it
pub fn json_document(value: &Value, cas: u64) -> proto::GetResponse {
    proto::GetResponse {
        content: serde_json::to_vec(value).expect("Failed to encode document"),
        content_type: proto::DocumentContentType::Json as i32,
        content_flags: 0x0200_0006,
        cas,
        expiry_time_secs: None,
    }
}

pub fn mutation_token(bucket: &str, partition_id: u32, seq_no: u64) -> proto::MutationToken {
    proto::MutationToken {
        bucket_name: bucket.to_string(),
        vbucket_id: partition_id,
        vbucket_uuid: 0xfeed_0000 + u64::from(partition_id),
        seq_no,
    }
}

/// One query chunk carrying `rows`
pub fn rows_chunk(rows: &[Value]) -> proto::QueryResponse {
    proto::QueryResponse {
        rows: rows
            .iter()
            .map(|row| serde_json::to_vec(row).expect("Failed to encode row"))
            .collect(),
        meta_data: None,
    }
}

/// Final query chunk carrying only metadata
pub fn metadata_chunk(request_id: &str) -> proto::QueryResponse {
    use proto::query_response::{meta_data, MetaData};

    proto::QueryResponse {
        rows: Vec::new(),
        meta_data: Some(MetaData {
            request_id: request_id.to_string(),
            client_context_id: String::new(),
            status: meta_data::Status::Success as i32,
            signature: br#"{"*":"*"}"#.to_vec(),
            metrics: Some(meta_data::Metrics {
                elapsed_time_micros: 2_000,
                execution_time_micros: 1_500,
                result_count: 3,
                ..Default::default()
            }),
            warnings: Vec::new(),
            profile: None,
        }),
    }
}

/// Error status carrying the details payload the service attaches
pub fn status_with_details(code: tonic::Code, reason: &str, resource_type: &str, resource: &str) -> Status {
    let details = proto::ErrorDetails {
        reason: reason.to_string(),
        resource_type: resource_type.to_string(),
        resource_name: resource.to_string(),
    };
    Status::with_details(code, "request failed", Bytes::from(details.encode_to_vec()))
}

/// Install a test subscriber honouring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grpc_timeout() {
        assert_eq!(parse_grpc_timeout("2500000u"), Some(Duration::from_millis(2500)));
        assert_eq!(parse_grpc_timeout("75S"), Some(Duration::from_secs(75)));
        assert_eq!(parse_grpc_timeout("10x"), None);
        assert_eq!(parse_grpc_timeout("u"), None);
    }
}
