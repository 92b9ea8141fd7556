//! Streaming query execution
//!
//! An [`N1qlRequest`] is single-pass: rows are pulled chunk by chunk from
//! the server stream and handed out in arrival order, and the trailing
//! metadata becomes available once the stream is exhausted. Reading past
//! the end fails with `AlreadyQueried`.
//!
//! The request owns mutable cursor state and is driven through `&mut self`;
//! it cannot be advanced from two tasks at once.

use crate::cluster::ClientContext;
use crate::error::{ClientError, Result};
use crate::query::options::N1qlQuery;
use crate::transcoder::Serializer;
use crate::transport::QueryStream;
use futures::stream::{self, BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use stellar_proto::query_response::{self, meta_data};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Final state reported by the query service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStatus {
    Running,
    Success,
    Errors,
    Completed,
    Stopped,
    Timeout,
    Closed,
    Fatal,
    Aborted,
    Unknown,
}

impl QueryStatus {
    fn from_wire(value: i32) -> Self {
        match meta_data::Status::try_from(value) {
            Ok(meta_data::Status::Running) => QueryStatus::Running,
            Ok(meta_data::Status::Success) => QueryStatus::Success,
            Ok(meta_data::Status::Errors) => QueryStatus::Errors,
            Ok(meta_data::Status::Completed) => QueryStatus::Completed,
            Ok(meta_data::Status::Stopped) => QueryStatus::Stopped,
            Ok(meta_data::Status::Timeout) => QueryStatus::Timeout,
            Ok(meta_data::Status::Closed) => QueryStatus::Closed,
            Ok(meta_data::Status::Fatal) => QueryStatus::Fatal,
            Ok(meta_data::Status::Aborted) => QueryStatus::Aborted,
            Ok(meta_data::Status::Unknown) | Err(_) => QueryStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryMetrics {
    pub elapsed_time: Duration,
    pub execution_time: Duration,
    pub result_count: u64,
    pub result_size: u64,
    pub mutation_count: u64,
    pub sort_count: u64,
    pub error_count: u64,
    pub warning_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryWarning {
    pub code: u32,
    pub message: String,
}

/// Trailing metadata of a completed query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMetaData {
    pub request_id: String,
    pub client_context_id: String,
    pub status: QueryStatus,
    pub signature: Option<Value>,
    pub metrics: Option<QueryMetrics>,
    pub warnings: Vec<QueryWarning>,
    pub profile: Option<Value>,
}

impl QueryMetaData {
    fn from_wire(raw: query_response::MetaData, serializer: &dyn Serializer) -> Result<Self> {
        let signature = if raw.signature.is_empty() {
            None
        } else {
            Some(serializer.deserialize(&raw.signature)?)
        };
        let profile = match raw.profile {
            Some(profile) if !profile.is_empty() => Some(serializer.deserialize(&profile)?),
            _ => None,
        };
        let metrics = raw.metrics.map(|m| QueryMetrics {
            elapsed_time: Duration::from_micros(m.elapsed_time_micros),
            execution_time: Duration::from_micros(m.execution_time_micros),
            result_count: m.result_count,
            result_size: m.result_size,
            mutation_count: m.mutation_count,
            sort_count: m.sort_count,
            error_count: m.error_count,
            warning_count: m.warning_count,
        });
        let warnings = raw
            .warnings
            .into_iter()
            .map(|w| QueryWarning {
                code: w.code,
                message: w.message,
            })
            .collect();

        Ok(Self {
            request_id: raw.request_id,
            client_context_id: raw.client_context_id,
            status: QueryStatus::from_wire(raw.status),
            signature,
            metrics,
            warnings,
            profile,
        })
    }
}

enum StreamState {
    NotStarted,
    Streaming(QueryStream),
    Done,
}

/// A query whose rows are read incrementally
pub struct N1qlRequest {
    context: Arc<ClientContext>,
    query: N1qlQuery,
    state: StreamState,
    rows: VecDeque<Vec<u8>>,
    raw_metadata: Option<query_response::MetaData>,
    metadata: Option<QueryMetaData>,
    deadline: Option<Instant>,
}

impl N1qlRequest {
    pub(crate) fn new(context: Arc<ClientContext>, query: N1qlQuery) -> Self {
        Self {
            context,
            query,
            state: StreamState::NotStarted,
            rows: VecDeque::new(),
            raw_metadata: None,
            metadata: None,
            deadline: None,
        }
    }

    pub fn query(&self) -> &N1qlQuery {
        &self.query
    }

    /// True once every row has been handed out (or the stream failed)
    pub fn is_done(&self) -> bool {
        matches!(self.state, StreamState::Done)
    }

    fn serializer(&self) -> Arc<dyn Serializer> {
        self.query
            .serializer()
            .cloned()
            .unwrap_or_else(|| self.context.default_serializer())
    }

    fn timeout(&self) -> Duration {
        self.query
            .timeout()
            .unwrap_or(self.context.options.timeouts.query_timeout)
    }

    /// Next row in server order, `None` once the stream is exhausted
    ///
    /// # Errors
    /// `AlreadyQueried` if called again after `None` was returned.
    pub async fn next_row(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(row) = self.rows.pop_front() {
                return self.serializer().deserialize(&row).map(Some);
            }
            match self.state {
                StreamState::NotStarted => self.start().await?,
                StreamState::Streaming(_) => {
                    if !self.pull_chunk().await? {
                        self.finish()?;
                        return Ok(None);
                    }
                }
                StreamState::Done => return Err(ClientError::AlreadyQueried),
            }
        }
    }

    /// Next row deserialized into `T`
    pub async fn next_row_as<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        match self.next_row().await? {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    async fn start(&mut self) -> Result<()> {
        // any failure from here on leaves the request spent
        self.state = StreamState::Done;

        let timeout = self.timeout();
        let request = self.query.to_wire()?;
        let deadline = Instant::now() + timeout;
        debug!(
            statement = %self.query.statement(),
            client_context_id = ?self.query.client_context_id(),
            "starting query"
        );

        let call = self
            .context
            .transport
            .query(self.context.request(request, timeout));
        let stream = match tokio::time::timeout_at(deadline, call).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(status)) => return Err(ClientError::from(status)),
            Err(_) => return Err(self.timeout_error(timeout)),
        };

        self.deadline = Some(deadline);
        self.state = StreamState::Streaming(stream);
        Ok(())
    }

    /// Pull one chunk into the buffer; false when the stream has ended
    async fn pull_chunk(&mut self) -> Result<bool> {
        let deadline = match self.deadline {
            Some(deadline) => deadline,
            None => return Ok(false),
        };
        let stream = match &mut self.state {
            StreamState::Streaming(stream) => stream,
            _ => return Ok(false),
        };

        let pulled = tokio::time::timeout_at(deadline, stream.next()).await;
        let next = match pulled {
            Ok(next) => next,
            Err(_) => {
                self.state = StreamState::Done;
                return Err(self.timeout_error(self.timeout()));
            }
        };

        match next {
            None => Ok(false),
            Some(Err(status)) => {
                self.state = StreamState::Done;
                Err(ClientError::from(status))
            }
            Some(Ok(chunk)) => {
                trace!(rows = chunk.rows.len(), has_metadata = chunk.meta_data.is_some(), "query chunk");
                self.rows.extend(chunk.rows);
                if let Some(meta) = chunk.meta_data {
                    if self.raw_metadata.is_some() {
                        warn!("query returned more than one metadata chunk, keeping the last");
                    }
                    self.raw_metadata = Some(meta);
                }
                Ok(true)
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.state = StreamState::Done;
        match self.raw_metadata.take() {
            Some(raw) => {
                let metadata = QueryMetaData::from_wire(raw, self.serializer().as_ref())?;
                debug!(request_id = %metadata.request_id, status = ?metadata.status, "query complete");
                self.metadata = Some(metadata);
            }
            None => warn!("query stream ended without metadata"),
        }
        Ok(())
    }

    fn timeout_error(&self, timeout: Duration) -> ClientError {
        ClientError::Timeout(format!(
            "query '{}' did not complete within {:?}",
            self.query.statement(),
            timeout
        ))
    }

    /// Metadata of the completed query
    ///
    /// Only available once every row has been read.
    pub fn metadata(&self) -> Result<&QueryMetaData> {
        match (&self.state, &self.metadata) {
            (StreamState::Done, Some(metadata)) => Ok(metadata),
            (StreamState::Done, None) => Err(ClientError::InternalError(
                "query completed without metadata".to_string(),
            )),
            _ => Err(ClientError::FailedPrecondition(
                "metadata is available after all rows have been read".to_string(),
            )),
        }
    }

    /// Read every remaining row
    pub async fn execute(&mut self) -> Result<Vec<Value>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Read every remaining row, deserialized into `T`
    pub async fn execute_as<T: DeserializeOwned>(&mut self) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row_as().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Consume the request as a stream of rows
    ///
    /// The stream ends after the last row; metadata is not reachable this way.
    pub fn into_stream(self) -> BoxStream<'static, Result<Value>> {
        stream::unfold(Some(self), |request| async move {
            let mut request = request?;
            match request.next_row().await {
                Ok(Some(row)) => Some((Ok(row), Some(request))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
        .boxed()
    }
}

impl fmt::Debug for N1qlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            StreamState::NotStarted => "not_started",
            StreamState::Streaming(_) => "streaming",
            StreamState::Done => "done",
        };
        f.debug_struct("N1qlRequest")
            .field("statement", &self.query.statement())
            .field("state", &state)
            .field("buffered_rows", &self.rows.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcoder::DefaultJsonSerializer;

    #[test]
    fn test_metadata_from_wire() {
        let raw = query_response::MetaData {
            request_id: "req-1".to_string(),
            client_context_id: "ctx".to_string(),
            status: meta_data::Status::Success as i32,
            signature: br#"{"*":"*"}"#.to_vec(),
            metrics: Some(meta_data::Metrics {
                elapsed_time_micros: 1500,
                execution_time_micros: 1200,
                result_count: 3,
                result_size: 42,
                ..Default::default()
            }),
            warnings: vec![meta_data::Warning {
                code: 1080,
                message: "timeout hint".to_string(),
            }],
            profile: None,
        };
        let metadata = QueryMetaData::from_wire(raw, &DefaultJsonSerializer).unwrap();
        assert_eq!(metadata.status, QueryStatus::Success);
        assert_eq!(metadata.signature, Some(serde_json::json!({"*": "*"})));
        let metrics = metadata.metrics.unwrap();
        assert_eq!(metrics.elapsed_time, Duration::from_micros(1500));
        assert_eq!(metrics.result_count, 3);
        assert_eq!(metadata.warnings[0].code, 1080);
        assert!(metadata.profile.is_none());
    }

    #[test]
    fn test_unknown_status() {
        assert_eq!(QueryStatus::from_wire(1234), QueryStatus::Unknown);
        assert_eq!(
            QueryStatus::from_wire(meta_data::Status::Fatal as i32),
            QueryStatus::Fatal
        );
    }
}
