/// Typed results of document operations
use crate::error::{ClientError, Result};
use crate::transcoder::DocumentValue;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use stellar_proto as proto;

/// Position of a mutation in a bucket partition's log
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationToken {
    pub partition_id: u16,
    pub partition_uuid: u64,
    pub sequence_number: u64,
    pub bucket_name: String,
}

impl MutationToken {
    pub fn new(
        partition_id: u16,
        partition_uuid: u64,
        sequence_number: u64,
        bucket_name: impl Into<String>,
    ) -> Self {
        Self {
            partition_id,
            partition_uuid,
            sequence_number,
            bucket_name: bucket_name.into(),
        }
    }

    pub(crate) fn from_wire(token: proto::MutationToken) -> Result<Self> {
        let partition_id = u16::try_from(token.vbucket_id).map_err(|_| {
            ClientError::InternalError(format!("partition id {} out of range", token.vbucket_id))
        })?;
        Ok(Self {
            partition_id,
            partition_uuid: token.vbucket_uuid,
            sequence_number: token.seq_no,
            bucket_name: token.bucket_name,
        })
    }

    pub(crate) fn to_wire(&self) -> proto::MutationToken {
        proto::MutationToken {
            bucket_name: self.bucket_name.clone(),
            vbucket_id: u32::from(self.partition_id),
            vbucket_uuid: self.partition_uuid,
            seq_no: self.sequence_number,
        }
    }
}

/// Result of `Collection::get`
#[derive(Debug, Clone, PartialEq)]
pub struct GetResult {
    cas: u64,
    expiry_time: Option<SystemTime>,
    value: DocumentValue,
}

impl GetResult {
    pub(crate) fn new(cas: u64, expiry_secs: Option<i64>, value: DocumentValue) -> Self {
        let expiry_time = expiry_secs
            .filter(|secs| *secs > 0)
            .map(|secs| UNIX_EPOCH + Duration::from_secs(secs as u64));
        Self {
            cas,
            expiry_time,
            value,
        }
    }

    pub fn cas(&self) -> u64 {
        self.cas
    }

    /// True when the server returned a document version
    pub fn success(&self) -> bool {
        self.cas != 0
    }

    /// Absolute expiry, if the document has one
    pub fn expiry_time(&self) -> Option<SystemTime> {
        self.expiry_time
    }

    pub fn content(&self) -> &DocumentValue {
        &self.value
    }

    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T> {
        self.value.content_as()
    }

    pub fn into_content(self) -> DocumentValue {
        self.value
    }
}

/// Result of `Collection::exists`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistsResult {
    exists: bool,
    cas: u64,
}

impl ExistsResult {
    pub(crate) fn new(exists: bool, cas: u64) -> Self {
        Self { exists, cas }
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Only meaningful when [`ExistsResult::exists`] is true
    pub fn cas(&self) -> u64 {
        self.cas
    }

    pub fn success(&self) -> bool {
        self.cas != 0
    }
}

/// Result of insert, upsert, replace and remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult {
    cas: u64,
    mutation_token: Option<MutationToken>,
}

impl MutationResult {
    pub(crate) fn new(cas: u64, mutation_token: Option<proto::MutationToken>) -> Result<Self> {
        Ok(Self {
            cas,
            mutation_token: mutation_token.map(MutationToken::from_wire).transpose()?,
        })
    }

    pub fn cas(&self) -> u64 {
        self.cas
    }

    pub fn success(&self) -> bool {
        self.cas != 0
    }

    pub fn mutation_token(&self) -> Option<&MutationToken> {
        self.mutation_token.as_ref()
    }
}

/// One decoded lookup-in field
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LookupInField {
    pub(crate) path: String,
    pub(crate) status: Option<proto::SpecStatus>,
    pub(crate) value: Option<Value>,
}

impl LookupInField {
    fn failure(&self) -> Option<ClientError> {
        let status = self.status.as_ref().filter(|s| s.code != tonic::Code::Ok as i32)?;
        let msg = if status.message.is_empty() {
            self.path.clone()
        } else {
            format!("{} ({})", status.message, self.path)
        };
        Some(match tonic::Code::from_i32(status.code) {
            tonic::Code::NotFound => ClientError::PathNotFound(msg),
            tonic::Code::AlreadyExists => ClientError::PathExists(msg),
            tonic::Code::FailedPrecondition => ClientError::PathMismatch(msg),
            code => ClientError::from(tonic::Status::new(code, msg)),
        })
    }
}

/// Result of `Collection::lookup_in`, indexed like the request specs
#[derive(Debug, Clone, PartialEq)]
pub struct LookupInResult {
    cas: u64,
    fields: Vec<LookupInField>,
}

impl LookupInResult {
    pub(crate) fn new(cas: u64, fields: Vec<LookupInField>) -> Self {
        Self { cas, fields }
    }

    pub fn cas(&self) -> u64 {
        self.cas
    }

    pub fn success(&self) -> bool {
        self.cas != 0
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Path requested by the spec at `index`
    pub fn path(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| f.path.as_str())
    }

    /// Decode the value of the spec at `index`
    ///
    /// Fails with the per-path error the server reported for that spec.
    pub fn content_as<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        let field = self.field(index)?;
        if let Some(err) = field.failure() {
            return Err(err);
        }
        match &field.value {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Err(ClientError::PathNotFound(field.path.clone())),
        }
    }

    /// Whether the path at `index` exists
    pub fn exists(&self, index: usize) -> Result<bool> {
        let field = self.field(index)?;
        match field.failure() {
            Some(ClientError::PathNotFound(_)) => Ok(false),
            Some(err) => Err(err),
            None => Ok(!matches!(field.value, Some(Value::Bool(false)))),
        }
    }

    fn field(&self, index: usize) -> Result<&LookupInField> {
        self.fields.get(index).ok_or_else(|| {
            ClientError::InvalidArgument(format!(
                "spec index {} out of range ({} specs)",
                index,
                self.fields.len()
            ))
        })
    }
}

/// Result of `Collection::mutate_in`
#[derive(Debug, Clone, PartialEq)]
pub struct MutateInResult {
    cas: u64,
    mutation_token: Option<MutationToken>,
    contents: Vec<Option<Value>>,
}

impl MutateInResult {
    pub(crate) fn new(
        cas: u64,
        mutation_token: Option<proto::MutationToken>,
        contents: Vec<Option<Value>>,
    ) -> Result<Self> {
        Ok(Self {
            cas,
            mutation_token: mutation_token.map(MutationToken::from_wire).transpose()?,
            contents,
        })
    }

    pub fn cas(&self) -> u64 {
        self.cas
    }

    pub fn success(&self) -> bool {
        self.cas != 0
    }

    pub fn mutation_token(&self) -> Option<&MutationToken> {
        self.mutation_token.as_ref()
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Value returned by the spec at `index` (counters return their new value)
    pub fn content_as<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        match self.contents.get(index) {
            Some(Some(value)) => Ok(serde_json::from_value(value.clone())?),
            Some(None) => Err(ClientError::InvalidArgument(format!(
                "spec {} did not return a value",
                index
            ))),
            None => Err(ClientError::InvalidArgument(format!(
                "spec index {} out of range ({} specs)",
                index,
                self.contents.len()
            ))),
        }
    }
}
