/// Document operations scoped to a collection
use crate::cluster::ClientContext;
use crate::error::{ClientError, Result};
use crate::options::{
    ExistsOptions, GetOptions, InsertOptions, LookupInOptions, MutateInOptions, OperationKind,
    RemoveOptions, ReplaceOptions, ResolvedFields, UpsertOptions, WireField,
};
use crate::result::{ExistsResult, GetResult, LookupInResult, MutateInResult, MutationResult};
use crate::subdoc::{self, LookupInSpec, MutateInSpec};
use crate::transcoder::{ContentType, DocumentValue, Transcoder};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use stellar_proto as proto;
use tracing::debug;

/// Longest key the server accepts, in bytes
pub const MAX_KEY_LENGTH: usize = 250;

/// Common flags stored alongside the document body
const JSON_COMMON_FLAGS: u32 = 0x0200_0006;
const BINARY_COMMON_FLAGS: u32 = 0x0300_0000;

/// (bucket, scope, collection) a handle operates on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub bucket: String,
    pub scope: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(
        bucket: impl Into<String>,
        scope: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            scope: scope.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.bucket, self.scope, self.collection)
    }
}

/// Handle for document operations in one collection
///
/// Cheap to clone; every call is independent and may run concurrently.
#[derive(Clone)]
pub struct Collection {
    namespace: Namespace,
    context: Arc<ClientContext>,
    transcoder: Option<Arc<dyn Transcoder>>,
}

/// Encoded document body ready for a mutation request
struct EncodedContent {
    content: Vec<u8>,
    content_type: i32,
    content_flags: u32,
}

impl Collection {
    pub(crate) fn new(
        namespace: Namespace,
        context: Arc<ClientContext>,
        transcoder: Option<Arc<dyn Transcoder>>,
    ) -> Self {
        Self {
            namespace,
            context,
            transcoder,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.namespace.collection
    }

    /// Default transcoder for operations on this handle
    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    /// Per-call transcoder, else this handle's, else the cluster default
    fn transcoder(&self, per_call: Option<&Arc<dyn Transcoder>>) -> Arc<dyn Transcoder> {
        per_call
            .or(self.transcoder.as_ref())
            .cloned()
            .unwrap_or_else(|| self.context.default_transcoder())
    }

    fn timeout(&self, fields: &ResolvedFields) -> Duration {
        fields
            .timeout()
            .unwrap_or(self.context.options.timeouts.kv_timeout)
    }

    fn encode(&self, value: &DocumentValue, transcoder: &dyn Transcoder) -> Result<EncodedContent> {
        let (content, content_type) = transcoder.encode_value(value)?;
        let content_flags = match content_type {
            ContentType::Binary => BINARY_COMMON_FLAGS,
            ContentType::Json | ContentType::Unknown => JSON_COMMON_FLAGS,
        };
        Ok(EncodedContent {
            content: content.to_vec(),
            content_type: content_type.to_wire(),
            content_flags,
        })
    }

    /// Fetch a document
    ///
    /// # Errors
    /// `DocumentNotFound` if the key does not exist.
    pub async fn get(&self, key: &str, options: GetOptions) -> Result<GetResult> {
        validate_key(key)?;
        let fields = options.resolve()?;
        let timeout = self.timeout(&fields);
        let ns = &self.namespace;

        let request = proto::GetRequest {
            bucket_name: ns.bucket.clone(),
            scope_name: ns.scope.clone(),
            collection_name: ns.collection.clone(),
            key: key.to_string(),
            project: fields
                .str_list(WireField::Project)
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
        };

        debug!(namespace = %ns, key, "get");
        let transport = &self.context.transport;
        let response = self
            .context
            .execute(
                OperationKind::Get,
                key,
                timeout,
                transport.get(self.context.request(request, timeout)),
            )
            .await?;

        let transcoder = self.transcoder(options.transcoder.as_ref());
        let value = transcoder.decode_value(
            &response.content,
            ContentType::from_wire(response.content_type),
        )?;
        Ok(GetResult::new(response.cas, response.expiry_time_secs, value))
    }

    /// Check whether a document exists without fetching it
    pub async fn exists(&self, key: &str, options: ExistsOptions) -> Result<ExistsResult> {
        validate_key(key)?;
        let fields = options.resolve()?;
        let timeout = self.timeout(&fields);
        let ns = &self.namespace;

        let request = proto::ExistsRequest {
            bucket_name: ns.bucket.clone(),
            scope_name: ns.scope.clone(),
            collection_name: ns.collection.clone(),
            key: key.to_string(),
        };

        debug!(namespace = %ns, key, "exists");
        let transport = &self.context.transport;
        let response = self
            .context
            .execute(
                OperationKind::Exists,
                key,
                timeout,
                transport.exists(self.context.request(request, timeout)),
            )
            .await?;
        Ok(ExistsResult::new(response.result, response.cas))
    }

    /// Create a document, failing with `DocumentExists` if the key is taken
    pub async fn insert(
        &self,
        key: &str,
        value: impl Into<DocumentValue>,
        options: InsertOptions,
    ) -> Result<MutationResult> {
        validate_key(key)?;
        let fields = options.resolve()?;
        let timeout = self.timeout(&fields);
        let transcoder = self.transcoder(options.transcoder.as_ref());
        let encoded = self.encode(&value.into(), transcoder.as_ref())?;
        let ns = &self.namespace;

        let request = proto::InsertRequest {
            bucket_name: ns.bucket.clone(),
            scope_name: ns.scope.clone(),
            collection_name: ns.collection.clone(),
            key: key.to_string(),
            content: encoded.content,
            content_type: encoded.content_type,
            content_flags: encoded.content_flags,
            expiry_secs: fields.u32(WireField::ExpirySecs),
            durability_spec: fields.durability_spec()?,
        };

        debug!(namespace = %ns, key, "insert");
        let transport = &self.context.transport;
        let response = self
            .context
            .execute(
                OperationKind::Insert,
                key,
                timeout,
                transport.insert(self.context.request(request, timeout)),
            )
            .await?;
        MutationResult::new(response.cas, response.mutation_token)
    }

    /// Create or overwrite a document
    pub async fn upsert(
        &self,
        key: &str,
        value: impl Into<DocumentValue>,
        options: UpsertOptions,
    ) -> Result<MutationResult> {
        validate_key(key)?;
        let fields = options.resolve()?;
        let timeout = self.timeout(&fields);
        let transcoder = self.transcoder(options.transcoder.as_ref());
        let encoded = self.encode(&value.into(), transcoder.as_ref())?;
        let ns = &self.namespace;

        let request = proto::UpsertRequest {
            bucket_name: ns.bucket.clone(),
            scope_name: ns.scope.clone(),
            collection_name: ns.collection.clone(),
            key: key.to_string(),
            content: encoded.content,
            content_type: encoded.content_type,
            content_flags: encoded.content_flags,
            expiry_secs: fields.u32(WireField::ExpirySecs),
            preserve_expiry_on_existing: fields.bool(WireField::PreserveExpiry),
            durability_spec: fields.durability_spec()?,
        };

        debug!(namespace = %ns, key, "upsert");
        let transport = &self.context.transport;
        let response = self
            .context
            .execute(
                OperationKind::Upsert,
                key,
                timeout,
                transport.upsert(self.context.request(request, timeout)),
            )
            .await?;
        MutationResult::new(response.cas, response.mutation_token)
    }

    /// Overwrite an existing document, optionally only at a given CAS
    pub async fn replace(
        &self,
        key: &str,
        value: impl Into<DocumentValue>,
        options: ReplaceOptions,
    ) -> Result<MutationResult> {
        validate_key(key)?;
        let fields = options.resolve()?;
        let timeout = self.timeout(&fields);
        let transcoder = self.transcoder(options.transcoder.as_ref());
        let encoded = self.encode(&value.into(), transcoder.as_ref())?;
        let ns = &self.namespace;

        let request = proto::ReplaceRequest {
            bucket_name: ns.bucket.clone(),
            scope_name: ns.scope.clone(),
            collection_name: ns.collection.clone(),
            key: key.to_string(),
            content: encoded.content,
            content_type: encoded.content_type,
            content_flags: encoded.content_flags,
            expiry_secs: fields.u32(WireField::ExpirySecs),
            preserve_expiry: fields.bool(WireField::PreserveExpiry),
            cas: fields.u64(WireField::Cas),
            durability_spec: fields.durability_spec()?,
        };

        debug!(namespace = %ns, key, "replace");
        let transport = &self.context.transport;
        let response = self
            .context
            .execute(
                OperationKind::Replace,
                key,
                timeout,
                transport.replace(self.context.request(request, timeout)),
            )
            .await?;
        MutationResult::new(response.cas, response.mutation_token)
    }

    /// Remove a document
    ///
    /// Without a `cas` option the removal is unconditional.
    ///
    /// # Errors
    /// `DocumentNotFound` if the key does not exist, `CasMismatch` if the
    /// document changed since `cas` was read.
    pub async fn remove(&self, key: &str, options: RemoveOptions) -> Result<MutationResult> {
        validate_key(key)?;
        let fields = options.resolve()?;
        let timeout = self.timeout(&fields);
        let ns = &self.namespace;

        let request = proto::RemoveRequest {
            bucket_name: ns.bucket.clone(),
            scope_name: ns.scope.clone(),
            collection_name: ns.collection.clone(),
            key: key.to_string(),
            cas: fields.u64(WireField::Cas),
            durability_spec: fields.durability_spec()?,
        };

        debug!(namespace = %ns, key, "remove");
        let transport = &self.context.transport;
        let response = self
            .context
            .execute(
                OperationKind::Remove,
                key,
                timeout,
                transport.remove(self.context.request(request, timeout)),
            )
            .await?;
        MutationResult::new(response.cas, response.mutation_token)
    }

    /// Read paths within a document
    ///
    /// Results are positional: `result.content_as(i)` belongs to `specs[i]`.
    pub async fn lookup_in(
        &self,
        key: &str,
        specs: &[LookupInSpec],
        options: LookupInOptions,
    ) -> Result<LookupInResult> {
        validate_key(key)?;
        let fields = options.resolve()?;
        let timeout = self.timeout(&fields);
        let ns = &self.namespace;

        let request = proto::LookupInRequest {
            bucket_name: ns.bucket.clone(),
            scope_name: ns.scope.clone(),
            collection_name: ns.collection.clone(),
            key: key.to_string(),
            specs: subdoc::lookup_in_specs_to_wire(specs)?,
            flags: fields
                .bool(WireField::AccessDeleted)
                .map(|access_deleted| proto::lookup_in_request::Flags {
                    access_deleted: Some(access_deleted),
                }),
        };

        debug!(namespace = %ns, key, specs = specs.len(), "lookup_in");
        let transport = &self.context.transport;
        let response = self
            .context
            .execute(
                OperationKind::LookupIn,
                key,
                timeout,
                transport.lookup_in(self.context.request(request, timeout)),
            )
            .await?;
        subdoc::decode_lookup_in(specs, response)
    }

    /// Apply path-level mutations to a document atomically
    pub async fn mutate_in(
        &self,
        key: &str,
        specs: &[MutateInSpec],
        options: MutateInOptions,
    ) -> Result<MutateInResult> {
        validate_key(key)?;
        let fields = options.resolve()?;
        let timeout = self.timeout(&fields);
        let ns = &self.namespace;

        let request = proto::MutateInRequest {
            bucket_name: ns.bucket.clone(),
            scope_name: ns.scope.clone(),
            collection_name: ns.collection.clone(),
            key: key.to_string(),
            specs: subdoc::mutate_in_specs_to_wire(specs)?,
            store_semantic: fields.enum_value(WireField::StoreSemantic),
            cas: fields.u64(WireField::Cas),
            access_deleted: fields.bool(WireField::AccessDeleted),
            expiry_secs: fields.u32(WireField::ExpirySecs),
            preserve_expiry: fields.bool(WireField::PreserveExpiry),
            durability_spec: fields.durability_spec()?,
        };

        debug!(namespace = %ns, key, specs = specs.len(), "mutate_in");
        let transport = &self.context.transport;
        let response = self
            .context
            .execute(
                OperationKind::MutateIn,
                key,
                timeout,
                transport.mutate_in(self.context.request(request, timeout)),
            )
            .await?;
        subdoc::decode_mutate_in(specs, response)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("namespace", &self.namespace)
            .field("transcoder", &self.transcoder)
            .finish_non_exhaustive()
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ClientError::InvalidArgument("key must not be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(ClientError::InvalidArgument(format!(
            "key is {} bytes, maximum is {}",
            key.len(),
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("user::1").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key(&"k".repeat(MAX_KEY_LENGTH)).is_ok());
        assert!(validate_key(&"k".repeat(MAX_KEY_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_namespace_display() {
        let ns = Namespace::new("travel", "inventory", "hotel");
        assert_eq!(ns.to_string(), "travel.inventory.hotel");
    }
}
