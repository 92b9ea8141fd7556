//! Bucket management
//!
//! Settings enums are mapped to their wire values through fixed tables;
//! values the server reports that this client does not know are rejected
//! rather than guessed.

use crate::cluster::ClientContext;
use crate::durability::DurabilityLevel;
use crate::error::{ClientError, Result};
use crate::options::{ManagementOptions, OperationKind};
use std::sync::Arc;
use std::time::Duration;
use stellar_proto as proto;
use tracing::{debug, info};

/// Smallest RAM quota the server accepts for a bucket
pub const MIN_RAM_QUOTA_MB: u64 = 100;
pub const MAX_BUCKET_NAME_LENGTH: usize = 100;
pub const MAX_REPLICAS: u32 = 3;

/// Declares a settings enum together with its wire mapping
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident => $wire:ty {
            $($(#[$vmeta:meta])* $variant:ident => $wire_variant:ident),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)*
        }

        impl $name {
            pub fn to_wire(self) -> i32 {
                match self {
                    $($name::$variant => <$wire>::$wire_variant as i32,)*
                }
            }

            pub fn from_wire(value: i32) -> Result<Self> {
                $(
                    if value == <$wire>::$wire_variant as i32 {
                        return Ok($name::$variant);
                    }
                )*
                Err(ClientError::InvalidArgument(format!(
                    "unknown {} value {}",
                    stringify!($name),
                    value
                )))
            }
        }
    };
}

wire_enum! {
    BucketType => proto::BucketType {
        Couchbase => Couchbase,
        Memcached => Memcached,
        /// In-memory only
        Ephemeral => Ephemeral,
    }
}

wire_enum! {
    /// What is ejected from memory under pressure
    EvictionPolicy => proto::EvictionMode {
        FullEviction => Full,
        ValueOnly => ValueOnly,
        NotRecentlyUsed => NotRecentlyUsed,
        NoEviction => None,
    }
}

wire_enum! {
    CompressionMode => proto::CompressionMode {
        Off => Off,
        Passive => Passive,
        Active => Active,
    }
}

wire_enum! {
    StorageBackend => proto::StorageBackend {
        Couchstore => Couchstore,
        Magma => Magma,
    }
}

wire_enum! {
    /// How conflicting cross-cluster writes are resolved
    ConflictResolutionType => proto::ConflictResolutionType {
        Timestamp => Timestamp,
        SequenceNumber => SequenceNumber,
        Custom => Custom,
    }
}

/// Bucket configuration as seen by the management API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSettings {
    pub name: String,
    pub bucket_type: BucketType,
    pub ram_quota_mb: u64,
    pub num_replicas: Option<u32>,
    pub flush_enabled: Option<bool>,
    pub replica_indexes: Option<bool>,
    pub eviction_policy: Option<EvictionPolicy>,
    /// Upper bound on document expiry (None = server default)
    pub max_expiry: Option<Duration>,
    pub compression_mode: Option<CompressionMode>,
    pub minimum_durability_level: Option<DurabilityLevel>,
    pub storage_backend: Option<StorageBackend>,
    pub conflict_resolution_type: Option<ConflictResolutionType>,
}

impl BucketSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bucket_type: BucketType::Couchbase,
            ram_quota_mb: MIN_RAM_QUOTA_MB,
            num_replicas: None,
            flush_enabled: None,
            replica_indexes: None,
            eviction_policy: None,
            max_expiry: None,
            compression_mode: None,
            minimum_durability_level: None,
            storage_backend: None,
            conflict_resolution_type: None,
        }
    }

    pub fn with_bucket_type(mut self, bucket_type: BucketType) -> Self {
        self.bucket_type = bucket_type;
        self
    }

    pub fn with_ram_quota_mb(mut self, ram_quota_mb: u64) -> Self {
        self.ram_quota_mb = ram_quota_mb;
        self
    }

    pub fn with_num_replicas(mut self, num_replicas: u32) -> Self {
        self.num_replicas = Some(num_replicas);
        self
    }

    pub fn with_flush_enabled(mut self, enabled: bool) -> Self {
        self.flush_enabled = Some(enabled);
        self
    }

    pub fn with_replica_indexes(mut self, enabled: bool) -> Self {
        self.replica_indexes = Some(enabled);
        self
    }

    pub fn with_eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }

    pub fn with_max_expiry(mut self, max_expiry: Duration) -> Self {
        self.max_expiry = Some(max_expiry);
        self
    }

    pub fn with_compression_mode(mut self, mode: CompressionMode) -> Self {
        self.compression_mode = Some(mode);
        self
    }

    pub fn with_minimum_durability_level(mut self, level: DurabilityLevel) -> Self {
        self.minimum_durability_level = Some(level);
        self
    }

    pub fn with_storage_backend(mut self, backend: StorageBackend) -> Self {
        self.storage_backend = Some(backend);
        self
    }

    pub fn with_conflict_resolution_type(mut self, kind: ConflictResolutionType) -> Self {
        self.conflict_resolution_type = Some(kind);
        self
    }

    /// Check the settings before they are sent
    pub fn validate(&self) -> Result<()> {
        validate_bucket_name(&self.name)?;

        if self.ram_quota_mb < MIN_RAM_QUOTA_MB {
            return Err(ClientError::InvalidArgument(format!(
                "ram quota must be at least {} MB, got {}",
                MIN_RAM_QUOTA_MB, self.ram_quota_mb
            )));
        }

        if let Some(replicas) = self.num_replicas {
            if replicas > MAX_REPLICAS {
                return Err(ClientError::InvalidArgument(format!(
                    "at most {} replicas are supported, got {}",
                    MAX_REPLICAS, replicas
                )));
            }
            if replicas > 0 && self.bucket_type == BucketType::Memcached {
                return Err(ClientError::InvalidArgument(
                    "memcached buckets do not support replicas".to_string(),
                ));
            }
        }

        if let Some(policy) = self.eviction_policy {
            let allowed = match self.bucket_type {
                BucketType::Couchbase => {
                    matches!(policy, EvictionPolicy::FullEviction | EvictionPolicy::ValueOnly)
                }
                BucketType::Ephemeral => {
                    matches!(policy, EvictionPolicy::NotRecentlyUsed | EvictionPolicy::NoEviction)
                }
                BucketType::Memcached => false,
            };
            if !allowed {
                return Err(ClientError::InvalidArgument(format!(
                    "{:?} eviction is not valid for {:?} buckets",
                    policy, self.bucket_type
                )));
            }
        }

        if let Some(max_expiry) = self.max_expiry {
            if u32::try_from(max_expiry.as_secs()).is_err() {
                return Err(ClientError::InvalidArgument(
                    "max expiry is out of range".to_string(),
                ));
            }
        }

        if self.storage_backend == Some(StorageBackend::Magma) && self.bucket_type != BucketType::Couchbase {
            return Err(ClientError::InvalidArgument(
                "the magma backend is only available for couchbase buckets".to_string(),
            ));
        }

        Ok(())
    }

    pub(crate) fn to_wire(&self) -> proto::BucketSettings {
        proto::BucketSettings {
            bucket_name: self.name.clone(),
            bucket_type: self.bucket_type.to_wire(),
            ram_quota_mb: self.ram_quota_mb,
            num_replicas: self.num_replicas,
            flush_enabled: self.flush_enabled,
            replica_indexes: self.replica_indexes,
            eviction_mode: self.eviction_policy.map(EvictionPolicy::to_wire),
            // validated to fit
            max_expiry_secs: self.max_expiry.map(|d| d.as_secs() as u32),
            compression_mode: self.compression_mode.map(CompressionMode::to_wire),
            minimum_durability_level: self.minimum_durability_level.and_then(DurabilityLevel::to_wire),
            storage_backend: self.storage_backend.map(StorageBackend::to_wire),
            conflict_resolution_type: self
                .conflict_resolution_type
                .map(ConflictResolutionType::to_wire),
        }
    }

    pub(crate) fn from_wire(settings: proto::BucketSettings) -> Result<Self> {
        Ok(Self {
            name: settings.bucket_name,
            bucket_type: BucketType::from_wire(settings.bucket_type)?,
            ram_quota_mb: settings.ram_quota_mb,
            num_replicas: settings.num_replicas,
            flush_enabled: settings.flush_enabled,
            replica_indexes: settings.replica_indexes,
            eviction_policy: settings.eviction_mode.map(EvictionPolicy::from_wire).transpose()?,
            max_expiry: settings
                .max_expiry_secs
                .map(|secs| Duration::from_secs(u64::from(secs))),
            compression_mode: settings
                .compression_mode
                .map(CompressionMode::from_wire)
                .transpose()?,
            minimum_durability_level: settings
                .minimum_durability_level
                .map(DurabilityLevel::from_wire)
                .transpose()?,
            storage_backend: settings
                .storage_backend
                .map(StorageBackend::from_wire)
                .transpose()?,
            conflict_resolution_type: settings
                .conflict_resolution_type
                .map(ConflictResolutionType::from_wire)
                .transpose()?,
        })
    }
}

fn validate_bucket_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ClientError::InvalidArgument("bucket name must not be empty".to_string()));
    }
    if name.len() > MAX_BUCKET_NAME_LENGTH {
        return Err(ClientError::InvalidArgument(format!(
            "bucket name exceeds {} characters",
            MAX_BUCKET_NAME_LENGTH
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '%')))
    {
        return Err(ClientError::InvalidArgument(format!(
            "invalid character '{}' in bucket name",
            c
        )));
    }
    Ok(())
}

/// Create, update, drop and inspect buckets
#[derive(Clone)]
pub struct BucketManager {
    context: Arc<ClientContext>,
}

impl BucketManager {
    pub(crate) fn new(context: Arc<ClientContext>) -> Self {
        Self { context }
    }

    fn timeout(&self, options: &ManagementOptions) -> Result<Duration> {
        let fields = options.resolve()?;
        Ok(fields
            .timeout()
            .unwrap_or(self.context.options.timeouts.management_timeout))
    }

    /// # Errors
    /// `BucketExists` if a bucket with this name already exists.
    pub async fn create_bucket(&self, settings: &BucketSettings, options: ManagementOptions) -> Result<()> {
        settings.validate()?;
        let timeout = self.timeout(&options)?;
        let request = proto::CreateBucketRequest {
            settings: Some(settings.to_wire()),
        };

        let transport = &self.context.transport;
        self.context
            .execute(
                OperationKind::Management,
                &settings.name,
                timeout,
                transport.create_bucket(self.context.request(request, timeout)),
            )
            .await?;
        info!(bucket = %settings.name, "created bucket");
        Ok(())
    }

    pub async fn update_bucket(&self, settings: &BucketSettings, options: ManagementOptions) -> Result<()> {
        settings.validate()?;
        let timeout = self.timeout(&options)?;
        let request = proto::UpdateBucketRequest {
            settings: Some(settings.to_wire()),
        };

        let transport = &self.context.transport;
        self.context
            .execute(
                OperationKind::Management,
                &settings.name,
                timeout,
                transport.update_bucket(self.context.request(request, timeout)),
            )
            .await?;
        info!(bucket = %settings.name, "updated bucket");
        Ok(())
    }

    /// # Errors
    /// `BucketNotFound` if no such bucket exists.
    pub async fn drop_bucket(&self, name: &str, options: ManagementOptions) -> Result<()> {
        validate_bucket_name(name)?;
        let timeout = self.timeout(&options)?;
        let request = proto::DeleteBucketRequest {
            bucket_name: name.to_string(),
        };

        let transport = &self.context.transport;
        self.context
            .execute(
                OperationKind::Management,
                name,
                timeout,
                transport.delete_bucket(self.context.request(request, timeout)),
            )
            .await?;
        info!(bucket = %name, "dropped bucket");
        Ok(())
    }

    /// Settings of one bucket
    ///
    /// # Errors
    /// `BucketNotFound` if the cluster has no bucket with this name.
    pub async fn get_bucket(&self, name: &str, options: ManagementOptions) -> Result<BucketSettings> {
        validate_bucket_name(name)?;
        self.get_all_buckets(options)
            .await?
            .into_iter()
            .find(|bucket| bucket.name == name)
            .ok_or_else(|| ClientError::BucketNotFound(name.to_string()))
    }

    pub async fn get_all_buckets(&self, options: ManagementOptions) -> Result<Vec<BucketSettings>> {
        let timeout = self.timeout(&options)?;
        let transport = &self.context.transport;
        let response = self
            .context
            .execute(
                OperationKind::Management,
                "buckets",
                timeout,
                transport.list_buckets(self.context.request(proto::ListBucketsRequest {}, timeout)),
            )
            .await?;
        debug!(count = response.buckets.len(), "listed buckets");
        response
            .buckets
            .into_iter()
            .map(BucketSettings::from_wire)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_resolution_values_are_distinct() {
        assert_ne!(
            ConflictResolutionType::Timestamp.to_wire(),
            ConflictResolutionType::SequenceNumber.to_wire()
        );
        for kind in [
            ConflictResolutionType::Timestamp,
            ConflictResolutionType::SequenceNumber,
            ConflictResolutionType::Custom,
        ] {
            assert_eq!(ConflictResolutionType::from_wire(kind.to_wire()).unwrap(), kind);
        }
    }

    #[test]
    fn test_eviction_mapping() {
        assert_eq!(EvictionPolicy::NoEviction.to_wire(), proto::EvictionMode::None as i32);
        assert_eq!(EvictionPolicy::FullEviction.to_wire(), proto::EvictionMode::Full as i32);
        assert!(EvictionPolicy::from_wire(17).is_err());
    }

    #[test]
    fn test_settings_round_trip() {
        let settings = BucketSettings::new("travel-sample")
            .with_ram_quota_mb(256)
            .with_num_replicas(1)
            .with_eviction_policy(EvictionPolicy::ValueOnly)
            .with_max_expiry(Duration::from_secs(3600))
            .with_minimum_durability_level(DurabilityLevel::Majority)
            .with_storage_backend(StorageBackend::Magma)
            .with_conflict_resolution_type(ConflictResolutionType::SequenceNumber);
        settings.validate().unwrap();
        let decoded = BucketSettings::from_wire(settings.to_wire()).unwrap();
        assert_eq!(decoded, settings);
    }

    #[test]
    fn test_none_durability_not_sent() {
        let settings = BucketSettings::new("b").with_minimum_durability_level(DurabilityLevel::None);
        assert_eq!(settings.to_wire().minimum_durability_level, None);
    }

    #[test]
    fn test_validation() {
        assert!(BucketSettings::new("").validate().is_err());
        assert!(BucketSettings::new("bad name").validate().is_err());
        assert!(BucketSettings::new("b").with_ram_quota_mb(50).validate().is_err());
        assert!(BucketSettings::new("b").with_num_replicas(4).validate().is_err());
        assert!(BucketSettings::new("b")
            .with_bucket_type(BucketType::Ephemeral)
            .with_eviction_policy(EvictionPolicy::FullEviction)
            .validate()
            .is_err());
        assert!(BucketSettings::new("b")
            .with_bucket_type(BucketType::Ephemeral)
            .with_eviction_policy(EvictionPolicy::NotRecentlyUsed)
            .validate()
            .is_ok());
        assert!(BucketSettings::new("b")
            .with_bucket_type(BucketType::Memcached)
            .with_num_replicas(1)
            .validate()
            .is_err());
    }
}
