//! Option resolution for document operations
//!
//! Every operation takes a typed options struct (`GetOptions`,
//! `UpsertOptions`, ...). Before a request is built the struct is flattened
//! into an [`OptionsBag`], merged with any keyword overrides, and run
//! through [`resolve`], which consults a fixed table mapping each
//! [`OptionKind`] to the wire fields it produces and the transform that
//! validates and converts the value.
//!
//! Names outside the operation's allow-list are dropped silently so that
//! callers can pass options understood by newer clients.

use crate::durability::{Durability, DurabilityLevel};
use crate::error::{ClientError, Result};
use crate::transcoder::Transcoder;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use stellar_proto as proto;
use tracing::trace;

/// Loosely typed option value as supplied by a caller
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Duration(Duration),
    Str(String),
    StrList(Vec<String>),
    Durability(Durability),
    StoreSemantics(StoreSemantics),
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<u64> for OptionValue {
    fn from(value: u64) -> Self {
        OptionValue::UInt(value)
    }
}

impl From<Duration> for OptionValue {
    fn from(value: Duration) -> Self {
        OptionValue::Duration(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        OptionValue::StrList(value)
    }
}

impl From<Durability> for OptionValue {
    fn from(value: Durability) -> Self {
        OptionValue::Durability(value)
    }
}

impl From<DurabilityLevel> for OptionValue {
    fn from(value: DurabilityLevel) -> Self {
        OptionValue::Durability(Durability::Level(value))
    }
}

impl From<StoreSemantics> for OptionValue {
    fn from(value: StoreSemantics) -> Self {
        OptionValue::StoreSemantics(value)
    }
}

/// Ordered option name → value mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsBag {
    entries: Vec<(String, OptionValue)>,
}

impl OptionsBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, replacing an existing value in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder form of [`OptionsBag::insert`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Request field an option resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WireField {
    TimeoutMicros,
    ExpirySecs,
    PreserveExpiry,
    Cas,
    DurabilityLevel,
    LegacyDurability,
    Project,
    AccessDeleted,
    StoreSemantic,
}

/// Converted, wire-ready field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    U32(u32),
    U64(u64),
    Enum(i32),
    StrList(Vec<String>),
    Legacy {
        num_replicated: u32,
        num_persisted: u32,
    },
}

/// Option names recognized by at least one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    Timeout,
    Expiry,
    PreserveExpiry,
    Cas,
    Durability,
    Project,
    AccessDeleted,
    StoreSemantics,
}

type Transform = fn(&OptionValue) -> Result<Option<FieldValue>>;

const TIMEOUT_FIELDS: &[(WireField, Transform)] = &[(WireField::TimeoutMicros, transform_timeout)];
const EXPIRY_FIELDS: &[(WireField, Transform)] = &[(WireField::ExpirySecs, transform_expiry)];
const PRESERVE_EXPIRY_FIELDS: &[(WireField, Transform)] =
    &[(WireField::PreserveExpiry, transform_bool)];
const CAS_FIELDS: &[(WireField, Transform)] = &[(WireField::Cas, transform_cas)];
const DURABILITY_FIELDS: &[(WireField, Transform)] = &[
    (WireField::DurabilityLevel, transform_durability_level),
    (WireField::LegacyDurability, transform_legacy_durability),
];
const PROJECT_FIELDS: &[(WireField, Transform)] = &[(WireField::Project, transform_project)];
const ACCESS_DELETED_FIELDS: &[(WireField, Transform)] =
    &[(WireField::AccessDeleted, transform_bool)];
const STORE_SEMANTICS_FIELDS: &[(WireField, Transform)] =
    &[(WireField::StoreSemantic, transform_store_semantics)];

impl OptionKind {
    pub const ALL: [OptionKind; 8] = [
        OptionKind::Timeout,
        OptionKind::Expiry,
        OptionKind::PreserveExpiry,
        OptionKind::Cas,
        OptionKind::Durability,
        OptionKind::Project,
        OptionKind::AccessDeleted,
        OptionKind::StoreSemantics,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OptionKind::Timeout => "timeout",
            OptionKind::Expiry => "expiry",
            OptionKind::PreserveExpiry => "preserve_expiry",
            OptionKind::Cas => "cas",
            OptionKind::Durability => "durability",
            OptionKind::Project => "project",
            OptionKind::AccessDeleted => "access_deleted",
            OptionKind::StoreSemantics => "store_semantics",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Destination fields and their transforms, in application order
    fn destinations(self) -> &'static [(WireField, Transform)] {
        match self {
            OptionKind::Timeout => TIMEOUT_FIELDS,
            OptionKind::Expiry => EXPIRY_FIELDS,
            OptionKind::PreserveExpiry => PRESERVE_EXPIRY_FIELDS,
            OptionKind::Cas => CAS_FIELDS,
            OptionKind::Durability => DURABILITY_FIELDS,
            OptionKind::Project => PROJECT_FIELDS,
            OptionKind::AccessDeleted => ACCESS_DELETED_FIELDS,
            OptionKind::StoreSemantics => STORE_SEMANTICS_FIELDS,
        }
    }
}

/// Operations that go through the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Get,
    Exists,
    Insert,
    Upsert,
    Replace,
    Remove,
    LookupIn,
    MutateIn,
    Management,
}

impl OperationKind {
    /// Options this operation understands
    pub fn allowed_options(self) -> &'static [OptionKind] {
        use OptionKind::*;
        match self {
            OperationKind::Get => &[Timeout, Project],
            OperationKind::Exists => &[Timeout],
            OperationKind::Insert => &[Timeout, Expiry, Durability],
            OperationKind::Upsert => &[Timeout, Expiry, PreserveExpiry, Durability],
            OperationKind::Replace => &[Timeout, Expiry, PreserveExpiry, Cas, Durability],
            OperationKind::Remove => &[Timeout, Cas, Durability],
            OperationKind::LookupIn => &[Timeout, AccessDeleted],
            OperationKind::MutateIn => &[
                Timeout,
                Expiry,
                PreserveExpiry,
                Cas,
                Durability,
                AccessDeleted,
                StoreSemantics,
            ],
            OperationKind::Management => &[Timeout],
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Get => "get",
            OperationKind::Exists => "exists",
            OperationKind::Insert => "insert",
            OperationKind::Upsert => "upsert",
            OperationKind::Replace => "replace",
            OperationKind::Remove => "remove",
            OperationKind::LookupIn => "lookup_in",
            OperationKind::MutateIn => "mutate_in",
            OperationKind::Management => "management",
        };
        f.write_str(name)
    }
}

/// Canonical request fields produced by [`resolve`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFields {
    fields: BTreeMap<WireField, FieldValue>,
}

impl ResolvedFields {
    pub fn get(&self, field: WireField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: WireField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WireField, &FieldValue)> {
        self.fields.iter()
    }

    pub fn bool(&self, field: WireField) -> Option<bool> {
        match self.fields.get(&field) {
            Some(FieldValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn u32(&self, field: WireField) -> Option<u32> {
        match self.fields.get(&field) {
            Some(FieldValue::U32(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn u64(&self, field: WireField) -> Option<u64> {
        match self.fields.get(&field) {
            Some(FieldValue::U64(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn enum_value(&self, field: WireField) -> Option<i32> {
        match self.fields.get(&field) {
            Some(FieldValue::Enum(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn str_list(&self, field: WireField) -> Option<&[String]> {
        match self.fields.get(&field) {
            Some(FieldValue::StrList(v)) => Some(v),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.u64(WireField::TimeoutMicros).map(Duration::from_micros)
    }

    pub fn legacy_durability(&self) -> Option<proto::LegacyDurabilitySpec> {
        match self.fields.get(&WireField::LegacyDurability) {
            Some(FieldValue::Legacy {
                num_replicated,
                num_persisted,
            }) => Some(proto::LegacyDurabilitySpec {
                num_replicated: *num_replicated,
                num_persisted: *num_persisted,
            }),
            _ => None,
        }
    }

    /// The mutually exclusive durability spec for a mutation request
    pub fn durability_spec(&self) -> Result<Option<proto::DurabilitySpec>> {
        crate::durability::durability_spec(
            self.enum_value(WireField::DurabilityLevel),
            self.legacy_durability(),
        )
    }
}

/// Merge `options` with `overrides` and resolve the result for `operation`
///
/// Overrides replace same-named options. Each recognized option is run
/// through its transforms; absent results are dropped and later options win
/// when two target the same field.
pub fn resolve(
    operation: OperationKind,
    options: Option<&OptionsBag>,
    overrides: &OptionsBag,
) -> Result<ResolvedFields> {
    let mut merged = options.cloned().unwrap_or_default();
    for (name, value) in overrides.iter() {
        merged.insert(name, value.clone());
    }

    let allowed = operation.allowed_options();
    let mut resolved = ResolvedFields::default();

    for (name, value) in merged.iter() {
        let kind = match OptionKind::from_name(name) {
            Some(kind) if allowed.contains(&kind) => kind,
            _ => {
                trace!(option = name, operation = %operation, "ignoring unrecognized option");
                continue;
            }
        };

        for (field, transform) in kind.destinations() {
            let converted = transform(value).map_err(|e| match e {
                ClientError::InvalidArgument(msg) => {
                    ClientError::InvalidArgument(format!("{}: option '{}': {}", operation, name, msg))
                }
                other => other,
            })?;
            if let Some(converted) = converted {
                resolved.fields.insert(*field, converted);
            }
        }
    }

    trace!(operation = %operation, fields = resolved.len(), "resolved options");
    Ok(resolved)
}

fn invalid(msg: impl Into<String>) -> ClientError {
    ClientError::InvalidArgument(msg.into())
}

fn transform_timeout(value: &OptionValue) -> Result<Option<FieldValue>> {
    match value {
        OptionValue::Duration(d) if d.is_zero() => Err(invalid("timeout must be positive")),
        OptionValue::Duration(d) => u64::try_from(d.as_micros())
            .map(|micros| Some(FieldValue::U64(micros)))
            .map_err(|_| invalid("timeout is too large")),
        other => Err(invalid(format!("expected a duration, got {:?}", other))),
    }
}

fn transform_expiry(value: &OptionValue) -> Result<Option<FieldValue>> {
    let secs = match value {
        OptionValue::Duration(d) => d.as_secs(),
        OptionValue::Int(secs) if *secs >= 0 => *secs as u64,
        OptionValue::UInt(secs) => *secs,
        other => return Err(invalid(format!("expected a duration, got {:?}", other))),
    };
    u32::try_from(secs)
        .map(|secs| Some(FieldValue::U32(secs)))
        .map_err(|_| invalid(format!("expiry of {} seconds is out of range", secs)))
}

fn transform_bool(value: &OptionValue) -> Result<Option<FieldValue>> {
    match value {
        OptionValue::Bool(b) => Ok(Some(FieldValue::Bool(*b))),
        other => Err(invalid(format!("expected a boolean, got {:?}", other))),
    }
}

/// CAS 0 means "no version", so it is never sent as a precondition
fn transform_cas(value: &OptionValue) -> Result<Option<FieldValue>> {
    let cas = match value {
        OptionValue::UInt(cas) => *cas,
        OptionValue::Int(cas) if *cas >= 0 => *cas as u64,
        other => return Err(invalid(format!("expected a CAS value, got {:?}", other))),
    };
    Ok((cas != 0).then_some(FieldValue::U64(cas)))
}

fn transform_durability_level(value: &OptionValue) -> Result<Option<FieldValue>> {
    match value {
        OptionValue::Durability(Durability::Level(level)) => Ok(level.to_wire().map(FieldValue::Enum)),
        OptionValue::Durability(Durability::Legacy { .. }) => Ok(None),
        OptionValue::Str(label) => Ok(DurabilityLevel::from_str(label)?.to_wire().map(FieldValue::Enum)),
        other => Err(invalid(format!("expected a durability, got {:?}", other))),
    }
}

fn transform_legacy_durability(value: &OptionValue) -> Result<Option<FieldValue>> {
    match value {
        OptionValue::Durability(Durability::Legacy {
            replicate_to,
            persist_to,
        }) => {
            let num_replicated = replicate_to.count();
            let num_persisted = persist_to.count();
            if num_replicated == 0 && num_persisted == 0 {
                return Ok(None);
            }
            Ok(Some(FieldValue::Legacy {
                num_replicated,
                num_persisted,
            }))
        }
        // validated by the level transform
        _ => Ok(None),
    }
}

fn transform_project(value: &OptionValue) -> Result<Option<FieldValue>> {
    match value {
        OptionValue::StrList(paths) if paths.is_empty() => Ok(None),
        OptionValue::StrList(paths) => {
            if paths.iter().any(|p| p.is_empty()) {
                return Err(invalid("projection paths must not be empty"));
            }
            Ok(Some(FieldValue::StrList(paths.clone())))
        }
        OptionValue::Str(path) if !path.is_empty() => Ok(Some(FieldValue::StrList(vec![path.clone()]))),
        other => Err(invalid(format!("expected projection paths, got {:?}", other))),
    }
}

fn transform_store_semantics(value: &OptionValue) -> Result<Option<FieldValue>> {
    let semantics = match value {
        OptionValue::StoreSemantics(s) => *s,
        OptionValue::Str(label) => label.parse()?,
        other => return Err(invalid(format!("expected store semantics, got {:?}", other))),
    };
    Ok(Some(FieldValue::Enum(semantics.to_wire())))
}

/// How a mutate-in treats the document as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreSemantics {
    /// Document must exist
    Replace,
    /// Create the document if missing
    Upsert,
    /// Document must not exist
    Insert,
}

impl StoreSemantics {
    pub fn to_wire(self) -> i32 {
        use proto::mutate_in_request::StoreSemantic;
        match self {
            StoreSemantics::Replace => StoreSemantic::Replace as i32,
            StoreSemantics::Upsert => StoreSemantic::Upsert as i32,
            StoreSemantics::Insert => StoreSemantic::Insert as i32,
        }
    }
}

impl FromStr for StoreSemantics {
    type Err = ClientError;

    fn from_str(label: &str) -> Result<Self> {
        match label.to_ascii_lowercase().as_str() {
            "replace" => Ok(StoreSemantics::Replace),
            "upsert" => Ok(StoreSemantics::Upsert),
            "insert" => Ok(StoreSemantics::Insert),
            other => Err(invalid(format!("unknown store semantics '{}'", other))),
        }
    }
}

/// Declares a typed options struct for one operation.
///
/// Fields listed before `;` are flattened into the options bag under their
/// own name, fields after it stay client-side. Every struct also carries an
/// `overrides` bag for untyped keyword options.
macro_rules! operation_options {
    (
        $(#[$meta:meta])*
        $name:ident => $op:expr,
        { $($(#[$fmeta:meta])* $field:ident : $ty:ty),* $(,)? }
        $(; { $($(#[$lmeta:meta])* $local:ident : $lty:ty),* $(,)? })?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        #[non_exhaustive]
        pub struct $name {
            $($(#[$fmeta])* pub $field: Option<$ty>,)*
            $($($(#[$lmeta])* pub $local: Option<$lty>,)*)?
            /// Keyword overrides, applied on top of the typed fields
            pub overrides: OptionsBag,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            $(
                pub fn $field(mut self, value: impl Into<$ty>) -> Self {
                    self.$field = Some(value.into());
                    self
                }
            )*

            $($(
                pub fn $local(mut self, value: $lty) -> Self {
                    self.$local = Some(value);
                    self
                }
            )*)?

            /// Set an untyped option by name; unknown names are ignored at resolve time
            pub fn set(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
                self.overrides.insert(name, value);
                self
            }

            /// Combine with `overrides`, whose set fields take precedence
            pub fn merge(self, overrides: Self) -> Self {
                let mut bag = self.overrides;
                for (name, value) in overrides.overrides.iter() {
                    bag.insert(name, value.clone());
                }
                Self {
                    $($field: overrides.$field.or(self.$field),)*
                    $($($local: overrides.$local.or(self.$local),)*)?
                    overrides: bag,
                }
            }

            /// Typed fields as an options bag, in declaration order
            pub fn to_bag(&self) -> OptionsBag {
                let mut bag = OptionsBag::new();
                $(
                    if let Some(value) = &self.$field {
                        bag.insert(stringify!($field), OptionValue::from(value.clone()));
                    }
                )*
                bag
            }

            pub(crate) fn resolve(&self) -> Result<ResolvedFields> {
                resolve($op, Some(&self.to_bag()), &self.overrides)
            }
        }
    };
}

operation_options!(
    /// Options for `Collection::get`
    GetOptions => OperationKind::Get,
    {
        timeout: Duration,
        /// Only fetch these paths of the document
        project: Vec<String>,
    };
    {
        transcoder: Arc<dyn Transcoder>,
    }
);

operation_options!(
    /// Options for `Collection::exists`
    ExistsOptions => OperationKind::Exists,
    {
        timeout: Duration,
    }
);

operation_options!(
    /// Options for `Collection::insert`
    InsertOptions => OperationKind::Insert,
    {
        timeout: Duration,
        expiry: Duration,
        durability: Durability,
    };
    {
        transcoder: Arc<dyn Transcoder>,
    }
);

operation_options!(
    /// Options for `Collection::upsert`
    UpsertOptions => OperationKind::Upsert,
    {
        timeout: Duration,
        expiry: Duration,
        preserve_expiry: bool,
        durability: Durability,
    };
    {
        transcoder: Arc<dyn Transcoder>,
    }
);

operation_options!(
    /// Options for `Collection::replace`
    ReplaceOptions => OperationKind::Replace,
    {
        timeout: Duration,
        expiry: Duration,
        preserve_expiry: bool,
        cas: u64,
        durability: Durability,
    };
    {
        transcoder: Arc<dyn Transcoder>,
    }
);

operation_options!(
    /// Options for `Collection::remove`
    RemoveOptions => OperationKind::Remove,
    {
        timeout: Duration,
        /// Only remove if the document still has this CAS
        cas: u64,
        durability: Durability,
    }
);

operation_options!(
    /// Options for `Collection::lookup_in`
    LookupInOptions => OperationKind::LookupIn,
    {
        timeout: Duration,
        access_deleted: bool,
    }
);

operation_options!(
    /// Options for `Collection::mutate_in`
    MutateInOptions => OperationKind::MutateIn,
    {
        timeout: Duration,
        expiry: Duration,
        preserve_expiry: bool,
        cas: u64,
        durability: Durability,
        access_deleted: bool,
        store_semantics: StoreSemantics,
    }
);

operation_options!(
    /// Options for bucket management calls
    ManagementOptions => OperationKind::Management,
    {
        timeout: Duration,
    }
);
