//! Query parameters
//!
//! [`QueryOptions`] is the caller-facing builder. [`N1qlQuery`] is the
//! validated parameter set built from it; every setter checks its input and
//! the scan consistency / `consistent_with` exclusion is enforced there.

use crate::error::{ClientError, Result};
use crate::mutation_state::MutationState;
use crate::transcoder::Serializer;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use stellar_proto::{self as proto, query_request};

/// How fresh the index must be when the query scans it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryScanConsistency {
    /// Return whatever the index currently holds
    NotBounded,
    /// Wait for all mutations made before the request
    RequestPlus,
    /// Wait for specific mutations; only reachable through `consistent_with`
    AtPlus,
}

impl FromStr for QueryScanConsistency {
    type Err = ClientError;

    fn from_str(label: &str) -> Result<Self> {
        match label.to_ascii_lowercase().as_str() {
            "not_bounded" => Ok(QueryScanConsistency::NotBounded),
            "request_plus" => Ok(QueryScanConsistency::RequestPlus),
            "at_plus" => Ok(QueryScanConsistency::AtPlus),
            other => Err(ClientError::InvalidArgument(format!(
                "unknown scan consistency '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryProfile {
    #[default]
    Off,
    Phases,
    Timings,
}

impl QueryProfile {
    fn to_wire(self) -> i32 {
        match self {
            QueryProfile::Off => query_request::ProfileMode::Off as i32,
            QueryProfile::Phases => query_request::ProfileMode::Phases as i32,
            QueryProfile::Timings => query_request::ProfileMode::Timings as i32,
        }
    }
}

impl FromStr for QueryProfile {
    type Err = ClientError;

    fn from_str(label: &str) -> Result<Self> {
        match label.to_ascii_lowercase().as_str() {
            "off" => Ok(QueryProfile::Off),
            "phases" => Ok(QueryProfile::Phases),
            "timings" => Ok(QueryProfile::Timings),
            other => Err(ClientError::InvalidArgument(format!(
                "unknown profile mode '{}'",
                other
            ))),
        }
    }
}

macro_rules! option_setters {
    ($($(#[$meta:meta])* $field:ident: $ty:ty),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $field(mut self, value: impl Into<$ty>) -> Self {
                self.$field = Some(value.into());
                self
            }
        )*
    };
}

/// Options for a query, validated when the query is built
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub timeout: Option<Duration>,
    pub read_only: Option<bool>,
    pub scan_consistency: Option<QueryScanConsistency>,
    pub consistent_with: Option<MutationState>,
    pub adhoc: Option<bool>,
    pub client_context_id: Option<String>,
    pub max_parallelism: Option<u32>,
    pub pipeline_batch: Option<u32>,
    pub pipeline_cap: Option<u32>,
    pub profile: Option<QueryProfile>,
    pub query_context: Option<String>,
    pub scan_cap: Option<u32>,
    pub scan_wait: Option<Duration>,
    pub flex_index: Option<bool>,
    pub preserve_expiry: Option<bool>,
    /// `Some(false)` asks the server to skip metrics; unset and `true` are equivalent
    pub metrics: Option<bool>,
    pub raw: Option<BTreeMap<String, Value>>,
    pub positional_parameters: Option<Vec<Value>>,
    pub named_parameters: Option<BTreeMap<String, Value>>,
    pub serializer: Option<Arc<dyn Serializer>>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    option_setters! {
        timeout: Duration,
        read_only: bool,
        scan_consistency: QueryScanConsistency,
        /// Wait for the index to include these mutations
        consistent_with: MutationState,
        adhoc: bool,
        client_context_id: String,
        max_parallelism: u32,
        pipeline_batch: u32,
        pipeline_cap: u32,
        profile: QueryProfile,
        query_context: String,
        scan_cap: u32,
        scan_wait: Duration,
        flex_index: bool,
        preserve_expiry: bool,
        metrics: bool,
        positional_parameters: Vec<Value>,
        named_parameters: BTreeMap<String, Value>,
    }

    /// Serializer for decoding this query's rows
    pub fn serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Add one passthrough option sent verbatim to the query service
    pub fn raw(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.raw.get_or_insert_with(BTreeMap::new).insert(name.into(), value.into());
        self
    }

    /// Add one named parameter (without the `$` prefix)
    pub fn named_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named_parameters
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn positional_parameter(mut self, value: impl Into<Value>) -> Self {
        self.positional_parameters
            .get_or_insert_with(Vec::new)
            .push(value.into());
        self
    }
}

/// A statement plus its validated parameter set
#[derive(Debug, Clone)]
pub struct N1qlQuery {
    statement: String,
    timeout: Option<Duration>,
    read_only: Option<bool>,
    consistency: Option<QueryScanConsistency>,
    consistent_with: Option<MutationState>,
    adhoc: Option<bool>,
    client_context_id: Option<String>,
    max_parallelism: Option<u32>,
    pipeline_batch: Option<u32>,
    pipeline_cap: Option<u32>,
    profile: Option<QueryProfile>,
    query_context: Option<String>,
    scan_cap: Option<u32>,
    scan_wait: Option<Duration>,
    flex_index: Option<bool>,
    preserve_expiry: Option<bool>,
    metrics: Option<bool>,
    raw: BTreeMap<String, Value>,
    positional_parameters: Vec<Value>,
    named_parameters: BTreeMap<String, Value>,
    serializer: Option<Arc<dyn Serializer>>,
}

impl N1qlQuery {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            timeout: None,
            read_only: None,
            consistency: None,
            consistent_with: None,
            adhoc: None,
            client_context_id: None,
            max_parallelism: None,
            pipeline_batch: None,
            pipeline_cap: None,
            profile: None,
            query_context: None,
            scan_cap: None,
            scan_wait: None,
            flex_index: None,
            preserve_expiry: None,
            metrics: None,
            raw: BTreeMap::new(),
            positional_parameters: Vec::new(),
            named_parameters: BTreeMap::new(),
            serializer: None,
        }
    }

    /// Build and validate a query from an options object
    pub fn from_options(statement: impl Into<String>, options: QueryOptions) -> Result<Self> {
        let mut query = Self::new(statement);
        if query.statement.trim().is_empty() {
            return Err(ClientError::InvalidArgument("statement must not be empty".to_string()));
        }

        if let Some(timeout) = options.timeout {
            query.set_timeout(timeout)?;
        }
        if let Some(consistency) = options.scan_consistency {
            query.set_consistency(consistency)?;
        }
        if let Some(state) = options.consistent_with {
            query.set_consistent_with(state)?;
        }
        if let Some(scan_wait) = options.scan_wait {
            query.set_scan_wait(scan_wait)?;
        }
        if let Some(client_context_id) = options.client_context_id {
            query.set_client_context_id(client_context_id)?;
        }

        query.read_only = options.read_only;
        query.adhoc = options.adhoc;
        query.max_parallelism = options.max_parallelism;
        query.pipeline_batch = options.pipeline_batch;
        query.pipeline_cap = options.pipeline_cap;
        query.profile = options.profile;
        query.query_context = options.query_context;
        query.scan_cap = options.scan_cap;
        query.flex_index = options.flex_index;
        query.preserve_expiry = options.preserve_expiry;
        query.metrics = options.metrics;
        query.raw = options.raw.unwrap_or_default();
        query.positional_parameters = options.positional_parameters.unwrap_or_default();
        for (name, value) in options.named_parameters.unwrap_or_default() {
            query.set_named_parameter(name, value);
        }
        query.serializer = options.serializer;
        Ok(query)
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        if timeout.is_zero() {
            return Err(ClientError::InvalidArgument("query timeout must be positive".to_string()));
        }
        self.timeout = Some(timeout);
        Ok(())
    }

    pub fn read_only(&self) -> Option<bool> {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = Some(read_only);
    }

    pub fn consistency(&self) -> Option<QueryScanConsistency> {
        self.consistency
    }

    /// Set scan consistency
    ///
    /// `AtPlus` is rejected; use [`N1qlQuery::set_consistent_with`].
    pub fn set_consistency(&mut self, consistency: QueryScanConsistency) -> Result<()> {
        if consistency == QueryScanConsistency::AtPlus {
            return Err(ClientError::InvalidArgument(
                "at_plus consistency is set through consistent_with".to_string(),
            ));
        }
        self.consistency = Some(consistency);
        self.consistent_with = None;
        Ok(())
    }

    pub fn consistent_with(&self) -> Option<&MutationState> {
        self.consistent_with.as_ref()
    }

    /// Require the scan to include the given mutations
    ///
    /// Fails if a scan consistency was already chosen or `state` is empty.
    pub fn set_consistent_with(&mut self, state: MutationState) -> Result<()> {
        match self.consistency {
            None | Some(QueryScanConsistency::AtPlus) => {}
            Some(other) => {
                return Err(ClientError::InvalidArgument(format!(
                    "consistent_with cannot be combined with {:?} scan consistency",
                    other
                )))
            }
        }
        if state.is_empty() {
            return Err(ClientError::InvalidArgument(
                "consistent_with requires at least one mutation token".to_string(),
            ));
        }
        self.consistency = Some(QueryScanConsistency::AtPlus);
        self.consistent_with = Some(state);
        Ok(())
    }

    pub fn adhoc(&self) -> Option<bool> {
        self.adhoc
    }

    pub fn set_adhoc(&mut self, adhoc: bool) {
        self.adhoc = Some(adhoc);
    }

    pub fn client_context_id(&self) -> Option<&str> {
        self.client_context_id.as_deref()
    }

    pub fn set_client_context_id(&mut self, id: impl Into<String>) -> Result<()> {
        let id = id.into();
        if id.is_empty() {
            return Err(ClientError::InvalidArgument(
                "client_context_id must not be empty".to_string(),
            ));
        }
        self.client_context_id = Some(id);
        Ok(())
    }

    pub fn max_parallelism(&self) -> Option<u32> {
        self.max_parallelism
    }

    pub fn set_max_parallelism(&mut self, value: u32) {
        self.max_parallelism = Some(value);
    }

    pub fn pipeline_batch(&self) -> Option<u32> {
        self.pipeline_batch
    }

    pub fn set_pipeline_batch(&mut self, value: u32) {
        self.pipeline_batch = Some(value);
    }

    pub fn pipeline_cap(&self) -> Option<u32> {
        self.pipeline_cap
    }

    pub fn set_pipeline_cap(&mut self, value: u32) {
        self.pipeline_cap = Some(value);
    }

    pub fn profile(&self) -> Option<QueryProfile> {
        self.profile
    }

    pub fn set_profile(&mut self, profile: QueryProfile) {
        self.profile = Some(profile);
    }

    pub fn query_context(&self) -> Option<&str> {
        self.query_context.as_deref()
    }

    pub fn set_query_context(&mut self, context: impl Into<String>) {
        self.query_context = Some(context.into());
    }

    pub fn scan_cap(&self) -> Option<u32> {
        self.scan_cap
    }

    pub fn set_scan_cap(&mut self, value: u32) {
        self.scan_cap = Some(value);
    }

    pub fn scan_wait(&self) -> Option<Duration> {
        self.scan_wait
    }

    pub fn set_scan_wait(&mut self, wait: Duration) -> Result<()> {
        if u64::try_from(wait.as_micros()).is_err() {
            return Err(ClientError::InvalidArgument("scan_wait is too large".to_string()));
        }
        self.scan_wait = Some(wait);
        Ok(())
    }

    pub fn flex_index(&self) -> Option<bool> {
        self.flex_index
    }

    pub fn set_flex_index(&mut self, value: bool) {
        self.flex_index = Some(value);
    }

    pub fn preserve_expiry(&self) -> Option<bool> {
        self.preserve_expiry
    }

    pub fn set_preserve_expiry(&mut self, value: bool) {
        self.preserve_expiry = Some(value);
    }

    pub fn metrics(&self) -> Option<bool> {
        self.metrics
    }

    pub fn set_metrics(&mut self, value: bool) {
        self.metrics = Some(value);
    }

    pub fn raw(&self) -> &BTreeMap<String, Value> {
        &self.raw
    }

    pub fn set_raw(&mut self, name: impl Into<String>, value: Value) {
        self.raw.insert(name.into(), value);
    }

    pub fn positional_parameters(&self) -> &[Value] {
        &self.positional_parameters
    }

    pub fn set_positional_parameters(&mut self, params: Vec<Value>) {
        self.positional_parameters = params;
    }

    pub fn named_parameters(&self) -> &BTreeMap<String, Value> {
        &self.named_parameters
    }

    /// Add or replace a named parameter; a leading `$` is optional
    pub fn set_named_parameter(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        let name = name.strip_prefix('$').map(str::to_string).unwrap_or(name);
        self.named_parameters.insert(name, value);
    }

    pub fn serializer(&self) -> Option<&Arc<dyn Serializer>> {
        self.serializer.as_ref()
    }

    pub fn set_serializer(&mut self, serializer: Arc<dyn Serializer>) {
        self.serializer = Some(serializer);
    }

    /// Set an option by its keyword name
    ///
    /// Returns `Ok(false)` when `name` is not a query option, so the caller
    /// can treat it as a named parameter instead. Durations are given in
    /// seconds.
    pub fn set_option(&mut self, name: &str, value: &Value) -> Result<bool> {
        match name {
            "timeout" => self.set_timeout(seconds(name, value)?)?,
            "scan_wait" => self.set_scan_wait(seconds(name, value)?)?,
            "read_only" | "readonly" => self.set_read_only(boolean(name, value)?),
            "adhoc" => self.set_adhoc(boolean(name, value)?),
            "flex_index" => self.set_flex_index(boolean(name, value)?),
            "preserve_expiry" => self.set_preserve_expiry(boolean(name, value)?),
            "metrics" => self.set_metrics(boolean(name, value)?),
            "max_parallelism" => self.set_max_parallelism(unsigned(name, value)?),
            "pipeline_batch" => self.set_pipeline_batch(unsigned(name, value)?),
            "pipeline_cap" => self.set_pipeline_cap(unsigned(name, value)?),
            "scan_cap" => self.set_scan_cap(unsigned(name, value)?),
            "client_context_id" => self.set_client_context_id(string(name, value)?)?,
            "query_context" => self.set_query_context(string(name, value)?),
            "scan_consistency" | "consistency" => {
                self.set_consistency(string(name, value)?.parse()?)?
            }
            "profile" => self.set_profile(string(name, value)?.parse()?),
            "consistent_with" => {
                return Err(ClientError::InvalidArgument(
                    "consistent_with takes a MutationState, set it through QueryOptions".to_string(),
                ))
            }
            "raw" => match value {
                Value::Object(map) => {
                    for (k, v) in map {
                        self.set_raw(k.clone(), v.clone());
                    }
                }
                _ => return Err(type_error(name, "an object", value)),
            },
            "positional_parameters" => match value {
                Value::Array(items) => self.set_positional_parameters(items.clone()),
                _ => return Err(type_error(name, "an array", value)),
            },
            "named_parameters" => match value {
                Value::Object(map) => {
                    for (k, v) in map {
                        self.set_named_parameter(k.clone(), v.clone());
                    }
                }
                _ => return Err(type_error(name, "an object", value)),
            },
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Build the wire request
    pub fn to_wire(&self) -> Result<proto::QueryRequest> {
        let raw = self
            .raw
            .iter()
            .map(|(k, v)| Ok((k.clone(), serde_json::to_vec(v)?)))
            .collect::<Result<_>>()?;
        let positional_parameters = self
            .positional_parameters
            .iter()
            .map(|v| Ok(serde_json::to_vec(v)?))
            .collect::<Result<_>>()?;
        let named_parameters = self
            .named_parameters
            .iter()
            .map(|(k, v)| Ok((format!("${}", k), serde_json::to_vec(v)?)))
            .collect::<Result<_>>()?;

        let scan_consistency = match self.consistency {
            Some(QueryScanConsistency::NotBounded) => {
                Some(query_request::ScanConsistency::NotBounded as i32)
            }
            Some(QueryScanConsistency::RequestPlus) => {
                Some(query_request::ScanConsistency::RequestPlus as i32)
            }
            // the mutation tokens carry the consistency requirement
            Some(QueryScanConsistency::AtPlus) | None => None,
        };
        let consistent_with = match (&self.consistency, &self.consistent_with) {
            (Some(QueryScanConsistency::AtPlus), Some(state)) => state.to_wire(),
            _ => Vec::new(),
        };

        let scan_wait_micros = self
            .scan_wait
            .map(|wait| u64::try_from(wait.as_micros()))
            .transpose()
            .map_err(|_| ClientError::InvalidArgument("scan_wait is too large".to_string()))?;
        let tuning = query_request::TuningOptions {
            max_parallelism: self.max_parallelism,
            pipeline_batch: self.pipeline_batch,
            pipeline_cap: self.pipeline_cap,
            scan_wait_micros,
            scan_cap: self.scan_cap,
            disable_metrics: (self.metrics == Some(false)).then_some(true),
        };
        let tuning_options = (tuning != query_request::TuningOptions::default()).then_some(tuning);

        Ok(proto::QueryRequest {
            statement: self.statement.clone(),
            query_context: self.query_context.clone(),
            read_only: self.read_only,
            prepared: self.adhoc.map(|adhoc| !adhoc),
            tuning_options,
            client_context_id: self.client_context_id.clone(),
            scan_consistency,
            positional_parameters,
            named_parameters,
            flex_index: self.flex_index,
            preserve_expiry: self.preserve_expiry,
            consistent_with,
            profile_mode: self.profile.map(QueryProfile::to_wire),
            raw,
        })
    }
}

fn type_error(name: &str, expected: &str, got: &Value) -> ClientError {
    ClientError::InvalidArgument(format!("option '{}' expects {}, got {}", name, expected, got))
}

fn seconds(name: &str, value: &Value) -> Result<Duration> {
    value
        .as_f64()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| type_error(name, "a non-negative number of seconds", value))
}

fn boolean(name: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| type_error(name, "a boolean", value))
}

fn unsigned(name: &str, value: &Value) -> Result<u32> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| type_error(name, "an unsigned integer", value))
}

fn string(name: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| type_error(name, "a string", value))
}

/// One argument of a mixed-style query call
#[derive(Debug, Clone)]
pub enum QueryArg {
    /// Base options object; at most one per call
    Options(QueryOptions),
    /// Positional query parameter
    Positional(Value),
    /// Query option if the name is recognized, named parameter otherwise
    Keyword(String, Value),
}

impl QueryArg {
    pub fn keyword(name: impl Into<String>, value: impl Into<Value>) -> Self {
        QueryArg::Keyword(name.into(), value.into())
    }
}

impl From<QueryOptions> for QueryArg {
    fn from(options: QueryOptions) -> Self {
        QueryArg::Options(options)
    }
}

impl From<Value> for QueryArg {
    fn from(value: Value) -> Self {
        QueryArg::Positional(value)
    }
}

/// Build a query from mixed positional, keyword and options arguments
///
/// Explicit positional arguments replace any `positional_parameters` in the
/// options object. Unrecognized keywords become named parameters and
/// replace same-named entries from the options object. When both `bucket`
/// and `scope` are given and no query context is set, the query runs in
/// that scope's context.
pub fn create_query_object(
    bucket: Option<&str>,
    scope: Option<&str>,
    statement: impl Into<String>,
    args: Vec<QueryArg>,
) -> Result<N1qlQuery> {
    let mut base: Option<QueryOptions> = None;
    let mut positional = Vec::new();
    let mut keywords = Vec::new();

    for arg in args {
        match arg {
            QueryArg::Options(options) => {
                if base.replace(options).is_some() {
                    return Err(ClientError::InvalidArgument(
                        "only one QueryOptions may be passed".to_string(),
                    ));
                }
            }
            QueryArg::Positional(value) => positional.push(value),
            QueryArg::Keyword(name, value) => keywords.push((name, value)),
        }
    }

    let mut options = base.unwrap_or_default();
    if options.query_context.is_none() {
        if let (Some(bucket), Some(scope)) = (bucket, scope) {
            options.query_context = Some(format!("default:`{}`.`{}`", bucket, scope));
        }
    }
    if !positional.is_empty() {
        options.positional_parameters = Some(positional);
    }

    let mut query = N1qlQuery::from_options(statement, options)?;
    for (name, value) in keywords {
        if !query.set_option(&name, &value)? {
            query.set_named_parameter(name, value);
        }
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::MutationToken;
    use proptest::prelude::*;
    use serde_json::json;

    fn state() -> MutationState {
        std::iter::once(MutationToken::new(3, 99, 12, "b")).collect()
    }

    #[test]
    fn test_at_plus_cannot_be_set_directly() {
        let mut query = N1qlQuery::new("select 1");
        assert!(query.set_consistency(QueryScanConsistency::AtPlus).is_err());
        assert!(query.consistency().is_none());

        let options = QueryOptions::new().scan_consistency(QueryScanConsistency::AtPlus);
        assert!(N1qlQuery::from_options("select 1", options).is_err());
    }

    #[test]
    fn test_consistent_with_after_consistency_fails() {
        let mut query = N1qlQuery::new("select 1");
        query.set_consistency(QueryScanConsistency::RequestPlus).unwrap();
        assert!(query.set_consistent_with(state()).is_err());

        let options = QueryOptions::new()
            .scan_consistency(QueryScanConsistency::NotBounded)
            .consistent_with(state());
        assert!(N1qlQuery::from_options("select 1", options).is_err());
    }

    #[test]
    fn test_consistent_with_requires_tokens() {
        let mut query = N1qlQuery::new("select 1");
        assert!(query.set_consistent_with(MutationState::new()).is_err());
        query.set_consistent_with(state()).unwrap();
        assert_eq!(query.consistency(), Some(QueryScanConsistency::AtPlus));

        let wire = query.to_wire().unwrap();
        assert_eq!(wire.scan_consistency, None);
        assert_eq!(wire.consistent_with.len(), 1);
        assert_eq!(wire.consistent_with[0].seq_no, 12);
    }

    #[test]
    fn test_wire_parameters() {
        let options = QueryOptions::new()
            .positional_parameters(vec![json!(1), json!("two")])
            .named_parameter("city", "Paris")
            .raw("use_cbo", true)
            .scan_consistency(QueryScanConsistency::RequestPlus)
            .profile(QueryProfile::Timings)
            .adhoc(false);
        let wire = N1qlQuery::from_options("select $city", options)
            .unwrap()
            .to_wire()
            .unwrap();

        assert_eq!(wire.positional_parameters, vec![b"1".to_vec(), b"\"two\"".to_vec()]);
        assert_eq!(wire.named_parameters.get("$city"), Some(&b"\"Paris\"".to_vec()));
        assert_eq!(wire.raw.get("use_cbo"), Some(&b"true".to_vec()));
        assert_eq!(
            wire.scan_consistency,
            Some(query_request::ScanConsistency::RequestPlus as i32)
        );
        assert_eq!(wire.profile_mode, Some(query_request::ProfileMode::Timings as i32));
        assert_eq!(wire.prepared, Some(true));
        assert!(wire.tuning_options.is_none());
    }

    #[test]
    fn test_tuning_only_when_set() {
        let mut query = N1qlQuery::new("select 1");
        query.set_metrics(true);
        assert!(query.to_wire().unwrap().tuning_options.is_none());

        query.set_metrics(false);
        query.set_max_parallelism(4);
        query.set_scan_wait(Duration::from_millis(50)).unwrap();
        let tuning = query.to_wire().unwrap().tuning_options.unwrap();
        assert_eq!(tuning.disable_metrics, Some(true));
        assert_eq!(tuning.max_parallelism, Some(4));
        assert_eq!(tuning.scan_wait_micros, Some(50_000));
        assert_eq!(tuning.pipeline_cap, None);
    }

    #[test]
    fn test_create_query_object_args() {
        let query = create_query_object(
            Some("b"),
            Some("s"),
            "select 1",
            vec![json!(10).into(), json!(20).into(), QueryArg::keyword("foo", "bar")],
        )
        .unwrap();
        assert_eq!(query.positional_parameters(), &[json!(10), json!(20)]);
        assert_eq!(query.named_parameters().get("foo"), Some(&json!("bar")));
        assert_eq!(query.named_parameters().len(), 1);
        assert_eq!(query.query_context(), Some("default:`b`.`s`"));
    }

    #[test]
    fn test_explicit_positional_args_win() {
        let options = QueryOptions::new().positional_parameters(vec![json!(1), json!(2)]);
        let query = create_query_object(
            None,
            None,
            "select 1",
            vec![options.into(), json!(3).into(), json!(4).into()],
        )
        .unwrap();
        assert_eq!(query.positional_parameters(), &[json!(3), json!(4)]);
    }

    #[test]
    fn test_keyword_named_parameter_overrides() {
        let options = QueryOptions::new()
            .named_parameter("foo", "old")
            .named_parameter("keep", 1);
        let query = create_query_object(
            None,
            None,
            "select 1",
            vec![
                options.into(),
                QueryArg::keyword("foo", "new"),
                QueryArg::keyword("timeout", 2.5),
                QueryArg::keyword("read_only", true),
            ],
        )
        .unwrap();
        assert_eq!(query.named_parameters().get("foo"), Some(&json!("new")));
        assert_eq!(query.named_parameters().get("keep"), Some(&json!(1)));
        assert_eq!(query.timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(query.read_only(), Some(true));
        assert!(!query.named_parameters().contains_key("timeout"));
    }

    #[test]
    fn test_two_options_objects_rejected() {
        let result = create_query_object(
            None,
            None,
            "select 1",
            vec![QueryOptions::new().into(), QueryOptions::new().into()],
        );
        assert!(matches!(result, Err(ClientError::InvalidArgument(_))));
    }

    #[test]
    fn test_keyword_type_errors() {
        let mut query = N1qlQuery::new("select 1");
        assert!(query.set_option("timeout", &json!("soon")).is_err());
        assert!(query.set_option("max_parallelism", &json!(-1)).is_err());
        assert!(query.set_option("scan_consistency", &json!("at_plus")).is_err());
        assert!(query.set_option("consistent_with", &json!([])).is_err());
        assert!(!query.set_option("no_such_option", &json!(1)).unwrap());
    }

    #[test]
    fn test_empty_statement_rejected() {
        assert!(N1qlQuery::from_options("  ", QueryOptions::new()).is_err());
    }

    proptest! {
        #[test]
        fn prop_positional_args_preserved(values in prop::collection::vec(any::<i64>(), 1..8)) {
            let args = values.iter().map(|v| QueryArg::Positional(json!(v))).collect();
            let query = create_query_object(None, None, "select 1", args).unwrap();
            let expected: Vec<Value> = values.iter().map(|v| json!(v)).collect();
            prop_assert_eq!(query.positional_parameters(), &expected[..]);
        }

        #[test]
        fn prop_keyword_overrides_named(name in "[a-z]{1,8}", old in any::<i64>(), new in any::<i64>()) {
            prop_assume!(N1qlQuery::new("x").set_option(&name, &json!(new)).map(|known| !known).unwrap_or(false));
            let options = QueryOptions::new().named_parameter(name.clone(), old);
            let query = create_query_object(
                None,
                None,
                "select 1",
                vec![options.into(), QueryArg::keyword(name.clone(), new)],
            )
            .unwrap();
            prop_assert_eq!(query.named_parameters().get(&name), Some(&json!(new)));
        }
    }
}
