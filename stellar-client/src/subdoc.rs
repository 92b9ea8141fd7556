//! Subdocument operation specs
//!
//! Specs are sent in the order given and the server answers positionally:
//! response spec `i` always belongs to request spec `i`.

use crate::error::{ClientError, Result};
use crate::result::{LookupInField, LookupInResult, MutateInResult};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use stellar_proto::{self as proto, lookup_in_request, mutate_in_request};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupInOp {
    Get,
    Exists,
    Count,
}

impl LookupInOp {
    fn to_wire(self) -> i32 {
        use lookup_in_request::spec::Operation;
        match self {
            LookupInOp::Get => Operation::Get as i32,
            LookupInOp::Exists => Operation::Exists as i32,
            LookupInOp::Count => Operation::Count as i32,
        }
    }
}

impl FromStr for LookupInOp {
    type Err = ClientError;

    fn from_str(kind: &str) -> Result<Self> {
        match kind {
            "get" => Ok(LookupInOp::Get),
            "exists" => Ok(LookupInOp::Exists),
            "count" | "get_count" => Ok(LookupInOp::Count),
            other => Err(ClientError::InvalidArgument(format!(
                "unknown lookup_in operation '{}'",
                other
            ))),
        }
    }
}

/// A single lookup-in operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupInSpec {
    op: LookupInOp,
    path: String,
    xattr: bool,
}

impl LookupInSpec {
    /// Build a spec from an operation name such as `"get"` or `"count"`
    pub fn new(kind: &str, path: impl Into<String>) -> Result<Self> {
        Ok(Self::with_op(kind.parse()?, path))
    }

    fn with_op(op: LookupInOp, path: impl Into<String>) -> Self {
        Self {
            op,
            path: path.into(),
            xattr: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::with_op(LookupInOp::Get, path)
    }

    pub fn exists(path: impl Into<String>) -> Self {
        Self::with_op(LookupInOp::Exists, path)
    }

    /// Number of elements in the array or object at `path`
    pub fn count(path: impl Into<String>) -> Self {
        Self::with_op(LookupInOp::Count, path)
    }

    /// Address an extended attribute instead of the document body
    pub fn xattr(mut self) -> Self {
        self.xattr = true;
        self
    }

    pub fn op(&self) -> LookupInOp {
        self.op
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn to_wire(&self) -> lookup_in_request::Spec {
        lookup_in_request::Spec {
            operation: self.op.to_wire(),
            path: self.path.clone(),
            flags: self.xattr.then_some(lookup_in_request::spec::Flags { xattr: Some(true) }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutateInOp {
    Insert,
    Upsert,
    Replace,
    Remove,
    ArrayAppend,
    ArrayPrepend,
    ArrayInsert,
    ArrayAddUnique,
    Counter,
}

impl MutateInOp {
    /// Every operation except remove sends a value
    pub fn carries_value(self) -> bool {
        !matches!(self, MutateInOp::Remove)
    }

    fn is_array(self) -> bool {
        matches!(
            self,
            MutateInOp::ArrayAppend | MutateInOp::ArrayPrepend | MutateInOp::ArrayInsert
        )
    }

    fn to_wire(self) -> i32 {
        use mutate_in_request::spec::Operation;
        let op = match self {
            MutateInOp::Insert => Operation::Insert,
            MutateInOp::Upsert => Operation::Upsert,
            MutateInOp::Replace => Operation::Replace,
            MutateInOp::Remove => Operation::Remove,
            MutateInOp::ArrayAppend => Operation::ArrayAppend,
            MutateInOp::ArrayPrepend => Operation::ArrayPrepend,
            MutateInOp::ArrayInsert => Operation::ArrayInsert,
            MutateInOp::ArrayAddUnique => Operation::ArrayAddUnique,
            MutateInOp::Counter => Operation::Counter,
        };
        op as i32
    }
}

impl fmt::Display for MutateInOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutateInOp::Insert => "insert",
            MutateInOp::Upsert => "upsert",
            MutateInOp::Replace => "replace",
            MutateInOp::Remove => "remove",
            MutateInOp::ArrayAppend => "array_append",
            MutateInOp::ArrayPrepend => "array_prepend",
            MutateInOp::ArrayInsert => "array_insert",
            MutateInOp::ArrayAddUnique => "array_add_unique",
            MutateInOp::Counter => "counter",
        };
        f.write_str(name)
    }
}

impl FromStr for MutateInOp {
    type Err = ClientError;

    fn from_str(kind: &str) -> Result<Self> {
        match kind {
            "insert" => Ok(MutateInOp::Insert),
            "upsert" => Ok(MutateInOp::Upsert),
            "replace" => Ok(MutateInOp::Replace),
            "remove" => Ok(MutateInOp::Remove),
            "array_append" => Ok(MutateInOp::ArrayAppend),
            "array_prepend" => Ok(MutateInOp::ArrayPrepend),
            "array_insert" => Ok(MutateInOp::ArrayInsert),
            "array_add_unique" => Ok(MutateInOp::ArrayAddUnique),
            "counter" => Ok(MutateInOp::Counter),
            other => Err(ClientError::InvalidArgument(format!(
                "unknown mutate_in operation '{}'",
                other
            ))),
        }
    }
}

/// A single mutate-in operation
#[derive(Debug, Clone, PartialEq)]
pub struct MutateInSpec {
    op: MutateInOp,
    path: String,
    values: Vec<Value>,
    create_path: bool,
    xattr: bool,
}

impl MutateInSpec {
    /// Build a spec from an operation name such as `"upsert"`
    ///
    /// Fails if the operation is unknown or if `value` is missing for an
    /// operation that needs one.
    pub fn new(kind: &str, path: impl Into<String>, value: Option<Value>) -> Result<Self> {
        let op: MutateInOp = kind.parse()?;
        let values = match (op.carries_value(), value) {
            (true, Some(Value::Array(items))) if op.is_array() => items,
            (true, Some(value)) => vec![value],
            (true, None) => {
                return Err(ClientError::InvalidArgument(format!(
                    "{} requires a value",
                    op
                )))
            }
            (false, _) => Vec::new(),
        };
        Ok(Self::with_values(op, path, values))
    }

    fn with_values(op: MutateInOp, path: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            op,
            path: path.into(),
            values,
            create_path: false,
            xattr: false,
        }
    }

    pub fn insert(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_values(MutateInOp::Insert, path, vec![value.into()])
    }

    pub fn upsert(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_values(MutateInOp::Upsert, path, vec![value.into()])
    }

    pub fn replace(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_values(MutateInOp::Replace, path, vec![value.into()])
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self::with_values(MutateInOp::Remove, path, Vec::new())
    }

    /// Append one or more values to the array at `path`
    pub fn array_append(path: impl Into<String>, values: Vec<Value>) -> Self {
        Self::with_values(MutateInOp::ArrayAppend, path, values)
    }

    pub fn array_prepend(path: impl Into<String>, values: Vec<Value>) -> Self {
        Self::with_values(MutateInOp::ArrayPrepend, path, values)
    }

    /// Insert values at the array position named by `path`, e.g. `tags[2]`
    pub fn array_insert(path: impl Into<String>, values: Vec<Value>) -> Self {
        Self::with_values(MutateInOp::ArrayInsert, path, values)
    }

    pub fn array_add_unique(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_values(MutateInOp::ArrayAddUnique, path, vec![value.into()])
    }

    pub fn increment(path: impl Into<String>, delta: u64) -> Self {
        Self::with_values(MutateInOp::Counter, path, vec![Value::from(delta)])
    }

    pub fn decrement(path: impl Into<String>, delta: u64) -> Self {
        let delta = i64::try_from(delta).map(|d| Value::from(-d)).unwrap_or(Value::Null);
        Self::with_values(MutateInOp::Counter, path, vec![delta])
    }

    /// Create missing parent objects along `path`
    pub fn create_path(mut self) -> Self {
        self.create_path = true;
        self
    }

    pub fn xattr(mut self) -> Self {
        self.xattr = true;
        self
    }

    pub fn op(&self) -> MutateInOp {
        self.op
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn content(&self) -> Result<Vec<u8>> {
        if !self.op.carries_value() {
            return Ok(Vec::new());
        }
        if self.values.is_empty() {
            return Err(ClientError::InvalidArgument(format!(
                "{} on '{}' requires a value",
                self.op, self.path
            )));
        }
        if self.op == MutateInOp::Counter {
            match self.values[0].as_i64() {
                Some(delta) if delta != 0 => {}
                _ => {
                    return Err(ClientError::InvalidArgument(format!(
                        "counter delta on '{}' must be a non-zero integer",
                        self.path
                    )))
                }
            }
        }

        // Multi-value array ops are sent as comma separated JSON
        let mut content = Vec::new();
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                content.push(b',');
            }
            serde_json::to_writer(&mut content, value)?;
        }
        Ok(content)
    }

    fn to_wire(&self) -> Result<mutate_in_request::Spec> {
        let flags = (self.create_path || self.xattr).then(|| mutate_in_request::spec::Flags {
            create_path: self.create_path.then_some(true),
            xattr: self.xattr.then_some(true),
        });
        Ok(mutate_in_request::Spec {
            operation: self.op.to_wire(),
            path: self.path.clone(),
            content: self.content()?,
            flags,
        })
    }
}

pub(crate) fn lookup_in_specs_to_wire(specs: &[LookupInSpec]) -> Result<Vec<lookup_in_request::Spec>> {
    if specs.is_empty() {
        return Err(ClientError::InvalidArgument(
            "lookup_in requires at least one spec".to_string(),
        ));
    }
    Ok(specs.iter().map(LookupInSpec::to_wire).collect())
}

pub(crate) fn mutate_in_specs_to_wire(specs: &[MutateInSpec]) -> Result<Vec<mutate_in_request::Spec>> {
    if specs.is_empty() {
        return Err(ClientError::InvalidArgument(
            "mutate_in requires at least one spec".to_string(),
        ));
    }
    specs.iter().map(MutateInSpec::to_wire).collect()
}

fn spec_count_mismatch(expected: usize, got: usize) -> ClientError {
    ClientError::InternalError(format!(
        "server returned {} spec results for {} specs",
        got, expected
    ))
}

/// Decode a lookup-in response against the specs that produced it
pub(crate) fn decode_lookup_in(
    specs: &[LookupInSpec],
    response: proto::LookupInResponse,
) -> Result<LookupInResult> {
    if response.specs.len() != specs.len() {
        return Err(spec_count_mismatch(specs.len(), response.specs.len()));
    }

    let mut fields = Vec::with_capacity(specs.len());
    for (spec, result) in specs.iter().zip(response.specs) {
        let value = if result.content.is_empty() {
            None
        } else {
            Some(serde_json::from_slice(&result.content)?)
        };
        fields.push(LookupInField {
            path: spec.path.clone(),
            status: result.status,
            value,
        });
    }
    Ok(LookupInResult::new(response.cas, fields))
}

/// Decode a mutate-in response; void operations leave their slot empty
pub(crate) fn decode_mutate_in(
    specs: &[MutateInSpec],
    response: proto::MutateInResponse,
) -> Result<MutateInResult> {
    if response.specs.len() != specs.len() {
        return Err(spec_count_mismatch(specs.len(), response.specs.len()));
    }

    let contents = response
        .specs
        .into_iter()
        .map(|spec| {
            spec.content
                .map(|content| serde_json::from_slice(&content))
                .transpose()
        })
        .collect::<std::result::Result<Vec<Option<Value>>, _>>()?;
    MutateInResult::new(response.cas, response.mutation_token, contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_order_preserved() {
        let specs = vec![
            LookupInSpec::exists("a"),
            LookupInSpec::get("b").xattr(),
            LookupInSpec::count("c"),
        ];
        let wire = lookup_in_specs_to_wire(&specs).unwrap();
        let paths: Vec<_> = wire.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "b", "c"]);
        assert_eq!(wire[0].operation, lookup_in_request::spec::Operation::Exists as i32);
        assert!(wire[0].flags.is_none());
        assert_eq!(wire[1].flags.as_ref().and_then(|f| f.xattr), Some(true));
        assert_eq!(wire[2].operation, lookup_in_request::spec::Operation::Count as i32);
    }

    #[test]
    fn test_unknown_kinds() {
        assert!(matches!(
            LookupInSpec::new("fetch", "a"),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(matches!(
            MutateInSpec::new("merge", "a", Some(json!(1))),
            Err(ClientError::InvalidArgument(_))
        ));
        assert_eq!(LookupInSpec::new("get_count", "x").unwrap().op(), LookupInOp::Count);
    }

    #[test]
    fn test_value_required() {
        assert!(MutateInSpec::new("upsert", "a", None).is_err());
        let remove = MutateInSpec::new("remove", "a", Some(json!(1))).unwrap();
        let wire = mutate_in_specs_to_wire(&[remove]).unwrap();
        assert!(wire[0].content.is_empty());
    }

    #[test]
    fn test_mutate_content_and_flags() {
        let specs = vec![
            MutateInSpec::upsert("name", "Alice").create_path(),
            MutateInSpec::array_append("tags", vec![json!("x"), json!({"y": 1})]),
            MutateInSpec::remove("old").xattr(),
            MutateInSpec::increment("visits", 2),
        ];
        let wire = mutate_in_specs_to_wire(&specs).unwrap();
        assert_eq!(wire[0].content, b"\"Alice\"".to_vec());
        let flags = wire[0].flags.as_ref().unwrap();
        assert_eq!(flags.create_path, Some(true));
        assert_eq!(flags.xattr, None);
        assert_eq!(wire[1].content, br#""x",{"y":1}"#.to_vec());
        assert_eq!(wire[2].operation, mutate_in_request::spec::Operation::Remove as i32);
        assert_eq!(wire[3].content, b"2".to_vec());
    }

    #[test]
    fn test_generic_array_value_is_spread() {
        let spec = MutateInSpec::new("array_prepend", "list", Some(json!([1, 2]))).unwrap();
        let wire = mutate_in_specs_to_wire(&[spec]).unwrap();
        assert_eq!(wire[0].content, b"1,2".to_vec());

        // array_add_unique takes exactly one value, even if it is an array
        let spec = MutateInSpec::new("array_add_unique", "list", Some(json!([1, 2]))).unwrap();
        let wire = mutate_in_specs_to_wire(&[spec]).unwrap();
        assert_eq!(wire[0].content, b"[1,2]".to_vec());
    }

    #[test]
    fn test_counter_validation() {
        assert!(mutate_in_specs_to_wire(&[MutateInSpec::increment("n", 0)]).is_err());
        assert!(MutateInSpec::new("counter", "n", Some(json!("five")))
            .and_then(|s| mutate_in_specs_to_wire(&[s]))
            .is_err());
        let wire = mutate_in_specs_to_wire(&[MutateInSpec::decrement("n", 3)]).unwrap();
        assert_eq!(wire[0].content, b"-3".to_vec());
    }

    #[test]
    fn test_empty_specs_rejected() {
        assert!(lookup_in_specs_to_wire(&[]).is_err());
        assert!(mutate_in_specs_to_wire(&[]).is_err());
    }

    #[test]
    fn test_decode_lookup_positional() {
        let specs = vec![LookupInSpec::exists("a"), LookupInSpec::get("b")];
        let response = proto::LookupInResponse {
            specs: vec![
                proto::lookup_in_response::Spec {
                    status: None,
                    content: b"true".to_vec(),
                },
                proto::lookup_in_response::Spec {
                    status: None,
                    content: br#"{"nested":[1,2]}"#.to_vec(),
                },
            ],
            cas: 77,
        };
        let result = decode_lookup_in(&specs, response).unwrap();
        assert_eq!(result.path(0), Some("a"));
        assert!(result.exists(0).unwrap());
        assert_eq!(result.content_as::<Value>(1).unwrap(), json!({"nested": [1, 2]}));
        assert_eq!(result.cas(), 77);
    }

    #[test]
    fn test_decode_count_mismatch() {
        let specs = vec![LookupInSpec::get("a"), LookupInSpec::get("b")];
        let response = proto::LookupInResponse {
            specs: vec![proto::lookup_in_response::Spec::default()],
            cas: 1,
        };
        assert!(matches!(
            decode_lookup_in(&specs, response),
            Err(ClientError::InternalError(_))
        ));
    }

    #[test]
    fn test_decode_mutate_void_slots() {
        let specs = vec![MutateInSpec::upsert("a", 1), MutateInSpec::increment("n", 1)];
        let response = proto::MutateInResponse {
            specs: vec![
                proto::mutate_in_response::Spec { content: None },
                proto::mutate_in_response::Spec {
                    content: Some(b"5".to_vec()),
                },
            ],
            cas: 9,
            mutation_token: None,
        };
        let result = decode_mutate_in(&specs, response).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.content_as::<i64>(1).unwrap(), 5);
        assert!(result.content_as::<i64>(0).is_err());
    }
}
