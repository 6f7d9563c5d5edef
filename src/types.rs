// src/types.rs

//! Typed task parameters.
//!
//! Every task kind declares a [`Schema`]: the closed list of parameters it
//! accepts, their [`ParamKind`], and whether they take part in the task's
//! identity. Concrete values travel in [`Params`], which is validated against
//! the schema when the graph is resolved.
//!
//! All values have a single canonical text form (see [`ParamValue::canonical`])
//! so fingerprints never depend on iteration order or float formatting.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Kind of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Str,
    Int,
    Float,
    Bool,
    /// Ordered, positional sequence (e.g. an image shape).
    Tuple,
    /// Unordered collection; serialized sorted and deduplicated.
    Set,
    /// String-keyed mapping; serialized sorted by key.
    Map,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::Str => "str",
            ParamKind::Int => "int",
            ParamKind::Float => "float",
            ParamKind::Bool => "bool",
            ParamKind::Tuple => "tuple",
            ParamKind::Set => "set",
            ParamKind::Map => "map",
        };
        f.write_str(name)
    }
}

/// Whether a parameter contributes to the task fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Significance {
    /// Part of the identity: changing it changes the fingerprint.
    #[default]
    Identity,
    /// Only partitions work (e.g. a shard range); excluded from the
    /// fingerprint but still part of the task's logical key.
    Partition,
}

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Tuple(Vec<ParamValue>),
    Set(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

/// Problems found while validating parameters against a schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("missing required parameter '{0}'")]
    Missing(String),

    #[error("parameter '{0}' is not declared in the task schema")]
    Undeclared(String),

    #[error("parameter '{name}' expects {expected}, got {found}")]
    KindMismatch {
        name: String,
        expected: ParamKind,
        found: ParamKind,
    },

    #[error("parameter '{0}' holds a non-finite float and cannot be serialized")]
    NonFinite(String),

    #[error("parameter '{0}' is declared more than once")]
    Duplicate(String),
}

impl ParamValue {
    /// Build a positional tuple.
    pub fn tuple<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        ParamValue::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Build an unordered set.
    pub fn set<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        ParamValue::Set(items.into_iter().map(Into::into).collect())
    }

    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Str(_) => ParamKind::Str,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Tuple(_) => ParamKind::Tuple,
            ParamValue::Set(_) => ParamKind::Set,
            ParamValue::Map(_) => ParamKind::Map,
        }
    }

    /// Canonical text form used for identity and hashing.
    ///
    /// Returns `None` if the value (or any nested value) is a non-finite
    /// float, which has no stable representation.
    pub fn canonical(&self) -> Option<String> {
        match self {
            ParamValue::Str(s) => Some(format!("{s:?}")),
            ParamValue::Int(i) => Some(i.to_string()),
            ParamValue::Float(f) if f.is_finite() => Some(format!("{f:?}")),
            ParamValue::Float(_) => None,
            ParamValue::Bool(b) => Some(b.to_string()),
            ParamValue::Tuple(items) => {
                let parts = items
                    .iter()
                    .map(ParamValue::canonical)
                    .collect::<Option<Vec<_>>>()?;
                Some(format!("({})", parts.join(", ")))
            }
            ParamValue::Set(items) => {
                let mut parts = items
                    .iter()
                    .map(ParamValue::canonical)
                    .collect::<Option<Vec<_>>>()?;
                parts.sort();
                parts.dedup();
                Some(format!("{{{}}}", parts.join(", ")))
            }
            ParamValue::Map(map) => {
                let parts = map
                    .iter()
                    .map(|(k, v)| v.canonical().map(|v| format!("{k:?}: {v}")))
                    .collect::<Option<Vec<_>>>()?;
                Some(format!("{{{}}}", parts.join(", ")))
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<BTreeMap<String, ParamValue>> for ParamValue {
    fn from(v: BTreeMap<String, ParamValue>) -> Self {
        ParamValue::Map(v)
    }
}

/// Parameter values of one task instance, keyed (and therefore ordered) by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Declaration of one parameter in a task kind's schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    pub kind: ParamKind,
    pub significance: Significance,
}

/// The closed set of parameters a task kind accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    decls: Vec<ParamDecl>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an identity-relevant parameter.
    pub fn param(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.decls.push(ParamDecl {
            name: name.into(),
            kind,
            significance: Significance::Identity,
        });
        self
    }

    /// Declare a partition parameter: it distinguishes task instances but
    /// is left out of the fingerprint.
    pub fn partition(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.decls.push(ParamDecl {
            name: name.into(),
            kind,
            significance: Significance::Partition,
        });
        self
    }

    pub fn decls(&self) -> &[ParamDecl] {
        &self.decls
    }

    pub fn decl(&self, name: &str) -> Option<&ParamDecl> {
        self.decls.iter().find(|d| d.name == name)
    }

    /// Whether `name` is declared and contributes to the fingerprint.
    pub fn is_significant(&self, name: &str) -> bool {
        self.decl(name)
            .is_some_and(|d| d.significance == Significance::Identity)
    }

    /// Check `params` against this schema.
    ///
    /// Every declared parameter must be present with the declared kind,
    /// nothing undeclared may appear, and every value must have a canonical
    /// form.
    pub fn validate(&self, params: &Params) -> Result<(), ParamError> {
        for (i, decl) in self.decls.iter().enumerate() {
            if self.decls[..i].iter().any(|d| d.name == decl.name) {
                return Err(ParamError::Duplicate(decl.name.clone()));
            }

            let value = params
                .get(&decl.name)
                .ok_or_else(|| ParamError::Missing(decl.name.clone()))?;

            if value.kind() != decl.kind {
                return Err(ParamError::KindMismatch {
                    name: decl.name.clone(),
                    expected: decl.kind,
                    found: value.kind(),
                });
            }
        }

        for (name, value) in params.iter() {
            if self.decl(name).is_none() {
                return Err(ParamError::Undeclared(name.to_string()));
            }
            if value.canonical().is_none() {
                return Err(ParamError::NonFinite(name.to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_scalars() {
        assert_eq!(ParamValue::from("a\"b").canonical().unwrap(), r#""a\"b""#);
        assert_eq!(ParamValue::from(42).canonical().unwrap(), "42");
        assert_eq!(ParamValue::from(0.1).canonical().unwrap(), "0.1");
        assert_eq!(ParamValue::from(1.0).canonical().unwrap(), "1.0");
        assert_eq!(ParamValue::from(true).canonical().unwrap(), "true");
    }

    #[test]
    fn tuples_keep_position_sets_do_not() {
        let t1 = ParamValue::tuple([64, 32]);
        let t2 = ParamValue::tuple([32, 64]);
        assert_ne!(t1.canonical(), t2.canonical());
        assert_eq!(t1.canonical().unwrap(), "(64, 32)");

        let s1 = ParamValue::set(["b", "a", "b"]);
        let s2 = ParamValue::set(["a", "b"]);
        assert_eq!(s1.canonical(), s2.canonical());
        assert_eq!(s2.canonical().unwrap(), r#"{"a", "b"}"#);
    }

    #[test]
    fn maps_serialize_sorted_by_key() {
        let mut m1 = BTreeMap::new();
        m1.insert("z".to_string(), ParamValue::from(1));
        m1.insert("a".to_string(), ParamValue::from(2));
        assert_eq!(ParamValue::Map(m1).canonical().unwrap(), r#"{"a": 2, "z": 1}"#);
    }

    #[test]
    fn non_finite_floats_have_no_canonical_form() {
        assert!(ParamValue::from(f64::NAN).canonical().is_none());
        assert!(ParamValue::tuple([ParamValue::Float(f64::INFINITY)]).canonical().is_none());
    }

    #[test]
    fn validate_reports_missing_undeclared_and_mismatched() {
        let schema = Schema::new()
            .param("lr", ParamKind::Float)
            .partition("lower", ParamKind::Int);

        let missing = Params::new().with("lr", 0.01);
        assert_eq!(
            schema.validate(&missing),
            Err(ParamError::Missing("lower".into()))
        );

        let extra = Params::new().with("lr", 0.01).with("lower", 0).with("x", 1);
        assert_eq!(
            schema.validate(&extra),
            Err(ParamError::Undeclared("x".into()))
        );

        let wrong = Params::new().with("lr", "fast").with("lower", 0);
        assert!(matches!(
            schema.validate(&wrong),
            Err(ParamError::KindMismatch { .. })
        ));

        let nan = Params::new().with("lr", f64::NAN).with("lower", 0);
        assert_eq!(schema.validate(&nan), Err(ParamError::NonFinite("lr".into())));

        let ok = Params::new().with("lr", 0.01).with("lower", 0);
        assert!(schema.validate(&ok).is_ok());
        assert!(schema.is_significant("lr"));
        assert!(!schema.is_significant("lower"));
    }
}
