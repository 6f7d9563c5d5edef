// src/dag/identity.rs

//! Content-addressed task identity ("salting").
//!
//! A task's fingerprint is a pure function of:
//! - the fingerprints of its direct dependencies, sorted,
//! - its type tag and declared version,
//! - its identity-relevant parameters, sorted by name.
//!
//! Because dependency fingerprints already fold in *their* dependencies,
//! the result covers the whole upstream closure: bumping a leaf's version
//! changes every ancestor's fingerprint.

use std::fmt;
use std::sync::Arc;

use crate::dag::resolve::resolve;
use crate::errors::{Result, SaltdagError};
use crate::task::Task;
use crate::types::{ParamError, Params, Schema};

/// Number of hex characters kept from the digest.
///
/// Ten characters keep file names readable; uniqueness only has to hold
/// within one pipeline, not cryptographically.
pub const FINGERPRINT_LEN: usize = 10;

const FIELD_END: u8 = 0;

/// Truncated hex digest identifying a task and everything upstream of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute a fingerprint from a task's identity tuple.
///
/// `deps` may be given in any order.
pub fn compute_salt(
    kind: &str,
    version: &str,
    schema: &Schema,
    params: &Params,
    deps: &[Fingerprint],
) -> std::result::Result<Fingerprint, ParamError> {
    schema.validate(params)?;

    let mut sorted: Vec<&Fingerprint> = deps.iter().collect();
    sorted.sort();

    // Every field is NUL-terminated so adjacent fields cannot run together.
    let mut hasher = blake3::Hasher::new();
    let mut field = |text: &str| {
        hasher.update(text.as_bytes());
        hasher.update(&[FIELD_END]);
    };

    for dep in sorted {
        field(dep.as_str());
    }
    field(kind);
    field(version);

    // `Params` iterates in name order.
    for (name, value) in params.iter() {
        if !schema.is_significant(name) {
            continue;
        }
        let text = value
            .canonical()
            .ok_or_else(|| ParamError::NonFinite(name.to_string()))?;
        field(&format!("{name}={text}"));
    }

    let digest = hasher.finalize().to_hex();
    Ok(Fingerprint(digest.as_str()[..FINGERPRINT_LEN].to_string()))
}

/// Fingerprint a single task, resolving its upstream graph first.
///
/// Fails with a configuration error if the upstream graph has a cycle or a
/// task's parameters do not match its schema.
pub fn fingerprint(task: &Arc<dyn Task>) -> Result<Fingerprint> {
    let graph = resolve(std::slice::from_ref(task))?;
    let root = graph
        .roots()
        .first()
        .copied()
        .ok_or_else(|| SaltdagError::ConfigError("resolved graph has no root".to_string()))?;
    Ok(graph.node(root).salt.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamKind;

    fn download_schema() -> Schema {
        Schema::new()
            .param("source", ParamKind::Str)
            .partition("lower", ParamKind::Int)
            .partition("upper", ParamKind::Int)
    }

    fn download_params(lower: i64, upper: i64) -> Params {
        Params::new()
            .with("source", "urls.txt")
            .with("lower", lower)
            .with("upper", upper)
    }

    #[test]
    fn salt_has_fixed_length_hex() {
        let salt = compute_salt("Download", "1.0", &download_schema(), &download_params(0, 10), &[])
            .unwrap();
        assert_eq!(salt.as_str().len(), FINGERPRINT_LEN);
        assert!(salt.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn partition_params_do_not_change_salt() {
        let schema = download_schema();
        let a = compute_salt("Download", "1.0", &schema, &download_params(0, 10), &[]).unwrap();
        let b = compute_salt("Download", "1.0", &schema, &download_params(10, 20), &[]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn version_and_kind_change_salt() {
        let schema = download_schema();
        let params = download_params(0, 10);
        let base = compute_salt("Download", "1.0", &schema, &params, &[]).unwrap();
        let bumped = compute_salt("Download", "1.1", &schema, &params, &[]).unwrap();
        let renamed = compute_salt("Fetch", "1.0", &schema, &params, &[]).unwrap();
        assert_ne!(base, bumped);
        assert_ne!(base, renamed);
    }

    #[test]
    fn dependency_order_is_irrelevant() {
        let schema = Schema::new();
        let params = Params::new();
        let x = Fingerprint("aaaaaaaaaa".into());
        let y = Fingerprint("bbbbbbbbbb".into());
        let a = compute_salt("Train", "0.1", &schema, &params, &[x.clone(), y.clone()]).unwrap();
        let b = compute_salt("Train", "0.1", &schema, &params, &[y, x]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn field_boundaries_are_part_of_the_salt() {
        let schema = Schema::new();
        let params = Params::new();
        let a = compute_salt("Train", "0.1", &schema, &params, &[]).unwrap();
        let b = compute_salt("Train0", ".1", &schema, &params, &[]).unwrap();
        assert_ne!(a, b);

        let x = Fingerprint("aaaaaaaaaa".into());
        let c = compute_salt("Train", "0.1", &schema, &params, &[x]).unwrap();
        let d = compute_salt("aaaaaaaaaaTrain", "0.1", &schema, &params, &[]).unwrap();
        assert_ne!(c, d);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let schema = Schema::new().param("lr", ParamKind::Float);
        let err = compute_salt("Train", "0.1", &schema, &Params::new(), &[]).unwrap_err();
        assert_eq!(err, ParamError::Missing("lr".into()));
    }
}
