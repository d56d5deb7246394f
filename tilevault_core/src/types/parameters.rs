//! Stable digests for request-parameter maps.
//!
//! A tile rendered with extra request parameters (styles, filters, time
//! dimensions) is stored under a digest of those parameters so that every
//! backend addresses the same variant by the same identifier, regardless of
//! parameter ordering.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// The well-known identifier for a tile stored without request parameters.
pub const EMPTY_PARAMETERS_ID: &str = "default";

/// Computes the stable identifier of a parameter map.
///
/// Pairs are digested in key order, so logically equal maps always produce
/// the same id. An empty map yields [`EMPTY_PARAMETERS_ID`].
///
/// ```
/// use std::collections::BTreeMap;
/// use tilevault_core::parameters_id;
///
/// let mut a = BTreeMap::new();
/// a.insert("style".to_string(), "night".to_string());
/// a.insert("elevation".to_string(), "200".to_string());
/// let mut b = a.clone();
/// assert_eq!(parameters_id(&a), parameters_id(&b));
/// ```
pub fn parameters_id(parameters: &BTreeMap<String, String>) -> String {
	if parameters.is_empty() {
		return EMPTY_PARAMETERS_ID.to_string();
	}
	let mut hasher = Sha256::new();
	for (key, value) in parameters {
		hasher.update(key.as_bytes());
		hasher.update([0u8]);
		hasher.update(value.as_bytes());
		hasher.update([0u8]);
	}
	let digest = hasher.finalize();
	// 16 hex bytes are plenty to keep ids collision-free and paths short
	let hex: String = digest.iter().take(16).map(|b| format!("{b:02x}")).collect();
	format!("p-{hex}")
}
