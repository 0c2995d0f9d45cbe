//! Request identifier generation.

use uuid::Uuid;

/// Length of generated request identifiers.
pub const GENERATED_LEN: usize = 8;

/// Generates a short request identifier: the first 8 hex characters of a
/// random UUID.
///
/// Best-effort randomness only. Collisions are accepted as statistically
/// negligible for diagnostic purposes; consumers treat the value as opaque.
#[must_use]
pub fn generate() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(GENERATED_LEN);
    id
}
