//! Identity stripping for rows that are about to be re-inserted.
//!
//! A copied row keeps all of its data columns but loses its primary key and
//! bookkeeping timestamps so the database assigns fresh ones. The former
//! primary key can be kept as `old_id` to build an old-id mapping.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Keys removed from every copied row.
pub const STRIPPED_KEYS: [&str; 4] = ["id", "created_at", "updated_at", "deleted_at"];

/// Key under which the former primary key is preserved.
pub const OLD_ID_KEY: &str = "old_id";

/// Serialize `row` into a JSON object without identity or timestamp fields.
///
/// When `keep_old_id` is set and the row has an `id`, it is preserved under
/// [`OLD_ID_KEY`].
pub fn create_plain_object<T: Serialize>(
    row: &T,
    keep_old_id: bool,
) -> Result<Map<String, Value>, CoreError> {
    let value = serde_json::to_value(row)
        .map_err(|e| CoreError::Internal(format!("Failed to serialize row: {e}")))?;

    let Value::Object(mut object) = value else {
        return Err(CoreError::Validation(
            "Only object-shaped rows can be copied".to_string(),
        ));
    };

    let old_id = object.get("id").cloned();
    for key in STRIPPED_KEYS {
        object.remove(key);
    }

    if keep_old_id {
        if let Some(id) = old_id.filter(|v| !v.is_null()) {
            object.insert(OLD_ID_KEY.to_string(), id);
        }
    }

    Ok(object)
}
