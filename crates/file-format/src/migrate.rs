use serde_json::Value;

use crate::errors::LoadError;

/// Bring a raw project payload from `from_version` up to `to_version`.
///
/// Migrations are applied one version at a time.
pub fn migrate(mut payload: Value, from_version: u64, to_version: u32) -> Result<Value, LoadError> {
    let mut version = from_version;
    while version < u64::from(to_version) {
        payload = match version {
            1 => migrate_v1_to_v2(payload)?,
            _ => {
                return Err(LoadError::MigrationFailed {
                    from: from_version,
                    to: to_version,
                    reason: format!("no migration path from v{version}"),
                })
            }
        };
        version += 1;
    }
    Ok(payload)
}

/// v1 files carry no history; whatever snapshot fields exist are dropped.
fn migrate_v1_to_v2(payload: Value) -> Result<Value, LoadError> {
    let Value::Object(mut map) = payload else {
        return Err(LoadError::MigrationFailed {
            from: 1,
            to: 2,
            reason: "payload is not an object".to_string(),
        });
    };
    map.remove("snapshots");
    map.remove("currentSnapshotIndex");
    map.insert("version".to_string(), Value::from(2));
    Ok(Value::Object(map))
}
