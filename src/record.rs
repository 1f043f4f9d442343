use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// One entry from the JSON export. Everything except `id` is optional and
/// loosely typed; the export was produced by ad-hoc scripts, so the flag
/// fields arrive as bools, numbers, or strings depending on the era.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_admin: Option<Value>,
    #[serde(default)]
    pub is_disabled: Option<Value>,
    #[serde(default)]
    pub department: Option<String>,
    /// Local filename under the files root, or an already-resolved URL.
    #[serde(default)]
    pub profile_picture: Option<String>,
}

/// Fully defaulted row shape for the `users` table. `id` passes through
/// untouched; it is the upsert conflict key.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_admin: bool,
    pub is_disabled: bool,
    pub department: Option<String>,
    pub profile_picture: Option<String>,
}

/// Coerce a boolean-ish export value to a strict bool.
/// Strings follow the same 1/true/on/yes convention as env flags.
pub fn coerce_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => {
            let v = s.trim().to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "on" | "yes")
        }
        _ => false,
    }
}

/// Project a (possibly picture-rewritten) record into a UserRow. All
/// defaulting and coercion happens here, at the boundary; `now` fills a
/// missing or unparseable creation timestamp.
pub fn normalize(record: &UserRecord, now: DateTime<Utc>) -> UserRow {
    let created_at = record
        .created_at
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now);

    UserRow {
        id: record.id.clone(),
        name: record.name.clone(),
        email: record
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .unwrap_or_default(),
        password: record.password.clone(),
        created_at,
        is_admin: coerce_flag(record.is_admin.as_ref()),
        is_disabled: coerce_flag(record.is_disabled.as_ref()),
        department: record.department.clone(),
        profile_picture: record.profile_picture.clone(),
    }
}
