use anyhow::Result;

use crate::util::env::{db_url, env_opt, env_req, init_env, preflight_check};

/// Bucket used when STORAGE_BUCKET is unset.
pub const DEFAULT_BUCKET: &str = "avatars";

/// Everything the importer needs from the environment, read once at process
/// start and passed in explicitly. No module below this reads env vars.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Supabase project endpoint, e.g. `https://xyz.supabase.co`.
    pub supabase_url: String,
    /// Service-role key used for storage uploads.
    pub service_role_key: String,
    /// Storage bucket holding profile pictures.
    pub bucket: String,
    /// Postgres DSN for the `users` table.
    pub database_url: String,
}

impl ImportConfig {
    /// Resolve configuration, failing before any remote I/O when a required
    /// key is missing. Logs a redacted snapshot for operator sanity.
    pub fn from_env() -> Result<Self> {
        init_env();
        preflight_check(
            "import_users",
            &["SUPABASE_URL", "SUPABASE_SERVICE_ROLE_KEY"],
            &[
                "SUPABASE_URL",
                "STORAGE_BUCKET",
                "SUPABASE_DB_URL",
                "DATABASE_URL",
            ],
        )?;
        Ok(Self {
            supabase_url: env_req("SUPABASE_URL")?.trim_end_matches('/').to_string(),
            service_role_key: env_req("SUPABASE_SERVICE_ROLE_KEY")?,
            bucket: env_opt("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            database_url: db_url()?,
        })
    }
}
