//! `users` table backed by the hosted Postgres database.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::info;

use super::UserStore;
use crate::record::UserRow;

#[derive(Clone)]
pub struct UsersTable {
    pool: PgPool,
}

impl UsersTable {
    /// Connect with a small pool. Statement caching is disabled so the same
    /// DSN works through PgBouncer transaction pooling.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = PgConnectOptions::from_str(database_url)?.statement_cache_capacity(0);
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;
        info!("connected to users database");
        Ok(Self { pool })
    }
}

#[async_trait]
impl UserStore for UsersTable {
    async fn upsert(&self, row: &UserRow) -> Result<()> {
        sqlx::query(
            r#"
INSERT INTO users (id, name, email, password, created_at, is_admin, is_disabled, department, profile_picture)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
ON CONFLICT (id) DO UPDATE SET
  name = EXCLUDED.name,
  email = EXCLUDED.email,
  password = EXCLUDED.password,
  created_at = EXCLUDED.created_at,
  is_admin = EXCLUDED.is_admin,
  is_disabled = EXCLUDED.is_disabled,
  department = EXCLUDED.department,
  profile_picture = EXCLUDED.profile_picture
"#,
        )
        .bind(&row.id)
        .bind(&row.name)
        .bind(&row.email)
        .bind(&row.password)
        .bind(row.created_at)
        .bind(row.is_admin)
        .bind(row.is_disabled)
        .bind(&row.department)
        .bind(&row.profile_picture)
        .persistent(false)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
