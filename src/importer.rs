//! The batch record importer: a strictly sequential fold over the export.
//! Each record is enriched (best-effort picture upload), normalized, and
//! upserted; a failure in one record never aborts the batch.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::record::{normalize, UserRecord};
use crate::store::object::guess_content_type;
use crate::store::{ObjectStore, UserStore};

/// Outcome counters for one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub uploaded: usize,
}

/// Deterministic object path, so re-running the batch overwrites the same
/// object instead of accumulating duplicates.
pub fn upload_path(id: &str, filename: &str) -> String {
    format!("profiles/{id}_{filename}")
}

/// Process every record to completion, in input order, one at a time.
/// Per-record failures are logged with the record's email and counted;
/// the batch itself always runs to the end of the input.
pub async fn run_import(
    records: &[UserRecord],
    objects: &dyn ObjectStore,
    users: &dyn UserStore,
    files_root: &Path,
    dry_run: bool,
) -> ImportSummary {
    let mut summary = ImportSummary::default();
    info!(total = records.len(), dry_run, "starting user import");

    for record in records {
        match import_one(record, objects, users, files_root, dry_run).await {
            Ok(uploaded) => {
                summary.succeeded += 1;
                if uploaded {
                    summary.uploaded += 1;
                }
            }
            Err(err) => {
                summary.failed += 1;
                warn!(
                    id = %record.id,
                    email = record.email.as_deref().unwrap_or("<none>"),
                    error = %err,
                    "record import failed; continuing with next record"
                );
            }
        }
    }

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        uploaded = summary.uploaded,
        "user import finished"
    );
    summary
}

async fn import_one(
    record: &UserRecord,
    objects: &dyn ObjectStore,
    users: &dyn UserStore,
    files_root: &Path,
    dry_run: bool,
) -> Result<bool> {
    let mut record = record.clone();
    let mut uploaded = false;

    // Best-effort picture enrichment. An upload failure keeps the original
    // reference and never blocks the row write; records whose picture is
    // absent from the files root (or is already a URL) pass through as-is.
    if let Some(picture) = record.profile_picture.clone() {
        let local = files_root.join(&picture);
        if local.is_file() {
            let path = upload_path(&record.id, &picture);
            if dry_run {
                info!(id = %record.id, path = %path, "DRY_RUN: would upload profile picture");
            } else {
                match upload_file(objects, &path, &picture, &local).await {
                    Ok(public_url) => {
                        info!(id = %record.id, url = %public_url, "uploaded profile picture");
                        record.profile_picture = Some(public_url);
                        uploaded = true;
                    }
                    Err(err) => {
                        warn!(
                            id = %record.id,
                            file = %picture,
                            error = %err,
                            "profile picture upload failed; keeping original reference"
                        );
                    }
                }
            }
        }
    }

    let row = normalize(&record, Utc::now());
    if dry_run {
        info!(id = %row.id, email = %row.email, "DRY_RUN: would upsert user");
        return Ok(uploaded);
    }

    users
        .upsert(&row)
        .await
        .with_context(|| format!("upsert user {}", row.id))?;
    info!(id = %row.id, email = %row.email, "upserted user");
    Ok(uploaded)
}

async fn upload_file(
    objects: &dyn ObjectStore,
    path: &str,
    filename: &str,
    local: &Path,
) -> Result<String> {
    let bytes = tokio::fs::read(local)
        .await
        .with_context(|| format!("read local file {}", local.display()))?;
    objects
        .upload(path, bytes, guess_content_type(filename))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::UserRow;
    use anyhow::bail;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeObjects {
        uploads: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl ObjectStore for FakeObjects {
        async fn upload(&self, path: &str, _bytes: Vec<u8>, _ct: &str) -> Result<String> {
            self.uploads.lock().unwrap().push(path.to_string());
            if self.fail {
                bail!("storage unavailable");
            }
            Ok(format!("https://cdn.test/{path}"))
        }
    }

    #[derive(Default)]
    struct FakeUsers {
        rows: Mutex<HashMap<String, UserRow>>,
        upsert_order: Mutex<Vec<String>>,
        fail_ids: Vec<String>,
    }

    #[async_trait]
    impl UserStore for FakeUsers {
        async fn upsert(&self, row: &UserRow) -> Result<()> {
            self.upsert_order.lock().unwrap().push(row.id.clone());
            if self.fail_ids.contains(&row.id) {
                bail!("write rejected");
            }
            self.rows.lock().unwrap().insert(row.id.clone(), row.clone());
            Ok(())
        }
    }

    fn record(value: serde_json::Value) -> UserRecord {
        serde_json::from_value(value).unwrap()
    }

    /// Fresh directory under the system temp dir, usable as a files root.
    fn files_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("user-import-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn record_without_picture_triggers_no_upload() {
        let objects = FakeObjects::default();
        let users = FakeUsers::default();
        let records = vec![record(json!({ "id": "u1", "email": "A@B.com", "isAdmin": 1 }))];

        let summary =
            run_import(&records, &objects, &users, &files_root("nopic"), false).await;

        assert_eq!(summary, ImportSummary { succeeded: 1, failed: 0, uploaded: 0 });
        assert!(objects.uploads.lock().unwrap().is_empty());

        let rows = users.rows.lock().unwrap();
        let row = rows.get("u1").unwrap();
        assert_eq!(row.email, "a@b.com");
        assert!(row.is_admin);
        assert!(!row.is_disabled);
        assert_eq!(row.profile_picture, None);
    }

    #[tokio::test]
    async fn missing_local_file_passes_reference_through_unchanged() {
        let objects = FakeObjects::default();
        let users = FakeUsers::default();
        let records = vec![record(json!({ "id": "u1", "profilePicture": "ghost.png" }))];

        let summary =
            run_import(&records, &objects, &users, &files_root("missing"), false).await;

        assert_eq!(summary.uploaded, 0);
        assert!(objects.uploads.lock().unwrap().is_empty());
        assert_eq!(
            users.rows.lock().unwrap()["u1"].profile_picture.as_deref(),
            Some("ghost.png")
        );
    }

    #[tokio::test]
    async fn present_local_file_is_uploaded_and_reference_rewritten() {
        let root = files_root("upload");
        std::fs::write(root.join("pic.png"), b"png-bytes").unwrap();

        let objects = FakeObjects::default();
        let users = FakeUsers::default();
        let records = vec![record(json!({ "id": "u1", "profilePicture": "pic.png" }))];

        let summary = run_import(&records, &objects, &users, &root, false).await;

        assert_eq!(summary, ImportSummary { succeeded: 1, failed: 0, uploaded: 1 });
        assert_eq!(
            *objects.uploads.lock().unwrap(),
            vec!["profiles/u1_pic.png".to_string()]
        );
        assert_eq!(
            users.rows.lock().unwrap()["u1"].profile_picture.as_deref(),
            Some("https://cdn.test/profiles/u1_pic.png")
        );
    }

    #[tokio::test]
    async fn failed_upload_still_writes_row_with_original_reference() {
        let root = files_root("upload-fail");
        std::fs::write(root.join("pic.png"), b"png-bytes").unwrap();

        let objects = FakeObjects { fail: true, ..Default::default() };
        let users = FakeUsers::default();
        let records = vec![record(json!({ "id": "u1", "profilePicture": "pic.png" }))];

        let summary = run_import(&records, &objects, &users, &root, false).await;

        // Enrichment is best-effort: the upload failure is not a record failure.
        assert_eq!(summary, ImportSummary { succeeded: 1, failed: 0, uploaded: 0 });
        assert_eq!(
            users.rows.lock().unwrap()["u1"].profile_picture.as_deref(),
            Some("pic.png")
        );
    }

    #[tokio::test]
    async fn failing_record_is_isolated_from_its_neighbors() {
        let objects = FakeObjects::default();
        let users = FakeUsers { fail_ids: vec!["u2".to_string()], ..Default::default() };
        let records = vec![
            record(json!({ "id": "u1", "email": "One@X.com" })),
            record(json!({ "id": "u2", "email": "Two@X.com" })),
            record(json!({ "id": "u3", "email": "Three@X.com" })),
        ];

        let summary =
            run_import(&records, &objects, &users, &files_root("isolate"), false).await;

        assert_eq!(summary, ImportSummary { succeeded: 2, failed: 1, uploaded: 0 });
        assert_eq!(
            *users.upsert_order.lock().unwrap(),
            vec!["u1".to_string(), "u2".to_string(), "u3".to_string()]
        );
        let rows = users.rows.lock().unwrap();
        assert_eq!(rows["u1"].email, "one@x.com");
        assert_eq!(rows["u3"].email, "three@x.com");
        assert!(!rows.contains_key("u2"));
    }

    #[tokio::test]
    async fn rerunning_the_batch_is_idempotent() {
        let root = files_root("idempotent");
        std::fs::write(root.join("pic.png"), b"png-bytes").unwrap();

        let objects = FakeObjects::default();
        let users = FakeUsers::default();
        let records = vec![record(json!({ "id": "u1", "profilePicture": "pic.png" }))];

        run_import(&records, &objects, &users, &root, false).await;
        run_import(&records, &objects, &users, &root, false).await;

        // Same deterministic object path both runs; one row, not two.
        let uploads = objects.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0], uploads[1]);
        assert_eq!(users.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dry_run_touches_neither_store() {
        let root = files_root("dry");
        std::fs::write(root.join("pic.png"), b"png-bytes").unwrap();

        let objects = FakeObjects::default();
        let users = FakeUsers::default();
        let records = vec![
            record(json!({ "id": "u1", "profilePicture": "pic.png" })),
            record(json!({ "id": "u2" })),
        ];

        let summary = run_import(&records, &objects, &users, &root, true).await;

        assert_eq!(summary, ImportSummary { succeeded: 2, failed: 0, uploaded: 0 });
        assert!(objects.uploads.lock().unwrap().is_empty());
        assert!(users.rows.lock().unwrap().is_empty());
    }

    #[test]
    fn upload_path_embeds_id_and_original_filename() {
        assert_eq!(upload_path("u1", "pic.png"), "profiles/u1_pic.png");
    }
}
