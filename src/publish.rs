//! Uploads dashboard JSON to S3 for a static front end to render.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::dashboard::{CameraSummary, Dashboard, View};
use crate::normalize::NormalizeReport;
use crate::output::{camera_stem, view_stem};

/// Top-level listing, served as `<prefix>/index.json`.
#[derive(Serialize)]
pub struct DashboardIndex {
    pub generated_at: DateTime<Utc>,
    pub record_count: usize,
    pub report: NormalizeReport,
    pub cameras: Vec<CameraIndexEntry>,
}

/// One camera in the index, with the key of its view document.
#[derive(Serialize)]
pub struct CameraIndexEntry {
    #[serde(flatten)]
    pub summary: CameraSummary,
    pub key: String,
}

/// Serializes a value to JSON and uploads it to an S3 bucket with `application/json` content type.
pub async fn write_json_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    value: &impl Serialize,
) -> Result<()> {
    let body = serde_json::to_vec(value)?;

    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(body.into())
        .content_type("application/json")
        .send()
        .await
        .with_context(|| format!("failed to upload s3://{}/{}", bucket, key))?;

    Ok(())
}

/// Object key for `<stem>.json` under `prefix`.
pub fn object_key(prefix: &str, stem: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        format!("{}.json", stem)
    } else {
        format!("{}/{}.json", prefix, stem)
    }
}

/// Object key for a view under `prefix`.
pub fn view_key(prefix: &str, view: &View) -> String {
    object_key(prefix, &view_stem(view))
}

/// Builds the index document for a dashboard whose views live under `prefix`.
pub fn build_index(dashboard: &Dashboard, prefix: &str) -> DashboardIndex {
    let cameras = dashboard
        .camera_summaries()
        .into_iter()
        .map(|summary| {
            let key = object_key(prefix, &camera_stem(Some(&summary.camera_id)));
            CameraIndexEntry { summary, key }
        })
        .collect();

    DashboardIndex {
        generated_at: Utc::now(),
        record_count: dashboard.record_count(),
        report: dashboard.report().clone(),
        cameras,
    }
}

/// Uploads the overall view, one view per camera and the index.
#[tracing::instrument(skip(s3, dashboard))]
pub async fn publish_dashboard(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    prefix: &str,
    dashboard: &Dashboard,
) -> Result<()> {
    let overall = dashboard.overall();
    write_json_to_s3(s3, bucket, &view_key(prefix, &overall), &overall).await?;

    for camera in dashboard.cameras() {
        let view = dashboard.camera_view(&camera);
        write_json_to_s3(s3, bucket, &view_key(prefix, &view), &view).await?;
    }

    let index = build_index(dashboard, prefix);
    write_json_to_s3(s3, bucket, &object_key(prefix, "index"), &index).await?;

    info!(cameras = index.cameras.len(), "Published dashboard");
    Ok(())
}
