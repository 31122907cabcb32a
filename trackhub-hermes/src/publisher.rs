//! Publish pipeline module
//!
//! Takes a hub definition through build, validation, rendering, staging and
//! an optional upload, recording the outcome in a [`PublishReport`].

use crate::error::StageError;
use crate::stage::Stager;
use crate::upload::{UploadTarget, Uploader};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};
use trackhub_libs::{render_with, validate, HubConfig, RenderOptions};
use uuid::Uuid;

/// Outcome of a publish run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    /// Staged, and uploaded when a target was configured
    Success,

    /// The definition did not validate
    Invalid,

    /// Building, staging or uploading failed
    Failed,
}

/// Serializable record of one publish run
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub run_id: String,
    pub hub: String,
    pub status: PublishStatus,

    /// Staging directory of this hub
    pub staging_dir: PathBuf,

    /// Rendered files, relative to the staging directory
    pub files: Vec<PathBuf>,

    /// Data links, relative to the staging directory
    pub links: Vec<PathBuf>,

    pub uploaded: bool,

    /// Validation violations, one line each
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublishReport {
    fn new(run_id: String, hub: &str, staging_dir: PathBuf) -> Self {
        Self {
            run_id,
            hub: hub.to_string(),
            status: PublishStatus::Failed,
            staging_dir,
            files: Vec::new(),
            links: Vec::new(),
            uploaded: false,
            violations: Vec::new(),
            error: None,
        }
    }
}

/// Runs the publish pipeline for hub definitions
pub struct Publisher {
    /// Each hub is staged in `<staging_root>/<hub name>`
    staging_root: PathBuf,

    /// Uploader and target; staging only when `None`
    upload: Option<(Arc<dyn Uploader>, UploadTarget)>,
}

impl Publisher {
    /// Create a publisher that only stages
    ///
    /// # Arguments
    ///
    /// * `staging_root` - Directory receiving one folder per hub
    pub fn new<P: AsRef<Path>>(staging_root: P) -> Self {
        Self {
            staging_root: staging_root.as_ref().to_path_buf(),
            upload: None,
        }
    }

    /// Upload every staged hub to `<target.path>/<hub name>`
    pub fn with_upload(mut self, uploader: Arc<dyn Uploader>, target: UploadTarget) -> Self {
        self.upload = Some((uploader, target));
        self
    }

    /// Publish one hub definition
    ///
    /// Failures are recorded in the report rather than returned.
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded hub definition
    ///
    /// # Returns
    ///
    /// * `PublishReport` - Outcome of the run
    pub async fn publish(&self, config: &HubConfig) -> PublishReport {
        let run_id = Uuid::new_v4().to_string();
        let staging_dir = self.staging_root.join(&config.hub.name);
        let mut report = PublishReport::new(run_id, &config.hub.name, staging_dir);

        info!("Starting publish run {} for hub '{}'", report.run_id, report.hub);

        match self.run(config, &mut report).await {
            Ok(()) => {
                report.status = PublishStatus::Success;
                info!("Publish run {} completed", report.run_id);
            }
            Err(StageError::Hub(e)) if !e.violations().is_empty() => {
                error!(
                    "Hub '{}' failed validation with {} violations",
                    report.hub,
                    e.violations().len()
                );
                report.violations = e.violations().iter().map(ToString::to_string).collect();
                report.status = PublishStatus::Invalid;
                report.error = Some(e.to_string());
            }
            Err(e) => {
                error!("Publish run {} failed: {}", report.run_id, e);
                report.error = Some(e.to_string());
            }
        }

        report
    }

    async fn run(&self, config: &HubConfig, report: &mut PublishReport) -> Result<(), StageError> {
        let (tree, hub) = config.build()?;
        debug!("Built tree with {} nodes", tree.len());

        validate(&tree, hub)?;

        // Already validated above
        let options = RenderOptions {
            validate: false,
            ..RenderOptions::default()
        };
        let rendered = render_with(&tree, hub, options)?;

        let stager = Stager::new(&report.staging_dir);
        let staged = stager.stage(&tree, hub, &rendered)?;
        debug!("Staging directory holds {} entries", stager.list_staged().len());
        report.files = staged.files;
        report.links = staged.links;

        if let Some((uploader, target)) = &self.upload {
            let target = UploadTarget {
                path: target.path.join(&config.hub.name),
                ..target.clone()
            };
            uploader.upload(&report.staging_dir, &target).await?;
            report.uploaded = true;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use trackhub_libs::load_hub_config;

    /// Records upload calls instead of running a transfer
    #[derive(Default)]
    struct RecordingUploader {
        calls: Mutex<Vec<(PathBuf, UploadTarget)>>,
        fail: bool,
    }

    #[async_trait]
    impl Uploader for RecordingUploader {
        async fn upload(&self, staged: &Path, target: &UploadTarget) -> Result<(), StageError> {
            self.calls
                .lock()
                .unwrap()
                .push((staged.to_path_buf(), target.clone()));
            if self.fail {
                return Err(StageError::Upload("connection refused".to_string()));
            }
            Ok(())
        }
    }

    fn write_definition(dir: &Path, track_type: &str) -> HubConfig {
        fs::write(dir.join("signal.bw"), b"bigwig").unwrap();
        let yaml = format!(
            r#"
hub:
  name: labHub
  email: lab@example.org
genomes:
  - name: hg38
    tracks:
      - name: signal
        type: {}
        source: signal.bw
"#,
            track_type
        );
        let path = dir.join("hub.yaml");
        fs::write(&path, yaml).unwrap();
        load_hub_config(&path).unwrap()
    }

    #[tokio::test]
    async fn test_publish_stages_hub() {
        let defs = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let config = write_definition(defs.path(), "bigWig");

        let report = Publisher::new(staging.path()).publish(&config).await;

        assert_eq!(report.status, PublishStatus::Success);
        assert_eq!(report.hub, "labHub");
        assert!(!report.uploaded);
        assert!(report.files.contains(&PathBuf::from("hub.txt")));
        assert_eq!(report.links, vec![PathBuf::from("hg38/signal.bigWig")]);
        assert!(staging.path().join("labHub/hg38/trackDb.txt").exists());
        assert!(Uuid::parse_str(&report.run_id).is_ok());
    }

    #[tokio::test]
    async fn test_publish_uploads_into_hub_folder() {
        let defs = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let config = write_definition(defs.path(), "bigWig");

        let uploader = Arc::new(RecordingUploader::default());
        let target = UploadTarget {
            host: Some("example.org".to_string()),
            user: Some("me".to_string()),
            path: PathBuf::from("/srv/hubs"),
            port: None,
        };
        let report = Publisher::new(staging.path())
            .with_upload(uploader.clone(), target)
            .publish(&config)
            .await;

        assert_eq!(report.status, PublishStatus::Success);
        assert!(report.uploaded);

        let calls = uploader.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, staging.path().join("labHub"));
        assert_eq!(calls[0].1.path, PathBuf::from("/srv/hubs/labHub"));
    }

    #[tokio::test]
    async fn test_invalid_hub_reports_violations() {
        let defs = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let mut config = write_definition(defs.path(), "bigWig");
        config.genomes[0].tracks[0].source = None;

        let report = Publisher::new(staging.path()).publish(&config).await;

        assert_eq!(report.status, PublishStatus::Invalid);
        assert_eq!(report.violations.len(), 1);
        assert!(report.violations[0].contains("signal"));
        assert!(!staging.path().join("labHub").exists());
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported() {
        let defs = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let config = write_definition(defs.path(), "bigWig");

        let uploader = Arc::new(RecordingUploader {
            fail: true,
            ..RecordingUploader::default()
        });
        let report = Publisher::new(staging.path())
            .with_upload(uploader, UploadTarget::local(staging.path().join("mirror")))
            .publish(&config)
            .await;

        assert_eq!(report.status, PublishStatus::Failed);
        assert!(!report.uploaded);
        assert!(report.error.unwrap().contains("connection refused"));

        let json = serde_json::to_value(&report.status).unwrap();
        assert_eq!(json, "failed");
    }
}
