//! Upload module
//!
//! Mirrors a staged hub to its destination. The [`Uploader`] trait is the
//! seam; [`RsyncUploader`] is the implementation used by the binary.

use crate::error::StageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

const DEFAULT_SSH_PORT: u16 = 22;

/// Where a staged hub is mirrored to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    /// Remote host; `None` mirrors into a local directory
    pub host: Option<String>,

    /// Remote user, omitted from the destination when `None`
    pub user: Option<String>,

    /// Destination directory
    pub path: PathBuf,

    /// SSH port, 22 when `None`
    pub port: Option<u16>,
}

impl UploadTarget {
    /// A local directory target
    pub fn local<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn is_remote(&self) -> bool {
        self.host.is_some()
    }

    /// Destination argument: `user@host:path`, `host:path` or a plain path
    pub fn destination(&self) -> String {
        let path = format!("{}/", self.path.display().to_string().trim_end_matches('/'));
        match (&self.host, &self.user) {
            (Some(host), Some(user)) => format!("{}@{}:{}", user, host, path),
            (Some(host), None) => format!("{}:{}", host, path),
            _ => path,
        }
    }
}

#[async_trait]
pub trait Uploader: Send + Sync {
    /// Mirror the contents of `staged` to `target`
    async fn upload(&self, staged: &Path, target: &UploadTarget) -> Result<(), StageError>;
}

/// Uploads with `rsync`
#[derive(Debug, Clone)]
pub struct RsyncUploader {
    /// Program to run
    pub program: String,

    /// Options placed before the ssh settings and paths
    pub options: Vec<String>,

    /// Upper bound on one transfer
    pub timeout: Duration,
}

impl Default for RsyncUploader {
    fn default() -> Self {
        Self {
            program: "rsync".to_string(),
            options: vec!["-azvrL".to_string(), "--progress".to_string()],
            timeout: Duration::from_secs(3600),
        }
    }
}

impl RsyncUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments passed to the program for one transfer
    ///
    /// The source always ends in `/` so the directory's contents are
    /// mirrored rather than the directory itself.
    pub fn command_args(&self, staged: &Path, target: &UploadTarget) -> Vec<String> {
        let mut args = self.options.clone();

        if let Some(port) = target.port.filter(|p| *p != DEFAULT_SSH_PORT && target.is_remote()) {
            args.push("-e".to_string());
            args.push(format!("ssh -p {}", port));
        }

        args.push(format!(
            "{}/",
            staged.display().to_string().trim_end_matches('/')
        ));
        args.push(target.destination());
        args
    }
}

#[async_trait]
impl Uploader for RsyncUploader {
    async fn upload(&self, staged: &Path, target: &UploadTarget) -> Result<(), StageError> {
        if !target.is_remote() {
            tokio::fs::create_dir_all(&target.path).await?;
        }

        let args = self.command_args(staged, target);
        info!("Uploading {:?} to {}", staged, target.destination());
        debug!("Running {} {}", self.program, args.join(" "));

        let child = Command::new(&self.program)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| StageError::Upload(format!("Failed to start {}: {}", self.program, e)))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(StageError::Upload(format!(
                    "Failed waiting for {}: {}",
                    self.program, e
                )));
            }
            Err(_) => {
                return Err(StageError::Upload(format!(
                    "{} timed out after {:?}",
                    self.program, self.timeout
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StageError::Upload(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        info!("Upload to {} complete", target.destination());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn remote(port: Option<u16>, user: Option<&str>) -> UploadTarget {
        UploadTarget {
            host: Some("example.org".to_string()),
            user: user.map(str::to_string),
            path: PathBuf::from("/var/www/hubs/lab"),
            port,
        }
    }

    #[test]
    fn test_remote_command_args() {
        let uploader = RsyncUploader::new();
        let args = uploader.command_args(Path::new("/tmp/staging"), &remote(None, Some("me")));
        assert_eq!(
            args,
            vec![
                "-azvrL",
                "--progress",
                "/tmp/staging/",
                "me@example.org:/var/www/hubs/lab/",
            ]
        );
    }

    #[test]
    fn test_custom_port_uses_ssh_option() {
        let uploader = RsyncUploader::new().with_options(["-av"]);
        let args = uploader.command_args(Path::new("/tmp/staging/"), &remote(Some(2222), None));
        assert_eq!(
            args,
            vec!["-av", "-e", "ssh -p 2222", "/tmp/staging/", "example.org:/var/www/hubs/lab/"]
        );

        let args = uploader.command_args(Path::new("/tmp/staging"), &remote(Some(22), None));
        assert!(!args.contains(&"-e".to_string()));
    }

    #[test]
    fn test_local_destination_is_plain_path() {
        let target = UploadTarget::local("/srv/hubs");
        assert_eq!(target.destination(), "/srv/hubs/");
        assert!(!target.is_remote());
    }

    #[tokio::test]
    async fn test_local_target_is_created() {
        let staged = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let target = UploadTarget::local(out.path().join("mirror"));

        let uploader = RsyncUploader {
            program: "true".to_string(),
            ..RsyncUploader::default()
        };
        uploader.upload(staged.path(), &target).await.unwrap();
        assert!(out.path().join("mirror").is_dir());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_upload_error() {
        let staged = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let uploader = RsyncUploader {
            program: "false".to_string(),
            ..RsyncUploader::default()
        };

        let result = uploader.upload(staged.path(), &UploadTarget::local(out.path())).await;
        assert!(matches!(result, Err(StageError::Upload(_))));
    }

    #[tokio::test]
    async fn test_missing_program_is_upload_error() {
        let staged = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let uploader = RsyncUploader {
            program: "definitely-not-an-installed-rsync".to_string(),
            ..RsyncUploader::default()
        };

        let result = uploader.upload(staged.path(), &UploadTarget::local(out.path())).await;
        assert!(matches!(result, Err(StageError::Upload(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_upload_error() {
        let staged = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let uploader = RsyncUploader {
            program: "sh".to_string(),
            ..RsyncUploader::default()
        }
        .with_options(["-c", "sleep 5", "sh"])
        .with_timeout(Duration::from_millis(100));

        let result = uploader.upload(staged.path(), &UploadTarget::local(out.path())).await;
        match result {
            Err(StageError::Upload(message)) => assert!(message.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
