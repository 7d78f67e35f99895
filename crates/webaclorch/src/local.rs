//! File-backed local backend.
//!
//! Wraps a [`MemoryWafApi`] whose Web ACLs are loaded from and saved to a
//! JSON state file, so successive CLI invocations see each other's changes.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use waf_api::{MemorySnapshot, MemoryWafApi};
use waf_types::TokenScope;

use crate::error::{Result, WebAclError};

/// Local WAF backend persisted to a state file.
#[derive(Debug)]
pub struct LocalBackend {
    path: PathBuf,
    api: MemoryWafApi,
}

impl LocalBackend {
    /// Opens the backend, starting empty when the state file does not exist.
    ///
    /// A state file written for a different token scope is rejected.
    pub fn open(path: impl Into<PathBuf>, scope: TokenScope) -> Result<Self> {
        let path = path.into();

        let api = match fs::read_to_string(&path) {
            Ok(content) => {
                let snapshot: MemorySnapshot = serde_json::from_str(&content)?;
                if snapshot.scope != scope {
                    return Err(WebAclError::Config(format!(
                        "state file {} belongs to scope {}, not {}",
                        path.display(),
                        snapshot.scope,
                        scope
                    )));
                }
                debug!(
                    "Loaded {} Web ACL(s) from {}",
                    snapshot.web_acls.len(),
                    path.display()
                );
                MemoryWafApi::from_snapshot(snapshot)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "State file {} not found, starting with an empty backend",
                    path.display()
                );
                MemoryWafApi::new(scope)
            }
            Err(e) => return Err(WebAclError::Io(e)),
        };

        Ok(Self { path, api })
    }

    pub fn api(&self) -> &MemoryWafApi {
        &self.api
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current backend contents to the state file.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.api.snapshot())?;
        fs::write(&self.path, content)?;
        debug!("Saved backend state to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use waf_api::{CreateWebAclInput, WafAction, WafApi};
    use waf_types::WafActionType;

    #[test]
    fn test_open_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::open(dir.path().join("state.json"), TokenScope::Global).unwrap();
        assert_eq!(backend.api().web_acl_count(), 0);
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let backend = LocalBackend::open(&path, TokenScope::Global).unwrap();
        let token = backend.api().get_change_token(&TokenScope::Global).unwrap();
        backend
            .api()
            .create_web_acl(CreateWebAclInput {
                change_token: token,
                name: "acl1".to_string(),
                metric_name: "acl1Metric".to_string(),
                default_action: WafAction::new(WafActionType::Allow),
            })
            .unwrap();
        backend.save().unwrap();

        let reopened = LocalBackend::open(&path, TokenScope::Global).unwrap();
        assert_eq!(reopened.api().snapshot(), backend.api().snapshot());
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn test_scope_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        LocalBackend::open(&path, TokenScope::Global)
            .unwrap()
            .save()
            .unwrap();

        let err = LocalBackend::open(&path, TokenScope::Regional("us-east-1".to_string()))
            .unwrap_err();
        assert!(matches!(err, WebAclError::Config(_)));
    }
}
