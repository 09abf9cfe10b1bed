//! YAML-backed policy store
//!
//! All policies live in one document under a top-level `policies:` key and the
//! whole file is rewritten on every save (temp file + atomic rename).
//!
//! # Writers
//!
//! The store assumes a single writer per policy document per run. Within one
//! process, load-modify-save sequences are serialized by an internal lock.
//! Across processes, every document carries a `revision` counter:
//! [`PolicyStore::upsert_checked`] refuses to overwrite a document whose stored
//! revision moved since it was read, so a racing run fails with
//! [`IbnError::Conflict`] instead of silently clobbering the other's result.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ibn_core::{IbnError, PolicyDocument, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const EMPTY_STORE: &str = "policies: []\n";

/// On-disk shape of the store file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyFile {
    #[serde(default)]
    pub policies: Vec<PolicyDocument>,
}

impl PolicyFile {
    fn position(&self, policy_id: &str) -> Option<usize> {
        self.policies.iter().position(|p| p.policy_id == policy_id)
    }
}

pub struct PolicyStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl PolicyStore {
    /// Open the store at `path`, creating an empty store file if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, EMPTY_STORE)?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the whole store.
    pub fn load(&self) -> Result<PolicyFile> {
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(PolicyFile::default());
        }
        let file: PolicyFile = serde_yaml::from_str(&text).map_err(|e| {
            IbnError::Validation(format!("{}: {}", self.path.display(), e))
        })?;

        {
            let mut seen = HashSet::new();
            for policy in &file.policies {
                policy.validate()?;
                if !seen.insert(policy.policy_id.as_str()) {
                    return Err(IbnError::Validation(format!(
                        "duplicate policy_id '{}' in {}",
                        policy.policy_id,
                        self.path.display()
                    )));
                }
            }
        }
        Ok(file)
    }

    /// Rewrite the whole store.
    pub fn save(&self, file: &PolicyFile) -> Result<()> {
        let text = serde_yaml::to_string(file)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| IbnError::Io(e.error))?;
        debug!(path = %self.path.display(), count = file.policies.len(), "policy store saved");
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<PolicyDocument>> {
        Ok(self.load()?.policies)
    }

    pub fn get(&self, policy_id: &str) -> Result<Option<PolicyDocument>> {
        Ok(self
            .load()?
            .policies
            .into_iter()
            .find(|p| p.policy_id == policy_id))
    }

    /// Like [`get`](Self::get) but a missing policy is an error.
    pub fn require(&self, policy_id: &str) -> Result<PolicyDocument> {
        self.get(policy_id)?
            .ok_or_else(|| IbnError::not_found("policy", policy_id))
    }

    /// Replace the document with the same `policy_id`, or append it.
    pub fn upsert(&self, policy: PolicyDocument) -> Result<PolicyDocument> {
        self.write(policy, false)
    }

    /// Upsert only if the stored revision still equals `policy.revision`.
    pub fn upsert_checked(&self, policy: PolicyDocument) -> Result<PolicyDocument> {
        self.write(policy, true)
    }

    fn write(&self, mut policy: PolicyDocument, checked: bool) -> Result<PolicyDocument> {
        policy.validate()?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut file = self.load()?;
        match file.position(&policy.policy_id) {
            Some(idx) => {
                let stored = file.policies[idx].revision;
                if checked && stored != policy.revision {
                    return Err(IbnError::Conflict {
                        policy_id: policy.policy_id,
                        expected: policy.revision,
                        found: stored,
                    });
                }
                policy.revision = stored.max(policy.revision) + 1;
                file.policies[idx] = policy.clone();
            }
            None => {
                policy.revision += 1;
                file.policies.push(policy.clone());
            }
        }
        self.save(&file)?;
        Ok(policy)
    }

    /// Shallow-merge a JSON object into an existing document.
    pub fn update(&self, policy_id: &str, patch: Value) -> Result<PolicyDocument> {
        let Value::Object(patch) = patch else {
            return Err(IbnError::Validation("policy patch must be an object".to_string()));
        };
        if let Some(id) = patch.get("policy_id") {
            if id.as_str() != Some(policy_id) {
                return Err(IbnError::Validation(format!(
                    "patch may not change policy_id of '{}'",
                    policy_id
                )));
            }
        }

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = self.load()?;
        let idx = file
            .position(policy_id)
            .ok_or_else(|| IbnError::not_found("policy", policy_id))?;

        let mut merged = match serde_json::to_value(&file.policies[idx])? {
            Value::Object(map) => map,
            other => {
                return Err(IbnError::Serialization(format!(
                    "policy '{}' did not serialize to an object: {}",
                    policy_id, other
                )))
            }
        };
        let revision = file.policies[idx].revision;
        for (key, value) in patch {
            if key != "revision" {
                merged.insert(key, value);
            }
        }

        let mut policy: PolicyDocument = serde_json::from_value(Value::Object(merged))
            .map_err(|e| IbnError::Validation(format!("patched policy is malformed: {}", e)))?;
        policy.validate()?;
        policy.revision = revision + 1;
        file.policies[idx] = policy.clone();
        self.save(&file)?;
        Ok(policy)
    }
}
