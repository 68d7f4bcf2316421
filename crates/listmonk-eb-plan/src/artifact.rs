//! Deployable bundle publishing
//!
//! The bundle directory is content-addressed: its digest names the storage
//! object, so an unchanged bundle keeps its key and any edit produces a new
//! one. Uploading is left to the external engine, which reads the asset
//! entries recorded in the plan.

use crate::error::{PlanError, Result};
use crate::identity::ServicePrincipal;
use crate::plan::{AssetEntry, Fragment, Grant};
use listmonk_eb_types::{Partition, ResolvedParameters, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

/// Qualifier of the bootstrap asset bucket
pub const ASSET_QUALIFIER: &str = "hnb659fds";

const READ_ACTIONS: &[&str] = &["s3:GetBucket*", "s3:GetObject*", "s3:List*"];

/// A published bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub source: PathBuf,
    pub digest: String,
    pub bucket: String,
    pub key: String,
    partition: Partition,
}

impl Artifact {
    pub fn bucket_value(&self) -> Value {
        Value::literal(&self.bucket)
    }

    pub fn key_value(&self) -> Value {
        Value::literal(&self.key)
    }

    pub fn bucket_arn(&self) -> String {
        format!("arn:{}:s3:::{}", self.partition, self.bucket)
    }

    pub fn object_arn(&self) -> String {
        format!("{}/{}", self.bucket_arn(), self.key)
    }

    /// Read access on the bucket and the object for `principal`
    pub fn read_grant(&self, principal: ServicePrincipal) -> Grant {
        Grant {
            principal: principal.as_str().to_string(),
            actions: READ_ACTIONS.iter().map(|a| a.to_string()).collect(),
            resources: vec![self.bucket_arn(), self.object_arn()],
        }
    }

    pub fn asset_entry(&self) -> AssetEntry {
        AssetEntry {
            source: self.source.clone(),
            digest: self.digest.clone(),
            bucket: self.bucket.clone(),
            key: self.key.clone(),
        }
    }
}

/// BLAKE3 digest over every file in `dir`: relative paths and contents, in
/// sorted order.
pub fn digest_bundle(dir: &Path) -> Result<String> {
    if !dir.is_dir() {
        return Err(PlanError::Bundle {
            path: dir.to_path_buf(),
            reason: "not a directory".into(),
        });
    }

    let mut hasher = blake3::Hasher::new();
    let mut files = 0usize;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| PlanError::Bundle {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(dir).map_err(|e| PlanError::Bundle {
            path: entry.path().to_path_buf(),
            reason: e.to_string(),
        })?;
        let name: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let contents = fs::read(entry.path()).map_err(|source| PlanError::Io {
            path: entry.path().to_path_buf(),
            source,
        })?;

        hasher.update(name.join("/").as_bytes());
        hasher.update(&[0]);
        hasher.update(&(contents.len() as u64).to_le_bytes());
        hasher.update(&contents);
        files += 1;
    }

    if files == 0 {
        return Err(PlanError::Bundle {
            path: dir.to_path_buf(),
            reason: "contains no files".into(),
        });
    }

    let digest = hasher.finalize().to_hex().to_string();
    debug!(path = %dir.display(), files, %digest, "Bundle digested");
    Ok(digest)
}

/// Digest the bundle and record where it is published and who may read it.
#[instrument(skip_all, fields(bundle = %params.bundle_dir.display()))]
pub fn build(params: &ResolvedParameters, reader: ServicePrincipal) -> Result<Fragment<Artifact>> {
    let digest = digest_bundle(&params.bundle_dir)?;
    let artifact = Artifact {
        source: params.bundle_dir.clone(),
        bucket: format!(
            "cdk-{ASSET_QUALIFIER}-assets-{}-{}",
            params.account, params.region
        ),
        key: format!("{digest}.zip"),
        digest,
        partition: params.partition,
    };

    info!(bucket = %artifact.bucket, key = %artifact.key, "Artifact published");

    let grant = artifact.read_grant(reader);
    let entry = artifact.asset_entry();
    Ok(Fragment::new(artifact, Vec::new())
        .with_asset(entry)
        .with_grant(grant))
}
