// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Filesystem-backed `BlobStore`. Buckets map to a subdirectory under
//! `root`; `presigned_url` returns a `file://` path since there is no object
//! store issuing real signed URLs in this deployment shape.

use std::path::{Path, PathBuf};

use ap_domain::services::BlobStore;
use ap_domain::ApError;
use async_trait::async_trait;
use tokio::fs;

pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, object_name: &str) -> PathBuf {
        self.root.join(bucket).join(object_name)
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn upload(&self, bucket: &str, object_name: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), ApError> {
        let path = self.object_path(bucket, object_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| ApError::Io(e.to_string()))?;
        }
        fs::write(&path, bytes).await.map_err(|e| ApError::Io(e.to_string()))
    }

    async fn download(&self, bucket: &str, object_name: &str) -> Result<Vec<u8>, ApError> {
        let path = self.object_path(bucket, object_name);
        fs::read(&path).await.map_err(|e| ApError::Io(e.to_string()))
    }

    async fn presigned_url(&self, bucket: &str, object_name: &str, _ttl_seconds: u64) -> Result<String, ApError> {
        let path = self.object_path(bucket, object_name);
        Ok(format!("file://{}", path.display()))
    }

    async fn delete(&self, bucket: &str, object_name: &str) -> Result<(), ApError> {
        let path = self.object_path(bucket, object_name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApError::Io(e.to_string())),
        }
    }

    async fn ensure_bucket(&self, bucket: &str) -> Result<(), ApError> {
        let path: &Path = &self.root.join(bucket);
        fs::create_dir_all(path).await.map_err(|e| ApError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());
        store.ensure_bucket("invoices").await.unwrap();
        store.upload("invoices", "1/a.pdf", b"hello".to_vec(), "application/pdf").await.unwrap();
        let data = store.download("invoices", "1/a.pdf").await.unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn download_missing_object_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());
        assert!(store.download("invoices", "missing.pdf").await.is_err());
    }

    #[tokio::test]
    async fn delete_missing_object_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());
        store.delete("invoices", "missing.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn presigned_url_is_a_file_uri() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());
        let url = store.presigned_url("invoices", "1/a.pdf", 900).await.unwrap();
        assert!(url.starts_with("file://"));
    }
}
