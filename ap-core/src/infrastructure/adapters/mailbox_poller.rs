// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Mailbox poller (spec.md §4.11): scans a configured directory for `.eml`
//! files and extracts every pdf/png/jpg/jpeg attachment as an ingestion
//! candidate. Storing the attachment and enqueuing the pipeline job are the
//! scheduler job's responsibility; this module only does the scan + parse.

use std::path::{Path, PathBuf};

use ap_domain::ApError;
use mail_parser::MessageParser;
use tokio::fs;

const INGESTIBLE_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg"];

/// One ingestible attachment found in a scanned `.eml` message.
pub struct IngestCandidate {
    pub sender: Option<String>,
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub source_path: PathBuf,
}

pub struct MailboxPoller {
    inbox_dir: PathBuf,
}

impl MailboxPoller {
    pub fn new(inbox_dir: impl Into<PathBuf>) -> Self {
        Self { inbox_dir: inbox_dir.into() }
    }

    /// Scans `inbox_dir` for `.eml` files and returns every ingestible
    /// attachment across all of them. Malformed messages are skipped, not
    /// fatal — one bad email shouldn't block the rest of the poll.
    pub async fn scan(&self) -> Result<Vec<IngestCandidate>, ApError> {
        let mut candidates = Vec::new();
        let mut entries = fs::read_dir(&self.inbox_dir).await.map_err(|e| ApError::Io(e.to_string()))?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| ApError::Io(e.to_string()))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("eml") {
                continue;
            }
            if let Ok(found) = self.extract_from_file(&path).await {
                candidates.extend(found);
            }
        }

        Ok(candidates)
    }

    async fn extract_from_file(&self, path: &Path) -> Result<Vec<IngestCandidate>, ApError> {
        let raw = fs::read(path).await.map_err(|e| ApError::Io(e.to_string()))?;
        let message = MessageParser::default().parse(&raw).ok_or_else(|| ApError::Validation(format!("unparseable email: {}", path.display())))?;

        let sender = message.from().and_then(|addrs| addrs.first()).and_then(|addr| addr.address()).map(|s| s.to_string());

        let mut candidates = Vec::new();
        for attachment in message.attachments() {
            let filename = match attachment.attachment_name() {
                Some(name) => name.to_string(),
                None => continue,
            };
            let extension = Path::new(&filename).extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase());
            let Some(extension) = extension else { continue };
            if !INGESTIBLE_EXTENSIONS.contains(&extension.as_str()) {
                continue;
            }

            let content_type = attachment.content_type().map(|ct| ct.c_type.to_string()).unwrap_or_else(|| "application/octet-stream".to_string());

            candidates.push(IngestCandidate {
                sender: sender.clone(),
                filename,
                content_type,
                bytes: attachment.contents().to_vec(),
                source_path: path.to_path_buf(),
            });
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scan_ignores_non_eml_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"not an email").await.unwrap();
        let poller = MailboxPoller::new(dir.path());
        let found = poller.scan().await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn scan_skips_malformed_eml_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.eml"), b"not a valid mime message at all \x00\x01").await.unwrap();
        let poller = MailboxPoller::new(dir.path());
        assert!(poller.scan().await.is_ok());
    }
}
