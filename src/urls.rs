//! Bookkeeping for reference URLs handed out by the provider.
//!
//! Every URL exported by the session is tracked here until it is revoked, so
//! teardown can release whatever is still outstanding and no URL is revoked
//! twice.

use crate::provider::MediaProvider;
use crate::types::ObjectUrl;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlPurpose {
    Recording,
    Photo,
}

#[derive(Debug, Default)]
pub struct UrlRegistry {
    outstanding: Vec<(ObjectUrl, UrlPurpose)>,
    revoked: u64,
}

impl UrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, url: ObjectUrl, purpose: UrlPurpose) {
        log::debug!("Tracking {:?} url {}", purpose, url);
        self.outstanding.push((url, purpose));
    }

    /// Revokes `url` if it is still outstanding. Returns `false` for unknown
    /// or already revoked URLs, in which case the provider is not called.
    pub fn revoke(&mut self, url: &ObjectUrl, provider: &dyn MediaProvider) -> bool {
        match self.outstanding.iter().position(|(u, _)| u == url) {
            Some(idx) => {
                let (url, purpose) = self.outstanding.remove(idx);
                provider.revoke(&url);
                self.revoked += 1;
                log::debug!("Revoked {:?} url {}", purpose, url);
                true
            }
            None => false,
        }
    }

    /// Revokes everything outstanding, returning how many URLs were released.
    pub fn revoke_all(&mut self, provider: &dyn MediaProvider) -> usize {
        let drained: Vec<_> = self.outstanding.drain(..).collect();
        for (url, _) in &drained {
            provider.revoke(url);
        }
        self.revoked += drained.len() as u64;
        drained.len()
    }

    pub fn is_outstanding(&self, url: &ObjectUrl) -> bool {
        self.outstanding.iter().any(|(u, _)| u == url)
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.len()
    }

    pub fn revoked_count(&self) -> u64 {
        self.revoked
    }
}
