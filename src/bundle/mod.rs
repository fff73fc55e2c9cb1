// src/bundle/mod.rs

//! Asset bundler collaborator.
//!
//! The rest of the daemon only needs "rebuild now, tell me what went wrong".
//! [`Bundler`] is that seam: production uses [`EsbuildBundler`], tests plug
//! in a counting fake.

pub mod esbuild;
pub mod manifest;

use std::future::Future;
use std::pin::Pin;

use tracing::{error, info, warn};

pub use esbuild::{EsbuildBundler, EsbuildOptions};
pub use manifest::{Manifest, MANIFEST_FILE, MANIFEST_MODE};

/// Outcome of one rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Entry point -> output file, present when manifest mode produced one.
    pub manifest: Option<Manifest>,
}

impl BuildReport {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Something that can rebuild the front-end assets on demand.
pub trait Bundler: Send + Sync {
    fn rebuild(&self) -> Pin<Box<dyn Future<Output = BuildReport> + Send + '_>>;
}

/// Trigger a rebuild and log its outcome. Never fails.
pub async fn run_bundler(bundler: &dyn Bundler) -> BuildReport {
    info!("building assets");
    let report = bundler.rebuild().await;

    if !report.errors.is_empty() {
        error!(errors = ?report.errors, "asset build failed");
        return report;
    }
    if !report.warnings.is_empty() {
        warn!(warnings = ?report.warnings, "asset build finished with warnings");
    }
    if let Some(manifest) = &report.manifest {
        info!(entries = manifest.len(), "asset manifest updated");
    }
    report
}
