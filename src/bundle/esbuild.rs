// src/bundle/esbuild.rs

//! [`Bundler`] implementation that shells out to the esbuild CLI.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::bundle::manifest::{manifest_from_metafile, write_manifest};
use crate::bundle::{BuildReport, Bundler};
use crate::config::ConfigFile;
use crate::fs::FileSystem;
use crate::types::SourceMap;

/// Resolved esbuild settings.
#[derive(Debug, Clone)]
pub struct EsbuildOptions {
    pub program: String,
    /// Working directory for esbuild; entry points are relative to it.
    pub root: PathBuf,
    pub entry_points: Vec<String>,
    pub output_dir: PathBuf,
    pub manifest: bool,
    pub minify: bool,
    pub sourcemap: SourceMap,
    pub target: Vec<String>,
    pub log_limit: u32,
}

impl EsbuildOptions {
    pub fn from_config(cfg: &ConfigFile, root: &Path) -> Self {
        Self {
            program: cfg.bundler.program.clone(),
            root: root.to_path_buf(),
            entry_points: cfg.bundler.entry_points.clone(),
            output_dir: cfg.output_dir_in(root),
            manifest: cfg.bundler.manifest,
            minify: cfg.bundler.minify,
            sourcemap: cfg.bundler.sourcemap,
            target: cfg.bundler.target.clone(),
            log_limit: cfg.bundler.log_limit,
        }
    }

    /// Command-line arguments for one build. `metafile` is where esbuild
    /// should write its build metadata.
    pub fn args(&self, metafile: Option<&Path>) -> Vec<String> {
        let mut args: Vec<String> = self.entry_points.clone();

        args.push("--bundle".to_string());
        args.push(format!("--outdir={}", self.output_dir.display()));

        let entry_names = if self.manifest { "[name]-[hash]" } else { "[name]" };
        args.push(format!("--entry-names={entry_names}"));

        if self.minify {
            args.push("--minify-syntax".to_string());
            args.push("--minify-whitespace".to_string());
            args.push("--minify-identifiers".to_string());
        }
        if let Some(mode) = self.sourcemap.esbuild_flag() {
            args.push(format!("--sourcemap={mode}"));
        }
        if !self.target.is_empty() {
            args.push(format!("--target={}", self.target.join(",")));
        }

        args.push(format!("--log-limit={}", self.log_limit));
        args.push("--log-level=warning".to_string());
        args.push("--color=false".to_string());

        if let Some(path) = metafile {
            args.push(format!("--metafile={}", path.display()));
        }
        args
    }
}

/// Runs `esbuild` once per rebuild. Rebuilds are serialised.
#[derive(Debug)]
pub struct EsbuildBundler {
    options: EsbuildOptions,
    fs: Arc<dyn FileSystem>,
    build_lock: Mutex<()>,
}

impl EsbuildBundler {
    pub fn new(options: EsbuildOptions, fs: Arc<dyn FileSystem>) -> Result<Self> {
        if options.entry_points.is_empty() {
            return Err(anyhow!("esbuild needs at least one entry point"));
        }
        if options.program.trim().is_empty() {
            return Err(anyhow!("esbuild program must not be empty"));
        }
        Ok(Self {
            options,
            fs,
            build_lock: Mutex::new(()),
        })
    }

    pub fn options(&self) -> &EsbuildOptions {
        &self.options
    }

    async fn build(&self) -> Result<BuildReport> {
        let _guard = self.build_lock.lock().await;

        let metafile = if self.options.manifest {
            Some(
                tempfile::Builder::new()
                    .prefix("devloop-meta")
                    .suffix(".json")
                    .tempfile()
                    .context("creating esbuild metafile")?,
            )
        } else {
            None
        };

        let args = self.options.args(metafile.as_ref().map(|f| f.path()));
        debug!(program = %self.options.program, ?args, "running esbuild");

        let output = Command::new(&self.options.program)
            .args(&args)
            .current_dir(&self.options.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("running {}", self.options.program))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let (mut errors, warnings) = parse_diagnostics(&stderr);
        if !output.status.success() && errors.is_empty() {
            errors.push(format!("esbuild exited with {}", output.status));
        }

        let mut report = BuildReport {
            errors,
            warnings,
            manifest: None,
        };

        if let (Some(metafile), true) = (metafile, report.is_success()) {
            match self.update_manifest(metafile.path()) {
                Ok(manifest) => report.manifest = Some(manifest),
                Err(err) => error!(error = %format!("{err:#}"), "failed to write manifest file"),
            }
        }

        Ok(report)
    }

    fn update_manifest(&self, metafile: &Path) -> Result<crate::bundle::Manifest> {
        let json = self.fs.read_to_string(metafile)?;
        let manifest = manifest_from_metafile(&json).context("parsing esbuild metafile")?;
        let path = write_manifest(self.fs.as_ref(), &self.options.output_dir, &manifest)?;
        debug!(path = ?path, "wrote asset manifest");
        Ok(manifest)
    }
}

impl Bundler for EsbuildBundler {
    fn rebuild(&self) -> Pin<Box<dyn Future<Output = BuildReport> + Send + '_>> {
        Box::pin(async move {
            match self.build().await {
                Ok(report) => report,
                Err(err) => BuildReport::failed(format!("{err:#}")),
            }
        })
    }
}

/// Split esbuild's stderr into error and warning messages.
///
/// esbuild tags the first line of each diagnostic, e.g.
/// `✘ [ERROR] Could not resolve "./missing"`; the source excerpt that
/// follows is not kept.
pub fn parse_diagnostics(stderr: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for line in stderr.lines() {
        if let Some(msg) = tagged_message(line, "[ERROR]") {
            errors.push(msg);
        } else if let Some(msg) = tagged_message(line, "[WARNING]") {
            warnings.push(msg);
        }
    }
    (errors, warnings)
}

fn tagged_message(line: &str, tag: &str) -> Option<String> {
    line.find(tag)
        .map(|idx| line[idx + tag.len()..].trim().to_string())
}
