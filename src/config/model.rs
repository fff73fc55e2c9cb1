// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::exec::CommandSpec;
use crate::types::SourceMap;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [watch]
/// quiet_period_ms = 100
/// exclude = ["static/assets"]
///
/// [bundler]
/// entry_points = ["assets/main.js", "assets/main.css"]
/// output_dir = "static/assets"
/// manifest = true
///
/// [server]
/// cmd = "go"
/// args = ["run", "./cmd/server"]
///
/// [generator]
/// cmd = "templ"
/// args = ["generate", "--watch", "--proxy", "http://localhost:8080"]
/// notify_args = ["generate", "--notify-proxy"]
/// ```
///
/// All sections are optional; the defaults describe a Go + templ + esbuild
/// project layout.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub bundler: BundlerSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub generator: GeneratorSection,
}

/// A validated configuration.
///
/// Obtain one through `ConfigFile::try_from(raw)` or
/// [`crate::config::load_and_validate`]. Paths are still relative to the
/// project root; the `*_in` helpers resolve them.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub bundler: BundlerSection,
    pub server: ServerSection,
    pub generator: GeneratorSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            watch: raw.watch,
            bundler: raw.bundler,
            server: raw.server,
            generator: raw.generator,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.watch.quiet_period_ms)
    }

    /// Absolute exclusion list for a project rooted at `root`.
    pub fn excluded_dirs_in(&self, root: &Path) -> Vec<PathBuf> {
        self.watch
            .exclude
            .iter()
            .map(|p| resolve_under(root, p))
            .collect()
    }

    /// Absolute asset output directory for a project rooted at `root`.
    pub fn output_dir_in(&self, root: &Path) -> PathBuf {
        resolve_under(root, &self.bundler.output_dir)
    }

    pub fn server_command(&self) -> CommandSpec {
        CommandSpec::new(&self.server.cmd, &self.server.args)
    }

    pub fn generator_command(&self) -> CommandSpec {
        CommandSpec::new(&self.generator.cmd, &self.generator.args)
    }

    pub fn generator_notify_command(&self) -> CommandSpec {
        CommandSpec::new(&self.generator.cmd, &self.generator.notify_args)
    }
}

/// Join a configured path onto `root`, dropping a leading `./` so the result
/// compares equal to paths produced by walking `root`.
fn resolve_under(root: &Path, configured: &str) -> PathBuf {
    let rel = Path::new(configured);
    if rel.is_absolute() {
        return rel.to_path_buf();
    }
    rel.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .fold(root.to_path_buf(), |acc, c| acc.join(c))
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Quiet period for debouncing filesystem events, in milliseconds.
    pub quiet_period_ms: u64,

    /// Directories (relative to the root) that are never watched.
    pub exclude: Vec<String>,

    /// Extensions whose writes trigger an asset rebuild.
    pub asset_extensions: Vec<String>,

    /// Extensions whose writes restart the server.
    pub server_extensions: Vec<String>,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            quiet_period_ms: 100,
            exclude: vec!["static/assets".to_string()],
            asset_extensions: vec!["js".to_string(), "css".to_string()],
            server_extensions: vec!["go".to_string()],
        }
    }
}

/// `[bundler]` section: how esbuild is invoked.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BundlerSection {
    pub program: String,
    pub entry_points: Vec<String>,
    pub output_dir: String,

    /// Content-hash output names and write `manifest.json`.
    pub manifest: bool,

    pub minify: bool,
    pub sourcemap: SourceMap,

    /// Language target plus browser engines, e.g. `["es2020", "chrome97"]`.
    pub target: Vec<String>,

    pub log_limit: u32,
}

impl Default for BundlerSection {
    fn default() -> Self {
        Self {
            program: "esbuild".to_string(),
            entry_points: vec!["assets/main.js".to_string(), "assets/main.css".to_string()],
            output_dir: "static/assets".to_string(),
            manifest: true,
            minify: true,
            sourcemap: SourceMap::Inline,
            target: ["es2020", "chrome97", "edge97", "firefox96", "safari15"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            log_limit: 6,
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub cmd: String,
    pub args: Vec<String>,

    /// How long `stop` waits after SIGTERM before escalating to SIGKILL.
    pub stop_timeout_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            cmd: "go".to_string(),
            args: vec!["run".to_string(), "./cmd/server".to_string()],
            stop_timeout_ms: 5000,
        }
    }
}

impl ServerSection {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// `[generator]` section: the template generator running in watch mode.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorSection {
    pub cmd: String,
    pub args: Vec<String>,

    /// Arguments for the one-shot call made after every server restart.
    pub notify_args: Vec<String>,

    pub stop_timeout_ms: u64,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            cmd: "templ".to_string(),
            args: ["generate", "--watch", "--proxy", "http://localhost:8080"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            notify_args: vec!["generate".to_string(), "--notify-proxy".to_string()],
            stop_timeout_ms: 5000,
        }
    }
}

impl GeneratorSection {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}
