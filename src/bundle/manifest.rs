// src/bundle/manifest.rs

//! Asset manifest: a JSON object mapping each entry point to the
//! content-hashed file esbuild produced for it, e.g.
//!
//! ```json
//! {"assets/main.css":"static/assets/main-5JZQ2R3B.css","assets/main.js":"static/assets/main-QW7X2ZKA.js"}
//! ```
//!
//! The server reads it once at startup to render asset URLs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::errors::Result;
use crate::fs::FileSystem;

pub const MANIFEST_FILE: &str = "manifest.json";

/// rw for owner, r for group.
pub const MANIFEST_MODE: u32 = 0o640;

pub type Manifest = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
struct Metafile {
    #[serde(default)]
    outputs: BTreeMap<String, MetafileOutput>,
}

#[derive(Debug, Deserialize)]
struct MetafileOutput {
    #[serde(rename = "entryPoint", default)]
    entry_point: Option<String>,
}

/// Build the manifest from esbuild's `--metafile` JSON. Outputs that are not
/// tied to an entry point (shared chunks, source maps) are skipped.
pub fn manifest_from_metafile(json: &str) -> Result<Manifest> {
    let meta: Metafile = serde_json::from_str(json)?;

    Ok(meta
        .outputs
        .into_iter()
        .filter_map(|(output, info)| match info.entry_point {
            Some(entry) if !entry.is_empty() => Some((entry, output)),
            _ => None,
        })
        .collect())
}

/// Write `manifest` to `<output_dir>/manifest.json`. Returns the path written.
pub fn write_manifest(
    fs: &dyn FileSystem,
    output_dir: &Path,
    manifest: &Manifest,
) -> anyhow::Result<PathBuf> {
    let path = output_dir.join(MANIFEST_FILE);
    let json = serde_json::to_vec(manifest).context("serialising manifest")?;
    fs.write_file(&path, &json, MANIFEST_MODE)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DevloopError;
    use crate::fs::mock::MockFileSystem;

    const METAFILE: &str = r#"{
        "inputs": {},
        "outputs": {
            "static/assets/main-QW7X2ZKA.js": {"entryPoint": "assets/main.js", "bytes": 10},
            "static/assets/main-5JZQ2R3B.css": {"entryPoint": "assets/main.css", "bytes": 4},
            "static/assets/chunk-ABC.js": {"bytes": 2}
        }
    }"#;

    #[test]
    fn maps_entry_points_to_outputs() {
        let manifest = manifest_from_metafile(METAFILE).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest["assets/main.js"], "static/assets/main-QW7X2ZKA.js");
        assert_eq!(manifest["assets/main.css"], "static/assets/main-5JZQ2R3B.css");
    }

    #[test]
    fn missing_outputs_is_empty_manifest() {
        assert!(manifest_from_metafile("{}").unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_a_json_error() {
        let err = manifest_from_metafile("not json").unwrap_err();
        assert!(matches!(err, DevloopError::JsonError(_)), "got {err:?}");
    }

    #[test]
    fn wrongly_typed_outputs_is_a_json_error() {
        let err = manifest_from_metafile(r#"{"outputs": []}"#).unwrap_err();
        assert!(matches!(err, DevloopError::JsonError(_)), "got {err:?}");
    }

    #[test]
    fn writes_sorted_json_with_mode() {
        let fs = MockFileSystem::new();
        fs.add_dir("/proj/static/assets");
        let manifest = manifest_from_metafile(METAFILE).unwrap();

        let path = write_manifest(&fs, Path::new("/proj/static/assets"), &manifest).unwrap();

        assert_eq!(path, PathBuf::from("/proj/static/assets/manifest.json"));
        assert_eq!(
            fs.read_to_string(&path).unwrap(),
            r#"{"assets/main.css":"static/assets/main-5JZQ2R3B.css","assets/main.js":"static/assets/main-QW7X2ZKA.js"}"#
        );
        assert_eq!(fs.mode_of(&path), Some(MANIFEST_MODE));
    }
}
