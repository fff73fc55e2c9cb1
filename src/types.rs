use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How esbuild emits source maps for the built assets.
///
/// - `Inline`: embed the map in the output file (default, matches dev usage).
/// - `External`: write a sibling `.map` file.
/// - `None`: no source maps at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMap {
    Inline,
    External,
    None,
}

impl Default for SourceMap {
    fn default() -> Self {
        SourceMap::Inline
    }
}

impl SourceMap {
    /// Value for esbuild's `--sourcemap=<mode>` flag, `None` when the flag
    /// should be omitted.
    pub fn esbuild_flag(self) -> Option<&'static str> {
        match self {
            SourceMap::Inline => Some("inline"),
            SourceMap::External => Some("external"),
            SourceMap::None => None,
        }
    }
}

impl FromStr for SourceMap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inline" => Ok(SourceMap::Inline),
            "external" => Ok(SourceMap::External),
            "none" => Ok(SourceMap::None),
            other => Err(format!(
                "invalid sourcemap: {other} (expected \"inline\", \"external\" or \"none\")"
            )),
        }
    }
}

impl fmt::Display for SourceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceMap::Inline => "inline",
            SourceMap::External => "external",
            SourceMap::None => "none",
        };
        f.write_str(s)
    }
}
