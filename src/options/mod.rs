//! Tunable settings with TOML preset support.
//!
//! Animation timing, preview scoring and tick cadence are consolidated
//! here. Options serialize to/from TOML presets; every section uses
//! `#[serde(default)]` so partial files work.

mod animation;
mod preview;
mod render;

use std::path::Path;

pub use animation::AnimationOptions;
pub use preview::PreviewOptions;
pub use render::RenderOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::FramescopeError;

/// Top-level options container.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Transition durations and easing.
    pub animation: AnimationOptions,
    /// Preview scoring.
    pub preview: PreviewOptions,
    /// Tick cadence.
    pub render: RenderOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// I/O failures and TOML parse errors.
    pub fn load(path: &Path) -> Result<Self, FramescopeError> {
        let content = std::fs::read_to_string(path).map_err(FramescopeError::Io)?;
        toml::from_str(&content)
            .map_err(|e| FramescopeError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// I/O failures and TOML serialization errors.
    pub fn save(&self, path: &Path) -> Result<(), FramescopeError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FramescopeError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(FramescopeError::Io)?;
        }
        std::fs::write(path, content).map_err(FramescopeError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::EasingFunction;
    use crate::dataset::PreviewMode;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[preview]
mode = "neighborSimilarity"
k = 5
"#;
        let opts: Options = toml::from_str(toml_str).unwrap();
        assert_eq!(opts.preview.mode, PreviewMode::NeighborSimilarity);
        assert_eq!(opts.preview.k, 5);
        assert_eq!(opts.preview.similarity_threshold, 0.5);
        assert_eq!(opts.animation.easing, EasingFunction::EaseInOut);
        assert_eq!(opts.render.target_fps, 60);
    }

    #[test]
    fn presets_save_load_and_list() {
        let dir = std::env::temp_dir()
            .join(format!("framescope-presets-{}", std::process::id()));
        let mut opts = Options::default();
        opts.preview.shuffle_seed = Some(42);
        opts.animation.frame_duration_ms = 1500.0;
        opts.save(&dir.join("slow.toml")).unwrap();
        Options::default().save(&dir.join("base.toml")).unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        assert_eq!(Options::load(&dir.join("slow.toml")).unwrap(), opts);
        assert_eq!(Options::list_presets(&dir), vec!["base", "slow"]);
        assert!(Options::load(&dir.join("missing.toml")).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();

        assert!(props.contains_key("animation"));
        assert!(props.contains_key("preview"));
        assert!(props.contains_key("render"));

        let preview = &props["preview"]["properties"];
        assert!(preview.get("k").is_some());
        assert!(preview.get("shuffle_seed").is_none());
        let animation = &props["animation"]["properties"];
        assert!(animation.get("frame_duration_ms").is_some());
        assert!(animation.get("easing").is_none());
    }
}
