//! Motion configuration files
//!
//! A motion file is TOML with named presets and a list of values to drive:
//!
//! ```toml
//! fps = 60
//!
//! [springs.press]
//! stiffness = 400.0
//! damping = 30.0
//!
//! [timings.fill]
//! duration_ms = 600.0
//! easing = "ease_out_cubic"
//!
//! [transitions.pulse]
//! kind = "repeat"
//! alternate = true
//! child = { kind = "timing", to = 0.4, duration_ms = 900.0 }
//!
//! [[values]]
//! name = "scale"
//! initial = 1.0
//! transition = { kind = "spring", to = 0.9, preset = "press" }
//!
//! [[values]]
//! name = "opacity"
//! initial = 1.0
//! preset = "pulse"
//! ```
//!
//! A leaf transition may name a spring or timing preset with `preset`; its
//! own fields override the preset's.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spring::SpringConfig;
use crate::timing::TimingConfig;
use crate::transition::Transition;
use crate::values::AnimValue;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse motion file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("value `{name}`: {reason}")]
    Invalid { name: String, reason: String },
}

impl ConfigError {
    fn invalid(name: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Named motion presets
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    #[serde(default)]
    pub springs: BTreeMap<String, SpringConfig>,
    #[serde(default)]
    pub timings: BTreeMap<String, TimingConfig>,
    #[serde(default)]
    pub transitions: BTreeMap<String, Transition>,
}

impl MotionConfig {
    pub fn spring(&self, name: &str) -> Option<SpringConfig> {
        self.springs.get(name).copied()
    }

    pub fn timing(&self, name: &str) -> Option<TimingConfig> {
        self.timings.get(name).copied()
    }

    pub fn transition(&self, name: &str) -> Option<&Transition> {
        self.transitions.get(name)
    }
}

/// A value entry in a motion file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueEntry {
    pub name: String,
    pub initial: AnimValue,
    /// Inline transition (leaves may reference spring/timing presets)
    #[serde(default)]
    pub transition: Option<toml::Value>,
    /// Name of a transition preset
    #[serde(default)]
    pub preset: Option<String>,
}

/// A value ready to run
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedValue {
    pub name: String,
    pub initial: AnimValue,
    pub transition: Transition,
}

/// A parsed motion file
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionFile {
    /// Preferred simulation rate
    #[serde(default)]
    pub fps: Option<u32>,
    #[serde(flatten)]
    pub presets: MotionConfig,
    #[serde(default)]
    pub values: Vec<ValueEntry>,
}

impl MotionFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = Self::parse(&content)?;
        tracing::debug!(
            "Loaded motion file {} ({} values)",
            path.display(),
            file.values.len()
        );
        Ok(file)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve presets and validate every value
    pub fn resolve(&self) -> Result<Vec<ResolvedValue>, ConfigError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(self.values.len());

        for entry in &self.values {
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::invalid(&entry.name, "duplicate value name"));
            }

            let transition = match (&entry.transition, &entry.preset) {
                (Some(inline), None) => self.resolve_inline(&entry.name, inline)?,
                (None, Some(preset)) => self
                    .presets
                    .transition(preset)
                    .cloned()
                    .ok_or_else(|| {
                        ConfigError::invalid(
                            &entry.name,
                            format!("unknown transition preset `{preset}`"),
                        )
                    })?,
                (Some(_), Some(_)) => {
                    return Err(ConfigError::invalid(
                        &entry.name,
                        "set either `transition` or `preset`, not both",
                    ))
                }
                (None, None) => {
                    return Err(ConfigError::invalid(
                        &entry.name,
                        "missing `transition` or `preset`",
                    ))
                }
            };

            validate(&entry.name, &entry.initial, &transition)?;
            resolved.push(ResolvedValue {
                name: entry.name.clone(),
                initial: entry.initial,
                transition,
            });
        }

        Ok(resolved)
    }

    fn resolve_inline(&self, name: &str, inline: &toml::Value) -> Result<Transition, ConfigError> {
        let expanded = self.expand_presets(name, inline.clone())?;
        expanded
            .try_into::<Transition>()
            .map_err(|err: toml::de::Error| ConfigError::invalid(name, err.message().to_string()))
    }

    /// Merge `preset = "..."` references on leaf tables into their fields
    fn expand_presets(&self, name: &str, value: toml::Value) -> Result<toml::Value, ConfigError> {
        let toml::Value::Table(mut table) = value else {
            return Ok(value);
        };

        if let Some(preset) = table.remove("preset") {
            let preset = preset
                .as_str()
                .ok_or_else(|| ConfigError::invalid(name, "`preset` must be a string"))?;
            let kind = table.get("kind").and_then(toml::Value::as_str);
            let defaults = match kind {
                Some("spring") => self.presets.spring(preset).map(toml::Value::try_from),
                Some("timing") => self.presets.timing(preset).map(toml::Value::try_from),
                _ => {
                    return Err(ConfigError::invalid(
                        name,
                        "`preset` is only allowed on spring and timing leaves",
                    ))
                }
            };
            let defaults = defaults
                .ok_or_else(|| ConfigError::invalid(name, format!("unknown preset `{preset}`")))?
                .map_err(|err| ConfigError::invalid(name, err.to_string()))?;
            if let toml::Value::Table(defaults) = defaults {
                for (key, field) in defaults {
                    table.entry(key).or_insert(field);
                }
            }
        }

        for key in ["child", "steps"] {
            if let Some(nested) = table.remove(key) {
                let nested = match nested {
                    toml::Value::Array(items) => toml::Value::Array(
                        items
                            .into_iter()
                            .map(|item| self.expand_presets(name, item))
                            .collect::<Result<_, _>>()?,
                    ),
                    other => self.expand_presets(name, other)?,
                };
                table.insert(key.to_string(), nested);
            }
        }

        Ok(toml::Value::Table(table))
    }
}

fn validate(name: &str, initial: &AnimValue, transition: &Transition) -> Result<(), ConfigError> {
    if !finite(initial) {
        return Err(ConfigError::invalid(name, "initial value is not finite"));
    }
    check_node(name, initial, transition)
}

fn check_node(name: &str, initial: &AnimValue, transition: &Transition) -> Result<(), ConfigError> {
    match transition {
        Transition::Spring { to, .. } | Transition::Timing { to, .. } => {
            if !to.same_shape(initial) {
                return Err(ConfigError::invalid(
                    name,
                    "transition target shape differs from the initial value",
                ));
            }
            if !finite(to) {
                return Err(ConfigError::invalid(name, "transition target is not finite"));
            }
            Ok(())
        }
        Transition::Sequence { steps } => steps
            .iter()
            .try_for_each(|step| check_node(name, initial, step)),
        Transition::Repeat { child, .. } => check_node(name, initial, child),
        Transition::Delay { delay_ms, child } => {
            if !delay_ms.is_finite() || *delay_ms < 0.0 {
                return Err(ConfigError::invalid(name, "delay must be a non-negative number"));
            }
            check_node(name, initial, child)
        }
    }
}

fn finite(value: &AnimValue) -> bool {
    match value {
        AnimValue::Scalar(v) => v.is_finite(),
        AnimValue::Pair(p) => p.x.is_finite() && p.y.is_finite(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Easing;
    use crate::transition::RepeatCount;

    const SAMPLE: &str = r#"
fps = 60

[springs.press]
stiffness = 400.0
damping = 30.0

[timings.fill]
duration_ms = 600.0
easing = "ease_out_cubic"

[transitions.pulse]
kind = "repeat"
alternate = true
child = { kind = "timing", to = 0.4, duration_ms = 900.0 }

[[values]]
name = "scale"
initial = 1.0
transition = { kind = "spring", to = 0.9, preset = "press" }

[[values]]
name = "opacity"
initial = 1.0
preset = "pulse"

[[values]]
name = "fill"
initial = 0.0
transition = { kind = "timing", to = 0.75, preset = "fill", duration_ms = 200.0 }

[[values]]
name = "offset"
initial = [0.0, 24.0]
transition = { kind = "delay", delay_ms = 80.0, child = { kind = "spring", to = [0.0, 0.0] } }
"#;

    #[test]
    fn test_parse_and_resolve() {
        let file = MotionFile::parse(SAMPLE).unwrap();
        assert_eq!(file.fps, Some(60));
        assert_eq!(file.presets.spring("press").unwrap().stiffness, 400.0);

        let values = file.resolve().unwrap();
        assert_eq!(values.len(), 4);

        assert_eq!(
            values[0].transition,
            Transition::spring(0.9, SpringConfig::new(400.0, 30.0, 1.0))
        );
        assert_eq!(
            values[1].transition,
            Transition::timing(0.4, 900.0, TimingConfig::default().easing)
                .repeat(RepeatCount::Indefinite, true)
        );
    }

    #[test]
    fn test_leaf_fields_override_preset() {
        let values = MotionFile::parse(SAMPLE).unwrap().resolve().unwrap();
        assert_eq!(
            values[2].transition,
            Transition::timing(0.75, 200.0, Easing::EaseOutCubic)
        );
    }

    #[test]
    fn test_pair_values() {
        let values = MotionFile::parse(SAMPLE).unwrap().resolve().unwrap();
        assert_eq!(values[3].initial, AnimValue::pair(0.0, 24.0));
        assert_eq!(
            values[3].transition.final_target(values[3].initial),
            AnimValue::pair(0.0, 0.0)
        );
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let file = MotionFile::parse(
            r#"
[[values]]
name = "bad"
initial = 1.0
transition = { kind = "timing", to = [1.0, 2.0] }
"#,
        )
        .unwrap();
        let err = file.resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref name, .. } if name == "bad"));
    }

    #[test]
    fn test_unknown_preset_rejected() {
        let file = MotionFile::parse(
            r#"
[[values]]
name = "scale"
initial = 1.0
transition = { kind = "spring", to = 0.9, preset = "missing" }
"#,
        )
        .unwrap();
        assert!(file.resolve().unwrap_err().to_string().contains("missing"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let file = MotionFile::parse(
            r#"
[[values]]
name = "a"
initial = 0.0
transition = { kind = "timing", to = 1.0 }

[[values]]
name = "a"
initial = 0.0
transition = { kind = "timing", to = 1.0 }
"#,
        )
        .unwrap();
        assert!(file.resolve().is_err());
    }

    #[test]
    fn test_missing_transition_rejected() {
        let file = MotionFile::parse("[[values]]\nname = \"a\"\ninitial = 0.0\n").unwrap();
        assert!(file.resolve().is_err());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            MotionFile::parse("values = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = MotionFile::load(Path::new("/nonexistent/motion.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
