#![forbid(unsafe_code)]

//! Policy-as-data configuration for the docking runtime.
//!
//! Every behavior switch the runtime consults (drag thresholds, size conflict
//! checks, close semantics, floating window defaults) lives in one
//! [`DockPolicyConfig`] that hosts may load from TOML or JSON at startup.
//!
//! # Loading
//!
//! ```toml
//! # fdock-policy.toml
//! [drag]
//! threshold_x = 6.0
//! float_on_empty_drop = false
//!
//! [close]
//! hide_documents_on_close = false
//! ```
//!
//! ```rust,ignore
//! let policy = DockPolicyConfig::from_toml_file("fdock-policy.toml")?;
//! let policy = DockPolicyConfig::from_json_str(json)?;
//! ```
//!
//! # Defaults
//!
//! `DockPolicyConfig::default()` matches the `Default` impls of
//! [`DragConfig`], [`ManagerConfig`] and [`FactoryConfig`], so a host that
//! never loads a file gets identical behavior.

#[cfg(feature = "policy-config")]
use std::path::Path;

#[cfg(feature = "policy-config")]
use serde::{Deserialize, Serialize};

use fdock_core::geometry::Size;
use fdock_core::gesture::{DEFAULT_DRAG_THRESHOLD_X, DEFAULT_DRAG_THRESHOLD_Y, DragThreshold};

use crate::drag::DragConfig;
use crate::factory::FactoryConfig;
use crate::manager::ManagerConfig;

/// Default width of a newly floated window.
pub const DEFAULT_WINDOW_WIDTH: f64 = 300.0;

/// Default height of a newly floated window.
pub const DEFAULT_WINDOW_HEIGHT: f64 = 400.0;

// ---------------------------------------------------------------------------
// Top-level DockPolicyConfig
// ---------------------------------------------------------------------------

/// Top-level docking policy.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct DockPolicyConfig {
    /// Drag gesture parameters.
    pub drag: DragPolicyConfig,
    /// Dock manager validation switches.
    pub manager: ManagerPolicyConfig,
    /// What closing a dockable does.
    pub close: ClosePolicyConfig,
    /// Floating window defaults.
    pub windows: WindowPolicyConfig,
}

impl DockPolicyConfig {
    /// Load from a TOML string.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, PolicyConfigError> {
        toml::from_str(s).map_err(PolicyConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PolicyConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PolicyConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(s: &str) -> Result<Self, PolicyConfigError> {
        serde_json::from_str(s).map_err(PolicyConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PolicyConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PolicyConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("drag.threshold_x", self.drag.threshold_x),
            ("drag.threshold_y", self.drag.threshold_y),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{name} must be finite and >= 0, got {value}"));
            }
        }

        for (name, value) in [
            ("windows.default_width", self.windows.default_width),
            ("windows.default_height", self.windows.default_height),
        ] {
            if !value.is_finite() || value <= 0.0 {
                errors.push(format!("{name} must be finite and > 0, got {value}"));
            }
        }

        errors
    }

    /// Like [`validate`](Self::validate), folded into a `Result`.
    pub fn validated(self) -> Result<Self, PolicyConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(PolicyConfigError::Validation(errors))
        }
    }

    /// Build a [`DragConfig`] from this policy.
    #[must_use]
    pub fn to_drag_config(&self) -> DragConfig {
        DragConfig {
            threshold: DragThreshold::new(self.drag.threshold_x, self.drag.threshold_y),
            float_on_empty_drop: self.drag.float_on_empty_drop,
        }
    }

    /// Build a [`ManagerConfig`] from this policy.
    #[must_use]
    pub fn to_manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            prevent_size_conflicts: self.manager.prevent_size_conflicts,
            float_size: Size::new(self.windows.default_width, self.windows.default_height),
        }
    }

    /// Build a [`FactoryConfig`] from this policy.
    #[must_use]
    pub fn to_factory_config(&self) -> FactoryConfig {
        FactoryConfig {
            hide_tools_on_close: self.close.hide_tools_on_close,
            hide_documents_on_close: self.close.hide_documents_on_close,
            use_owner_for_floating_windows: self.windows.use_owner_for_floating_windows,
            default_window_size: Size::new(self.windows.default_width, self.windows.default_height),
        }
    }

    /// Format as a JSONL line for structured logging.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        format!(
            r#"{{"schema":"fdock-policy-v1","drag_threshold_x":{},"drag_threshold_y":{},"float_on_empty_drop":{},"prevent_size_conflicts":{},"hide_tools_on_close":{},"hide_documents_on_close":{},"use_owner_for_floating_windows":{}}}"#,
            self.drag.threshold_x,
            self.drag.threshold_y,
            self.drag.float_on_empty_drop,
            self.manager.prevent_size_conflicts,
            self.close.hide_tools_on_close,
            self.close.hide_documents_on_close,
            self.windows.use_owner_for_floating_windows,
        )
    }
}

// ---------------------------------------------------------------------------
// Sub-configs (flat, serde-friendly)
// ---------------------------------------------------------------------------

/// Drag gesture parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct DragPolicyConfig {
    /// Horizontal travel (px) before a press becomes a drag. Default: 4.
    pub threshold_x: f64,
    /// Vertical travel (px) before a press becomes a drag. Default: 4.
    pub threshold_y: f64,
    /// Float the source when released over no drop target. Default: true.
    pub float_on_empty_drop: bool,
}

impl Default for DragPolicyConfig {
    fn default() -> Self {
        Self {
            threshold_x: DEFAULT_DRAG_THRESHOLD_X,
            threshold_y: DEFAULT_DRAG_THRESHOLD_Y,
            float_on_empty_drop: true,
        }
    }
}

/// Dock manager validation switches.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct ManagerPolicyConfig {
    /// Reject drops whose min/max sizes cannot coexist. Default: true.
    pub prevent_size_conflicts: bool,
}

impl Default for ManagerPolicyConfig {
    fn default() -> Self {
        Self {
            prevent_size_conflicts: true,
        }
    }
}

/// Close semantics per dockable kind.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct ClosePolicyConfig {
    /// Closing a tool hides it (restorable). Default: true.
    pub hide_tools_on_close: bool,
    /// Closing a document hides it (restorable). Default: true.
    pub hide_documents_on_close: bool,
}

impl Default for ClosePolicyConfig {
    fn default() -> Self {
        Self {
            hide_tools_on_close: true,
            hide_documents_on_close: true,
        }
    }
}

/// Floating window defaults.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct WindowPolicyConfig {
    /// Windows in `Default` owner mode are owned by their parent. Default: true.
    pub use_owner_for_floating_windows: bool,
    /// Width of a floated window. Default: 300.
    pub default_width: f64,
    /// Height of a floated window. Default: 400.
    pub default_height: f64,
}

impl Default for WindowPolicyConfig {
    fn default() -> Self {
        Self {
            use_owner_for_floating_windows: true,
            default_width: DEFAULT_WINDOW_WIDTH,
            default_height: DEFAULT_WINDOW_HEIGHT,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading a policy configuration.
#[derive(Debug)]
pub enum PolicyConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "policy-config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "policy-config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for PolicyConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for PolicyConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_component_defaults() {
        let policy = DockPolicyConfig::default();

        let drag = policy.to_drag_config();
        let expected_drag = DragConfig::default();
        assert_eq!(drag.threshold, expected_drag.threshold);
        assert_eq!(drag.float_on_empty_drop, expected_drag.float_on_empty_drop);

        let manager = policy.to_manager_config();
        let expected_manager = ManagerConfig::default();
        assert_eq!(
            manager.prevent_size_conflicts,
            expected_manager.prevent_size_conflicts
        );
        assert_eq!(manager.float_size, expected_manager.float_size);

        let factory = policy.to_factory_config();
        assert_eq!(factory, FactoryConfig::default());
    }

    #[test]
    fn defaults_are_documented_values() {
        let policy = DockPolicyConfig::default();
        assert_eq!(policy.drag.threshold_x, 4.0);
        assert_eq!(policy.drag.threshold_y, 4.0);
        assert!(policy.drag.float_on_empty_drop);
        assert!(policy.manager.prevent_size_conflicts);
        assert!(policy.close.hide_tools_on_close);
        assert!(policy.close.hide_documents_on_close);
        assert!(policy.windows.use_owner_for_floating_windows);
        assert_eq!(policy.windows.default_width, 300.0);
        assert_eq!(policy.windows.default_height, 400.0);
        assert!(policy.validate().is_empty());
    }

    #[test]
    fn validate_catches_bad_thresholds() {
        let mut policy = DockPolicyConfig::default();
        policy.drag.threshold_x = -1.0;
        policy.drag.threshold_y = f64::NAN;
        let errors = policy.validate();
        assert!(errors.iter().any(|e| e.contains("drag.threshold_x")));
        assert!(errors.iter().any(|e| e.contains("drag.threshold_y")));
    }

    #[test]
    fn validate_catches_bad_window_size() {
        let mut policy = DockPolicyConfig::default();
        policy.windows.default_width = 0.0;
        let errors = policy.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("windows.default_width"));
        assert!(matches!(
            policy.validated(),
            Err(PolicyConfigError::Validation(list)) if list.len() == 1
        ));
    }

    #[test]
    fn to_jsonl_produces_valid_json() {
        let jsonl = DockPolicyConfig::default().to_jsonl();
        let value: serde_json::Value = serde_json::from_str(&jsonl).expect("valid json");
        assert_eq!(value["schema"], "fdock-policy-v1");
        assert_eq!(value["float_on_empty_drop"], true);
    }

    #[test]
    fn validation_error_display_joins_messages() {
        let err = PolicyConfigError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "validation errors: a; b");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[cfg(feature = "policy-config")]
    mod loading {
        use super::*;
        use std::io::Write;

        #[test]
        fn partial_toml_preserves_defaults() {
            let policy = DockPolicyConfig::from_toml_str(
                "[drag]\nthreshold_x = 6.0\n\n[close]\nhide_documents_on_close = false\n",
            )
            .expect("parse");
            assert_eq!(policy.drag.threshold_x, 6.0);
            assert_eq!(policy.drag.threshold_y, 4.0);
            assert!(policy.drag.float_on_empty_drop);
            assert!(!policy.close.hide_documents_on_close);
            assert!(policy.close.hide_tools_on_close);
        }

        #[test]
        fn json_round_trip() {
            let mut policy = DockPolicyConfig::default();
            policy.manager.prevent_size_conflicts = false;
            let json = serde_json::to_string(&policy).expect("serialize");
            let back = DockPolicyConfig::from_json_str(&json).expect("parse");
            assert_eq!(back, policy);
        }

        #[test]
        fn toml_file_loads() {
            let mut file = tempfile::NamedTempFile::new().expect("temp file");
            writeln!(file, "[windows]\ndefault_width = 640.0").expect("write");
            let policy = DockPolicyConfig::from_toml_file(file.path()).expect("load");
            assert_eq!(policy.windows.default_width, 640.0);
            assert_eq!(policy.windows.default_height, 400.0);
        }

        #[test]
        fn missing_file_is_io_error() {
            let err = DockPolicyConfig::from_json_file("/nonexistent/fdock-policy.json")
                .expect_err("missing");
            assert!(matches!(err, PolicyConfigError::Io(_)));
        }

        #[test]
        fn malformed_toml_is_parse_error() {
            let err = DockPolicyConfig::from_toml_str("[drag\nthreshold_x = ").expect_err("bad");
            assert!(matches!(err, PolicyConfigError::Toml(_)));
            assert!(std::error::Error::source(&err).is_some());
        }
    }
}
