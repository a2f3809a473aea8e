//! Conversion plan model, as handed over by the conversion engine.

use super::undo_log::{ProjectType, Replacement};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A completed conversion plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionPlan {
    /// Analysis that produced the plan.
    pub analysis: ConversionAnalysis,
    /// File actions, in the order they are applied.
    pub actions: Vec<ConversionAction>,
}

/// Project analysis results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionAnalysis {
    pub project_type: ProjectType,
    pub placeholders: Vec<DetectedPlaceholder>,
}

/// A value that was chosen to become a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedPlaceholder {
    /// Placeholder token, e.g. `{{PROJECT_NAME}}`.
    pub placeholder: String,
    /// Original literal value.
    pub value: String,
}

/// A single file action of the conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConversionAction {
    /// Literal values replaced with placeholders.
    Modify {
        #[serde(alias = "path")]
        file: PathBuf,
        #[serde(default)]
        replacements: Vec<Replacement>,
    },
    /// File or directory removed from the template.
    Delete {
        #[serde(alias = "file")]
        path: PathBuf,
    },
    /// Template-only file added.
    Create {
        #[serde(alias = "file")]
        path: PathBuf,
        #[serde(default)]
        content: String,
    },
}

impl ConversionAction {
    /// Path the action touches.
    pub fn path(&self) -> &PathBuf {
        match self {
            ConversionAction::Modify { file, .. } => file,
            ConversionAction::Delete { path } | ConversionAction::Create { path, .. } => path,
        }
    }
}
