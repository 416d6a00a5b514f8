use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::tree::{ColorMode, WidgetKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    pub index: usize,
    pub kind: WidgetKind,
}

/// Where a widget sits in the display, e.g. `display/composite[3]/text entry[0]`.
///
/// Indices count every declared sibling, skipped ones included, so a path
/// names the same widget in the source and in the converted output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    pub fn child(&self, index: usize, kind: WidgetKind) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment { index, kind });
        NodePath(segments)
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("display")?;
        for segment in &self.0 {
            write!(f, "/{}[{}]", segment.kind, segment.index)?;
        }
        Ok(())
    }
}

/// Why a widget was skipped or converted with loss
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticReason {
    /// No Gestalt widget exists for this kind; it was left out.
    Unsupported,
    /// Gestalt has no alarm/discrete coloring; the static colors were used.
    LossyColorMode(ColorMode),
    /// A field with no Gestalt counterpart was dropped.
    DroppedField { field: SmolStr, value: String },
    /// A value was replaced by the nearest Gestalt equivalent.
    Approximated {
        field: SmolStr,
        value: String,
        replacement: String,
    },
}

impl fmt::Display for DiagnosticReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticReason::Unsupported => write!(f, "no Gestalt equivalent, widget skipped"),
            DiagnosticReason::LossyColorMode(mode) => {
                write!(f, "{} color mode not supported, static colors used", mode)
            }
            DiagnosticReason::DroppedField { field, value } => {
                write!(f, "field '{}' ({:?}) has no Gestalt equivalent, dropped", field, value)
            }
            DiagnosticReason::Approximated {
                field,
                value,
                replacement,
            } => write!(
                f,
                "field '{}' value {:?} approximated as {:?}",
                field, value, replacement
            ),
        }
    }
}

/// A non-fatal note about one widget of a conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionDiagnostic {
    pub path: NodePath,
    pub kind: WidgetKind,
    pub reason: DiagnosticReason,
}

impl fmt::Display for ConversionDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.path, self.kind, self.reason)
    }
}
