#![deny(clippy::unwrap_used, clippy::expect_used)]
//! Convert MEDM `.adl` displays into Gestalt YAML layouts.
//!
//! The pipeline is [`parse`] (text to [`WidgetTree`]), [`convert`] (tree to
//! a [`MappedForest`] plus the colors it references) and [`emit`] (back to
//! text). [`convert_str`] runs all three.

pub mod builder;
pub mod color;
mod diagnostics;
mod emitter;
mod error;
pub mod mapper;
mod options;
pub mod reader;
mod tree;

pub use crate::{
    builder::TreeBuilder,
    color::{ColorTable, ResolvedColor, ResolvedColors, Rgb},
    diagnostics::{ConversionDiagnostic, DiagnosticReason, NodePath, PathSegment},
    emitter::{emit, emit_with},
    error::Adl2GestaltError,
    mapper::{MappedForest, MappedWidget, Mapping, Property, TargetKind},
    options::ConvertOptions,
    reader::{BlockReader, Event},
    tree::{
        AttributeGroup, Attributes, ColorIndex, ColorMode, FileInfo, Geometry, Point, Value,
        WidgetKind, WidgetNode, WidgetTree,
    },
};
use std::path::PathBuf;

/// The result of mapping one display
#[derive(Debug, Clone)]
pub struct Conversion {
    pub forest: MappedForest,
    /// Every color the forest references, and no other
    pub colors: ResolvedColors,
    /// Skipped widgets and lossy mappings, in tree order
    pub diagnostics: Vec<ConversionDiagnostic>,
}

/// Parse ADL text into a widget tree.
pub fn parse(text: &str) -> Result<WidgetTree, Adl2GestaltError> {
    let tree = TreeBuilder::new().build(BlockReader::new(text))?;
    log::info!(
        "Parsed display with {} top-level widgets and {} colors",
        tree.root.children.len(),
        tree.colors.len()
    );
    Ok(tree)
}

/// Map a parsed display with the default options.
pub fn convert(tree: &WidgetTree) -> Result<Conversion, Adl2GestaltError> {
    convert_with(tree, &ConvertOptions::default())
}

pub fn convert_with(
    tree: &WidgetTree,
    options: &ConvertOptions,
) -> Result<Conversion, Adl2GestaltError> {
    let colors = ResolvedColors::collect(tree)?;
    let mut ctx = mapper::MapContext::new(tree, colors, options);
    let forest = mapper::map_tree(&mut ctx)?;
    let (colors, diagnostics) = ctx.finish();
    if !diagnostics.is_empty() {
        log::info!("Converted with {} warnings", diagnostics.len());
    }
    Ok(Conversion {
        forest,
        colors,
        diagnostics,
    })
}

/// Parse, convert and emit in one go.
pub fn convert_str(
    text: &str,
    options: &ConvertOptions,
) -> Result<(String, Vec<ConversionDiagnostic>), Adl2GestaltError> {
    let tree = parse(text)?;
    let conversion = convert_with(&tree, options)?;
    let output = emit_with(&conversion.forest, &conversion.colors, options);
    Ok((output, conversion.diagnostics))
}

/// Read and parse an ADL file.
///
/// When the display has no `file` block, the path is recorded in its place so
/// the output can still name its source.
pub fn load(filename: impl Into<PathBuf>) -> Result<WidgetTree, Adl2GestaltError> {
    let pb = filename.into();
    log::debug!("Reading {}", pb.display());
    let text = std::fs::read_to_string(&pb)?;
    let mut tree = parse(&text)?;
    if tree.file.name.is_none() {
        tree.file.name = Some(pb.to_string_lossy().into_owned());
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_public_types_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WidgetTree>();
        assert_send_sync::<Conversion>();
        assert_send_sync::<ColorTable>();
    }

    #[test]
    fn test_convert_str() {
        let (output, diagnostics) = convert_str(
            "display { object { x=0 y=0 width=10 height=10 } }",
            &ConvertOptions::default(),
        )
        .unwrap();
        assert!(diagnostics.is_empty());
        assert!(output.starts_with("#include colors.yml\n#include widgets.yml\n"));
        assert!(output.contains("Form: !Form\n    geometry: 10x10\n"));
    }
}
