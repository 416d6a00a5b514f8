//! Static graphics, text and composites.

use super::{properties, MapContext, MappedWidget, Property};
use crate::{
    diagnostics::NodePath,
    tree::{Point, WidgetNode},
    Adl2GestaltError,
};

/// MEDM angles are in 1/64 degree.
const DEGREE_UNITS: f64 = 64.0;

/// Rectangles and ovals
pub(super) fn shape(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    properties::stroke(ctx, node, path, widget);
    Ok(())
}

/// Kinds that need nothing beyond geometry, channel and colors.
pub(super) fn plain(
    _ctx: &mut MapContext<'_>,
    _node: &WidgetNode,
    _path: &NodePath,
    _widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    Ok(())
}

pub(super) fn arc(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    properties::stroke(ctx, node, path, widget);
    let angle = |key: &str, default: i64| {
        let units = node.attributes.field(key).and_then(|v| v.as_int()).unwrap_or(default);
        Property::Float(units as f64 / DEGREE_UNITS)
    };
    widget.set("start-angle", angle("beginAngle", 0));
    widget.set("span", angle("pathAngle", 90 * 64));
    Ok(())
}

pub(super) fn image(
    _ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    _path: &NodePath,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    if let Some(file) = node.attributes.text("image name") {
        widget.set("file", Property::Str(file.to_string()));
    }
    Ok(())
}

/// Polylines and polygons; points become relative to the widget's own origin.
pub(super) fn points(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    if node.attributes.points.is_empty() {
        return Err(Adl2GestaltError::AttributeMapping {
            path: path.clone(),
            field: "points",
        });
    }
    let origin = node.geometry.origin();
    let points = node
        .attributes
        .points
        .iter()
        .map(|p| Point::new(p.x - origin.x, p.y - origin.y))
        .collect();
    widget.set("points", Property::Points(points));
    properties::stroke(ctx, node, path, widget);
    Ok(())
}

pub(super) fn text(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    if let Some(text) = node.attributes.text("textix") {
        widget.set("text", Property::Str(text.to_string()));
    }
    properties::alignment(ctx, node, path, widget);
    Ok(())
}

/// Children are mapped by the caller; only the file reference needs care.
pub(super) fn composite(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    _widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    if node
        .attributes
        .text("composite file")
        .is_some_and(|file| !file.is_empty())
    {
        properties::drop_field(ctx, node, path, "composite file");
    }
    Ok(())
}
