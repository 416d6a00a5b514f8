use super::{properties, MapContext, MappedWidget, Property};
use crate::{diagnostics::NodePath, tree::WidgetNode, Adl2GestaltError};

/// Bars and indicators
pub(super) fn scale(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    properties::direction(node, widget);
    properties::limits(node, widget);
    properties::decorations(ctx, node, path);
    Ok(())
}

pub(super) fn byte(
    _ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    _path: &NodePath,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    properties::direction(node, widget);
    for (key, target) in [("sbit", "start-bit"), ("ebit", "end-bit")] {
        if let Some(bit) = node.attributes.field(key).and_then(|v| v.as_int()) {
            widget.set(target, Property::Int(bit));
        }
    }
    Ok(())
}

pub(super) fn text_update(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    properties::alignment(ctx, node, path, widget);
    properties::format(ctx, node, path, widget);
    properties::limits(node, widget);
    Ok(())
}
