use std::sync::LazyLock;

use regex::{Captures, Regex};
use smol_str::format_smolstr;

use super::{MapContext, MappedWidget, Property};
use crate::{
    diagnostics::{DiagnosticReason, NodePath},
    tree::{WidgetKind, WidgetNode},
};

/// The pixel heights of the MEDM widget fonts.
const FONT_LADDER: [i32; 17] = [4, 6, 8, 10, 12, 13, 14, 16, 18, 20, 22, 24, 30, 36, 40, 48, 60];

static MACRO_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    // $(NAME) or ${NAME}
    #[allow(clippy::unwrap_used)] // Safe because the regex is valid
    Regex::new(r"\$\(([^)]*)\)|\$\{([^}]*)\}").unwrap()
});

/// Rewrite MEDM macro references, `$(P)` and `${P}`, as Gestalt's `{P}`.
pub fn rewrite_macros(text: &str) -> String {
    MACRO_REFERENCE
        .replace_all(text, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            format!("{{{}}}", name)
        })
        .into_owned()
}

/// MEDM picks the largest font that fits the widget's height; width plays no part.
pub(super) fn font_size(height: i32) -> i32 {
    FONT_LADDER
        .iter()
        .copied()
        .take_while(|&size| size <= height)
        .last()
        .unwrap_or(FONT_LADDER[0])
}

pub(super) fn font(ctx: &MapContext<'_>, node: &WidgetNode, widget: &mut MappedWidget) {
    let size = font_size(node.geometry.height);
    widget.set(
        "font",
        Property::Ident(format_smolstr!(
            "-{} - normal - {}",
            ctx.options().font_family,
            size
        )),
    );
}

fn approximated(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    field: &str,
    value: &str,
    replacement: &str,
) {
    ctx.diagnose(
        path,
        node.kind,
        DiagnosticReason::Approximated {
            field: field.into(),
            value: value.to_string(),
            replacement: replacement.to_string(),
        },
    );
}

/// Record a text field that Gestalt cannot express, if the widget sets it.
pub(super) fn drop_field(ctx: &mut MapContext<'_>, node: &WidgetNode, path: &NodePath, key: &str) {
    if let Some(value) = node.attributes.text(key) {
        ctx.diagnose(
            path,
            node.kind,
            DiagnosticReason::DroppedField {
                field: key.into(),
                value: value.to_string(),
            },
        );
    }
}

pub(super) fn alignment(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    widget: &mut MappedWidget,
) {
    let Some(align) = node.attributes.text("align") else {
        return;
    };
    let alignment = match align {
        "horiz. left" => "Left",
        "horiz. centered" => "Center",
        "horiz. right" => "Right",
        other => {
            approximated(ctx, node, path, "align", other, "Left");
            "Left"
        }
    };
    widget.set("alignment", Property::Ident(alignment.into()));
}

pub(super) fn format(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    widget: &mut MappedWidget,
) {
    let Some(format) = node.attributes.text("format") else {
        return;
    };
    let target = match format {
        "decimal" => "decimal",
        "exponential" => "exponential",
        "engr. notation" => "engineering",
        "compact" => "compact",
        "hexadecimal" => "hex",
        "octal" => "octal",
        "string" => "string",
        // truncated, sexagesimal, sexagesimal-hms, sexagesimal-dms
        other => {
            approximated(ctx, node, path, "format", other, "decimal");
            "decimal"
        }
    };
    widget.set("format", Property::Ident(target.into()));
}

/// Operating range and precision.
///
/// A `channel` source (the default) defers the value to runtime and emits
/// only a marker; `default` and `user specified` emit the `*Default` literal.
pub(super) fn limits(node: &WidgetNode, widget: &mut MappedWidget) {
    let limits = node.attributes.limits.as_ref();
    let from_channel = |src: &str| {
        limits.and_then(|l| l.text(src)).unwrap_or("channel") == "channel"
    };

    for (src, default, key, fallback) in [
        ("loprSrc", "loprDefault", "minimum", 0.0),
        ("hoprSrc", "hoprDefault", "maximum", 1.0),
    ] {
        let value = if from_channel(src) {
            Property::FromChannel
        } else {
            Property::Float(limits.and_then(|l| l.float(default)).unwrap_or(fallback))
        };
        widget.set(key, value);
    }

    let precision = if from_channel("precSrc") {
        Property::FromChannel
    } else {
        Property::Int(limits.and_then(|l| l.int("precDefault")).unwrap_or(0))
    };
    widget.set("precision", precision);
}

/// Line width, style and fill of a graphic's basic attribute.
///
/// An outline shape draws only its border, in the foreground color. A
/// polyline is all line, so only its width carries over. A solid fill
/// ignores the width.
pub(super) fn stroke(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    widget: &mut MappedWidget,
) {
    let Some(basic) = node.attributes.basic.as_ref() else {
        return;
    };
    let width = basic.int("width").filter(|&width| width > 0);
    if node.kind == WidgetKind::Polyline {
        if let Some(width) = width {
            widget.set("line-width", Property::Int(width));
        }
    } else if basic.text("fill") == Some("outline") {
        if let Some(color) = widget.properties.shift_remove("foreground") {
            widget.set("border-color", color);
        }
        widget.set("border-width", Property::Int(width.unwrap_or(1)));
    }
    if let Some(style) = basic.text("style").filter(|&style| style != "solid") {
        approximated(ctx, node, path, "style", style, "solid");
    }
}

/// Bar and indicator decorations Gestalt's scale has no equivalent for.
pub(super) fn decorations(ctx: &mut MapContext<'_>, node: &WidgetNode, path: &NodePath) {
    for (key, plain) in [("label", "none"), ("fillmod", "from edge")] {
        if node.attributes.text(key).is_some_and(|value| value != plain) {
            drop_field(ctx, node, path, key);
        }
    }
}

/// Fill direction. Documented MEDM semantics: up/down fill vertically,
/// left/right horizontally.
pub(super) fn direction(node: &WidgetNode, widget: &mut MappedWidget) {
    if let Some(direction) = node.attributes.text("direction") {
        let horizontal = matches!(direction, "left" | "right");
        widget.set("horizontal", Property::Bool(horizontal));
    }
}

/// A label with MEDM's leading `-` (hide the icon) removed.
pub(super) fn label(node: &WidgetNode) -> Option<&str> {
    node.attributes
        .text("label")
        .map(|label| label.strip_prefix('-').unwrap_or(label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2, 4)]
    #[case(4, 4)]
    #[case(15, 14)]
    #[case(20, 20)]
    #[case(35, 30)]
    #[case(200, 60)]
    fn test_font_size(#[case] height: i32, #[case] expected: i32) {
        assert_eq!(font_size(height), expected);
    }

    #[rstest]
    #[case("$(P)$(R)Temp", "{P}{R}Temp")]
    #[case("${SYS}:ai1", "{SYS}:ai1")]
    #[case("plain:pv", "plain:pv")]
    #[case("$(P", "$(P")]
    fn test_rewrite_macros(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(rewrite_macros(input), expected);
    }
}
