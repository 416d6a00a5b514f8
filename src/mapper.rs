//! Turns the legacy widget tree into Gestalt widgets.
//!
//! Dispatch is a static table from [`WidgetKind`] to a [`TargetKind`], the
//! channel group the kind must be bound through, and a transform function
//! filling in the kind-specific properties. Kinds with no Gestalt
//! counterpart have no target and are skipped with a diagnostic.

mod controls;
mod graphics;
mod monitors;
mod properties;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::{format_smolstr, SmolStr};

pub use properties::rewrite_macros;

use crate::{
    color::ResolvedColors,
    diagnostics::{ConversionDiagnostic, DiagnosticReason, NodePath},
    options::ConvertOptions,
    tree::{ColorIndex, ColorMode, Geometry, Point, WidgetKind, WidgetNode, WidgetTree},
    Adl2GestaltError,
};

/// The Gestalt widget types we produce
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Arc,
    Image,
    Ellipse,
    Polygon,
    Polyline,
    Rectangle,
    Text,
    Scale,
    ByteMonitor,
    TextMonitor,
    ChoiceButton,
    Menu,
    MessageButton,
    RelatedDisplay,
    ShellCommand,
    Slider,
    TextEntry,
    Group,
    Form,
}

impl TargetKind {
    /// The YAML tag, as in `name: !Tag`
    pub fn tag(&self) -> &'static str {
        match self {
            TargetKind::Arc => "Arc",
            TargetKind::Image => "Image",
            TargetKind::Ellipse => "Ellipse",
            TargetKind::Polygon => "Polygon",
            TargetKind::Polyline => "Polyline",
            TargetKind::Rectangle => "Rectangle",
            TargetKind::Text => "Text",
            TargetKind::Scale => "Scale",
            TargetKind::ByteMonitor => "ByteMonitor",
            TargetKind::TextMonitor => "TextMonitor",
            TargetKind::ChoiceButton => "ChoiceButton",
            TargetKind::Menu => "Menu",
            TargetKind::MessageButton => "MessageButton",
            TargetKind::RelatedDisplay => "RelatedDisplay",
            TargetKind::ShellCommand => "ShellCommand",
            TargetKind::Slider => "Slider",
            TargetKind::TextEntry => "TextEntry",
            TargetKind::Group => "Group",
            TargetKind::Form => "Form",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A property value of a mapped widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Property {
    /// Written quoted
    Str(String),
    /// Written bare, e.g. `Left` or a font name
    Ident(SmolStr),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// A reference to a named color definition
    Color(SmolStr),
    Points(Vec<Point>),
    /// A list of flow mappings, e.g. related display links
    List(Vec<IndexMap<SmolStr, String>>),
    /// The value is read from the channel at runtime; nothing literal is written.
    FromChannel,
}

/// One converted widget. Geometry is relative to the parent's origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedWidget {
    pub name: SmolStr,
    pub kind: TargetKind,
    pub geometry: Geometry,
    pub properties: IndexMap<SmolStr, Property>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MappedWidget>,
}

impl MappedWidget {
    pub fn new(name: impl Into<SmolStr>, kind: TargetKind, geometry: Geometry) -> Self {
        MappedWidget {
            name: name.into(),
            kind,
            geometry,
            properties: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: Property) {
        self.properties.insert(key.into(), value);
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    pub fn child(&self, name: &str) -> Option<&MappedWidget> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// The result of mapping one node
#[derive(Debug, Clone, PartialEq)]
pub enum Mapping {
    Widget(MappedWidget),
    /// No Gestalt counterpart; the node (and anything below it) is dropped.
    Skip,
}

/// A converted display: the form plus its top-level widgets in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedForest {
    pub form: MappedWidget,
    pub widgets: Vec<MappedWidget>,
    /// File name of the source display, for the header comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl MappedForest {
    pub fn widget(&self, name: &str) -> Option<&MappedWidget> {
        self.widgets.iter().find(|w| w.name == name)
    }

    /// Every widget below the form, parents before their children.
    pub fn descendants(&self) -> Vec<&MappedWidget> {
        fn walk<'a>(widget: &'a MappedWidget, out: &mut Vec<&'a MappedWidget>) {
            out.push(widget);
            for child in &widget.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for widget in &self.widgets {
            walk(widget, &mut out);
        }
        out
    }
}

/// The channel group a kind must carry a `chan` in
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Binding {
    None,
    Monitor,
    Control,
}

type Transform = fn(
    &mut MapContext<'_>,
    &WidgetNode,
    &NodePath,
    &mut MappedWidget,
) -> Result<(), Adl2GestaltError>;

struct Target {
    kind: TargetKind,
    binding: Binding,
    /// Gets a font sized from its height
    text: bool,
    transform: Transform,
}

struct MappingEntry {
    legacy: WidgetKind,
    target: Option<Target>,
}

macro_rules! target {
    ($kind:ident, $binding:ident, $text:literal, $transform:path) => {
        Some(Target {
            kind: TargetKind::$kind,
            binding: Binding::$binding,
            text: $text,
            transform: $transform,
        })
    };
}

static MAPPINGS: &[MappingEntry] = &[
    // Graphics
    MappingEntry {
        legacy: WidgetKind::Arc,
        target: target!(Arc, None, false, graphics::arc),
    },
    MappingEntry {
        legacy: WidgetKind::Image,
        target: target!(Image, None, false, graphics::image),
    },
    MappingEntry {
        legacy: WidgetKind::Oval,
        target: target!(Ellipse, None, false, graphics::shape),
    },
    MappingEntry {
        legacy: WidgetKind::Polygon,
        target: target!(Polygon, None, false, graphics::points),
    },
    MappingEntry {
        legacy: WidgetKind::Polyline,
        target: target!(Polyline, None, false, graphics::points),
    },
    MappingEntry {
        legacy: WidgetKind::Rectangle,
        target: target!(Rectangle, None, false, graphics::shape),
    },
    MappingEntry {
        legacy: WidgetKind::Text,
        target: target!(Text, None, true, graphics::text),
    },
    MappingEntry {
        legacy: WidgetKind::Composite,
        target: target!(Group, None, false, graphics::composite),
    },
    // Monitors
    MappingEntry {
        legacy: WidgetKind::Bar,
        target: target!(Scale, Monitor, false, monitors::scale),
    },
    MappingEntry {
        legacy: WidgetKind::Indicator,
        target: target!(Scale, Monitor, false, monitors::scale),
    },
    MappingEntry {
        legacy: WidgetKind::Byte,
        target: target!(ByteMonitor, Monitor, false, monitors::byte),
    },
    MappingEntry {
        legacy: WidgetKind::TextUpdate,
        target: target!(TextMonitor, Monitor, true, monitors::text_update),
    },
    MappingEntry {
        legacy: WidgetKind::CartesianPlot,
        target: None,
    },
    MappingEntry {
        legacy: WidgetKind::Meter,
        target: None,
    },
    MappingEntry {
        legacy: WidgetKind::StripChart,
        target: None,
    },
    // Controls
    MappingEntry {
        legacy: WidgetKind::ChoiceButton,
        target: target!(ChoiceButton, Control, true, controls::choice_button),
    },
    MappingEntry {
        legacy: WidgetKind::Menu,
        target: target!(Menu, Control, true, graphics::plain),
    },
    MappingEntry {
        legacy: WidgetKind::MessageButton,
        target: target!(MessageButton, Control, true, controls::message_button),
    },
    MappingEntry {
        legacy: WidgetKind::RelatedDisplay,
        target: target!(RelatedDisplay, None, true, controls::related_display),
    },
    MappingEntry {
        legacy: WidgetKind::ShellCommand,
        target: target!(ShellCommand, None, true, controls::shell_command),
    },
    MappingEntry {
        legacy: WidgetKind::Valuator,
        target: target!(Slider, Control, false, controls::valuator),
    },
    MappingEntry {
        legacy: WidgetKind::TextEntry,
        target: target!(TextEntry, Control, true, controls::text_entry),
    },
    MappingEntry {
        legacy: WidgetKind::WheelSwitch,
        target: None,
    },
    // Special
    MappingEntry {
        legacy: WidgetKind::EmbeddedDisplay,
        target: None,
    },
    MappingEntry {
        legacy: WidgetKind::Display,
        target: target!(Form, None, false, graphics::plain),
    },
];

fn lookup(kind: WidgetKind) -> Option<&'static Target> {
    MAPPINGS
        .iter()
        .find(|entry| entry.legacy == kind)
        .and_then(|entry| entry.target.as_ref())
}

/// The Gestalt kind a legacy kind becomes, or `None` if it is skipped.
pub fn target_kind(kind: WidgetKind) -> Option<TargetKind> {
    lookup(kind).map(|target| target.kind)
}

/// Working state of one conversion: the colors handed out so far and the
/// diagnostics recorded.
pub struct MapContext<'a> {
    tree: &'a WidgetTree,
    options: &'a ConvertOptions,
    colors: ResolvedColors,
    diagnostics: Vec<ConversionDiagnostic>,
}

impl<'a> MapContext<'a> {
    pub fn new(tree: &'a WidgetTree, colors: ResolvedColors, options: &'a ConvertOptions) -> Self {
        MapContext {
            tree,
            options,
            colors,
            diagnostics: Vec::new(),
        }
    }

    pub fn options(&self) -> &ConvertOptions {
        self.options
    }

    pub fn diagnostics(&self) -> &[ConversionDiagnostic] {
        &self.diagnostics
    }

    /// Record a skip or a lossy mapping.
    pub fn diagnose(&mut self, path: &NodePath, kind: WidgetKind, reason: DiagnosticReason) {
        let diagnostic = ConversionDiagnostic {
            path: path.clone(),
            kind,
            reason,
        };
        log::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    fn color(&mut self, index: ColorIndex, line: usize) -> Result<Property, Adl2GestaltError> {
        let color = self.colors.intern(&self.tree.colors, index, line)?;
        Ok(Property::Color(color.name.clone()))
    }

    pub fn finish(self) -> (ResolvedColors, Vec<ConversionDiagnostic>) {
        (self.colors, self.diagnostics)
    }
}

/// Map the whole tree: the display becomes the form, its children the widgets.
pub fn map_tree(ctx: &mut MapContext<'_>) -> Result<MappedForest, Adl2GestaltError> {
    let tree = ctx.tree;
    let form = map_form(ctx, &tree.root)?;
    let root = NodePath::root();
    let mut widgets = Vec::with_capacity(tree.root.children.len());
    for (index, child) in tree.root.children.iter().enumerate() {
        let path = root.child(index, child.kind);
        if let Mapping::Widget(widget) = map(ctx, child, Point::ORIGIN, &path)? {
            widgets.push(widget);
        }
    }
    log::info!(
        "Mapped {} top-level widgets with {} diagnostics",
        widgets.len(),
        ctx.diagnostics.len()
    );
    let source = tree
        .file
        .name
        .as_deref()
        .and_then(|name| std::path::Path::new(name).file_name())
        .and_then(|name| name.to_str())
        .map(str::to_string);
    Ok(MappedForest {
        form,
        widgets,
        source,
    })
}

fn map_form(ctx: &mut MapContext<'_>, root: &WidgetNode) -> Result<MappedWidget, Adl2GestaltError> {
    let mut form = MappedWidget::new("Form", TargetKind::Form, root.geometry);
    form.set("title", Property::Str(ctx.tree.title()));
    form.set("margins", Property::Ident(ctx.options.margins.as_str().into()));
    apply_colors(ctx, root, &NodePath::root(), &mut form)?;
    Ok(form)
}

/// Map one node, and for composites its subtree.
///
/// `parent_origin` is the absolute origin of the enclosing composite, or
/// `(0, 0)` at top level.
pub fn map(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    parent_origin: Point,
    path: &NodePath,
) -> Result<Mapping, Adl2GestaltError> {
    let Some(target) = lookup(node.kind) else {
        ctx.diagnose(path, node.kind, DiagnosticReason::Unsupported);
        return Ok(Mapping::Skip);
    };
    log::debug!("Mapping {} as {}", path, target.kind);
    let index = path.last().map_or(0, |segment| segment.index);
    let name = format_smolstr!("{}_{}", node.kind.keyword().replace(' ', "_"), index);
    let mut widget = MappedWidget::new(name, target.kind, node.geometry.relative_to(parent_origin));

    bind_channel(node, path, target.binding, &mut widget)?;
    apply_colors(ctx, node, path, &mut widget)?;
    if target.text {
        properties::font(ctx, node, &mut widget);
    }
    if let Some(vis) = node.attributes.dynamic.as_ref().and_then(|d| d.text("vis")) {
        if vis != "static" {
            ctx.diagnose(
                path,
                node.kind,
                DiagnosticReason::DroppedField {
                    field: "vis".into(),
                    value: vis.to_string(),
                },
            );
        }
    }
    (target.transform)(ctx, node, path, &mut widget)?;

    if node.kind.is_container() {
        let origin = node.geometry.origin();
        for (index, child) in node.children.iter().enumerate() {
            let child_path = path.child(index, child.kind);
            if let Mapping::Widget(mapped) = map(ctx, child, origin, &child_path)? {
                widget.children.push(mapped);
            }
        }
    }
    Ok(Mapping::Widget(widget))
}

fn bind_channel(
    node: &WidgetNode,
    path: &NodePath,
    binding: Binding,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    // Files older than ADL 2.2 call the channel `ctrl` / `rdbk`.
    let (group, legacy_key, field) = match binding {
        Binding::None => return Ok(()),
        Binding::Monitor => (node.attributes.monitor.as_ref(), "rdbk", "monitor.chan"),
        Binding::Control => (node.attributes.control.as_ref(), "ctrl", "control.chan"),
    };
    let chan = group
        .and_then(|g| g.text("chan").or_else(|| g.text(legacy_key)))
        .map(str::trim)
        .filter(|chan| !chan.is_empty())
        .ok_or_else(|| Adl2GestaltError::AttributeMapping {
            path: path.clone(),
            field,
        })?;
    widget.set("pv", Property::Str(rewrite_macros(chan)));
    Ok(())
}

fn apply_colors(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    let (fg, bg) = node.colors();
    if let Some(fg) = fg {
        let color = ctx.color(fg, node.line)?;
        widget.set("foreground", color);
    }
    if let Some(bg) = bg {
        let color = ctx.color(bg, node.line)?;
        widget.set("background", color);
    }
    match node.color_mode() {
        ColorMode::Static => {}
        mode => ctx.diagnose(path, node.kind, DiagnosticReason::LossyColorMode(mode)),
    }
    Ok(())
}
