use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{color::ColorTable, Adl2GestaltError};

/// An index into the display's color table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColorIndex(pub u8);

impl fmt::Display for ColorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a widget picks its colors at runtime
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    /// Fixed foreground/background
    Static,
    /// Colored by alarm severity
    Alarm,
    /// Colored by a per-value rule
    Discrete,
}

impl FromStr for ColorMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(ColorMode::Static),
            "alarm" => Ok(ColorMode::Alarm),
            "discrete" => Ok(ColorMode::Discrete),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Static => write!(f, "static"),
            ColorMode::Alarm => write!(f, "alarm"),
            ColorMode::Discrete => write!(f, "discrete"),
        }
    }
}

/// A typed field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Color(ColorIndex),
    Mode(ColorMode),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<ColorIndex> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_mode(&self) -> Option<ColorMode> {
        match self {
            Value::Mode(m) => Some(*m),
            _ => None,
        }
    }
}

/// A named block of fields, possibly holding further blocks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeGroup {
    pub name: SmolStr,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<SmolStr, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<AttributeGroup>,
    pub line: usize,
}

impl AttributeGroup {
    pub fn new(name: impl Into<SmolStr>, line: usize) -> Self {
        AttributeGroup {
            name: name.into(),
            fields: IndexMap::new(),
            groups: Vec::new(),
            line,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_float)
    }

    pub fn color(&self, key: &str) -> Option<ColorIndex> {
        self.get(key).and_then(Value::as_color)
    }

    pub fn mode(&self, key: &str) -> Option<ColorMode> {
        self.get(key).and_then(Value::as_mode)
    }

    pub fn group(&self, name: &str) -> Option<&AttributeGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Every color index in this group and its subgroups, in declaration order.
    pub fn color_refs(&self) -> Vec<ColorIndex> {
        let mut refs: Vec<ColorIndex> = self.fields.values().filter_map(Value::as_color).collect();
        for group in &self.groups {
            refs.extend(group.color_refs());
        }
        refs
    }
}

/// The compound attribute groups a widget can carry
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupKind {
    Object,
    Basic,
    Dynamic,
    Monitor,
    Control,
    Limits,
    Plot,
    Points,
}

impl GroupKind {
    pub fn from_keyword(name: &str) -> Option<Self> {
        match name {
            "object" => Some(GroupKind::Object),
            "basic attribute" => Some(GroupKind::Basic),
            "dynamic attribute" => Some(GroupKind::Dynamic),
            "monitor" => Some(GroupKind::Monitor),
            "control" => Some(GroupKind::Control),
            "limits" => Some(GroupKind::Limits),
            "plotcom" => Some(GroupKind::Plot),
            "points" => Some(GroupKind::Points),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            GroupKind::Object => "object",
            GroupKind::Basic => "basic attribute",
            GroupKind::Dynamic => "dynamic attribute",
            GroupKind::Monitor => "monitor",
            GroupKind::Control => "control",
            GroupKind::Limits => "limits",
            GroupKind::Plot => "plotcom",
            GroupKind::Points => "points",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

/// A widget rectangle. Legacy geometry is absolute; mapped geometry is
/// relative to the parent's origin.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Geometry {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn relative_to(&self, origin: Point) -> Geometry {
        Geometry {
            x: self.x - origin.x,
            y: self.y - origin.y,
            ..*self
        }
    }

    pub fn absolute_from(&self, origin: Point) -> Geometry {
        Geometry {
            x: self.x + origin.x,
            y: self.y + origin.y,
            ..*self
        }
    }
}

/// All attribute groups of one widget, except the geometry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic: Option<AttributeGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<AttributeGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor: Option<AttributeGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<AttributeGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<AttributeGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<AttributeGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Point>,
    /// Fields written directly in the widget block
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<SmolStr, Value>,
    /// Blocks we have no dedicated slot for, such as `display[0]` or `trace[1]`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<AttributeGroup>,
}

impl Attributes {
    pub fn group(&self, kind: GroupKind) -> Option<&AttributeGroup> {
        match kind {
            GroupKind::Basic => self.basic.as_ref(),
            GroupKind::Dynamic => self.dynamic.as_ref(),
            GroupKind::Monitor => self.monitor.as_ref(),
            GroupKind::Control => self.control.as_ref(),
            GroupKind::Limits => self.limits.as_ref(),
            GroupKind::Plot => self.plot.as_ref(),
            GroupKind::Object | GroupKind::Points => None,
        }
    }

    pub(crate) fn slot_mut(&mut self, kind: GroupKind) -> Option<&mut Option<AttributeGroup>> {
        match kind {
            GroupKind::Basic => Some(&mut self.basic),
            GroupKind::Dynamic => Some(&mut self.dynamic),
            GroupKind::Monitor => Some(&mut self.monitor),
            GroupKind::Control => Some(&mut self.control),
            GroupKind::Limits => Some(&mut self.limits),
            GroupKind::Plot => Some(&mut self.plot),
            GroupKind::Object | GroupKind::Points => None,
        }
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    /// Indexed entries such as `display[0]`, `display[1]`, ordered by index.
    pub fn indexed(&self, prefix: &str) -> Vec<&AttributeGroup> {
        let mut found: Vec<(usize, &AttributeGroup)> = self
            .other
            .iter()
            .filter_map(|g| {
                let rest = g.name.strip_prefix(prefix)?;
                let index = rest.strip_prefix('[')?.strip_suffix(']')?.parse().ok()?;
                Some((index, g))
            })
            .collect();
        found.sort_by_key(|(index, _)| *index);
        found.into_iter().map(|(_, g)| g).collect()
    }

    fn compound(&self) -> impl Iterator<Item = &AttributeGroup> {
        [
            &self.basic,
            &self.dynamic,
            &self.monitor,
            &self.control,
            &self.limits,
            &self.plot,
        ]
        .into_iter()
        .flatten()
    }

    pub fn color_refs(&self) -> Vec<ColorIndex> {
        let mut refs: Vec<ColorIndex> = self.fields.values().filter_map(Value::as_color).collect();
        for group in self.compound().chain(self.other.iter()) {
            refs.extend(group.color_refs());
        }
        refs
    }
}

macro_rules! widget_kinds {
    ($($variant:ident => $keyword:literal),* $(,)?) => {
        /// The legacy widget types
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum WidgetKind {
            $($variant),*
        }

        impl WidgetKind {
            pub const ALL: &'static [WidgetKind] = &[$(WidgetKind::$variant),*];

            pub fn keyword(&self) -> &'static str {
                match self {
                    $(WidgetKind::$variant => $keyword),*
                }
            }

            pub fn from_keyword(keyword: &str) -> Option<Self> {
                match keyword {
                    $($keyword => Some(WidgetKind::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

widget_kinds! {
    Display => "display",
    Composite => "composite",
    Arc => "arc",
    Image => "image",
    Oval => "oval",
    Polygon => "polygon",
    Polyline => "polyline",
    Rectangle => "rectangle",
    Text => "text",
    Bar => "bar",
    Byte => "byte",
    CartesianPlot => "cartesian plot",
    Indicator => "indicator",
    Meter => "meter",
    StripChart => "strip chart",
    TextUpdate => "text update",
    ChoiceButton => "choice button",
    Menu => "menu",
    MessageButton => "message button",
    RelatedDisplay => "related display",
    ShellCommand => "shell command",
    Valuator => "valuator",
    TextEntry => "text entry",
    WheelSwitch => "wheel switch",
    EmbeddedDisplay => "embedded display",
}

impl WidgetKind {
    /// Only containers may hold child widgets.
    pub fn is_container(&self) -> bool {
        matches!(self, WidgetKind::Display | WidgetKind::Composite)
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One widget of the legacy display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetNode {
    pub kind: WidgetKind,
    pub geometry: Geometry,
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<WidgetNode>,
    /// Source line of the widget's opening brace
    pub line: usize,
}

impl WidgetNode {
    pub fn new(kind: WidgetKind, geometry: Geometry) -> Self {
        WidgetNode {
            kind,
            geometry,
            attributes: Attributes::default(),
            children: Vec::new(),
            line: 0,
        }
    }

    /// The group holding the channel binding, if any.
    pub fn channel_group(&self) -> Option<&AttributeGroup> {
        self.attributes
            .control
            .as_ref()
            .or(self.attributes.monitor.as_ref())
    }

    /// Foreground and background as MEDM draws them: the channel group
    /// colors win over widget-level ones, which win over the basic attribute.
    pub fn colors(&self) -> (Option<ColorIndex>, Option<ColorIndex>) {
        let channel = self.channel_group();
        let pick = |key: &str| {
            channel
                .and_then(|g| g.color(key))
                .or_else(|| self.attributes.field(key).and_then(Value::as_color))
        };
        let fg = pick("clr")
            .or_else(|| self.attributes.basic.as_ref().and_then(|b| b.color("clr")));
        let bg = pick("bclr");
        (fg, bg)
    }

    /// The color mode, from `clrmod` or the dynamic attribute.
    pub fn color_mode(&self) -> ColorMode {
        self.attributes
            .field("clrmod")
            .and_then(Value::as_mode)
            .or_else(|| self.attributes.dynamic.as_ref().and_then(|d| d.mode("clr")))
            .unwrap_or(ColorMode::Static)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A parsed ADL document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetTree {
    pub file: FileInfo,
    pub colors: ColorTable,
    /// The `display` widget; every other widget is below it.
    pub root: WidgetNode,
    /// Top-level blocks we do not interpret
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<AttributeGroup>,
}

impl WidgetTree {
    /// A title for the display, from the file name recorded in the `file` block.
    pub fn title(&self) -> String {
        self.file
            .name
            .as_deref()
            .and_then(|name| std::path::Path::new(name).file_stem())
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or("display")
            .to_string()
    }

    /// Check every color reference against the color table.
    pub(crate) fn check_color_refs(&self) -> Result<(), Adl2GestaltError> {
        fn walk(node: &WidgetNode, table: &ColorTable) -> Result<(), Adl2GestaltError> {
            for index in node.attributes.color_refs() {
                table.resolve(index, node.line)?;
            }
            node.children.iter().try_for_each(|child| walk(child, table))
        }
        walk(&self.root, &self.colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_round_trip() {
        for kind in WidgetKind::ALL {
            assert_eq!(WidgetKind::from_keyword(kind.keyword()), Some(*kind));
        }
        assert_eq!(WidgetKind::from_keyword("display[0]"), None);
    }

    #[test]
    fn test_relative_geometry() {
        let g = Geometry::new(120, 130, 10, 5);
        let rel = g.relative_to(Point::new(100, 100));
        assert_eq!(rel, Geometry::new(20, 30, 10, 5));
        assert_eq!(rel.absolute_from(Point::new(100, 100)), g);
    }

    #[test]
    fn test_indexed_groups_are_sorted() {
        let mut attrs = Attributes::default();
        attrs.other.push(AttributeGroup::new("display[1]", 3));
        attrs.other.push(AttributeGroup::new("trace[0]", 4));
        attrs.other.push(AttributeGroup::new("display[0]", 5));
        let names: Vec<_> = attrs.indexed("display").iter().map(|g| g.name.clone()).collect();
        assert_eq!(names, vec!["display[0]", "display[1]"]);
    }

    #[test]
    fn test_channel_colors_win() {
        let mut node = WidgetNode::new(WidgetKind::TextUpdate, Geometry::new(0, 0, 10, 10));
        let mut basic = AttributeGroup::new("basic attribute", 1);
        basic.fields.insert("clr".into(), Value::Color(ColorIndex(3)));
        node.attributes.basic = Some(basic);
        assert_eq!(node.colors(), (Some(ColorIndex(3)), None));

        let mut monitor = AttributeGroup::new("monitor", 2);
        monitor.fields.insert("clr".into(), Value::Color(ColorIndex(14)));
        monitor.fields.insert("bclr".into(), Value::Color(ColorIndex(4)));
        node.attributes.monitor = Some(monitor);
        assert_eq!(node.colors(), (Some(ColorIndex(14)), Some(ColorIndex(4))));
    }
}
