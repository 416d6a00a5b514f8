use smol_str::SmolStr;

use crate::{
    color::{ColorMapBuilder, ColorTable, MAX_COLORS},
    reader::{Event, RawValue},
    tree::{
        AttributeGroup, Attributes, ColorIndex, ColorMode, FileInfo, Geometry, GroupKind, Point,
        Value, WidgetKind, WidgetNode, WidgetTree,
    },
    Adl2GestaltError,
};

/// Blocks nested deeper than this are rejected.
pub const MAX_DEPTH: usize = 64;

const LIMIT_SOURCES: &[&str] = &["channel", "default", "user specified"];
const DIRECTIONS: &[&str] = &["up", "down", "left", "right"];
const STACKINGS: &[&str] = &["row", "column", "row column"];
const FILLS: &[&str] = &["solid", "outline"];
const LINE_STYLES: &[&str] = &["solid", "dash", "bigdash"];

enum FieldType {
    Int,
    Float,
    Color,
    Mode,
    Choice(&'static [&'static str], &'static str),
    Text,
}

fn field_type(group: Option<&str>, key: &str) -> FieldType {
    match (group, key) {
        // In a dynamic attribute `clr` is the color mode, not a color.
        (Some("dynamic attribute"), "clr") => FieldType::Mode,
        (_, "clr" | "bclr" | "data_clr") => FieldType::Color,
        (_, "clrmod") => FieldType::Mode,
        (
            _,
            "x" | "y" | "width" | "height" | "beginAngle" | "pathAngle" | "sbit" | "ebit"
            | "precDefault" | "ncolors" | "gridSpacing" | "gridOn" | "snapToGrid" | "r" | "g"
            | "b" | "inten",
        ) => FieldType::Int,
        (_, "loprDefault" | "hoprDefault" | "dPrecision" | "period") => FieldType::Float,
        (_, "loprSrc" | "hoprSrc" | "precSrc") => {
            FieldType::Choice(LIMIT_SOURCES, "one of channel, default, user specified")
        }
        (_, "direction") => FieldType::Choice(DIRECTIONS, "one of up, down, left, right"),
        (_, "stacking") => FieldType::Choice(STACKINGS, "one of row, column, row column"),
        (Some("basic attribute"), "fill") => FieldType::Choice(FILLS, "one of solid, outline"),
        (Some("basic attribute"), "style") => {
            FieldType::Choice(LINE_STYLES, "one of solid, dash, bigdash")
        }
        _ => FieldType::Text,
    }
}

fn typed_value(
    group: Option<&str>,
    key: &str,
    raw: RawValue,
    line: usize,
) -> Result<Value, Adl2GestaltError> {
    let text = raw.as_str().trim();
    let bad = |expected: &'static str| Adl2GestaltError::Value {
        line,
        field: key.to_string(),
        value: text.to_string(),
        expected,
    };
    match field_type(group, key) {
        FieldType::Int => text.parse().map(Value::Int).map_err(|_| bad("an integer")),
        FieldType::Float => match text.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            _ => Err(bad("a number")),
        },
        FieldType::Color => {
            let index: i64 = text.parse().map_err(|_| bad("a color index"))?;
            let index = u8::try_from(index).map_err(|_| Adl2GestaltError::ColorIndex {
                line,
                index,
                available: MAX_COLORS,
            })?;
            Ok(Value::Color(ColorIndex(index)))
        }
        FieldType::Mode => text
            .parse::<ColorMode>()
            .map(Value::Mode)
            .map_err(|_| bad("one of static, alarm, discrete")),
        FieldType::Choice(options, expected) => {
            if options.contains(&text) {
                Ok(Value::Text(text.to_string()))
            } else {
                Err(bad(expected))
            }
        }
        FieldType::Text => match raw {
            RawValue::Quoted(s) | RawValue::Bare(s) => Ok(Value::Text(s)),
        },
    }
}

struct WidgetFrame {
    kind: WidgetKind,
    line: usize,
    object: Option<AttributeGroup>,
    attributes: Attributes,
    children: Vec<WidgetNode>,
}

impl WidgetFrame {
    fn new(kind: WidgetKind, line: usize) -> Self {
        WidgetFrame {
            kind,
            line,
            object: None,
            attributes: Attributes::default(),
            children: Vec::new(),
        }
    }

    fn attach(&mut self, group: AttributeGroup, points: Vec<Point>) {
        match GroupKind::from_keyword(&group.name) {
            Some(GroupKind::Object) => self.object = Some(group),
            Some(GroupKind::Points) => self.attributes.points.extend(points),
            Some(kind) => {
                if let Some(slot) = self.attributes.slot_mut(kind) {
                    if slot.is_some() {
                        log::debug!(
                            "'{}' on line {} has a second {} block; the later one wins",
                            self.kind,
                            self.line,
                            kind.keyword()
                        );
                    }
                    *slot = Some(group);
                }
            }
            None => self.attributes.other.push(group),
        }
    }

    fn finish(self) -> Result<WidgetNode, Adl2GestaltError> {
        let kind = self.kind;
        let object = self.object.ok_or_else(|| {
            Adl2GestaltError::structure(self.line, format!("'{}' has no object block", kind))
        })?;
        let coordinate = |key: &'static str, min: i64| -> Result<i32, Adl2GestaltError> {
            let value = object.int(key).ok_or_else(|| {
                Adl2GestaltError::structure(
                    object.line,
                    format!("object block of '{}' has no '{}'", kind, key),
                )
            })?;
            let bad = || Adl2GestaltError::Value {
                line: object.line,
                field: key.to_string(),
                value: value.to_string(),
                expected: if min > 0 {
                    "a positive integer"
                } else {
                    "a non-negative integer"
                },
            };
            if value < min {
                return Err(bad());
            }
            i32::try_from(value).map_err(|_| bad())
        };
        let geometry = Geometry::new(
            coordinate("x", 0)?,
            coordinate("y", 0)?,
            coordinate("width", 1)?,
            coordinate("height", 1)?,
        );
        log::debug!("Parsed '{}' on line {} at {:?}", kind, self.line, geometry);
        Ok(WidgetNode {
            kind,
            geometry,
            attributes: self.attributes,
            children: self.children,
            line: self.line,
        })
    }
}

struct GroupFrame {
    group: AttributeGroup,
    points: Vec<Point>,
    items: Vec<(RawValue, usize)>,
}

enum Frame {
    Widget(WidgetFrame),
    Group(GroupFrame),
    /// A composite's `children { }` block
    Children,
    ColorMap(ColorMapBuilder),
}

#[derive(Clone, Copy)]
enum Context {
    TopLevel,
    Widget(WidgetKind),
    Children,
    Group,
    ColorMap,
}

/// Assembles a [`WidgetTree`] from the reader's events.
#[derive(Default)]
pub struct TreeBuilder {
    stack: Vec<Frame>,
    file: FileInfo,
    colors: Option<ColorTable>,
    display: Option<WidgetNode>,
    top_level: Vec<WidgetNode>,
    /// Attribute blocks written before the widget they belong to (pre-2.2 files)
    pending: Vec<AttributeGroup>,
    extras: Vec<AttributeGroup>,
    last_line: usize,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build<I>(mut self, events: I) -> Result<WidgetTree, Adl2GestaltError>
    where
        I: IntoIterator<Item = Result<Event, Adl2GestaltError>>,
    {
        for event in events {
            let event = event?;
            self.last_line = event.line();
            match event {
                Event::Enter { name, line } => self.enter(name, line)?,
                Event::Field { key, value, line } => self.field(key, value, line)?,
                Event::Point { x, y, line } => self.point(x, y, line)?,
                Event::Item { value, line } => self.item(value, line)?,
                Event::Exit { line } => self.exit(line)?,
            }
        }
        self.finish()
    }

    fn context(&self) -> Context {
        match self.stack.last() {
            None => Context::TopLevel,
            Some(Frame::Widget(w)) => Context::Widget(w.kind),
            Some(Frame::Children) => Context::Children,
            Some(Frame::Group(_)) => Context::Group,
            Some(Frame::ColorMap(_)) => Context::ColorMap,
        }
    }

    fn enter(&mut self, name: SmolStr, line: usize) -> Result<(), Adl2GestaltError> {
        if self.stack.len() >= MAX_DEPTH {
            return Err(Adl2GestaltError::structure(
                line,
                format!("blocks nested deeper than {} levels", MAX_DEPTH),
            ));
        }
        let context = self.context();
        if matches!(
            context,
            Context::TopLevel | Context::Widget(_) | Context::Children
        ) {
            if let Some(kind) = WidgetKind::from_keyword(&name) {
                return self.enter_widget(kind, context, line);
            }
        }
        let frame = match (context, name.as_str()) {
            (Context::Widget(parent), "children") => {
                if !parent.is_container() {
                    return Err(Adl2GestaltError::structure(
                        line,
                        format!("'{}' cannot contain child widgets", parent),
                    ));
                }
                Frame::Children
            }
            (Context::TopLevel, "color map") => Frame::ColorMap(ColorMapBuilder::new(line)),
            _ => Frame::Group(GroupFrame {
                group: AttributeGroup::new(name.clone(), line),
                points: Vec::new(),
                items: Vec::new(),
            }),
        };
        self.stack.push(frame);
        Ok(())
    }

    fn enter_widget(
        &mut self,
        kind: WidgetKind,
        context: Context,
        line: usize,
    ) -> Result<(), Adl2GestaltError> {
        if let Context::Widget(parent) = context {
            if !parent.is_container() {
                return Err(Adl2GestaltError::structure(
                    line,
                    format!("'{}' cannot contain a '{}' widget", parent, kind),
                ));
            }
        }
        if kind == WidgetKind::Display {
            if !matches!(context, Context::TopLevel) {
                return Err(Adl2GestaltError::structure(
                    line,
                    "the display block must be at top level",
                ));
            }
            if self.display.is_some() {
                return Err(Adl2GestaltError::structure(
                    line,
                    "the document has a second display block",
                ));
            }
        }
        let mut frame = WidgetFrame::new(kind, line);
        for group in self.pending.drain(..) {
            frame.attach(group, Vec::new());
        }
        self.stack.push(Frame::Widget(frame));
        Ok(())
    }

    fn field(
        &mut self,
        key: SmolStr,
        value: RawValue,
        line: usize,
    ) -> Result<(), Adl2GestaltError> {
        match self.stack.last_mut() {
            Some(Frame::Widget(w)) => {
                let value = typed_value(None, &key, value, line)?;
                w.attributes.fields.insert(key, value);
            }
            Some(Frame::Group(g)) => {
                let value = typed_value(Some(g.group.name.as_str()), &key, value, line)?;
                g.group.fields.insert(key, value);
            }
            Some(Frame::ColorMap(map)) => {
                if key == "ncolors" {
                    if let Value::Int(n) = typed_value(Some("color map"), &key, value, line)? {
                        map.declare(n, line)?;
                    }
                } else {
                    log::debug!("Ignoring color map field '{}' on line {}", key, line);
                }
            }
            Some(Frame::Children) | None => {
                return Err(Adl2GestaltError::structure(
                    line,
                    format!("field '{}' is outside of any widget", key),
                ))
            }
        }
        Ok(())
    }

    fn point(&mut self, x: i64, y: i64, line: usize) -> Result<(), Adl2GestaltError> {
        let Some(Frame::Group(g)) = self.stack.last_mut() else {
            return Err(Adl2GestaltError::structure(
                line,
                "point outside of a points block",
            ));
        };
        let coordinate = |v: i64| {
            i32::try_from(v).map_err(|_| Adl2GestaltError::Value {
                line,
                field: "points".to_string(),
                value: v.to_string(),
                expected: "a 32-bit coordinate",
            })
        };
        g.points.push(Point::new(coordinate(x)?, coordinate(y)?));
        Ok(())
    }

    fn item(&mut self, value: RawValue, line: usize) -> Result<(), Adl2GestaltError> {
        let Some(Frame::Group(g)) = self.stack.last_mut() else {
            return Err(Adl2GestaltError::structure(
                line,
                format!("list item '{}' outside of a list", value.as_str()),
            ));
        };
        g.items.push((value, line));
        Ok(())
    }

    fn exit(&mut self, line: usize) -> Result<(), Adl2GestaltError> {
        let Some(frame) = self.stack.pop() else {
            return Err(Adl2GestaltError::syntax(line, "a block", "unmatched '}'"));
        };
        match frame {
            Frame::Widget(w) => {
                let node = w.finish()?;
                self.attach_widget(node);
            }
            Frame::Group(g) => self.attach_group(g)?,
            Frame::Children => {}
            Frame::ColorMap(map) => {
                if self.colors.is_some() {
                    log::warn!("Ignoring second color map ending on line {}", line);
                } else {
                    self.colors = Some(map.finish());
                }
            }
        }
        Ok(())
    }

    fn attach_widget(&mut self, node: WidgetNode) {
        let parent = self.stack.iter_mut().rev().find_map(|frame| match frame {
            Frame::Widget(w) => Some(w),
            _ => None,
        });
        match parent {
            Some(parent) => parent.children.push(node),
            None if node.kind == WidgetKind::Display => self.display = Some(node),
            None => self.top_level.push(node),
        }
    }

    fn attach_group(&mut self, frame: GroupFrame) -> Result<(), Adl2GestaltError> {
        let GroupFrame {
            group,
            points,
            items,
        } = frame;
        let top_level = self.stack.is_empty();
        match self.stack.last_mut() {
            Some(Frame::Widget(w)) => w.attach(group, points),
            Some(Frame::Group(parent)) => {
                if !points.is_empty() || !items.is_empty() {
                    log::debug!(
                        "Dropping list entries of nested block '{}' on line {}",
                        group.name,
                        group.line
                    );
                }
                parent.group.groups.push(group);
            }
            Some(Frame::ColorMap(map)) => match group.name.as_str() {
                "colors" => {
                    for (item, line) in &items {
                        map.push_item(item, *line)?;
                    }
                }
                "dl_color" => map.push_dl_color(&group)?,
                other => log::debug!("Ignoring '{}' block inside color map", other),
            },
            Some(Frame::Children) | None => match GroupKind::from_keyword(&group.name) {
                Some(GroupKind::Basic | GroupKind::Dynamic) => self.pending.push(group),
                _ if top_level && group.name == "file" => {
                    self.file = FileInfo {
                        name: group.text("name").map(String::from),
                        version: group.text("version").map(String::from),
                    };
                }
                _ => {
                    log::debug!("Keeping unknown block '{}' from line {}", group.name, group.line);
                    self.extras.push(group);
                }
            },
        }
        Ok(())
    }

    fn finish(self) -> Result<WidgetTree, Adl2GestaltError> {
        if let Some(frame) = self.stack.last() {
            let line = match frame {
                Frame::Widget(w) => w.line,
                Frame::Group(g) => g.group.line,
                Frame::Children | Frame::ColorMap(_) => self.last_line,
            };
            return Err(Adl2GestaltError::syntax(
                line,
                "'}' closing this block",
                "end of input",
            ));
        }
        let mut root = self.display.ok_or_else(|| {
            Adl2GestaltError::structure(self.last_line, "the document has no display block")
        })?;
        root.children.extend(self.top_level);
        if !self.pending.is_empty() {
            log::warn!(
                "{} attribute block(s) at the end of the file belong to no widget",
                self.pending.len()
            );
        }
        let tree = WidgetTree {
            file: self.file,
            colors: self.colors.unwrap_or_default(),
            root,
            extras: self.extras,
        };
        tree.check_color_refs()?;
        Ok(tree)
    }
}
