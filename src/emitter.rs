//! Writes a mapped display as Gestalt YAML.
//!
//! The output is produced directly rather than through a YAML serializer:
//! Gestalt relies on `#include` lines, `!Tag` nodes and anchors/aliases laid
//! out in a fixed order.

use std::fmt::{self, Write};

use crate::{
    color::ResolvedColors,
    mapper::{MappedForest, MappedWidget, Property, TargetKind},
    options::ConvertOptions,
    tree::Geometry,
};

const INDENT: &str = "    ";

/// Render a converted display with the default options.
pub fn emit(forest: &MappedForest, colors: &ResolvedColors) -> String {
    emit_with(forest, colors, &ConvertOptions::default())
}

pub fn emit_with(
    forest: &MappedForest,
    colors: &ResolvedColors,
    options: &ConvertOptions,
) -> String {
    GestaltDocument {
        forest,
        colors,
        options,
    }
    .to_string()
}

struct GestaltDocument<'a> {
    forest: &'a MappedForest,
    colors: &'a ResolvedColors,
    options: &'a ConvertOptions,
}

impl fmt::Display for GestaltDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.options.includes.is_empty() {
            for include in &self.options.includes {
                writeln!(f, "#include {}", include)?;
            }
            writeln!(f)?;
        }
        if self.options.header {
            writeln!(f, "# Gestalt display generated from MEDM ADL")?;
            if let Some(source) = &self.forest.source {
                writeln!(f, "# Source: {}", source)?;
            }
            writeln!(f)?;
        }
        if !self.colors.is_empty() {
            for color in self.colors.iter() {
                writeln!(f, "{name}: &{name} {}", color.rgb, name = color.name)?;
            }
            writeln!(f)?;
        }
        write_widget(f, &self.forest.form, 0)?;
        for widget in &self.forest.widgets {
            writeln!(f)?;
            write_widget(f, widget, 0)?;
        }
        Ok(())
    }
}

fn write_indent(f: &mut impl Write, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn write_geometry(f: &mut impl Write, kind: TargetKind, geometry: &Geometry) -> fmt::Result {
    if kind == TargetKind::Form {
        write!(f, "{}x{}", geometry.width, geometry.height)
    } else {
        write!(
            f,
            "{}x{} x {}x{}",
            geometry.width, geometry.height, geometry.x, geometry.y
        )
    }
}

fn write_widget(f: &mut impl Write, widget: &MappedWidget, depth: usize) -> fmt::Result {
    write_indent(f, depth)?;
    writeln!(f, "{}: !{}", widget.name, widget.kind)?;

    write_indent(f, depth + 1)?;
    f.write_str("geometry: ")?;
    write_geometry(f, widget.kind, &widget.geometry)?;
    writeln!(f)?;

    for (key, value) in &widget.properties {
        write_indent(f, depth + 1)?;
        match value {
            Property::FromChannel => writeln!(f, "# {}: from channel", key)?,
            Property::List(entries) => {
                writeln!(f, "{}:", key)?;
                for entry in entries {
                    write_indent(f, depth + 2)?;
                    f.write_str("- {")?;
                    for (i, (field, text)) in entry.iter().enumerate() {
                        if i > 0 {
                            f.write_char(',')?;
                        }
                        write!(f, " {}: ", field)?;
                        write_string(f, text)?;
                    }
                    writeln!(f, " }}")?;
                }
            }
            scalar => {
                write!(f, "{}: ", key)?;
                write_scalar(f, scalar)?;
                writeln!(f)?;
            }
        }
    }

    if !widget.children.is_empty() {
        write_indent(f, depth + 1)?;
        writeln!(f, "children:")?;
        for child in &widget.children {
            write_widget(f, child, depth + 2)?;
        }
    }
    Ok(())
}

fn write_scalar(f: &mut impl Write, value: &Property) -> fmt::Result {
    match value {
        Property::Str(text) => write_string(f, text),
        Property::Ident(ident) => f.write_str(ident),
        Property::Int(i) => write!(f, "{}", i),
        Property::Float(x) => write!(f, "{}", x),
        Property::Bool(b) => write!(f, "{}", b),
        Property::Color(name) => write!(f, "*{}", name),
        Property::Points(points) => {
            f.write_char('[')?;
            for (i, point) in points.iter().enumerate() {
                if i > 0 {
                    f.write_char(',')?;
                }
                write!(f, " {}x{}", point.x, point.y)?;
            }
            f.write_str(" ]")
        }
        // Written by the caller, as they span lines or are comments.
        Property::List(_) | Property::FromChannel => Ok(()),
    }
}

/// A double-quoted YAML string.
fn write_string(f: &mut impl Write, text: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in text.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::tree::Point;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn forest(widgets: Vec<MappedWidget>) -> MappedForest {
        let mut form = MappedWidget::new("Form", TargetKind::Form, Geometry::new(0, 0, 200, 100));
        form.set("title", Property::Str("panel".into()));
        MappedForest {
            form,
            widgets,
            source: Some("panel.adl".into()),
        }
    }

    #[test]
    fn test_document_layout() {
        let mut rect = MappedWidget::new(
            "rectangle_0",
            TargetKind::Rectangle,
            Geometry::new(10, 20, 30, 40),
        );
        rect.set("foreground", Property::Color("medm_color_14".into()));
        let output = emit(&forest(vec![rect]), &ResolvedColors::default());
        assert_eq!(
            output,
            "#include colors.yml\n\
             #include widgets.yml\n\
             \n\
             # Gestalt display generated from MEDM ADL\n\
             # Source: panel.adl\n\
             \n\
             Form: !Form\n    geometry: 200x100\n    title: \"panel\"\n\
             \n\
             rectangle_0: !Rectangle\n    geometry: 30x40 x 10x20\n    foreground: *medm_color_14\n"
        );
    }

    #[test]
    fn test_nested_children_and_lists() {
        let mut text = MappedWidget::new("text_0", TargetKind::Text, Geometry::new(1, 2, 3, 4));
        text.set("text", Property::Str(r#"say "hi" \o/"#.into()));
        let mut related = MappedWidget::new(
            "related_display_1",
            TargetKind::RelatedDisplay,
            Geometry::new(5, 6, 7, 8),
        );
        let mut link = IndexMap::new();
        link.insert("label".into(), "A".to_string());
        link.insert("file".into(), "a.adl".to_string());
        related.set("links", Property::List(vec![link]));
        related.set("minimum", Property::FromChannel);
        let mut group = MappedWidget::new(
            "composite_0",
            TargetKind::Group,
            Geometry::new(0, 0, 50, 50),
        );
        group.children = vec![text, related];

        let options = ConvertOptions {
            includes: Vec::new(),
            header: false,
            ..Default::default()
        };
        let output = emit_with(&forest(vec![group]), &ResolvedColors::default(), &options);
        let expected = r#"Form: !Form
    geometry: 200x100
    title: "panel"

composite_0: !Group
    geometry: 50x50 x 0x0
    children:
        text_0: !Text
            geometry: 3x4 x 1x2
            text: "say \"hi\" \\o/"
        related_display_1: !RelatedDisplay
            geometry: 7x8 x 5x6
            links:
                - { label: "A", file: "a.adl" }
            # minimum: from channel
"#;
        assert_eq!(output, expected);
    }

    #[test]
    fn test_scalars() {
        let mut out = String::new();
        write_scalar(
            &mut out,
            &Property::Points(vec![Point::new(0, 0), Point::new(10, 5)]),
        )
        .unwrap();
        assert_eq!(out, "[ 0x0, 10x5 ]");

        let mut out = String::new();
        write_scalar(&mut out, &Property::Float(0.5)).unwrap();
        write_scalar(&mut out, &Property::Float(90.0)).unwrap();
        assert_eq!(out, "0.590");
    }
}
