use adl2gestalt::{
    convert, convert_str, emit, load, parse, mapper::target_kind, Adl2GestaltError, ColorIndex,
    ConvertOptions, DiagnosticReason, MappedWidget, Point, Property, TargetKind, WidgetKind,
    WidgetNode,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn test_end_to_end() -> Result<(), Adl2GestaltError> {
    let tree = load("resources/end_to_end.adl")?;
    let conversion = convert(&tree)?;

    assert_eq!(conversion.colors.len(), 1);
    assert!(conversion.colors.get(ColorIndex(14)).is_some());
    assert_eq!(conversion.diagnostics.len(), 1);
    assert_eq!(conversion.diagnostics[0].kind, WidgetKind::CartesianPlot);
    assert_eq!(
        conversion.diagnostics[0].reason,
        DiagnosticReason::Unsupported
    );

    let output = emit(&conversion.forest, &conversion.colors);
    let expected = r#"#include colors.yml
#include widgets.yml

# Gestalt display generated from MEDM ADL
# Source: end_to_end.adl

medm_color_14: &medm_color_14 $000000

Form: !Form
    geometry: 800x600
    title: "end_to_end"
    margins: 10x0x10x10

rectangle_0: !Rectangle
    geometry: 150x75 x 100x200
    foreground: *medm_color_14

text_entry_2: !TextEntry
    geometry: 120x20 x 300x300
    pv: "xxx:yyy:zzz"
    foreground: *medm_color_14
    background: *medm_color_14
    font: -Liberation Sans - normal - 20
    # minimum: from channel
    # maximum: from channel
    # precision: from channel
"#;
    assert_eq!(output, expected);
    Ok(())
}

#[test]
fn test_composite_nesting() -> Result<(), Adl2GestaltError> {
    let conversion = convert(&load("resources/composite.adl")?)?;
    let forest = &conversion.forest;
    assert_eq!(forest.widgets.len(), 1);

    let group = &forest.widgets[0];
    assert_eq!(group.kind, TargetKind::Group);
    let offsets: Vec<(i32, i32)> = group
        .children
        .iter()
        .map(|c| (c.geometry.x, c.geometry.y))
        .collect();
    assert_eq!(offsets, vec![(20, 20), (40, 30)]);
    assert_eq!(
        group.children[1].property("pv"),
        Some(&Property::Str("{P}:temp".into()))
    );

    let skipped: Vec<String> = conversion
        .diagnostics
        .iter()
        .map(|d| d.path.to_string())
        .collect();
    assert_eq!(
        skipped,
        vec!["display/composite[0]/strip chart[2]", "display/meter[1]"]
    );
    Ok(())
}

#[test]
fn test_color_dedup() -> Result<(), Adl2GestaltError> {
    let conversion = convert(&load("resources/composite.adl")?)?;
    let indices: Vec<u8> = conversion.colors.iter().map(|c| c.index.0).collect();
    // Color 3 is only used by skipped widgets.
    assert_eq!(indices, vec![0, 1, 2]);

    let output = emit(&conversion.forest, &conversion.colors);
    let definitions: Vec<&str> = output
        .lines()
        .filter(|line| line.starts_with("medm_color_"))
        .collect();
    assert_eq!(
        definitions,
        vec![
            "medm_color_0: &medm_color_0 $ffffff",
            "medm_color_1: &medm_color_1 $000000",
            "medm_color_2: &medm_color_2 $ff0000",
        ]
    );
    Ok(())
}

#[test]
fn test_determinism() -> Result<(), Adl2GestaltError> {
    let text = std::fs::read_to_string("resources/composite.adl")?;
    let options = ConvertOptions::default();
    let (first, _) = convert_str(&text, &options)?;
    let (second, _) = convert_str(&text, &options)?;
    assert_eq!(first, second);
    Ok(())
}

fn check_round_trip(nodes: &[WidgetNode], mapped: &[MappedWidget], origin: Point) {
    let kept: Vec<&WidgetNode> = nodes
        .iter()
        .filter(|node| target_kind(node.kind).is_some())
        .collect();
    assert_eq!(kept.len(), mapped.len());
    for (node, widget) in kept.into_iter().zip(mapped) {
        assert!(widget.geometry.width > 0 && widget.geometry.height > 0);
        assert_eq!(widget.geometry.absolute_from(origin), node.geometry);
        check_round_trip(&node.children, &widget.children, node.geometry.origin());
    }
}

#[rstest]
#[case("resources/end_to_end.adl")]
#[case("resources/composite.adl")]
#[case("resources/legacy.adl")]
fn test_geometry_round_trip(#[case] path: &str) -> Result<(), Adl2GestaltError> {
    let tree = load(path)?;
    let conversion = convert(&tree)?;
    check_round_trip(&tree.root.children, &conversion.forest.widgets, Point::ORIGIN);
    Ok(())
}

#[rstest]
#[case("cartesian plot")]
#[case("meter")]
#[case("strip chart")]
#[case("wheel switch")]
#[case("embedded display")]
fn test_skip_completeness(#[case] keyword: &str) -> Result<(), Adl2GestaltError> {
    let text = format!(
        r#"
display {{
    object {{ x=0 y=0 width=300 height=300 }}
}}
"{keyword}" {{
    object {{ x=10 y=10 width=50 height=50 }}
}}
composite {{
    object {{ x=100 y=100 width=100 height=100 }}
    children {{
        "{keyword}" {{
            object {{ x=110 y=110 width=50 height=50 }}
        }}
    }}
}}
"#
    );
    let tree = parse(&text)?;
    let conversion = convert(&tree)?;
    assert_eq!(conversion.diagnostics.len(), 2);
    assert!(conversion
        .diagnostics
        .iter()
        .all(|d| d.reason == DiagnosticReason::Unsupported && d.kind.keyword() == keyword));

    let forest = &conversion.forest;
    assert_eq!(forest.widgets.len(), 1);
    assert!(forest.descendants().iter().all(|w| w.kind == TargetKind::Group));
    let output = emit(forest, &conversion.colors);
    assert!(!output.contains(&keyword.replace(' ', "_")));
    Ok(())
}

#[test]
fn test_empty_channel_names_the_widget() -> Result<(), Adl2GestaltError> {
    let tree = parse(
        r#"
display {
    object { x=0 y=0 width=300 height=300 }
}
rectangle {
    object { x=10 y=10 width=50 height=50 }
}
"text entry" {
    object { x=10 y=70 width=80 height=20 }
    control {
        chan=""
        clr=14
        bclr=4
    }
}
"#,
    )?;
    match convert(&tree) {
        Err(Adl2GestaltError::AttributeMapping { path, field }) => {
            assert_eq!(path.to_string(), "display/text entry[1]");
            assert_eq!(field, "control.chan");
        }
        other => panic!("expected an attribute mapping error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_legacy_layout() -> Result<(), Adl2GestaltError> {
    let conversion = convert(&load("resources/legacy.adl")?)?;
    assert!(conversion.diagnostics.is_empty());
    let forest = &conversion.forest;
    let rect = forest.widget("rectangle_0").ok_or_else(|| missing("rectangle_0"))?;
    assert_eq!(
        rect.property("foreground"),
        Some(&Property::Color("medm_color_1".into()))
    );
    let slider = forest.widget("valuator_1").ok_or_else(|| missing("valuator_1"))?;
    assert_eq!(slider.kind, TargetKind::Slider);
    assert_eq!(
        slider.property("pv"),
        Some(&Property::Str("old:setpoint".into()))
    );
    assert_eq!(slider.property("horizontal"), Some(&Property::Bool(true)));
    assert_eq!(slider.property("increment"), Some(&Property::Float(0.5)));

    let output = emit(forest, &conversion.colors);
    assert!(output.contains(
        "medm_color_0: &medm_color_0 $ffffff\nmedm_color_1: &medm_color_1 $000000\n"
    ));
    Ok(())
}

fn missing(name: &str) -> Adl2GestaltError {
    Adl2GestaltError::Structure {
        line: 0,
        reason: format!("{} was not converted", name),
    }
}

#[test]
fn test_parse_errors() {
    assert!(matches!(
        parse("display {\n    object { x=0 y=0 width=10 height=10 }\n"),
        Err(Adl2GestaltError::Syntax { line: 1, .. })
    ));
    assert!(matches!(
        parse("display {\n    object { x=0 y=0 width=10 height=10 }\n    clr=70\n}\n"),
        Err(Adl2GestaltError::ColorIndex {
            index: 70,
            available: 65,
            ..
        })
    ));
    assert!(matches!(
        parse("display {\n    object { x=0 y=0 width=0 height=10 }\n}\n"),
        Err(Adl2GestaltError::Value { .. })
    ));
    assert!(matches!(
        parse("rectangle {\n    object { x=0 y=0 width=10 height=10 }\n}\n"),
        Err(Adl2GestaltError::Structure { .. })
    ));
}

#[test]
fn test_load_missing_file() {
    assert!(matches!(
        load("resources/does_not_exist.adl"),
        Err(Adl2GestaltError::IO(_))
    ));
}
