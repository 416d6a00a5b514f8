use indexmap::IndexMap;
use smol_str::SmolStr;

use super::{properties, MapContext, MappedWidget, Property};
use crate::{
    diagnostics::{DiagnosticReason, NodePath},
    tree::WidgetNode,
    Adl2GestaltError,
};

/// Stacking keeps MEDM's documented meaning: `row` lays the buttons out
/// vertically and `column` horizontally.
pub(super) fn choice_button(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    let Some(stacking) = node.attributes.text("stacking") else {
        return Ok(());
    };
    let horizontal = match stacking {
        "column" => true,
        "row" => false,
        other => {
            ctx.diagnose(
                path,
                node.kind,
                DiagnosticReason::Approximated {
                    field: "stacking".into(),
                    value: other.to_string(),
                    replacement: "row".to_string(),
                },
            );
            false
        }
    };
    widget.set("horizontal", Property::Bool(horizontal));
    Ok(())
}

pub(super) fn message_button(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    if let Some(label) = properties::label(node) {
        widget.set("text", Property::Str(label.to_string()));
    }
    if let Some(press) = node.attributes.text("press_msg") {
        widget.set("value", Property::Str(press.to_string()));
    }
    properties::drop_field(ctx, node, path, "release_msg");
    Ok(())
}

fn entry(pairs: &[(&str, String)]) -> IndexMap<SmolStr, String> {
    pairs
        .iter()
        .map(|(key, value)| (SmolStr::new(key), value.clone()))
        .collect()
}

pub(super) fn related_display(
    ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    path: &NodePath,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    if let Some(label) = properties::label(node) {
        widget.set("text", Property::Str(label.to_string()));
    }
    let mut links = Vec::new();
    for display in node.attributes.indexed("display") {
        let Some(file) = display.text("name").filter(|name| !name.is_empty()) else {
            continue;
        };
        if let Some(policy) = display.text("policy") {
            ctx.diagnose(
                path,
                node.kind,
                DiagnosticReason::DroppedField {
                    field: format!("{}.policy", display.name).into(),
                    value: policy.to_string(),
                },
            );
        }
        links.push(entry(&[
            ("label", display.text("label").unwrap_or(file).to_string()),
            ("file", file.to_string()),
            (
                "macros",
                properties::rewrite_macros(display.text("args").unwrap_or_default()),
            ),
        ]));
    }
    if !links.is_empty() {
        widget.set("links", Property::List(links));
    }
    properties::drop_field(ctx, node, path, "visual");
    Ok(())
}

pub(super) fn shell_command(
    _ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    _path: &NodePath,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    if let Some(label) = properties::label(node) {
        widget.set("text", Property::Str(label.to_string()));
    }
    let commands: Vec<_> = node
        .attributes
        .indexed("command")
        .into_iter()
        .filter_map(|command| {
            let name = command.text("name").filter(|name| !name.is_empty())?;
            let line = match command.text("args").filter(|args| !args.is_empty()) {
                Some(args) => format!("{} {}", name, args),
                None => name.to_string(),
            };
            Some(entry(&[
                ("label", command.text("label").unwrap_or(name).to_string()),
                ("command", line),
            ]))
        })
        .collect();
    if !commands.is_empty() {
        widget.set("commands", Property::List(commands));
    }
    Ok(())
}

pub(super) fn valuator(
    _ctx: &mut MapContext<'_>,
    node: &WidgetNode,
    _path: &NodePath,
    widget: &mut MappedWidget,
) -> Result<(), Adl2GestaltError> {
    properties::direction(node, widget);
    properties::limits(node, widget);
    if let Some(step) = node.attributes.field("dPrecision").and_then(|v| v.as_float()) {
        widget.set("increment", Property::Float(step));
    }
    Ok(())
}

pub(super) fn text_entry(
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

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::super::tests::{convert, DISPLAY};
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("row", false, 0)]
    #[case("column", true, 0)]
    #[case("row column", false, 1)]
    fn test_choice_button_stacking(
        #[case] stacking: &str,
        #[case] horizontal: bool,
        #[case] lossy: usize,
    ) {
        let text = format!(
            r#"{}
"choice button" {{
    object {{ x=10 y=10 width=100 height=40 }}
    control {{ chan="mode:select" clr=14 bclr=4 }}
    stacking="{}"
}}
"#,
            DISPLAY, stacking
        );
        let (forest, diagnostics) = convert(&text);
        let button = forest.widget("choice_button_0").unwrap();
        assert_eq!(
            button.property("horizontal"),
            Some(&Property::Bool(horizontal))
        );
        assert_eq!(diagnostics.len(), lossy);
    }

    #[test]
    fn test_message_button() {
        let text = format!(
            "{}{}",
            DISPLAY,
            r#"
"message button" {
    object { x=10 y=10 width=80 height=20 }
    control { chan="pump:start" clr=14 bclr=4 }
    label="Start"
    press_msg="1"
    release_msg="0"
}
"#
        );
        let (forest, diagnostics) = convert(&text);
        let button = forest.widget("message_button_0").unwrap();
        assert_eq!(button.property("text"), Some(&Property::Str("Start".into())));
        assert_eq!(button.property("value"), Some(&Property::Str("1".into())));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].reason,
            DiagnosticReason::DroppedField {
                field: "release_msg".into(),
                value: "0".into()
            }
        );
    }

    #[test]
    fn test_related_display_links() {
        let text = format!(
            "{}{}",
            DISPLAY,
            r#"
"related display" {
    object { x=10 y=10 width=80 height=20 }
    display[1] {
        label="Vacuum"
        name="vacuum.adl"
        args="P=$(P),S=1"
        policy="replace display"
    }
    display[0] {
        name="overview.adl"
    }
    display[2] {
        label="empty"
    }
    clr=14
    bclr=4
    label="-More"
    visual="a row of buttons"
}
"#
        );
        let (forest, diagnostics) = convert(&text);
        let related = forest.widget("related_display_0").unwrap();
        assert_eq!(related.property("text"), Some(&Property::Str("More".into())));
        let Some(Property::List(links)) = related.property("links") else {
            panic!("no links");
        };
        assert_eq!(links.len(), 2);
        assert_eq!(links[0]["file"], "overview.adl");
        assert_eq!(links[0]["label"], "overview.adl");
        assert_eq!(links[1]["label"], "Vacuum");
        assert_eq!(links[1]["macros"], "P={P},S=1");
        let dropped: Vec<_> = diagnostics
            .iter()
            .map(|d| match &d.reason {
                DiagnosticReason::DroppedField { field, .. } => field.to_string(),
                other => other.to_string(),
            })
            .collect();
        assert_eq!(dropped, vec!["display[1].policy", "visual"]);
    }

    #[test]
    fn test_shell_commands() {
        let text = format!(
            "{}{}",
            DISPLAY,
            r#"
"shell command" {
    object { x=10 y=10 width=80 height=20 }
    command[0] {
        label="Logs"
        name="xterm"
        args="-e tail -f /var/log/ioc.log"
    }
    command[1] {
        name="probe"
    }
    clr=14
    bclr=4
}
"#
        );
        let (forest, _) = convert(&text);
        let shell = forest.widget("shell_command_0").unwrap();
        let Some(Property::List(commands)) = shell.property("commands") else {
            panic!("no commands");
        };
        assert_eq!(commands[0]["command"], "xterm -e tail -f /var/log/ioc.log");
        assert_eq!(commands[1]["label"], "probe");
    }

    #[test]
    fn test_text_entry_limits_from_channel() {
        let text = format!(
            "{}{}",
            DISPLAY,
            r#"
"text entry" {
    object { x=10 y=10 width=80 height=20 }
    control { chan="xxx:yyy:zzz" clr=14 bclr=4 }
    limits { precSrc="default" precDefault=3 }
}
"#
        );
        let (forest, _) = convert(&text);
        let entry = forest.widget("text_entry_0").unwrap();
        assert_eq!(
            entry.property("pv"),
            Some(&Property::Str("xxx:yyy:zzz".into()))
        );
        assert_eq!(entry.property("minimum"), Some(&Property::FromChannel));
        assert_eq!(entry.property("precision"), Some(&Property::Int(3)));
    }
}
