//! Dev harness: registers the demo schema, converts a good payload and two
//! bad ones, and prints the typed value / aggregate reports.

use anyhow::Result;
use serde_json::json;

use json_conform::{ConvertError, EnumDecl, FieldDecl, Registry, Shape, StructDecl};

/// Demo schema: an aliased enum, a nested record, single inheritance, and
/// one field of every container kind.
fn demo_registry() -> Result<Registry> {
    let mut reg = Registry::new();
    reg.register_enum(
        EnumDecl::new("A")
            .variant("a", json!(1))
            .variant("b", json!(2))
            .variant("c", json!(2)),
    )?;
    reg.register_struct(StructDecl::new("D").field("x", Shape::named("A")))?;
    reg.register_struct(StructDecl::new("Base").field("a", Shape::Str))?;
    reg.register_struct(
        StructDecl::new("ComplexClass")
            .base("Base")
            .field("b", Shape::tuple([Shape::Int, Shape::Str]))
            .field("c", Shape::map(Shape::Str, Shape::Int))
            .field("d", Shape::list(Shape::Int))
            .field("e", Shape::named("A"))
            .field("f", Shape::named("D"))
            .field("g", Shape::union([Shape::Int, Shape::Str]))
            .field_decl(
                FieldDecl::new("h", Shape::set(Shape::Int)).default_value(json!([9, 9, 9, 9])),
            ),
    )?;
    Ok(reg)
}

fn main() -> Result<()> {
    let reg = demo_registry()?;
    let target = Shape::named("ComplexClass");

    // 1) a conforming payload, from text
    let text = r#"{"a": "1", "b": [1, "s"], "c": {"s": 1}, "d": [1, 2, 3],
                   "e": 1, "f": {"x": 2}, "g": 1, "h": [9]}"#;
    let typed = reg.from_json(text, &target)?;
    println!("{}", serde_json::to_string_pretty(&typed)?);

    // 2) a payload with several independent violations
    let bad = json!({
        "a": 1,
        "b": ["1", "s", 3],
        "c": {"s": 1},
        "d": [1, 2, 3],
        "e": 1,
        "f": {"x": 4},
        "g": 8,
        "h": ["9"]
    });
    report_or_bail(reg.from_value(&bad, &target).unwrap_err())?;

    // 3) everything missing; the eager default covers h
    report_or_bail(reg.from_json("{}", &target).unwrap_err())?;

    Ok(())
}

fn report_or_bail(err: ConvertError) -> Result<()> {
    match err.report() {
        Some(report) => {
            println!("{}", "-".repeat(50));
            println!("{report}");
            Ok(())
        }
        None => Err(err.into()),
    }
}
