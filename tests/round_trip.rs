/*
 * Round-trip Tests
 *
 * Rendering a tree and parsing the result yields the same tree and the
 * same value; trees survive a trip through bytes; compiled expressions
 * give the same result on every run.
 */

mod cases;

use cases::{engine, test_class_type, test_object};
use cseval::{SyntaxNode, Type, Value, parse_syntax_tree, render};
use pretty_assertions::assert_eq;

const SOURCES: &[&str] = &[
    "2 + 2 * 3",
    "(2 + 2) * 3",
    "10 - (4 - 3)",
    "a - -b",
    "-(a + b)",
    "(byte)-b",
    "s ?? (o as string) ?? \"z\"",
    "(s ?? (o as string)) ?? \"z\"",
    "a > 0 ? a : b > 0 ? b : 0",
    "(a > 0 ? a : b) + 1",
    "checked(a * b)",
    "unchecked(a + 2147483647)",
    "(1).ToString() + \"x\\n\\\"\"",
    "'\\'' == 'a'",
    "(new[] { a, b, 3 }).Length",
    "(new int[3]).Length",
    "Array.Exists(new[] { a, b }, x => x > 1 && x < 10)",
    "o is string && (o as string).Length > 0",
    "typeof(int).Name",
    "default(int) + a",
    "arg1.TestClassField?.IntField ?? arg1.ArrayField?[0]",
    "@is + @new * a",
    "Array.Exists(new[] { @is, a }, @checked => @checked > @new)",
];

fn params() -> Vec<(&'static str, Type)> {
    vec![
        ("a", Type::INT32),
        ("b", Type::INT32),
        ("o", Type::Object),
        ("s", Type::String),
        ("arg1", test_class_type()),
        ("is", Type::INT32),
        ("new", Type::INT32),
    ]
}

fn args() -> Vec<Value> {
    vec![
        Value::Int32(4),
        Value::Int32(-2),
        Value::string("hi"),
        Value::Null,
        test_object(5),
        Value::Int32(3),
        Value::Int32(7),
    ]
}

fn parse(source: &str) -> SyntaxNode {
    parse_syntax_tree(source, true).unwrap_or_else(|e| panic!("{:?} failed to parse: {:?}", source, e))
}

#[test]
fn test_render_parses_to_same_tree() {
    for source in SOURCES {
        let tree = parse(source);
        let rendered = render(&tree);
        let reparsed = parse(&rendered);
        assert!(
            tree.same_shape(&reparsed),
            "{:?} rendered as {:?}, which parses differently",
            source,
            rendered
        );
    }
}

#[test]
fn test_verbatim_names_keep_their_at_sign() {
    assert_eq!(render(&parse("@is + @new * a")), "@is + @new * a");
}

#[test]
fn test_rendering_is_idempotent() {
    for source in SOURCES {
        let once = render(&parse(source));
        let twice = render(&parse(&once));
        assert_eq!(once, twice, "rendering {:?} is not stable", source);
    }
}

#[test]
fn test_render_preserves_value() {
    let engine = engine();
    for source in SOURCES {
        let rendered = render(&parse(source));
        let original = engine.compile(source, &params()).and_then(|e| e.run(&args()));
        let again = engine.compile(&rendered, &params()).and_then(|e| e.run(&args()));
        match (original, again) {
            (Ok(a), Ok(b)) => assert_eq!(a, b, "{:?} vs {:?}", source, rendered),
            (a, b) => panic!("{:?} gave {:?}, {:?} gave {:?}", source, a, rendered, b),
        }
    }
}

#[test]
fn test_tree_survives_bytes() {
    for source in SOURCES {
        let tree = parse(source);
        let bytes = tree.to_bytes().unwrap();
        let decoded = SyntaxNode::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, tree);
    }
}

#[test]
fn test_decoded_tree_binds() {
    let engine = engine();
    let tree = parse("a * b + arg1.IntField");
    let decoded = SyntaxNode::from_bytes(&tree.to_bytes().unwrap()).unwrap();
    let typed = engine
        .bind_syntax(
            &engine.options().default_compilation_options,
            "a * b + arg1.IntField",
            &decoded,
            &params(),
            None,
        )
        .unwrap();
    let result = cseval::lower(&typed).run(&args()).unwrap();
    assert_eq!(result, Value::Int32(-3));
}

#[test]
fn test_runs_are_repeatable() {
    let expr = engine()
        .compile("arg1.Twice(a) + b", &params())
        .unwrap();
    let first = expr.run(&args()).unwrap();
    for _ in 0..10 {
        assert_eq!(expr.run(&args()).unwrap(), first);
    }
    assert_eq!(first, Value::Int32(6));
}
