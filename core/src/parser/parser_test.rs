use bumpalo::Bump;
use pretty_assertions::assert_eq;

use super::*;
use crate::lexer::tokenize;
use crate::syntax::{BinaryOp, UnaryOp};
use crate::syntax_tree::{Initializer, Literal, MemberValue, SyntaxKind, TypeRef};

fn tree(source: &str) -> SyntaxNode {
    parse_syntax_tree(source, true)
        .unwrap_or_else(|e| panic!("Expression parsing failed: {}\n{}", source, e))
}

fn kind(source: &str) -> SyntaxKind {
    tree(source).kind.clone()
}

fn parse_error(source: &str) -> ParseErrorKind {
    match parse_syntax_tree(source, true) {
        Err(SyntaxError::Parse(e)) => e.kind,
        other => panic!("expected a parse error for {:?}, got {:?}", source, other),
    }
}

fn named(path: &[&str]) -> TypeRef {
    TypeRef::Named {
        path: path.iter().map(|s| s.to_string()).collect(),
        type_arguments: Vec::new(),
    }
}

fn generic(path: &[&str], args: Vec<TypeRef>) -> TypeRef {
    TypeRef::Named {
        path: path.iter().map(|s| s.to_string()).collect(),
        type_arguments: args,
    }
}

#[test]
fn test_parse_tree_shape() {
    let arena = Bump::new();
    let tokens = tokenize("a + f(1, x: 2)").unwrap();
    let root = parse(&arena, &tokens).unwrap();
    assert_eq!(
        root.to_string(),
        "(Binary + (Identifier a) (Call (Identifier f) (Arguments (Literal 1) (NamedArgument x (Literal 2)))))"
    );
    assert_eq!(root.count(), 8);
}

#[test]
fn test_spans_cover_source() {
    let node = tree("foo.Bar(1) + 2");
    assert_eq!(node.span.0, 0..14);
    let SyntaxKind::Binary { left, .. } = &node.kind else {
        panic!("expected binary");
    };
    assert_eq!(left.span.0, 0..10);
}

#[test]
fn test_literals() {
    assert_eq!(kind("42u"), SyntaxKind::Literal(Literal::Number("42u".into())));
    assert_eq!(
        kind(r#""a\n""#),
        SyntaxKind::Literal(Literal::String("a\n".into()))
    );
    assert_eq!(kind("'x'"), SyntaxKind::Literal(Literal::Char('x')));
    assert_eq!(
        kind("true"),
        SyntaxKind::Identifier {
            name: "true".into(),
            type_arguments: vec![]
        }
    );
}

#[test]
fn test_verbatim_identifier_name() {
    assert_eq!(
        kind("@new"),
        SyntaxKind::Identifier {
            name: "new".into(),
            type_arguments: vec![]
        }
    );
}

#[test]
fn test_generic_method_call() {
    let SyntaxKind::Call { target, arguments } = kind("Array.IndexOf<int>(a, 1)") else {
        panic!("expected call");
    };
    assert_eq!(arguments.positional.len(), 2);
    match &target.kind {
        SyntaxKind::MemberAccess {
            member,
            type_arguments,
            ..
        } => {
            assert_eq!(member, "IndexOf");
            assert_eq!(*type_arguments, vec![named(&["int"])]);
        }
        other => panic!("unexpected target {:?}", other),
    }
}

#[test]
fn test_less_than_is_not_generic() {
    assert!(matches!(
        kind("a < b"),
        SyntaxKind::Binary {
            op: BinaryOp::LessThan,
            ..
        }
    ));
    // `a < b > c` cannot end a generic list (an identifier follows).
    let SyntaxKind::Binary { op, left, .. } = kind("a < b > c") else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::GreaterThan);
    assert!(matches!(
        left.kind,
        SyntaxKind::Binary {
            op: BinaryOp::LessThan,
            ..
        }
    ));
}

#[test]
fn test_nested_generic_splits_shift_token() {
    let SyntaxKind::TypeOf(ty) = kind("typeof(Dictionary<string, List<int>>)") else {
        panic!("expected typeof");
    };
    assert_eq!(
        ty,
        generic(
            &["Dictionary"],
            vec![named(&["string"]), generic(&["List"], vec![named(&["int"])])]
        )
    );
    // The shift operator itself still works.
    assert!(matches!(
        kind("a >> 2"),
        SyntaxKind::Binary {
            op: BinaryOp::RightShift,
            ..
        }
    ));
}

#[test]
fn test_casts() {
    let SyntaxKind::Cast { ty, checked, .. } = kind("(System.Byte)1") else {
        panic!("expected cast");
    };
    assert_eq!(ty, named(&["System", "Byte"]));
    assert!(checked);

    assert!(matches!(kind("(int?)x"), SyntaxKind::Cast { ty: TypeRef::Nullable(_), .. }));
    assert!(matches!(kind("(int[])x"), SyntaxKind::Cast { ty: TypeRef::Array { rank: 1, .. }, .. }));
    assert!(matches!(kind("(int)-1"), SyntaxKind::Cast { .. }));
    // A user type followed by `-` is a subtraction.
    assert!(matches!(
        kind("(a) - 1"),
        SyntaxKind::Binary {
            op: BinaryOp::Subtract,
            ..
        }
    ));
    assert!(matches!(kind("(a)"), SyntaxKind::Identifier { .. }));
}

#[test]
fn test_lambdas() {
    let SyntaxKind::Lambda { parameters, body } = kind("(a, b) => a + b") else {
        panic!("expected lambda");
    };
    assert_eq!(parameters.len(), 2);
    assert_eq!(parameters[1].name, "b");
    assert!(matches!(body.kind, SyntaxKind::Binary { .. }));

    let SyntaxKind::Lambda { parameters, .. } = kind("() => 1") else {
        panic!("expected lambda");
    };
    assert!(parameters.is_empty());

    let SyntaxKind::Lambda { parameters, .. } = kind("(int x, string s) => s") else {
        panic!("expected lambda");
    };
    assert_eq!(parameters[0].ty, Some(named(&["int"])));
    assert_eq!(parameters[1].name, "s");

    let SyntaxKind::Lambda { parameters, .. } = kind("x => x") else {
        panic!("expected lambda");
    };
    assert_eq!(parameters[0].ty, None);
}

#[test]
fn test_named_arguments() {
    let SyntaxKind::Call { arguments, .. } = kind("f(1, y: 2, x: 3)") else {
        panic!("expected call");
    };
    assert_eq!(arguments.positional.len(), 1);
    let names: Vec<_> = arguments.named.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["y", "x"]);

    assert_eq!(parse_error("f(x: 1, 2)"), ParseErrorKind::PositionalAfterNamed);
}

#[test]
fn test_checked_scopes_propagate() {
    let SyntaxKind::OverflowScope { checked, operand } = kind("unchecked(a + (b * c))") else {
        panic!("expected scope");
    };
    assert!(!checked);
    let SyntaxKind::Binary { checked, right, .. } = &operand.kind else {
        panic!("expected binary");
    };
    assert!(!*checked);
    assert!(matches!(right.kind, SyntaxKind::Binary { checked: false, .. }));

    let unchecked_default = parse_syntax_tree("a + checked(b - c)", false).unwrap();
    let SyntaxKind::Binary { checked, right, .. } = &unchecked_default.kind else {
        panic!("expected binary");
    };
    assert!(!*checked);
    assert!(matches!(right.kind, SyntaxKind::OverflowScope { checked: true, .. }));

    // A verbatim name is an ordinary call.
    assert!(matches!(kind("@checked(1)"), SyntaxKind::Call { .. }));
}

#[test]
fn test_null_conditional_access() {
    let SyntaxKind::MemberAccess {
        target,
        null_conditional,
        ..
    } = kind("a?.b.c")
    else {
        panic!("expected member access");
    };
    assert!(!null_conditional);
    assert!(matches!(
        target.kind,
        SyntaxKind::MemberAccess {
            null_conditional: true,
            ..
        }
    ));
    assert!(matches!(
        kind("a?[0]"),
        SyntaxKind::Index {
            null_conditional: true,
            ..
        }
    ));
}

#[test]
fn test_unary_operators() {
    assert!(matches!(
        kind("-1"),
        SyntaxKind::Unary {
            op: UnaryOp::Negate,
            ..
        }
    ));
    assert!(matches!(
        kind("~x"),
        SyntaxKind::Unary {
            op: UnaryOp::Complement,
            ..
        }
    ));
}

#[test]
fn test_new_forms() {
    let SyntaxKind::New {
        ty,
        arguments,
        initializer,
    } = kind("new Foo(1) { X = 2, Items = { 3, 4 }, Child = { Y = 5 } }")
    else {
        panic!("expected new");
    };
    assert_eq!(ty, named(&["Foo"]));
    assert_eq!(arguments.len(), 1);
    let Some(Initializer::Object(members)) = initializer else {
        panic!("expected object initializer");
    };
    assert_eq!(members.len(), 3);
    assert!(matches!(members[0].value, MemberValue::Expression(_)));
    assert!(matches!(
        members[1].value,
        MemberValue::Initializer(Initializer::Collection(_))
    ));
    assert!(matches!(
        members[2].value,
        MemberValue::Initializer(Initializer::Object(_))
    ));

    let SyntaxKind::New { initializer, .. } = kind(r#"new Dictionary<string, int> { { "a", 1 }, { "b", 2 } }"#)
    else {
        panic!("expected new");
    };
    let Some(Initializer::Collection(elements)) = initializer else {
        panic!("expected collection initializer");
    };
    assert_eq!(elements[1].arguments.len(), 2);

    assert!(matches!(
        kind("new List<int>()"),
        SyntaxKind::New {
            initializer: None,
            ..
        }
    ));

    let SyntaxKind::NewArrayBounds { element, bounds } = kind("new int[3]") else {
        panic!("expected array bounds");
    };
    assert_eq!(element, named(&["int"]));
    assert_eq!(bounds.len(), 1);

    let SyntaxKind::NewArrayInit { element, elements } = kind("new int[] { 1, 2, 3 }") else {
        panic!("expected array init");
    };
    assert_eq!(element, Some(named(&["int"])));
    assert_eq!(elements.len(), 3);

    let SyntaxKind::NewArrayInit { element, elements } = kind("new[] { 1, 2 }") else {
        panic!("expected array init");
    };
    assert_eq!(element, None);
    assert_eq!(elements.len(), 2);

    assert_eq!(parse_error("new Foo { X = 1, 2 }"), ParseErrorKind::MixedInitializer);
}

#[test]
fn test_typeof_and_default() {
    assert_eq!(kind("typeof(int)"), SyntaxKind::TypeOf(named(&["int"])));
    assert_eq!(
        kind("default(int?)"),
        SyntaxKind::Default(TypeRef::Nullable(Box::new(named(&["int"]))))
    );
    assert!(matches!(kind("x is int?"), SyntaxKind::Is { ty: TypeRef::Nullable(_), .. }));
}

#[test]
fn test_errors() {
    assert_eq!(parse_error(""), ParseErrorKind::EmptyExpression);
    assert_eq!(parse_error("1 +"), ParseErrorKind::MissingOperand);
    assert_eq!(parse_error("(1 + 2"), ParseErrorKind::UnclosedBracket('('));
    assert_eq!(
        parse_error("f(1]"),
        ParseErrorKind::MismatchedBracket {
            open: '(',
            found: ']'
        }
    );
    assert_eq!(parse_error("a ? b"), ParseErrorKind::MissingColon);
    assert_eq!(parse_error("a : b"), ParseErrorKind::UnmatchedColon);
    assert_eq!(parse_error("()"), ParseErrorKind::MissingOperand);
    assert!(matches!(parse_error("1 2"), ParseErrorKind::UnexpectedToken(_)));
    assert!(matches!(parse_error("a)"), ParseErrorKind::UnexpectedToken(_)));
    assert_eq!(parse_error("typeof(1)"), ParseErrorKind::ExpectedType);
}

#[test]
fn test_error_positions() {
    let Err(SyntaxError::Parse(e)) = parse_syntax_tree("1 + * 2", true) else {
        panic!("expected parse error");
    };
    assert_eq!(e.span.0, 4..5);
    assert_eq!(e.token, "*");
}

#[test]
fn test_deep_left_nesting_does_not_recurse_in_parser() {
    let source = vec!["1"; 5000].join(" + ");
    let arena = Bump::new();
    let tokens = tokenize(&source).unwrap();
    let root = parse(&arena, &tokens).unwrap();
    assert_eq!(root.count(), 9999);
}

#[test]
fn test_postcard_roundtrip() {
    let node = tree("a?.b(1, x: \"s\") ?? new[] { 1m }");
    let bytes = node.to_bytes().unwrap();
    assert_eq!(SyntaxNode::from_bytes(&bytes).unwrap(), node);
}
