use pretty_assertions::assert_eq;

use super::*;
use crate::api::CompilationOptions;
use crate::parser::parse_syntax_tree;
use crate::stdlib::datetime::DAY_OF_WEEK;
use crate::syntax::number_literal::NumberLiteralError;
use crate::types::{Type, TypeCatalog};
use crate::values::Value;

fn bind_source(source: &str, parameters: &[(&str, Type)]) -> Result<TypedExpression, BindError> {
    let syntax = parse_syntax_tree(source, true)
        .unwrap_or_else(|e| panic!("Expression parsing failed: {}\n{}", source, e));
    bind(&syntax, parameters, &TypeCatalog::empty(), &CompilationOptions::default())
}

fn type_of(source: &str, parameters: &[(&str, Type)]) -> Type {
    match bind_source(source, parameters) {
        Ok(typed) => typed.result_type,
        Err(e) => panic!("Binding failed for {:?}: {}", source, e),
    }
}

fn error_of(source: &str, parameters: &[(&str, Type)]) -> BindErrorKind {
    match bind_source(source, parameters) {
        Ok(typed) => panic!("expected {:?} to fail, bound as {}", source, typed.result_type),
        Err(e) => e.kind,
    }
}

#[test]
fn test_literal_types() {
    assert_eq!(type_of("1", &[]), Type::INT32);
    assert_eq!(type_of("1u", &[]), Type::UINT32);
    assert_eq!(type_of("1L", &[]), Type::INT64);
    assert_eq!(type_of("1UL", &[]), Type::UINT64);
    assert_eq!(type_of("1.5", &[]), Type::DOUBLE);
    assert_eq!(type_of("1.5f", &[]), Type::SINGLE);
    assert_eq!(type_of("1.5m", &[]), Type::DECIMAL);
    assert_eq!(type_of("'a'", &[]), Type::CHAR);
    assert_eq!(type_of("\"abc\"", &[]), Type::String);
    assert_eq!(type_of("true", &[]), Type::BOOL);
    assert_eq!(type_of("null", &[]), Type::Null);
}

#[test]
fn test_extreme_literals_are_errors() {
    assert_eq!(
        error_of("99999999999999999999", &[]),
        BindErrorKind::InvalidLiteral(NumberLiteralError::IntegerTooLarge)
    );
    // The negated minimum is representable.
    assert_eq!(type_of("-2147483648", &[]), Type::INT32);
}

#[test]
fn test_numeric_promotion() {
    assert_eq!(type_of("(byte)1 + 1", &[]), Type::INT32);
    assert_eq!(type_of("1m + 1", &[]), Type::DECIMAL);
    assert_eq!(type_of("1u + 1", &[]), Type::UINT32);
    assert_eq!(type_of("1.5f + 1L", &[]), Type::SINGLE);
    assert_eq!(type_of("u + i", &[("u", Type::UINT32), ("i", Type::INT32)]), Type::INT64);
    assert!(matches!(
        error_of("1m + 1.0", &[]),
        BindErrorKind::BinaryNotApplicable { .. }
    ));
    assert!(matches!(
        error_of("u + i", &[("u", Type::UINT64), ("i", Type::INT32)]),
        BindErrorKind::BinaryNotApplicable { .. }
    ));
}

#[test]
fn test_unary_operators() {
    assert_eq!(type_of("-b", &[("b", Type::BYTE)]), Type::INT32);
    assert_eq!(type_of("~c", &[("c", Type::CHAR)]), Type::INT32);
    assert_eq!(type_of("!true", &[]), Type::BOOL);
    assert!(matches!(
        error_of("!1", &[]),
        BindErrorKind::UnaryNotApplicable { .. }
    ));
    assert!(matches!(
        error_of("-\"a\"", &[]),
        BindErrorKind::UnaryNotApplicable { .. }
    ));
}

#[test]
fn test_comparisons_are_bool() {
    assert_eq!(type_of("1 < 2L", &[]), Type::BOOL);
    assert_eq!(type_of("\"a\" == \"b\"", &[]), Type::BOOL);
    assert_eq!(type_of("1 < 2 && 3 > 2", &[]), Type::BOOL);
}

#[test]
fn test_nullable_lifting() {
    let int_n = Type::nullable(Type::INT32);
    let params = [("a", int_n.clone()), ("b", Type::INT32)];
    assert_eq!(type_of("a + b", &params), int_n);
    assert_eq!(type_of("-a", &params), int_n);
    assert_eq!(type_of("a == b", &params), Type::BOOL);
    assert_eq!(type_of("a < b", &params), Type::BOOL);
    assert_eq!(type_of("a ?? b", &params), Type::INT32);
    assert_eq!(type_of("a ?? null", &params), int_n);
    assert_eq!(type_of("null == a", &params), Type::BOOL);
}

#[test]
fn test_null_conditional_types() {
    assert_eq!(
        type_of("s?.Length", &[("s", Type::String)]),
        Type::nullable(Type::INT32)
    );
    assert_eq!(type_of("s?.ToUpper()", &[("s", Type::String)]), Type::String);
    assert_eq!(
        type_of("s?.Length ?? 0", &[("s", Type::String)]),
        Type::INT32
    );
    assert!(matches!(
        error_of("i?.ToString()", &[("i", Type::INT32)]),
        BindErrorKind::NullConditionalOnValueType(_)
    ));
}

#[test]
fn test_null_guard_uses_a_temporary() {
    let typed = bind_source("s?.Length", &[("s", Type::String)]).unwrap();
    assert_eq!(typed.temporaries, 1);
    assert!(matches!(typed.root.kind, TypedKind::NullGuard { .. }));

    let typed = bind_source("s.Length", &[("s", Type::String)]).unwrap();
    assert_eq!(typed.temporaries, 0);
}

#[test]
fn test_unknown_names() {
    assert_eq!(
        error_of("foo + 1", &[]),
        BindErrorKind::UnknownName("foo".to_string())
    );
    match error_of("s.Lenght", &[("s", Type::String)]) {
        BindErrorKind::UnknownMember {
            ty,
            member,
            available,
        } => {
            assert_eq!(ty, "string");
            assert_eq!(member, "Lenght");
            assert!(available.iter().any(|m| m == "Length"));
        }
        other => panic!("expected UnknownMember, got {:?}", other),
    }
    assert!(matches!(
        error_of("new Foo()", &[]),
        BindErrorKind::UnknownType(_)
    ));
}

#[test]
fn test_error_spans_point_at_the_culprit() {
    let err = bind_source("1 + foo", &[]).unwrap_err();
    assert_eq!(err.span.0, 4..7);
    let diagnostic = err.to_diagnostic();
    assert_eq!(diagnostic.code.as_deref(), Some("B001"));
    assert_eq!(
        diagnostic.message,
        "the name 'foo' does not exist in the current context"
    );
}

#[test]
fn test_overload_resolution() {
    crate::test_utils::init_test_logging();
    assert_eq!(type_of("Math.Max(1, 2)", &[]), Type::INT32);
    assert_eq!(type_of("Math.Max(1, 2L)", &[]), Type::INT64);
    assert_eq!(type_of("Math.Max(1, 2.5)", &[]), Type::DOUBLE);
    assert_eq!(type_of("System.Math.Abs(-1m)", &[]), Type::DECIMAL);
    assert!(matches!(
        error_of("Math.Max(1)", &[]),
        BindErrorKind::NoOverload { .. }
    ));
    assert!(matches!(
        error_of("Math.Max(\"a\", 1)", &[]),
        BindErrorKind::NoOverload { .. }
    ));
}

#[test]
fn test_generic_inference_with_lambdas() {
    let numbers = [("xs", Type::array(Type::INT32))];
    assert_eq!(type_of("Array.Exists(xs, x => x > 2)", &numbers), Type::BOOL);
    assert_eq!(type_of("Array.Find(xs, x => x % 2 == 0)", &numbers), Type::INT32);
    assert_eq!(type_of("Array.IndexOf(xs, 3)", &numbers), Type::INT32);
    assert_eq!(
        type_of("Array.Find<int>(xs, x => x > 0)", &numbers),
        Type::INT32
    );
}

#[test]
fn test_lambda_needs_a_target() {
    assert_eq!(
        error_of("x => x + 1", &[]),
        BindErrorKind::LambdaWithoutTarget
    );
    assert_eq!(
        type_of("(int x) => x + 1", &[]),
        Type::function(vec![Type::INT32], Type::INT32)
    );
}

#[test]
fn test_bind_to_lambda_root() {
    let syntax = parse_syntax_tree("x => x * 2", true).unwrap();
    let target = Type::function(vec![Type::INT32], Type::INT64);
    let typed = bind_to(
        &syntax,
        &[],
        Some(&target),
        &TypeCatalog::empty(),
        &CompilationOptions::default(),
    )
    .unwrap();
    assert_eq!(typed.result_type, target);

    let arity = Type::function(vec![Type::INT32, Type::INT32], Type::INT32);
    let err = bind_to(
        &syntax,
        &[],
        Some(&arity),
        &TypeCatalog::empty(),
        &CompilationOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err.kind, BindErrorKind::LambdaArity { found: 1, .. }));
}

#[test]
fn test_bind_to_converts_result() {
    let syntax = parse_syntax_tree("1", true).unwrap();
    let typed = bind_to(
        &syntax,
        &[],
        Some(&Type::INT64),
        &TypeCatalog::empty(),
        &CompilationOptions::default(),
    )
    .unwrap();
    assert_eq!(typed.result_type, Type::INT64);

    let syntax = parse_syntax_tree("\"a\"", true).unwrap();
    let err = bind_to(
        &syntax,
        &[],
        Some(&Type::INT32),
        &TypeCatalog::empty(),
        &CompilationOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err.kind, BindErrorKind::CannotConvert { .. }));
}

#[test]
fn test_context_parameter() {
    let syntax = parse_syntax_tree("Length + 1", true).unwrap();
    let options = CompilationOptions {
        context_parameter: Some("this".to_string()),
        ..CompilationOptions::default()
    };
    let typed = bind(&syntax, &[("this", Type::String)], &TypeCatalog::empty(), &options).unwrap();
    assert_eq!(typed.result_type, Type::INT32);

    let err = bind(
        &syntax,
        &[("this", Type::String)],
        &TypeCatalog::empty(),
        &CompilationOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind, BindErrorKind::UnknownName("Length".to_string()));
}

#[test]
fn test_conditional_types() {
    let s = [("s", Type::String)];
    assert_eq!(type_of("true ? 1 : 2L", &[]), Type::INT64);
    assert_eq!(type_of("true ? s : null", &s), Type::String);
    assert_eq!(type_of("true ? 1 : null", &[]), Type::nullable(Type::INT32));
    assert!(matches!(
        error_of("true ? 1 : \"a\"", &[]),
        BindErrorKind::NoCommonType(..)
    ));
    assert!(matches!(
        error_of("1 ? 2 : 3", &[]),
        BindErrorKind::CannotConvert { .. }
    ));
}

#[test]
fn test_collection_initializers() {
    let list = type_of("new List<int> { 1, 2, 3 }", &[]);
    assert_eq!(list.to_string(), "List<int>");
    assert_eq!(type_of("(new List<int> { 1, 2 }).Count", &[]), Type::INT32);
    assert_eq!(type_of("new[] { 1, 2L }", &[]), Type::array(Type::INT64));
    assert_eq!(type_of("(new int[3]).Length", &[]), Type::INT32);
    assert!(matches!(
        error_of("new List<int> { \"a\" }", &[]),
        BindErrorKind::NoOverload { .. }
    ));
}

#[test]
fn test_enums() {
    let day = Type::Enum(DAY_OF_WEEK.clone());
    assert_eq!(type_of("DayOfWeek.Monday", &[]), day);
    assert_eq!(type_of("DayOfWeek.Monday + 1", &[]), day);
    assert_eq!(type_of("DayOfWeek.Friday - DayOfWeek.Monday", &[]), Type::INT32);
    assert_eq!(type_of("(int)DayOfWeek.Friday", &[]), Type::INT32);
    assert_eq!(type_of("DayOfWeek.Monday < DayOfWeek.Friday", &[]), Type::BOOL);
}

#[test]
fn test_string_concatenation() {
    assert_eq!(type_of("\"a\" + 1", &[]), Type::String);
    assert_eq!(type_of("1 + \"a\"", &[]), Type::String);
    assert_eq!(type_of("\"a\" + null", &[]), Type::String);
    assert_eq!(type_of("'a' + 1", &[]), Type::INT32);
}

#[test]
fn test_type_operators() {
    let typed = bind_source("typeof(int)", &[]).unwrap();
    assert_eq!(typed.result_type, Type::MetaType);
    assert_eq!(typed.root.as_constant(), Some(&Value::Type(Type::INT32)));

    let o = [("o", Type::Object)];
    assert_eq!(type_of("o is string", &o), Type::BOOL);
    assert_eq!(type_of("o as string", &o), Type::String);
    assert_eq!(type_of("o as int?", &o), Type::nullable(Type::INT32));
    assert_eq!(
        error_of("o as int", &o),
        BindErrorKind::InvalidAs("int".to_string())
    );
    assert_eq!(type_of("default(int)", &[]), Type::INT32);
}

#[test]
fn test_casts() {
    assert_eq!(type_of("(long)1", &[]), Type::INT64);
    assert_eq!(type_of("(int)1.9", &[]), Type::INT32);
    assert_eq!(type_of("(int?)1", &[]), Type::nullable(Type::INT32));
    assert_eq!(type_of("(object)1", &[]), Type::Object);
    assert_eq!(type_of("(int)o", &[("o", Type::Object)]), Type::INT32);
    assert!(matches!(
        error_of("(int)\"a\"", &[]),
        BindErrorKind::InvalidCast { .. }
    ));
}

#[test]
fn test_constant_narrowing() {
    let syntax = parse_syntax_tree("255", true).unwrap();
    let typed = bind_to(
        &syntax,
        &[],
        Some(&Type::BYTE),
        &TypeCatalog::empty(),
        &CompilationOptions::default(),
    )
    .unwrap();
    assert_eq!(typed.result_type, Type::BYTE);

    let syntax = parse_syntax_tree("256", true).unwrap();
    assert!(
        bind_to(
            &syntax,
            &[],
            Some(&Type::BYTE),
            &TypeCatalog::empty(),
            &CompilationOptions::default(),
        )
        .is_err()
    );
}

#[test]
fn test_duplicate_parameters() {
    assert_eq!(
        error_of("x", &[("x", Type::INT32), ("x", Type::INT64)]),
        BindErrorKind::DuplicateParameter("x".to_string())
    );
    let syntax = parse_syntax_tree("(int a, int a) => a", true).unwrap();
    let err = bind(&syntax, &[], &TypeCatalog::empty(), &CompilationOptions::default()).unwrap_err();
    assert_eq!(err.kind, BindErrorKind::DuplicateParameter("a".to_string()));
}

#[test]
fn test_void_has_no_value() {
    let list = type_of("new List<int>()", &[]);
    let params = [("list", list)];
    assert_eq!(type_of("list.Add(1)", &params), Type::Void);
    assert_eq!(error_of("list.Add(1) == null", &params), BindErrorKind::VoidValue);
}

#[test]
fn test_types_are_not_values() {
    assert!(matches!(error_of("Math", &[]), BindErrorKind::NotAValue(_)));
    assert!(matches!(error_of("System", &[]), BindErrorKind::NotAValue(_)));
}

#[test]
fn test_static_and_instance_access() {
    assert!(matches!(
        error_of("s.IsNullOrEmpty(s)", &[("s", Type::String)]),
        BindErrorKind::StaticMismatch { .. }
    ));
    assert_eq!(type_of("string.IsNullOrEmpty(s)", &[("s", Type::String)]), Type::BOOL);
    assert_eq!(type_of("int.MaxValue", &[]), Type::INT32);
}

#[test]
fn test_node_count_and_parameters() {
    let typed = bind_source("a + b * 2", &[("a", Type::INT32), ("b", Type::INT32)]).unwrap();
    assert_eq!(typed.root.node_count(), 5);
    assert_eq!(
        typed.parameters,
        vec![("a".to_string(), Type::INT32), ("b".to_string(), Type::INT32)]
    );
}

fn pair_catalog() -> TypeCatalog {
    use crate::types::{ClassInfo, MemberTable, Method, Parameter, native};

    let class = ClassInfo::declare("Tests", "Pair");
    let f = |a: Type, b: Type, result: Type| {
        Method::new(
            "F",
            vec![Parameter::new("a", a), Parameter::new("b", b)],
            result,
            native(|_, _| Ok(Value::Null)),
        )
    };
    class.define(
        MemberTable::new()
            .method(f(Type::INT32, Type::INT64, Type::INT64))
            .method(f(Type::INT64, Type::INT32, Type::String)),
    );
    let catalog = TypeCatalog::empty();
    catalog.register(Type::Class(class));
    catalog
}

fn bind_with_pair(source: &str) -> Result<TypedExpression, BindError> {
    let syntax = parse_syntax_tree(source, true).expect("parsing failed");
    bind(&syntax, &[], &pair_catalog(), &CompilationOptions::default())
}

#[test]
fn test_ambiguous_overloads() {
    let err = bind_with_pair("Pair.F(1, 1)").expect_err("neither overload is better");
    assert!(matches!(err.kind, BindErrorKind::Ambiguous { ref name, .. } if name == "F"));
    assert_eq!(err.to_diagnostic().code.as_deref(), Some("B005"));

    // One argument that fits only one overload settles it.
    assert_eq!(bind_with_pair("Pair.F(1, 2L)").unwrap().result_type, Type::INT64);
    assert_eq!(bind_with_pair("Pair.F(2L, 1)").unwrap().result_type, Type::String);
}

#[test]
fn test_named_arguments_pick_the_overload() {
    let typed = bind_with_pair("Pair.F(b: 1, a: 2L)").unwrap();
    assert_eq!(typed.result_type, Type::String);
    let TypedKind::Call { arguments, .. } = &typed.root.kind else {
        panic!("expected a call");
    };
    // Arguments are stored in parameter order.
    assert_eq!(arguments[0].as_ref().map(|a| a.ty.clone()), Some(Type::INT64));
    assert_eq!(arguments[1].as_ref().map(|a| a.ty.clone()), Some(Type::INT32));
}
