use crate::syntax_tree::SyntaxNode;

use super::parse_syntax_tree;

// Helper function to parse an expression and return the tree without spans.
//
// We test precedence by comparing whether two expressions parenthesized in
// different ways yield the same tree (groups do not survive lowering).
fn ast(source: &str) -> SyntaxNode {
    parse_syntax_tree(source, true)
        .unwrap_or_else(|e| panic!("Expression parsing failed: {}\n{}", source, e))
        .without_spans()
}

#[test]
fn test_addition_vs_subtraction() {
    assert_eq!(ast("a + b - c"), ast("(a + b) - c"));
    assert_eq!(ast("a - b + c"), ast("(a - b) + c"));
    assert_eq!(
        ast("a + b - c + d - e + f"),
        ast("((((a + b) - c) + d) - e) + f")
    );
}

#[test]
fn test_multiplication_vs_division() {
    assert_eq!(ast("a * b / c"), ast("(a * b) / c"));
    assert_eq!(ast("a / b % c"), ast("(a / b) % c"));
    assert_eq!(ast("a ** b * c"), ast("(a ** b) * c"));
}

#[test]
fn test_addition_vs_multiplication() {
    assert_eq!(ast("a + b * c"), ast("a + (b * c)"));
    assert_eq!(ast("a * b + c"), ast("(a * b) + c"));
}

#[test]
fn test_logical_operators() {
    assert_eq!(ast("a && b || c"), ast("(a && b) || c"));
    assert_eq!(ast("a || b && c"), ast("a || (b && c)"));
    assert_eq!(ast("a | b ^ c & d"), ast("a | (b ^ (c & d))"));
    assert_eq!(ast("a == b && c != d"), ast("(a == b) && (c != d)"));
}

#[test]
fn test_shift_between_additive_and_relational() {
    assert_eq!(ast("a << b + c"), ast("a << (b + c)"));
    assert_eq!(ast("a < b << c"), ast("a < (b << c)"));
    assert_eq!(
        ast("2 * (2 + 3) << 1 - 1 & 7 | 25 ^ 10"),
        ast("(((2 * (2 + 3)) << (1 - 1)) & 7) | (25 ^ 10)")
    );
}

#[test]
fn test_unary_vs_binary() {
    assert_eq!(ast("--a"), ast("-(-a)"));
    assert_eq!(ast("-a + b"), ast("(-a) + b"));
    assert_eq!(ast("a + -b"), ast("a + (-b)"));
    assert_eq!(ast("!a && ~b == c"), ast("(!a) && ((~b) == c)"));
    assert_eq!(ast("-a.b"), ast("-(a.b)"));
}

#[test]
fn test_coalesce_is_right_associative() {
    assert_eq!(ast("a ?? b ?? c"), ast("a ?? (b ?? c)"));
    assert_eq!(ast("a ?? b || c"), ast("a ?? (b || c)"));
    assert_eq!(ast("a ?? b ? c : d"), ast("(a ?? b) ? c : d"));
}

#[test]
fn test_conditional_nesting() {
    assert_eq!(ast("a ? b : c ? d : e"), ast("a ? b : (c ? d : e)"));
    assert_eq!(ast("a ? b ? c : d : e"), ast("a ? (b ? c : d) : e"));
    assert_eq!(ast("a || b ? c + 1 : d"), ast("(a || b) ? (c + 1) : d"));
}

#[test]
fn test_lambda_body_extends_right() {
    assert_eq!(ast("f(x => x + 1, 2)"), ast("f(x => (x + 1), 2)"));
    assert_eq!(ast("x => y => x + y"), ast("x => (y => (x + y))"));
    assert_eq!(ast("x => a ? b : c"), ast("x => (a ? b : c)"));
}

#[test]
fn test_cast_binds_like_unary() {
    assert_eq!(ast("(int)a + b"), ast("((int)a) + b"));
    assert_eq!(ast("(int)-a * b"), ast("((int)(-a)) * b"));
    assert_eq!(ast("(Foo)a.b"), ast("(Foo)(a.b)"));
}

#[test]
fn test_is_as_are_relational() {
    assert_eq!(ast("a + b is int"), ast("(a + b) is int"));
    assert_eq!(ast("a as string == null"), ast("(a as string) == null"));
    assert_eq!(ast("a is int && b"), ast("(a is int) && b"));
}

#[test]
fn test_postfix_chains() {
    assert_eq!(ast("a.b(c)[d].e"), ast("((a.b(c))[d]).e"));
    assert_eq!(ast("a?.b.c ?? d"), ast("(a?.b.c) ?? d"));
}
