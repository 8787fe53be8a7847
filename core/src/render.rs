//! Renders a syntax tree back to C# source.
//!
//! Parentheses are inserted only where precedence or associativity demands
//! them, so parsing the output yields the same tree (groups are not part of
//! the tree).

use core::fmt::Write;

use crate::lexer::KEYWORDS;
use crate::stack::ensure_sufficient_stack;
use crate::syntax::precedence;
use crate::syntax::string_literal::{Quote, escape_string};
use crate::syntax::UnaryOp;
use crate::syntax_tree::{
    ArgumentList, Initializer, LambdaParameter, Literal, MemberValue, SyntaxKind, SyntaxNode,
    TypeRef,
};

/// Renders `node` as C# source text.
///
/// # Example
///
/// ```
/// use cseval_core::parser::parse_syntax_tree;
/// use cseval_core::render::render;
///
/// let tree = parse_syntax_tree("(a + b) * c", true).unwrap();
/// assert_eq!(render(&tree), "(a + b) * c");
/// ```
pub fn render(node: &SyntaxNode) -> String {
    let mut out = String::new();
    write_node(&mut out, node, 0);
    out
}

/// Renders a type reference as written in source (`List<int>`, `int?[]`).
pub fn render_type(ty: &TypeRef) -> String {
    let mut out = String::new();
    write_type(&mut out, ty);
    out
}

fn node_precedence(node: &SyntaxNode) -> u8 {
    match &node.kind {
        SyntaxKind::Binary { op, .. } => op.precedence(),
        SyntaxKind::Unary { .. } | SyntaxKind::Cast { .. } => precedence::UNARY,
        SyntaxKind::Is { .. } | SyntaxKind::As { .. } => precedence::RELATIONAL,
        SyntaxKind::Conditional { .. } => precedence::CONDITIONAL,
        SyntaxKind::Lambda { .. } => precedence::LAMBDA,
        // `new int[3][0]` would read as a jagged array type; creations only
        // take postfix operators inside parentheses.
        SyntaxKind::New { .. } | SyntaxKind::NewArrayBounds { .. } | SyntaxKind::NewArrayInit { .. } => {
            precedence::UNARY
        }
        _ => precedence::PRIMARY,
    }
}

fn write_node(out: &mut String, node: &SyntaxNode, min: u8) {
    let parenthesize = node_precedence(node) < min || is_type_test(node) && min > 0;
    if parenthesize {
        out.push('(');
        write_kind(out, node);
        out.push(')');
    } else {
        write_kind(out, node);
    }
}

/// A type name followed by more tokens can swallow them (`x is int? ...`),
/// so nested `is`/`as` are always parenthesized.
fn is_type_test(node: &SyntaxNode) -> bool {
    matches!(&node.kind, SyntaxKind::Is { .. } | SyntaxKind::As { .. })
}

fn write_kind(out: &mut String, node: &SyntaxNode) {
    ensure_sufficient_stack(|| write_kind_inner(out, node))
}

fn write_kind_inner(out: &mut String, node: &SyntaxNode) {
    match &node.kind {
        SyntaxKind::Literal(literal) => write_literal(out, literal),
        SyntaxKind::Identifier {
            name,
            type_arguments,
        } => {
            write_name(out, name);
            write_type_arguments(out, type_arguments);
        }
        SyntaxKind::MemberAccess {
            target,
            member,
            type_arguments,
            null_conditional,
        } => {
            write_postfix_target(out, target);
            out.push_str(if *null_conditional { "?." } else { "." });
            write_name(out, member);
            write_type_arguments(out, type_arguments);
        }
        SyntaxKind::Index {
            target,
            arguments,
            null_conditional,
        } => {
            write_postfix_target(out, target);
            out.push_str(if *null_conditional { "?[" } else { "[" });
            write_arguments(out, arguments);
            out.push(']');
        }
        SyntaxKind::Call { target, arguments } => {
            write_postfix_target(out, target);
            out.push('(');
            write_arguments(out, arguments);
            out.push(')');
        }
        SyntaxKind::Unary { op, operand, .. } => {
            out.push_str(op.symbol());
            // `- -x` must not become the decrement token.
            let repeated = matches!(
                (&operand.kind, op),
                (SyntaxKind::Unary { op: UnaryOp::Negate, .. }, UnaryOp::Negate)
                    | (SyntaxKind::Unary { op: UnaryOp::Plus, .. }, UnaryOp::Plus)
            );
            if repeated {
                out.push('(');
                write_kind(out, operand);
                out.push(')');
            } else {
                write_node(out, operand, precedence::UNARY);
            }
        }
        SyntaxKind::Binary {
            op, left, right, ..
        } => {
            let p = op.precedence();
            let (left_min, right_min) = if op.is_right_associative() { (p + 1, p) } else { (p, p + 1) };
            write_node(out, left, left_min);
            let _ = write!(out, " {} ", op.symbol());
            write_node(out, right, right_min);
        }
        SyntaxKind::Conditional {
            condition,
            when_true,
            when_false,
        } => {
            write_node(out, condition, precedence::CONDITIONAL + 1);
            out.push_str(" ? ");
            write_node(out, when_true, precedence::CONDITIONAL);
            out.push_str(" : ");
            write_node(out, when_false, precedence::CONDITIONAL);
        }
        SyntaxKind::Cast { ty, operand, .. } => {
            out.push('(');
            write_type(out, ty);
            out.push(')');
            // `(T)-x` reads as a subtraction unless `T` is a keyword.
            let signed = matches!(
                operand.kind,
                SyntaxKind::Unary {
                    op: UnaryOp::Negate | UnaryOp::Plus,
                    ..
                }
            );
            if signed {
                out.push('(');
                write_kind(out, operand);
                out.push(')');
            } else {
                write_node(out, operand, precedence::UNARY);
            }
        }
        SyntaxKind::Is { operand, ty } => {
            write_node(out, operand, precedence::RELATIONAL);
            out.push_str(" is ");
            write_type(out, ty);
        }
        SyntaxKind::As { operand, ty } => {
            write_node(out, operand, precedence::RELATIONAL);
            out.push_str(" as ");
            write_type(out, ty);
        }
        SyntaxKind::TypeOf(ty) => {
            out.push_str("typeof(");
            write_type(out, ty);
            out.push(')');
        }
        SyntaxKind::Default(ty) => {
            out.push_str("default(");
            write_type(out, ty);
            out.push(')');
        }
        SyntaxKind::OverflowScope { checked, operand } => {
            out.push_str(if *checked { "checked(" } else { "unchecked(" });
            write_node(out, operand, 0);
            out.push(')');
        }
        SyntaxKind::Lambda { parameters, body } => {
            write_lambda_parameters(out, parameters);
            out.push_str(" => ");
            write_node(out, body, precedence::LAMBDA);
        }
        SyntaxKind::New {
            ty,
            arguments,
            initializer,
        } => {
            out.push_str("new ");
            write_type(out, ty);
            out.push('(');
            write_arguments(out, arguments);
            out.push(')');
            if let Some(init) = initializer {
                out.push(' ');
                write_initializer(out, init);
            }
        }
        SyntaxKind::NewArrayBounds { element, bounds } => {
            out.push_str("new ");
            write_type(out, element);
            out.push('[');
            write_list(out, bounds);
            out.push(']');
        }
        SyntaxKind::NewArrayInit { element, elements } => {
            out.push_str("new");
            if let Some(element) = element {
                out.push(' ');
                write_type(out, element);
            }
            out.push_str("[] { ");
            write_list(out, elements);
            out.push_str(if elements.is_empty() { "}" } else { " }" });
        }
    }
}

fn write_postfix_target(out: &mut String, target: &SyntaxNode) {
    // `1.ToString()` would lex the dot into the number.
    if matches!(target.kind, SyntaxKind::Literal(Literal::Number(_))) {
        out.push('(');
        write_kind(out, target);
        out.push(')');
    } else {
        write_node(out, target, precedence::PRIMARY);
    }
}

/// Names that are keywords were written verbatim. `true`, `false` and `null`
/// are kept bare: the tree holds them as names either way.
fn write_name(out: &mut String, name: &str) {
    if KEYWORDS.contains(&name) && !matches!(name, "true" | "false" | "null") {
        out.push('@');
    }
    out.push_str(name);
}

fn write_literal(out: &mut String, literal: &Literal) {
    match literal {
        Literal::Number(text) => out.push_str(text),
        Literal::String(s) => {
            let _ = escape_string(out, s, Quote::Double);
        }
        Literal::Char(c) => {
            let mut buf = [0u8; 4];
            let _ = escape_string(out, c.encode_utf8(&mut buf), Quote::Single);
        }
    }
}

fn write_list(out: &mut String, nodes: &[SyntaxNode]) {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_node(out, node, 0);
    }
}

fn write_arguments(out: &mut String, arguments: &ArgumentList) {
    write_list(out, &arguments.positional);
    for (i, named) in arguments.named.iter().enumerate() {
        if i > 0 || !arguments.positional.is_empty() {
            out.push_str(", ");
        }
        write_name(out, &named.name);
        out.push_str(": ");
        write_node(out, &named.value, 0);
    }
}

fn write_lambda_parameters(out: &mut String, parameters: &[LambdaParameter]) {
    if let [LambdaParameter { name, ty: None, .. }] = parameters {
        write_name(out, name);
        return;
    }
    out.push('(');
    for (i, p) in parameters.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        if let Some(ty) = &p.ty {
            write_type(out, ty);
            out.push(' ');
        }
        write_name(out, &p.name);
    }
    out.push(')');
}

fn write_initializer(out: &mut String, initializer: &Initializer) {
    out.push_str("{ ");
    match initializer {
        Initializer::Collection(elements) => {
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match element.arguments.as_slice() {
                    [single] => write_node(out, single, 0),
                    arguments => {
                        out.push_str("{ ");
                        write_list(out, arguments);
                        out.push_str(" }");
                    }
                }
            }
        }
        Initializer::Object(members) => {
            for (i, member) in members.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_name(out, &member.member);
                out.push_str(" = ");
                match &member.value {
                    MemberValue::Expression(value) => write_node(out, value, precedence::ASSIGNMENT),
                    MemberValue::Initializer(nested) => write_initializer(out, nested),
                }
            }
        }
    }
    out.push_str(" }");
}

fn write_type_arguments(out: &mut String, arguments: &[TypeRef]) {
    if arguments.is_empty() {
        return;
    }
    out.push('<');
    for (i, arg) in arguments.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_type(out, arg);
    }
    out.push('>');
}

fn write_type(out: &mut String, ty: &TypeRef) {
    match ty {
        TypeRef::Named {
            path,
            type_arguments,
        } => {
            out.push_str(&path.join("."));
            write_type_arguments(out, type_arguments);
        }
        TypeRef::Nullable(inner) => {
            write_type(out, inner);
            out.push('?');
        }
        TypeRef::Array { element, rank } => {
            write_type(out, element);
            out.push('[');
            for _ in 1..*rank {
                out.push(',');
            }
            out.push(']');
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::parse_syntax_tree;

    fn parse(source: &str) -> SyntaxNode {
        parse_syntax_tree(source, true)
            .unwrap_or_else(|e| panic!("Expression parsing failed: {}\n{}", source, e))
    }

    fn round_trip(source: &str) -> String {
        let tree = parse(source);
        let rendered = render(&tree);
        let reparsed = parse(&rendered);
        assert!(
            tree.same_shape(&reparsed),
            "{:?} rendered as {:?} does not parse back to the same tree",
            source,
            rendered
        );
        rendered
    }

    #[test]
    fn test_minimal_parentheses() {
        assert_eq!(round_trip("((a + b)) * c"), "(a + b) * c");
        assert_eq!(round_trip("a + (b * c)"), "a + b * c");
        assert_eq!(round_trip("a - (b - c)"), "a - (b - c)");
        assert_eq!(round_trip("(a - b) - c"), "a - b - c");
        assert_eq!(round_trip("a ?? (b ?? c)"), "a ?? b ?? c");
        assert_eq!(round_trip("(a ?? b) ?? c"), "(a ?? b) ?? c");
        assert_eq!(round_trip("(a ? b : c) ? d : e"), "(a ? b : c) ? d : e");
        assert_eq!(round_trip("a ? b : (c ? d : e)"), "a ? b : c ? d : e");
    }

    #[test]
    fn test_unary_and_casts() {
        assert_eq!(round_trip("-(-a)"), "-(-a)");
        assert_eq!(round_trip("-(a + b)"), "-(a + b)");
        assert_eq!(round_trip("!(a && b)"), "!(a && b)");
        assert_eq!(round_trip("(int)x.Y"), "(int)x.Y");
        assert_eq!(round_trip("(int)(x + 1)"), "(int)(x + 1)");
        assert_eq!(round_trip("(long)(-1)"), "(long)(-1)");
    }

    #[test]
    fn test_literals_are_escaped() {
        assert_eq!(round_trip(r#""a\"b\n""#), r#""a\"b\n""#);
        assert_eq!(round_trip(r"'\''"), r"'\''");
        assert_eq!(round_trip("1.5m + 0x1F + 2UL"), "1.5m + 0x1F + 2UL");
        assert_eq!(round_trip("(1).ToString()"), "(1).ToString()");
    }

    #[test]
    fn test_postfix_chains() {
        assert_eq!(round_trip("a?.b[0]?.c(1, x: 2)"), "a?.b[0]?.c(1, x: 2)");
        assert_eq!(round_trip("Array.IndexOf<int>(a, 1)"), "Array.IndexOf<int>(a, 1)");
        assert_eq!(round_trip("(a + b).ToString()"), "(a + b).ToString()");
    }

    #[test]
    fn test_type_operators() {
        assert_eq!(round_trip("x is string && (y as string) != null"), "(x is string) && (y as string) != null");
        assert_eq!(round_trip("typeof(List<int>)"), "typeof(List<int>)");
        assert_eq!(round_trip("default(int?)"), "default(int?)");
        assert_eq!(round_trip("checked(a + b) * 2"), "checked(a + b) * 2");
    }

    #[test]
    fn test_lambdas() {
        assert_eq!(round_trip("Array.Find(a, x => x > 1)"), "Array.Find(a, x => x > 1)");
        assert_eq!(round_trip("(int x, int y) => x + y"), "(int x, int y) => x + y");
        assert_eq!(round_trip("() => 1"), "() => 1");
    }

    #[test]
    fn test_verbatim_names() {
        assert_eq!(round_trip("@is + @new"), "@is + @new");
        assert_eq!(round_trip("x.@typeof(@default: 1)"), "x.@typeof(@default: 1)");
        assert_eq!(round_trip("@checked => @checked"), "@checked => @checked");
        assert_eq!(round_trip("new Foo { @as = 1 }"), "new Foo() { @as = 1 }");
        assert_eq!(round_trip("@true"), "true");
    }

    #[test]
    fn test_deep_nesting() {
        let sum = vec!["a"; 10_000].join(" + ");
        assert_eq!(render(&parse(&sum)), sum);

        let grouped = format!("{}a + 1{}", "(".repeat(1000), ")".repeat(1000));
        assert_eq!(render(&parse(&grouped)), "a + 1");

        let negated = format!("{}a{}", "-(".repeat(1000), ")".repeat(1000));
        let expected = format!("{}-a{}", "-(".repeat(999), ")".repeat(999));
        assert_eq!(render(&parse(&negated)), expected);
    }

    #[test]
    fn test_creation() {
        assert_eq!(round_trip("new List<int> { 1, 2 }"), "new List<int>() { 1, 2 }");
        assert_eq!(round_trip("new int[3]"), "new int[3]");
        assert_eq!(round_trip("new[] { 1, 2 }"), "new[] { 1, 2 }");
        assert_eq!(round_trip("new string[] { \"a\" }"), "new string[] { \"a\" }");
        assert_eq!(round_trip("(new int[3]).Length"), "(new int[3]).Length");
        assert_eq!(
            round_trip("new Foo { A = 1, B = { 2, 3 }, C = { D = 4 } }"),
            "new Foo() { A = 1, B = { 2, 3 }, C = { D = 4 } }"
        );
    }
}
