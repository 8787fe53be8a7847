use std::ops::Deref;

use cseval_core::parser::parse_syntax_tree;
use cseval_core::syntax_tree::SyntaxNode;

fn parse(source: &str) -> SyntaxNode {
    parse_syntax_tree(source, true).unwrap()
}

#[test]
fn test_postcard() {
    // Number literal: span 0..1, SyntaxKind::Literal, Literal::Number("1")
    let tree = parse("1");
    let v = tree.to_bytes().unwrap();
    assert_eq!(&[0, 1, 0, 0, 1, b'1'], v.deref());
    assert_eq!(SyntaxNode::from_bytes(&v).unwrap(), tree);
    println!("✓ Literal round-trip");

    // Identifier: span 0..1, SyntaxKind::Identifier { name: "x", type_arguments: [] }
    let tree = parse("x");
    let v = tree.to_bytes().unwrap();
    assert_eq!(&[0, 1, 1, 1, b'x', 0], v.deref());
    assert_eq!(SyntaxNode::from_bytes(&v).unwrap(), tree);
    println!("✓ Identifier round-trip");

    // Larger trees keep their spans
    let source = "items?.Where(x => x.Price > 10m).Count() ?? (int)default(long?)";
    let tree = parse(source);
    let decoded = SyntaxNode::from_bytes(&tree.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded, tree);
    assert_eq!(decoded.span.end(), source.len());
    println!("✓ Nested round-trip");
}

#[test]
fn test_truncated_bytes_are_rejected() {
    let bytes = parse("a + b * c").to_bytes().unwrap();
    for len in 0..bytes.len() {
        assert!(
            SyntaxNode::from_bytes(&bytes[..len]).is_err(),
            "{} of {} bytes decoded",
            len,
            bytes.len()
        );
    }
}
