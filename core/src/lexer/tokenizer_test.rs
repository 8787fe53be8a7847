use super::*;

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
}

fn texts(source: &str) -> Vec<String> {
    tokenize(source)
        .unwrap()
        .into_iter()
        .filter(|t| t.kind != TokenKind::End)
        .map(|t| t.text.to_string())
        .collect()
}

#[test]
fn test_empty_source_yields_end() {
    assert_eq!(kinds(""), vec![TokenKind::End]);
    assert_eq!(kinds("   \n\t "), vec![TokenKind::End]);
}

#[test]
fn test_operators_are_greedy() {
    assert_eq!(
        kinds("a?.b ?? c?[0] => x >> 1 << 2 ** 3"),
        vec![
            TokenKind::Identifier,
            TokenKind::QuestionDot,
            TokenKind::Identifier,
            TokenKind::QuestionQuestion,
            TokenKind::Identifier,
            TokenKind::QuestionBracket,
            TokenKind::Number,
            TokenKind::RBracket,
            TokenKind::Arrow,
            TokenKind::Identifier,
            TokenKind::GtGt,
            TokenKind::Number,
            TokenKind::LtLt,
            TokenKind::Number,
            TokenKind::StarStar,
            TokenKind::Number,
            TokenKind::End,
        ]
    );
}

#[test]
fn test_numbers_keep_suffix_text() {
    assert_eq!(
        texts("1 2u 3L 4UL 5.5f 6d 7.25m 0xFF 1e10 .5"),
        vec!["1", "2u", "3L", "4UL", "5.5f", "6d", "7.25m", "0xFF", "1e10", ".5"]
    );
}

#[test]
fn test_member_access_on_integer_literal() {
    assert_eq!(
        kinds("1.ToString()"),
        vec![
            TokenKind::Number,
            TokenKind::Dot,
            TokenKind::Identifier,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::End,
        ]
    );
}

#[test]
fn test_malformed_suffix_is_lex_error() {
    let err = tokenize("1.5u").unwrap_err();
    assert!(matches!(err.kind, LexErrorKind::MalformedNumber(_)));
    assert_eq!(err.position(), 0);

    let err = tokenize("x + 12abc").unwrap_err();
    assert!(matches!(err.kind, LexErrorKind::MalformedNumber(_)));
    assert_eq!(err.position(), 4);
}

#[test]
fn test_string_values_are_unescaped() {
    let tokens = tokenize(r#""a\tb\u0041" @"C:\dir""x""#).unwrap();
    assert_eq!(tokens[0].value.as_deref(), Some("a\tbA"));
    assert_eq!(tokens[0].text, r#""a\tb\u0041""#);
    assert_eq!(tokens[1].value.as_deref(), Some("C:\\dir\"x"));
}

#[test]
fn test_char_literals() {
    let tokens = tokenize(r"'a' '\n' '\x41'").unwrap();
    assert_eq!(tokens[0].value.as_deref(), Some("a"));
    assert_eq!(tokens[1].value.as_deref(), Some("\n"));
    assert_eq!(tokens[2].value.as_deref(), Some("A"));

    assert_eq!(tokenize("''").unwrap_err().kind, LexErrorKind::EmptyChar);
    assert_eq!(tokenize("'ab'").unwrap_err().kind, LexErrorKind::TooManyChars);
}

#[test]
fn test_unterminated_literals() {
    assert_eq!(
        tokenize("\"abc").unwrap_err().kind,
        LexErrorKind::UnterminatedString
    );
    assert_eq!(
        tokenize("'a").unwrap_err().kind,
        LexErrorKind::UnterminatedChar
    );
}

#[test]
fn test_invalid_escape_points_at_sequence() {
    let err = tokenize(r#"x == "ab\qc""#).unwrap_err();
    assert!(matches!(err.kind, LexErrorKind::InvalidEscape(_)));
    assert_eq!(err.span.0, 8..10);
}

#[test]
fn test_verbatim_identifier() {
    let tokens = tokenize("@new + new").unwrap();
    assert!(tokens[0].verbatim);
    assert_eq!(tokens[0].name(), "new");
    assert!(!tokens[0].is_keyword("new"));
    assert!(tokens[2].is_keyword("new"));
}

#[test]
fn test_positions() {
    let tokens = tokenize("a +\n  bb").unwrap();
    assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
    assert_eq!((tokens[1].line, tokens[1].column), (1, 3));
    assert_eq!((tokens[2].line, tokens[2].column), (2, 3));
    assert_eq!(tokens[2].offset, 6);
    assert_eq!(tokens[2].length, 2);
}

#[test]
fn test_comments_are_skipped() {
    assert_eq!(texts("1 /* two */ + // three\n 4"), vec!["1", "+", "4"]);
}

#[test]
fn test_unexpected_character() {
    assert_eq!(
        tokenize("a # b").unwrap_err().kind,
        LexErrorKind::UnexpectedCharacter('#')
    );
}

#[test]
fn test_tokenize_is_restartable() {
    assert_eq!(tokenize("a.b(1)").unwrap(), tokenize("a.b(1)").unwrap());
}
