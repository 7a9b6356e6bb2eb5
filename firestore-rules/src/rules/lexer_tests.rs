use super::*;
use crate::rules::errors::DiagnosticKind;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn kinds(source: &str) -> Vec<TokenKind> {
    Lexer::new(source)
        .map(|each| each.map(|t| t.kind))
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn first_error(source: &str) -> Diagnostic {
    Lexer::new(source)
        .find_map(|each| each.err())
        .expect("expected a lexical error")
}

#[test]
fn test_empty_input_yields_single_eof() {
    let mut lexer = Lexer::new("   // only a comment");
    let token = lexer.next().unwrap().unwrap();
    assert_eq!(token.kind, TokenKind::Eof);
    assert_eq!(token.span.start.offset, 20);
    assert!(lexer.next().is_none());
}

#[test]
fn test_comments_are_skipped() {
    let source = "// leading\nallow // trailing\n read";
    assert_eq!(
        kinds(source),
        vec![
            TokenKind::Keyword(Keyword::Allow),
            TokenKind::Keyword(Keyword::Read),
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_token_spans() {
    let tokens = Lexer::new("a\n  bb")
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(tokens[0].text, "a");
    assert_eq!(
        tokens[0].span,
        SourceSpan::new(
            Location {
                offset: 0,
                line: 1,
                column: 1
            },
            Location {
                offset: 1,
                line: 1,
                column: 2
            }
        )
    );
    assert_eq!(tokens[1].text, "bb");
    assert_eq!(tokens[1].span.start.line, 2);
    assert_eq!(tokens[1].span.start.column, 3);
    assert_eq!(tokens[1].span.start.offset, 4);
    assert_eq!(tokens[1].span.end.offset, 6);
}

#[rstest]
#[case("foo", TokenKind::Identifier)]
#[case("_foo_1", TokenKind::Identifier)]
#[case("service", TokenKind::Keyword(Keyword::Service))]
#[case("rules_version", TokenKind::Keyword(Keyword::RulesVersion))]
#[case("timestamp", TokenKind::Keyword(Keyword::Timestamp))]
#[case("null", TokenKind::Keyword(Keyword::Null))]
#[case("42", TokenKind::Int(42))]
#[case("3.25", TokenKind::Float(3.25))]
#[case("\"hi\"", TokenKind::String("hi".to_string()))]
#[case("'hi'", TokenKind::String("hi".to_string()))]
#[case(r#"'it\'s'"#, TokenKind::String("it's".to_string()))]
#[case(r#""a\\b\?\"\`""#, TokenKind::String("a\\b?\"`".to_string()))]
#[case("<=", TokenKind::Operator(Operator::Le))]
#[case("!=", TokenKind::Operator(Operator::NotEq))]
#[case("&&", TokenKind::Operator(Operator::AndAnd))]
#[case("=", TokenKind::Operator(Operator::Assign))]
#[case("$", TokenKind::Punctuation(Punctuation::Dollar))]
fn test_single_token(#[case] source: &str, #[case] expected: TokenKind) {
    assert_eq!(kinds(source), vec![expected, TokenKind::Eof]);
}

#[test]
fn test_longest_operator_wins() {
    assert_eq!(
        kinds("a<=b<c"),
        vec![
            TokenKind::Identifier,
            TokenKind::Operator(Operator::Le),
            TokenKind::Identifier,
            TokenKind::Operator(Operator::Lt),
            TokenKind::Identifier,
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_number_followed_by_member() {
    assert_eq!(
        kinds("1.size"),
        vec![
            TokenKind::Int(1),
            TokenKind::Punctuation(Punctuation::Dot),
            TokenKind::Identifier,
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_multi_capture_lexes_as_separate_tokens() {
    assert_eq!(
        kinds("/{doc=**}"),
        vec![
            TokenKind::Operator(Operator::Slash),
            TokenKind::Punctuation(Punctuation::LBrace),
            TokenKind::Identifier,
            TokenKind::Operator(Operator::Assign),
            TokenKind::Operator(Operator::Star),
            TokenKind::Operator(Operator::Star),
            TokenKind::Punctuation(Punctuation::RBrace),
            TokenKind::Eof
        ]
    );
}

#[rstest]
#[case("\"abc\ndef\"", 0, "unterminated string literal")]
#[case("x = 'abc", 4, "unterminated string literal")]
#[case(r#""bad \n escape""#, 5, "invalid escape sequence `\\n`")]
#[case("a # b", 2, "unexpected character `#`")]
#[case("99999999999999999999", 0, "integer literal `99999999999999999999` is out of range")]
fn test_lexical_errors(#[case] source: &str, #[case] offset: usize, #[case] message: &str) {
    let error = first_error(source);
    assert_eq!(error.kind, DiagnosticKind::Lexical);
    assert_eq!(error.span.start.offset, offset);
    assert_eq!(error.message, message);
}

#[test]
fn test_float_out_of_range() {
    let literal = format!("{}.0", "9".repeat(400));
    let error = first_error(&format!("x + {} + 1", literal));
    assert_eq!(error.kind, DiagnosticKind::Lexical);
    assert_eq!(error.span.start.offset, 4);
    assert_eq!(
        error.message,
        format!("float literal `{}` is out of range", literal)
    );
}

#[test]
fn test_lexer_stops_after_error() {
    let mut lexer = Lexer::new("a ~ b");
    assert!(lexer.next().unwrap().is_ok());
    assert!(lexer.next().unwrap().is_err());
    assert!(lexer.next().is_none());
}

#[test]
fn test_lexer_is_restartable_by_clone() {
    let mut lexer = Lexer::new("a b");
    let first = lexer.next_token().unwrap();
    let mut copy = lexer.clone();
    assert_eq!(first.text, "a");
    assert_eq!(lexer.next_token().unwrap().text, "b");
    assert_eq!(copy.next_token().unwrap().text, "b");
}

#[test]
fn test_keyword_classification() {
    assert!(Keyword::Match.is_reserved());
    assert!(Keyword::In.is_reserved());
    assert!(!Keyword::Read.is_reserved());
    assert!(!Keyword::Map.is_reserved());
    assert_eq!(Keyword::lookup("latlng"), Some(Keyword::LatLng));
    assert_eq!(Keyword::lookup("Service"), None);
}
