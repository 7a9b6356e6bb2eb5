use std::collections::HashMap;
use std::fmt::Formatter;

use lazy_static::lazy_static;
use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_till, take_while};
use nom::character::complete::{char, digit1, multispace1, one_of, satisfy};
use nom::combinator::{map, opt, recognize, value};
use nom::error::ErrorKind;
use nom::multi::many0;
use nom::sequence::{pair, preceded};
use nom_locate::LocatedSpan;

use crate::rules::errors::Diagnostic;
use crate::rules::exprs::{Location, SourceSpan};

pub(crate) type Span<'a> = LocatedSpan<&'a str>;

pub(crate) fn from_str2(in_str: &str) -> Span {
    Span::new(in_str)
}

#[derive(Clone, PartialEq, Debug)]
pub(crate) struct ParserError<'a> {
    pub(crate) context: String,
    pub(crate) span: Span<'a>,
    pub(crate) kind: ErrorKind,
}

pub(crate) type IResult<'a, I, O> = nom::IResult<I, O, ParserError<'a>>;

impl<'a> nom::error::ParseError<Span<'a>> for ParserError<'a> {
    fn from_error_kind(input: Span<'a>, kind: ErrorKind) -> Self {
        ParserError {
            context: "".to_string(),
            span: input,
            kind,
        }
    }

    fn append(_input: Span<'a>, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

fn failure<'a, O>(at: Span<'a>, context: String, kind: ErrorKind) -> IResult<'a, Span<'a>, O> {
    Err(nom::Err::Failure(ParserError {
        context,
        span: at,
        kind,
    }))
}

pub(crate) fn location_of(span: &Span) -> Location {
    Location {
        offset: span.location_offset(),
        line: span.location_line(),
        column: span.get_utf8_column(),
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Keyword {
    // reserved, never usable as a name
    Service,
    Function,
    Let,
    Return,
    Match,
    Allow,
    If,
    In,
    Is,
    True,
    False,
    Null,
    // soft, usable as names wherever the grammar does not expect them
    RulesVersion,
    Read,
    Write,
    Get,
    List,
    Create,
    Update,
    Delete,
    Bool,
    Bytes,
    Constraint,
    Duration,
    Float,
    Int,
    LatLng,
    Map,
    Number,
    Path,
    Set,
    String,
    Timestamp,
}

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, Keyword> = {
        let mut keywords = HashMap::with_capacity(34);
        keywords.insert("service", Keyword::Service);
        keywords.insert("function", Keyword::Function);
        keywords.insert("let", Keyword::Let);
        keywords.insert("return", Keyword::Return);
        keywords.insert("match", Keyword::Match);
        keywords.insert("allow", Keyword::Allow);
        keywords.insert("if", Keyword::If);
        keywords.insert("in", Keyword::In);
        keywords.insert("is", Keyword::Is);
        keywords.insert("true", Keyword::True);
        keywords.insert("false", Keyword::False);
        keywords.insert("null", Keyword::Null);
        keywords.insert("rules_version", Keyword::RulesVersion);
        keywords.insert("read", Keyword::Read);
        keywords.insert("write", Keyword::Write);
        keywords.insert("get", Keyword::Get);
        keywords.insert("list", Keyword::List);
        keywords.insert("create", Keyword::Create);
        keywords.insert("update", Keyword::Update);
        keywords.insert("delete", Keyword::Delete);
        keywords.insert("bool", Keyword::Bool);
        keywords.insert("bytes", Keyword::Bytes);
        keywords.insert("constraint", Keyword::Constraint);
        keywords.insert("duration", Keyword::Duration);
        keywords.insert("float", Keyword::Float);
        keywords.insert("int", Keyword::Int);
        keywords.insert("latlng", Keyword::LatLng);
        keywords.insert("map", Keyword::Map);
        keywords.insert("number", Keyword::Number);
        keywords.insert("path", Keyword::Path);
        keywords.insert("set", Keyword::Set);
        keywords.insert("string", Keyword::String);
        keywords.insert("timestamp", Keyword::Timestamp);
        keywords
    };
}

impl Keyword {
    pub fn lookup(text: &str) -> Option<Keyword> {
        KEYWORDS.get(text).copied()
    }

    pub fn is_reserved(&self) -> bool {
        matches!(
            self,
            Keyword::Service
                | Keyword::Function
                | Keyword::Let
                | Keyword::Return
                | Keyword::Match
                | Keyword::Allow
                | Keyword::If
                | Keyword::In
                | Keyword::Is
                | Keyword::True
                | Keyword::False
                | Keyword::Null
        )
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Question,
    Assign,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Punctuation {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Dollar,
}

#[derive(PartialEq, Debug, Clone)]
pub enum TokenKind {
    Identifier,
    Keyword(Keyword),
    Int(i64),
    Float(f64),
    /// unescaped value of a string literal
    String(String),
    Operator(Operator),
    Punctuation(Punctuation),
    Eof,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: SourceSpan,
}

impl<'a> Token<'a> {
    pub fn is_operator(&self, op: Operator) -> bool {
        self.kind == TokenKind::Operator(op)
    }

    pub fn is_punctuation(&self, punctuation: Punctuation) -> bool {
        self.kind == TokenKind::Punctuation(punctuation)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    ///
    /// Identifier or soft keyword, anything that can stand where a name is expected
    ///
    pub fn is_name(&self) -> bool {
        match &self.kind {
            TokenKind::Identifier => true,
            TokenKind::Keyword(keyword) => !keyword.is_reserved(),
            _ => false,
        }
    }

    ///
    /// Any word shaped token including the reserved keywords
    ///
    pub fn is_word(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Keyword(_))
    }

    ///
    /// Whether `other` starts exactly where this token ends, no whitespace or
    /// comments in between
    ///
    pub fn touches(&self, other: &Token) -> bool {
        self.span.end.offset == other.span.start.offset
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Identifier => f.write_str("identifier"),
            TokenKind::Keyword(_) => f.write_str("keyword"),
            TokenKind::Int(_) | TokenKind::Float(_) => f.write_str("number"),
            TokenKind::String(_) => f.write_str("string"),
            TokenKind::Operator(_) => f.write_str("operator"),
            TokenKind::Punctuation(_) => f.write_str("punctuation"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

impl<'a> std::fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("end of input"),
            _ => write!(f, "`{}`", self.text),
        }
    }
}

//
// Trivia, whitespace and `//` line comments
//

pub(crate) fn comment(input: Span) -> IResult<Span, Span> {
    preceded(tag("//"), take_till(|c| c == '\n'))(input)
}

pub(crate) fn trivia(input: Span) -> IResult<Span, ()> {
    value((), many0(alt((multispace1, comment))))(input)
}

//
// Token level parsers
//

pub(crate) fn word(input: Span) -> IResult<Span, Span> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn number(input: Span) -> IResult<Span, TokenKind> {
    let (rest, text) = recognize(pair(digit1, opt(pair(char('.'), digit1))))(input)?;
    let fragment = *text.fragment();
    if fragment.contains('.') {
        match fragment.parse::<f64>() {
            Ok(float) if float.is_finite() => Ok((rest, TokenKind::Float(float))),
            _ => failure(
                input,
                format!("float literal `{}` is out of range", fragment),
                ErrorKind::Float,
            ),
        }
    } else {
        match fragment.parse::<i64>() {
            Ok(int) => Ok((rest, TokenKind::Int(int))),
            Err(_) => failure(
                input,
                format!("integer literal `{}` is out of range", fragment),
                ErrorKind::Digit,
            ),
        }
    }
}

fn escaped<'a>(quote_at: Span<'a>, input: Span<'a>) -> IResult<'a, Span<'a>, char> {
    let (rest, _) = char('\\')(input)?;
    match rest.fragment().chars().next() {
        Some(c @ ('\\' | '?' | '"' | '\'' | '`')) => {
            let (rest, _) = take(1usize)(rest)?;
            Ok((rest, c))
        }
        Some('\n') | Some('\r') | None => failure(
            quote_at,
            "unterminated string literal".to_string(),
            ErrorKind::Escaped,
        ),
        Some(other) => failure(
            input,
            format!("invalid escape sequence `\\{}`", other),
            ErrorKind::Escaped,
        ),
    }
}

///
/// Single or double quoted string. Returns the unescaped value, the
/// surrounding quotes are not part of it. A string may not span lines.
///
pub(crate) fn string_literal(input: Span) -> IResult<Span, String> {
    let (mut rest, quote) = one_of("'\"")(input)?;
    let mut content = String::new();
    loop {
        let (next, fragment) =
            take_till(|c| c == quote || c == '\\' || c == '\n' || c == '\r')(rest)?;
        content.push_str(fragment.fragment());
        rest = next;
        match rest.fragment().chars().next() {
            Some(c) if c == quote => {
                let (next, _) = take(1usize)(rest)?;
                return Ok((next, content));
            }
            Some('\\') => {
                let (next, c) = escaped(input, rest)?;
                content.push(c);
                rest = next;
            }
            _ => {
                return failure(
                    input,
                    "unterminated string literal".to_string(),
                    ErrorKind::Char,
                )
            }
        }
    }
}

fn operator(input: Span) -> IResult<Span, TokenKind> {
    use Operator::*;
    use Punctuation::*;

    alt((
        alt((
            value(TokenKind::Operator(EqEq), tag("==")),
            value(TokenKind::Operator(NotEq), tag("!=")),
            value(TokenKind::Operator(Le), tag("<=")),
            value(TokenKind::Operator(Ge), tag(">=")),
            value(TokenKind::Operator(AndAnd), tag("&&")),
            value(TokenKind::Operator(OrOr), tag("||")),
        )),
        alt((
            value(TokenKind::Operator(Plus), char('+')),
            value(TokenKind::Operator(Minus), char('-')),
            value(TokenKind::Operator(Star), char('*')),
            value(TokenKind::Operator(Slash), char('/')),
            value(TokenKind::Operator(Percent), char('%')),
            value(TokenKind::Operator(Lt), char('<')),
            value(TokenKind::Operator(Gt), char('>')),
            value(TokenKind::Operator(Bang), char('!')),
            value(TokenKind::Operator(Question), char('?')),
            value(TokenKind::Operator(Assign), char('=')),
        )),
        alt((
            value(TokenKind::Punctuation(LParen), char('(')),
            value(TokenKind::Punctuation(RParen), char(')')),
            value(TokenKind::Punctuation(LBracket), char('[')),
            value(TokenKind::Punctuation(RBracket), char(']')),
            value(TokenKind::Punctuation(LBrace), char('{')),
            value(TokenKind::Punctuation(RBrace), char('}')),
            value(TokenKind::Punctuation(Comma), char(',')),
            value(TokenKind::Punctuation(Colon), char(':')),
            value(TokenKind::Punctuation(Semicolon), char(';')),
            value(TokenKind::Punctuation(Dot), char('.')),
            value(TokenKind::Punctuation(Dollar), char('$')),
        )),
    ))(input)
}

fn token_kind(input: Span) -> IResult<Span, TokenKind> {
    alt((
        map(word, |text: Span| match Keyword::lookup(text.fragment()) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier,
        }),
        number,
        map(string_literal, TokenKind::String),
        operator,
    ))(input)
}

///
/// Lexes a single token after skipping leading trivia. Returns the remaining
/// input and the token. At the end of input an `Eof` token with an empty span
/// is produced.
///
pub(crate) fn token<'a>(input: Span<'a>) -> IResult<'a, Span<'a>, Token<'a>> {
    let (input, _) = trivia(input)?;
    let start = location_of(&input);
    if input.fragment().is_empty() {
        return Ok((
            input,
            Token {
                kind: TokenKind::Eof,
                text: "",
                span: SourceSpan::point(start),
            },
        ));
    }

    let (rest, kind) = match token_kind(input) {
        Ok(result) => result,
        Err(nom::Err::Error(_)) => {
            let unexpected = input.fragment().chars().next().unwrap_or(' ');
            return failure(
                input,
                format!("unexpected character `{}`", unexpected),
                ErrorKind::Char,
            );
        }
        Err(e) => return Err(e),
    };
    let end = location_of(&rest);
    let source: &'a str = *input.fragment();
    let text = &source[..end.offset - start.offset];
    Ok((
        rest,
        Token {
            kind,
            text,
            span: SourceSpan::new(start, end),
        },
    ))
}

///
/// Lazy token stream over rules source. Tokens are produced on demand, the
/// stream ends with exactly one `Eof` token. After a lexical error no further
/// tokens are produced.
///
#[derive(Clone, Debug)]
pub struct Lexer<'a> {
    remaining: Span<'a>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            remaining: from_str2(source),
            finished: false,
        }
    }

    pub fn next_token(&mut self) -> Result<Token<'a>, Diagnostic> {
        match token(self.remaining) {
            Ok((rest, token)) => {
                if token.kind == TokenKind::Eof {
                    self.finished = true;
                }
                self.remaining = rest;
                log::trace!("lexed {:?} at {}", token.kind, token.span.start);
                Ok(token)
            }
            Err(e) => {
                self.finished = true;
                Err(Diagnostic::from(e))
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, Diagnostic>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        Some(self.next_token())
    }
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod lexer_tests;
