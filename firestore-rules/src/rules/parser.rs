use std::collections::VecDeque;
use std::convert::TryFrom;

use indexmap::IndexSet;

use crate::rules::errors::{Diagnostic, Error};
use crate::rules::exprs::*;
use crate::rules::grammar::Grammar;
use crate::rules::lexer::{Keyword, Lexer, Operator, Punctuation, Token, TokenKind};

pub(crate) type ParseResult<T> = std::result::Result<T, Diagnostic>;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                                                                                //
//                         TOKEN CURSOR                                                           //
//                                                                                                //
////////////////////////////////////////////////////////////////////////////////////////////////////

///
/// Pulls tokens lazily from the lexer and keeps as many as the parser has
/// looked ahead. The trailing `Eof` token is never consumed, peeking past the
/// end keeps returning it.
///
pub(crate) struct TokenCursor<'a> {
    lexer: Lexer<'a>,
    lookahead: VecDeque<Token<'a>>,
    previous: Option<SourceSpan>,
}

impl<'a> TokenCursor<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        TokenCursor {
            lexer: Lexer::new(source),
            lookahead: VecDeque::with_capacity(4),
            previous: None,
        }
    }

    fn fill(&mut self, n: usize) -> ParseResult<()> {
        while self.lookahead.len() <= n {
            let token = match self.lookahead.back() {
                Some(last) if last.kind == TokenKind::Eof => last.clone(),
                _ => self.lexer.next_token()?,
            };
            self.lookahead.push_back(token);
        }
        Ok(())
    }

    pub(crate) fn peek(&mut self) -> ParseResult<&Token<'a>> {
        self.peek_nth(0)
    }

    pub(crate) fn peek_nth(&mut self, n: usize) -> ParseResult<&Token<'a>> {
        self.fill(n)?;
        match self.lookahead.get(n) {
            Some(token) => Ok(token),
            None => Err(Diagnostic::syntax(
                "unexpected end of input",
                self.previous.unwrap_or_default(),
            )),
        }
    }

    pub(crate) fn advance(&mut self) -> ParseResult<Token<'a>> {
        self.fill(0)?;
        let at_end = matches!(self.lookahead.front(), Some(token) if token.kind == TokenKind::Eof);
        let token = if at_end {
            self.lookahead.front().cloned()
        } else {
            self.lookahead.pop_front()
        };
        let previous = self.previous.unwrap_or_default();
        let token = token.ok_or_else(|| Diagnostic::syntax("unexpected end of input", previous))?;
        self.previous = Some(token.span);
        Ok(token)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                                                                                //
//                         PARSER                                                                 //
//                                                                                                //
////////////////////////////////////////////////////////////////////////////////////////////////////

///
/// Recursive descent parser for rules declarations. Expressions are handled
/// by the precedence climbing methods in `expr_parser`, both share this state.
///
pub struct Parser<'a, 'g> {
    pub(crate) tokens: TokenCursor<'a>,
    pub(crate) grammar: &'g Grammar,
}

impl<'a, 'g> Parser<'a, 'g> {
    pub fn new(source: &'a str, grammar: &'g Grammar) -> Self {
        Parser {
            tokens: TokenCursor::new(source),
            grammar,
        }
    }

    //
    // Token helpers
    //

    pub(crate) fn unexpected(&mut self, expected: &str) -> Diagnostic {
        match self.tokens.peek() {
            Ok(token) => Diagnostic::syntax(format!("expected {}, found {}", expected, token), token.span),
            Err(e) => e,
        }
    }

    pub(crate) fn check_punctuation(&mut self, punctuation: Punctuation) -> ParseResult<bool> {
        Ok(self.tokens.peek()?.is_punctuation(punctuation))
    }

    pub(crate) fn check_operator(&mut self, op: Operator) -> ParseResult<bool> {
        Ok(self.tokens.peek()?.is_operator(op))
    }

    pub(crate) fn check_keyword(&mut self, keyword: Keyword) -> ParseResult<bool> {
        Ok(self.tokens.peek()?.is_keyword(keyword))
    }

    pub(crate) fn eat_punctuation(&mut self, punctuation: Punctuation) -> ParseResult<Option<Token<'a>>> {
        if self.check_punctuation(punctuation)? {
            return Ok(Some(self.tokens.advance()?));
        }
        Ok(None)
    }

    pub(crate) fn expect_punctuation(
        &mut self,
        punctuation: Punctuation,
        expected: &str,
    ) -> ParseResult<Token<'a>> {
        match self.eat_punctuation(punctuation)? {
            Some(token) => Ok(token),
            None => Err(self.unexpected(expected)),
        }
    }

    pub(crate) fn expect_operator(&mut self, op: Operator, expected: &str) -> ParseResult<Token<'a>> {
        if self.check_operator(op)? {
            return self.tokens.advance();
        }
        Err(self.unexpected(expected))
    }

    pub(crate) fn expect_keyword(&mut self, keyword: Keyword, expected: &str) -> ParseResult<Token<'a>> {
        if self.check_keyword(keyword)? {
            return self.tokens.advance();
        }
        Err(self.unexpected(expected))
    }

    ///
    /// Identifier, or a soft keyword used as one
    ///
    pub(crate) fn expect_name(&mut self, expected: &str) -> ParseResult<Identifier> {
        if self.tokens.peek()?.is_name() {
            let token = self.tokens.advance()?;
            return Ok(Identifier::new(token.text, token.span));
        }
        Err(self.unexpected(expected))
    }

    pub(crate) fn expect_end(&mut self) -> ParseResult<()> {
        if self.tokens.peek()?.kind == TokenKind::Eof {
            return Ok(());
        }
        Err(self.unexpected("end of input"))
    }

    //
    // Declarations
    //

    pub fn source_file(&mut self) -> ParseResult<SourceFile> {
        let start = self.tokens.peek()?.span;

        let rules_version = if self.check_keyword(Keyword::RulesVersion)? {
            Some(self.rules_version()?)
        } else {
            None
        };

        let service = self.service_name()?;
        let body = self.match_body()?;
        self.expect_end()?;

        let span = start.to(body.span);
        Ok(SourceFile {
            rules_version,
            service,
            body,
            span,
        })
    }

    fn rules_version(&mut self) -> ParseResult<RulesVersion> {
        let keyword = self.tokens.advance()?;
        self.expect_operator(Operator::Assign, "`=` after `rules_version`")?;
        let version = match self.tokens.peek()?.kind.clone() {
            TokenKind::String(version) => {
                self.tokens.advance()?;
                version
            }
            _ => return Err(self.unexpected("version string")),
        };
        let semicolon = self.expect_punctuation(Punctuation::Semicolon, "`;` after rules version")?;
        log::debug!("rules_version {}", version);
        Ok(RulesVersion {
            version,
            span: keyword.span.to(semicolon.span),
        })
    }

    fn service_name(&mut self) -> ParseResult<ServiceName> {
        let keyword = self.expect_keyword(Keyword::Service, "`service` declaration")?;
        let first = self.tokens.peek()?.clone();
        if !first.is_word() {
            return Err(self.unexpected("service name"));
        }
        self.tokens.advance()?;

        let mut name = first.text.to_string();
        let mut span = first.span;
        while self.check_punctuation(Punctuation::Dot)? {
            self.tokens.advance()?;
            let part = self.tokens.peek()?.clone();
            if !part.is_word() {
                return Err(self.unexpected("service name after `.`"));
            }
            self.tokens.advance()?;
            name.push('.');
            name.push_str(part.text);
            span = span.to(part.span);
        }

        if name != "cloud.firestore" {
            return Err(Diagnostic::syntax(
                format!("unsupported service `{}`, expected `cloud.firestore`", name),
                span,
            ));
        }
        log::debug!("service {} at {}", name, keyword.span.start);
        Ok(ServiceName { name, span })
    }

    pub fn match_body(&mut self) -> ParseResult<MatchBody> {
        let open = self.expect_punctuation(Punctuation::LBrace, "`{`")?;
        let mut declarations = Vec::new();
        loop {
            let kind = self.tokens.peek()?.kind.clone();
            let declaration = match kind {
                TokenKind::Punctuation(Punctuation::RBrace) => break,
                TokenKind::Keyword(Keyword::Function) => Declaration::Function(self.function_def()?),
                TokenKind::Keyword(Keyword::Match) => Declaration::Match(self.match_block()?),
                TokenKind::Keyword(Keyword::Allow) => Declaration::Rule(self.rule_def()?),
                _ => return Err(self.unexpected("`function`, `match`, `allow` or `}`")),
            };
            declarations.push(declaration);
        }
        let close = self.tokens.advance()?;
        Ok(MatchBody {
            declarations,
            span: open.span.to(close.span),
        })
    }

    pub fn match_block(&mut self) -> ParseResult<MatchBlock> {
        let keyword = self.expect_keyword(Keyword::Match, "`match`")?;
        let pattern = self.path_pattern()?;
        log::debug!("match block {} at {}", pattern, keyword.span.start);
        let body = self.match_body()?;
        Ok(MatchBlock {
            span: keyword.span.to(body.span),
            pattern,
            body,
        })
    }

    ///
    /// `/segment` sequence of a match block. Each segment is written without
    /// interior whitespace, `/{name}` and `/{name=**}` included.
    ///
    pub fn path_pattern(&mut self) -> ParseResult<PathPattern> {
        if !self.check_operator(Operator::Slash)? {
            return Err(self.unexpected("path pattern starting with `/`"));
        }
        let mut segments = Vec::new();
        while self.check_operator(Operator::Slash)? {
            segments.push(self.pattern_segment()?);
        }
        let span = match (segments.first(), segments.last()) {
            (Some(first), Some(last)) => first.span.to(last.span),
            _ => SourceSpan::default(),
        };
        Ok(PathPattern { segments, span })
    }

    fn pattern_segment(&mut self) -> ParseResult<PathSegment> {
        let slash = self.tokens.advance()?;
        let next = self.tokens.peek()?.clone();
        if !slash.touches(&next) {
            return Err(Diagnostic::syntax(
                "path segment must directly follow `/`",
                slash.span,
            ));
        }

        if next.is_word() || matches!(next.kind, TokenKind::Int(_)) {
            self.tokens.advance()?;
            return Ok(PathSegment {
                kind: SegmentKind::Literal(next.text.to_string()),
                span: slash.span.to(next.span),
            });
        }

        if !next.is_punctuation(Punctuation::LBrace) {
            return Err(Diagnostic::syntax(
                format!("expected path segment after `/`, found {}", next),
                slash.span.to(next.span),
            ));
        }
        let open = self.tokens.advance()?;
        let name = self.tokens.peek()?.clone();
        if !name.is_name() || !open.touches(&name) {
            return Err(Diagnostic::syntax(
                format!("expected capture name in path segment, found {}", name),
                slash.span.to(name.span),
            ));
        }
        self.tokens.advance()?;

        let mut last = name.clone();
        let multi = {
            let assign = self.tokens.peek()?.clone();
            if assign.is_operator(Operator::Assign) && last.touches(&assign) {
                self.tokens.advance()?;
                last = assign;
                for _ in 0..2 {
                    let star = self.tokens.peek()?.clone();
                    if !star.is_operator(Operator::Star) || !last.touches(&star) {
                        return Err(Diagnostic::syntax(
                            format!("expected `**` in multi segment capture `{}`, found {}", name.text, star),
                            slash.span.to(star.span),
                        ));
                    }
                    self.tokens.advance()?;
                    last = star;
                }
                true
            } else {
                false
            }
        };

        let close = self.tokens.peek()?.clone();
        if !close.is_punctuation(Punctuation::RBrace) || !last.touches(&close) {
            return Err(Diagnostic::syntax(
                format!("expected `}}` closing capture `{}`, found {}", name.text, close),
                slash.span.to(close.span),
            ));
        }
        self.tokens.advance()?;

        let captured = name.text.to_string();
        Ok(PathSegment {
            kind: if multi {
                SegmentKind::MultiCapture(captured)
            } else {
                SegmentKind::SingleCapture(captured)
            },
            span: slash.span.to(close.span),
        })
    }

    ///
    /// `function name(params) { let x = ...; return ...; }`. Parameters and
    /// `let` bindings share one flat scope per function, rebinding any name in
    /// it is rejected.
    ///
    pub fn function_def(&mut self) -> ParseResult<FunctionDef> {
        let keyword = self.expect_keyword(Keyword::Function, "`function`")?;
        let name = self.expect_name("function name")?;
        log::debug!("function {} at {}", name.name, name.span.start);

        self.expect_punctuation(Punctuation::LParen, "`(` after function name")?;
        let mut scope = IndexSet::new();
        let mut parameters = Vec::new();
        if !self.check_punctuation(Punctuation::RParen)? {
            loop {
                let parameter = self.expect_name("parameter name")?;
                if !scope.insert(parameter.name.clone()) {
                    return Err(Diagnostic::syntax(
                        format!(
                            "duplicate parameter `{}` in function `{}`",
                            parameter.name, name.name
                        ),
                        parameter.span,
                    ));
                }
                parameters.push(parameter);
                if self.eat_punctuation(Punctuation::Comma)?.is_none() {
                    break;
                }
            }
        }
        self.expect_punctuation(Punctuation::RParen, "`,` or `)` in parameter list")?;
        self.expect_punctuation(Punctuation::LBrace, "`{` starting function body")?;

        let mut bindings = Vec::new();
        // names read by earlier initializers before any binding of them
        let mut unbound: Vec<(String, SourceSpan)> = Vec::new();
        while self.check_keyword(Keyword::Let)? {
            let binding = self.variable_binding()?;
            if scope.contains(&binding.name.name) {
                return Err(Diagnostic::syntax(
                    format!(
                        "`{}` is already bound in function `{}`",
                        binding.name.name, name.name
                    ),
                    binding.name.span,
                ));
            }
            for (reference, span) in binding.value.variable_references() {
                if !scope.contains(reference) {
                    unbound.push((reference.to_string(), span));
                }
            }
            if let Some((_, span)) = unbound.iter().find(|(n, _)| *n == binding.name.name) {
                return Err(Diagnostic::syntax(
                    format!(
                        "`{}` is used before it is bound in function `{}`",
                        binding.name.name, name.name
                    ),
                    *span,
                ));
            }
            scope.insert(binding.name.name.clone());
            bindings.push(binding);
        }

        let token = self.tokens.peek()?.clone();
        if token.is_punctuation(Punctuation::RBrace) {
            return Err(Diagnostic::structural(
                format!("function `{}` must end with a `return` statement", name.name),
                token.span,
            ));
        }
        if !token.is_keyword(Keyword::Return) {
            return Err(self.unexpected("`let` or `return`"));
        }
        self.tokens.advance()?;
        let result = self.expression()?;
        self.expect_punctuation(Punctuation::Semicolon, "`;` after return expression")?;

        let after = self.tokens.peek()?.clone();
        if after.is_keyword(Keyword::Let) || after.is_keyword(Keyword::Return) {
            return Err(Diagnostic::structural(
                format!(
                    "unreachable statement after `return` in function `{}`",
                    name.name
                ),
                after.span,
            ));
        }
        let close = self.expect_punctuation(Punctuation::RBrace, "`}` closing function body")?;

        Ok(FunctionDef {
            name,
            parameters,
            bindings,
            result,
            span: keyword.span.to(close.span),
        })
    }

    fn variable_binding(&mut self) -> ParseResult<VariableBinding> {
        let keyword = self.tokens.advance()?;
        let name = self.expect_name("variable name after `let`")?;
        self.expect_operator(Operator::Assign, "`=` in let binding")?;
        let value = self.expression()?;
        let semicolon = self.expect_punctuation(Punctuation::Semicolon, "`;` after let binding")?;
        Ok(VariableBinding {
            name,
            value,
            span: keyword.span.to(semicolon.span),
        })
    }

    ///
    /// `allow read, write: if <guard>;`, the guard is optional
    ///
    pub fn rule_def(&mut self) -> ParseResult<RuleDef> {
        let keyword = self.expect_keyword(Keyword::Allow, "`allow`")?;
        let mut methods = Vec::new();
        loop {
            let token = self.tokens.peek()?.clone();
            let method = match token.kind {
                TokenKind::Keyword(_) => Method::from_name(token.text),
                _ => None,
            };
            match method {
                Some(method) => {
                    self.tokens.advance()?;
                    methods.push(MethodRef {
                        method,
                        span: token.span,
                    });
                }
                None => {
                    return Err(self.unexpected(
                        "method (read, write, get, list, create, update, delete)",
                    ))
                }
            }
            if self.eat_punctuation(Punctuation::Comma)?.is_none() {
                break;
            }
        }

        let guard = if self.eat_punctuation(Punctuation::Colon)?.is_some() {
            self.expect_keyword(Keyword::If, "`if` after `:`")?;
            Some(self.expression()?)
        } else {
            None
        };
        let semicolon = self.expect_punctuation(Punctuation::Semicolon, "`;` after allow rule")?;
        log::debug!(
            "allow {} at {}",
            methods
                .iter()
                .map(|m| m.method.name())
                .collect::<Vec<_>>()
                .join(", "),
            keyword.span.start
        );
        Ok(RuleDef {
            methods,
            guard,
            span: keyword.span.to(semicolon.span),
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                                                                                //
//                         ENTRY POINTS                                                           //
//                                                                                                //
////////////////////////////////////////////////////////////////////////////////////////////////////

pub fn parse(source: &str) -> ParseResult<SourceFile> {
    parse_with(source, &Grammar::default())
}

pub fn parse_with(source: &str, grammar: &Grammar) -> ParseResult<SourceFile> {
    log::debug!("parsing rules with extensions {:?}", grammar.extensions);
    let result = Parser::new(source, grammar).source_file();
    if let Err(diagnostic) = &result {
        log::debug!("parse failed: {}", diagnostic);
    }
    result
}

pub fn parse_expr(source: &str) -> ParseResult<Expr> {
    parse_expr_with(source, &Grammar::default())
}

///
/// Parses a standalone expression, the whole input must be consumed
///
pub fn parse_expr_with(source: &str, grammar: &Grammar) -> ParseResult<Expr> {
    let mut parser = Parser::new(source, grammar);
    let expr = parser.expression()?;
    parser.expect_end()?;
    Ok(expr)
}

fn parse_fragment<T>(
    source: &str,
    parse_one: impl FnOnce(&mut Parser) -> ParseResult<T>,
) -> Result<T, Error> {
    let grammar = Grammar::default();
    let mut parser = Parser::new(source, &grammar);
    let value = parse_one(&mut parser)?;
    parser.expect_end()?;
    Ok(value)
}

impl TryFrom<&str> for SourceFile {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(parse(value)?)
    }
}

impl TryFrom<&str> for Expr {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        parse_fragment(value, |parser| parser.expression())
    }
}

impl TryFrom<&str> for MatchBlock {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        parse_fragment(value, |parser| parser.match_block())
    }
}

impl TryFrom<&str> for FunctionDef {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        parse_fragment(value, |parser| parser.function_def())
    }
}

impl TryFrom<&str> for RuleDef {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        parse_fragment(value, |parser| parser.rule_def())
    }
}

impl TryFrom<&str> for PathPattern {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        parse_fragment(value, |parser| parser.path_pattern())
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod parser_tests;
