//
// Expression grammar, loosest binding first
//
//   expression := ternary
//   ternary    := binary(LOGICAL_OR) ( '?' expression ':' ternary )?
//   binary(n)  := unary ( op binary(level(op) + 1) | 'is' type )*    for level(op) >= n
//   unary      := ( '!' | '-' ) unary | postfix
//   postfix    := primary ( '.' name call? | '[' index ']' )*
//   primary    := literal | name call? | '(' expression ')' | list | map | path
//

use crate::rules::errors::Diagnostic;
use crate::rules::exprs::*;
use crate::rules::grammar::{Associativity, Extension, InfixOperator, LOGICAL_OR};
use crate::rules::lexer::{Keyword, Operator, Punctuation, Token, TokenKind};
use crate::rules::parser::{ParseResult, Parser};

impl<'a, 'g> Parser<'a, 'g> {
    pub fn expression(&mut self) -> ParseResult<Expr> {
        self.ternary()
    }

    fn ternary(&mut self) -> ParseResult<Expr> {
        let condition = self.binary(LOGICAL_OR)?;
        if !self.check_operator(Operator::Question)? {
            return Ok(condition);
        }
        self.tokens.advance()?;
        let then_branch = self.expression()?;
        self.expect_punctuation(Punctuation::Colon, "`:` in conditional expression")?;
        let else_branch = self.ternary()?;
        let span = condition.span.to(else_branch.span);
        Ok(Expr::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        ))
    }

    ///
    /// Precedence climbing over the infix operators of the grammar's table.
    /// Only operators binding at least as tight as `min_level` are folded here,
    /// looser ones are left for the caller.
    ///
    fn binary(&mut self, min_level: u8) -> ParseResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let token = self.tokens.peek()?;
            let info = match self.grammar.precedence.infix(token) {
                Some(info) if info.level >= min_level => *info,
                _ => break,
            };
            let operator = self.tokens.advance()?;

            left = match info.operator {
                InfixOperator::TypeTest => self.type_test(left, &operator)?,
                InfixOperator::Binary(op) => {
                    let next_level = match info.associativity {
                        Associativity::Left => info.level + 1,
                        Associativity::Right => info.level,
                    };
                    let right = self.binary(next_level)?;
                    let span = left.span.to(right.span);
                    Expr::new(
                        ExprKind::Binary {
                            op,
                            left: Box::new(left),
                            right: Box::new(right),
                        },
                        span,
                    )
                }
            };
        }
        Ok(left)
    }

    fn type_test(&mut self, operand: Expr, operator: &Token) -> ParseResult<Expr> {
        if !self.grammar.allows(Extension::TypeTests) {
            return Err(disabled(Extension::TypeTests, operator));
        }
        let token = self.tokens.peek()?.clone();
        let type_name = match token.kind {
            TokenKind::Identifier | TokenKind::Keyword(_) => TypeName::from_name(token.text),
            _ => None,
        };
        match type_name {
            Some(type_name) => {
                self.tokens.advance()?;
                let span = operand.span.to(token.span);
                Ok(Expr::new(
                    ExprKind::TypeTest {
                        operand: Box::new(operand),
                        type_name,
                    },
                    span,
                ))
            }
            None => Err(self.unexpected("type name after `is`")),
        }
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = {
            let token = self.tokens.peek()?;
            if token.is_operator(Operator::Bang) {
                UnaryOp::Not
            } else if token.is_operator(Operator::Minus) {
                UnaryOp::Neg
            } else {
                return self.postfix();
            }
        };
        let operator = self.tokens.advance()?;
        let operand = self.unary()?;
        let span = operator.span.to(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    ///
    /// Member, index and call chains. Folded iteratively onto the expression
    /// built so far, `a.b[c].d()` never recurses on its left side.
    ///
    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            let token = self.tokens.peek()?.clone();
            expr = match token.kind {
                TokenKind::Punctuation(Punctuation::Dot) => {
                    self.tokens.advance()?;
                    self.member(expr)?
                }
                TokenKind::Punctuation(Punctuation::LBracket) => {
                    self.tokens.advance()?;
                    self.index(expr)?
                }
                TokenKind::Punctuation(Punctuation::LParen) => {
                    return Err(Diagnostic::syntax(
                        "only named functions and methods can be called",
                        token.span,
                    ))
                }
                _ => break,
            };
        }
        Ok(expr)
    }

    fn member(&mut self, object: Expr) -> ParseResult<Expr> {
        let token = self.tokens.peek()?.clone();
        if !token.is_word() {
            return Err(self.unexpected("field or method name after `.`"));
        }
        self.tokens.advance()?;
        let name = Identifier::new(token.text, token.span);

        let (field, end) = if self.check_punctuation(Punctuation::LParen)? {
            let (arguments, close) = self.call_arguments()?;
            (MemberField::Method(FunctionCall { name, arguments }), close)
        } else {
            (MemberField::Variable(name), token.span)
        };
        let span = object.span.to(end);
        Ok(Expr::new(
            ExprKind::Member {
                object: Box::new(object),
                field,
            },
            span,
        ))
    }

    fn index(&mut self, object: Expr) -> ParseResult<Expr> {
        let field = if self.grammar.allows(Extension::FieldIndexing)
            && self.tokens.peek_nth(1)?.is_punctuation(Punctuation::RBracket)
        {
            match &self.tokens.peek()?.kind {
                TokenKind::String(name) => Some(name.clone()),
                _ => None,
            }
        } else {
            None
        };

        let index = match field {
            Some(name) => {
                self.tokens.advance()?;
                IndexOperand::Field(name)
            }
            None => {
                let start = self.expression()?;
                if self.eat_punctuation(Punctuation::Colon)?.is_some() {
                    let end = self.expression()?;
                    IndexOperand::Range {
                        start: Box::new(start),
                        end: Box::new(end),
                    }
                } else {
                    IndexOperand::Element(Box::new(start))
                }
            }
        };
        let close = self.expect_punctuation(Punctuation::RBracket, "`]` closing index")?;
        let span = object.span.to(close.span);
        Ok(Expr::new(
            ExprKind::Index {
                object: Box::new(object),
                index,
            },
            span,
        ))
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.tokens.peek()?.clone();
        let literal = match &token.kind {
            TokenKind::Int(value) => Some(Literal::Int(*value)),
            TokenKind::Float(value) => Some(Literal::Float(*value)),
            TokenKind::String(value) => Some(Literal::String(value.clone())),
            TokenKind::Keyword(Keyword::True) => Some(Literal::Bool(true)),
            TokenKind::Keyword(Keyword::False) => Some(Literal::Bool(false)),
            TokenKind::Keyword(Keyword::Null) => Some(Literal::Null),
            _ => None,
        };
        if let Some(literal) = literal {
            self.tokens.advance()?;
            return Ok(Expr::new(ExprKind::Literal(literal), token.span));
        }

        if token.is_name() {
            self.tokens.advance()?;
            if self.check_punctuation(Punctuation::LParen)? {
                let name = Identifier::new(token.text, token.span);
                let (arguments, close) = self.call_arguments()?;
                return Ok(Expr::new(
                    ExprKind::Call(FunctionCall { name, arguments }),
                    token.span.to(close),
                ));
            }
            return Ok(Expr::new(
                ExprKind::Variable(token.text.to_string()),
                token.span,
            ));
        }

        match token.kind {
            TokenKind::Punctuation(Punctuation::LParen) => {
                self.tokens.advance()?;
                let inner = self.expression()?;
                let close = self.expect_punctuation(Punctuation::RParen, "`)` closing group")?;
                Ok(Expr::new(inner.kind, token.span.to(close.span)))
            }
            TokenKind::Punctuation(Punctuation::LBracket) => self.list(),
            TokenKind::Punctuation(Punctuation::LBrace) => {
                if !self.grammar.allows(Extension::MapLiterals) {
                    return Err(disabled(Extension::MapLiterals, &token));
                }
                self.map()
            }
            TokenKind::Operator(Operator::Slash) => {
                let path = self.path_literal()?;
                let span = path.span;
                Ok(Expr::new(ExprKind::Path(path), span))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn list(&mut self) -> ParseResult<Expr> {
        let open = self.tokens.advance()?;
        let mut elements = Vec::new();
        if !self.check_punctuation(Punctuation::RBracket)? {
            loop {
                elements.push(self.expression()?);
                if self.eat_punctuation(Punctuation::Comma)?.is_none() {
                    break;
                }
            }
        }
        let close = self.expect_punctuation(Punctuation::RBracket, "`,` or `]` in list")?;
        Ok(Expr::new(ExprKind::List(elements), open.span.to(close.span)))
    }

    fn map(&mut self) -> ParseResult<Expr> {
        let open = self.tokens.advance()?;
        let mut entries = Vec::new();
        if !self.check_punctuation(Punctuation::RBrace)? {
            loop {
                let key = self.expression()?;
                self.expect_punctuation(Punctuation::Colon, "`:` after map key")?;
                let value = self.expression()?;
                entries.push(MapEntry { key, value });
                if self.eat_punctuation(Punctuation::Comma)?.is_none() {
                    break;
                }
            }
        }
        let close = self.expect_punctuation(Punctuation::RBrace, "`,` or `}` in map")?;
        Ok(Expr::new(ExprKind::Map(entries), open.span.to(close.span)))
    }

    ///
    /// Arguments of a call, the cursor is on the opening parenthesis. A leading
    /// `/` selects the path form which takes exactly one path and nothing else.
    /// Returns the arguments and the span of the closing parenthesis.
    ///
    fn call_arguments(&mut self) -> ParseResult<(CallArguments, SourceSpan)> {
        self.expect_punctuation(Punctuation::LParen, "`(`")?;

        if self.check_operator(Operator::Slash)? {
            let path = self.path_literal()?;
            if self.check_punctuation(Punctuation::Comma)? {
                let comma = self.tokens.advance()?;
                return Err(Diagnostic::syntax(
                    "a path argument must be the only argument of a call",
                    comma.span,
                ));
            }
            let close = self.expect_punctuation(Punctuation::RParen, "`)` after path argument")?;
            return Ok((CallArguments::Path(path), close.span));
        }

        let mut arguments = Vec::new();
        if !self.check_punctuation(Punctuation::RParen)? {
            loop {
                arguments.push(self.expression()?);
                if self.eat_punctuation(Punctuation::Comma)?.is_none() {
                    break;
                }
            }
        }
        let close = self.expect_punctuation(Punctuation::RParen, "`,` or `)` in argument list")?;
        Ok((CallArguments::Exprs(arguments), close.span))
    }

    ///
    /// Path used as a value, `/databases/$(database)/documents/users/$(uid)`.
    /// Every segment is glued to its slash and to the previous segment, the
    /// path ends at the first gap.
    ///
    pub(crate) fn path_literal(&mut self) -> ParseResult<PathLiteral> {
        let mut segments: Vec<PathSegment> = Vec::new();
        loop {
            let slash = self.tokens.peek()?.clone();
            if !slash.is_operator(Operator::Slash) {
                break;
            }
            if let Some(previous) = segments.last() {
                if previous.span.end.offset != slash.span.start.offset {
                    break;
                }
            }
            self.tokens.advance()?;

            let next = self.tokens.peek()?.clone();
            if !slash.touches(&next) {
                return Err(Diagnostic::syntax(
                    "path segment must directly follow `/`",
                    slash.span,
                ));
            }

            let segment = if next.is_word() || matches!(next.kind, TokenKind::Int(_)) {
                self.tokens.advance()?;
                PathSegment {
                    kind: SegmentKind::Literal(next.text.to_string()),
                    span: slash.span.to(next.span),
                }
            } else if next.is_punctuation(Punctuation::Dollar) {
                if !self.grammar.allows(Extension::DynamicPathSegments) {
                    return Err(disabled(Extension::DynamicPathSegments, &next));
                }
                self.tokens.advance()?;
                let open = self.tokens.peek()?.clone();
                if !open.is_punctuation(Punctuation::LParen) || !next.touches(&open) {
                    return Err(Diagnostic::syntax(
                        format!("expected `(` directly after `$`, found {}", open),
                        open.span,
                    ));
                }
                self.tokens.advance()?;
                let expr = self.expression()?;
                let close =
                    self.expect_punctuation(Punctuation::RParen, "`)` closing path segment")?;
                PathSegment {
                    kind: SegmentKind::Evaluated(expr),
                    span: slash.span.to(close.span),
                }
            } else {
                return Err(Diagnostic::syntax(
                    format!("expected path segment after `/`, found {}", next),
                    slash.span.to(next.span),
                ));
            };
            segments.push(segment);
        }

        let span = match (segments.first(), segments.last()) {
            (Some(first), Some(last)) => first.span.to(last.span),
            _ => return Err(self.unexpected("path starting with `/`")),
        };
        Ok(PathLiteral { segments, span })
    }
}

fn disabled(extension: Extension, at: &Token) -> Diagnostic {
    Diagnostic::syntax(
        format!("{} are not enabled in this grammar", extension.name()),
        at.span,
    )
}

#[cfg(test)]
#[path = "expr_parser_tests.rs"]
mod expr_parser_tests;
