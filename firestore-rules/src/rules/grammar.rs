use std::convert::TryFrom;
use std::fmt::Formatter;
use std::str::FromStr;

use enumflags2::{bitflags, BitFlags};
use indexmap::IndexMap;

use crate::rules::errors::Error;
use crate::rules::exprs::BinaryOp;
use crate::rules::lexer::{Keyword, Token, TokenKind};

pub const TERNARY: u8 = 1;
pub const LOGICAL_OR: u8 = 2;
pub const LOGICAL_AND: u8 = 3;
pub const TYPE_TEST: u8 = 4;
pub const RELATION: u8 = 5;
pub const ADDITIVE: u8 = 6;
pub const MULTIPLICATIVE: u8 = 7;
pub const UNARY: u8 = 8;
pub const POSTFIX: u8 = 9;

///
/// Optional productions that only some revisions of the rules language accept
///
#[bitflags]
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialOrd, PartialEq, Hash)]
pub enum Extension {
    /// `{ key: value, ... }`
    MapLiterals = 0b0001,
    /// `expr is string`
    TypeTests = 0b0010,
    /// `/users/$(request.auth.uid)` in path literals
    DynamicPathSegments = 0b0100,
    /// `resource.data["name"]` produces a field access rather than an element index
    FieldIndexing = 0b1000,
}

impl Extension {
    pub fn name(&self) -> &'static str {
        match self {
            Extension::MapLiterals => "map literals",
            Extension::TypeTests => "type tests",
            Extension::DynamicPathSegments => "dynamic path segments",
            Extension::FieldIndexing => "field indexing",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Dialect {
    /// earliest grammar, lists, calls with path arguments, member and index chains
    Legacy,
    /// every extension enabled
    Current,
}

impl Dialect {
    pub fn extensions(&self) -> BitFlags<Extension> {
        match self {
            Dialect::Legacy => BitFlags::empty(),
            Dialect::Current => BitFlags::all(),
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(Dialect::Legacy),
            "current" => Ok(Dialect::Current),
            _ => Err(Error::IllegalArguments(format!(
                "Unknown dialect `{}`, expected one of legacy, current",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Legacy => f.write_str("legacy"),
            Dialect::Current => f.write_str("current"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Associativity {
    Left,
    Right,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum InfixOperator {
    Binary(BinaryOp),
    TypeTest,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct OperatorInfo {
    pub operator: InfixOperator,
    pub level: u8,
    pub associativity: Associativity,
}

///
/// Binding power of every infix operator, keyed by the operator's source text.
/// The ternary, unary and postfix levels are structural and handled directly by
/// the expression parser, they are exposed as the level constants above.
///
#[derive(Debug, Clone, PartialEq)]
pub struct PrecedenceTable {
    operators: IndexMap<&'static str, OperatorInfo>,
}

impl PrecedenceTable {
    pub fn standard() -> Self {
        let mut table = PrecedenceTable {
            operators: IndexMap::with_capacity(15),
        };
        for op in &[BinaryOp::Mul, BinaryOp::Div, BinaryOp::Mod] {
            table.binary(*op, MULTIPLICATIVE);
        }
        for op in &[BinaryOp::Add, BinaryOp::Sub] {
            table.binary(*op, ADDITIVE);
        }
        for op in &[
            BinaryOp::Lt,
            BinaryOp::Le,
            BinaryOp::Ge,
            BinaryOp::Gt,
            BinaryOp::Eq,
            BinaryOp::Ne,
            BinaryOp::In,
        ] {
            table.binary(*op, RELATION);
        }
        table.operators.insert(
            "is",
            OperatorInfo {
                operator: InfixOperator::TypeTest,
                level: TYPE_TEST,
                associativity: Associativity::Left,
            },
        );
        table.binary(BinaryOp::And, LOGICAL_AND);
        table.binary(BinaryOp::Or, LOGICAL_OR);
        table
    }

    fn binary(&mut self, op: BinaryOp, level: u8) {
        self.operators.insert(
            op.symbol(),
            OperatorInfo {
                operator: InfixOperator::Binary(op),
                level,
                associativity: Associativity::Left,
            },
        );
    }

    ///
    /// Infix operator info for a token, `None` when the token cannot continue
    /// a binary expression
    ///
    pub fn infix(&self, token: &Token) -> Option<&OperatorInfo> {
        match token.kind {
            TokenKind::Operator(_)
            | TokenKind::Keyword(Keyword::In)
            | TokenKind::Keyword(Keyword::Is) => self.operators.get(token.text),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&&'static str, &OperatorInfo)> {
        self.operators.iter()
    }
}

impl Default for PrecedenceTable {
    fn default() -> Self {
        PrecedenceTable::standard()
    }
}

impl BinaryOp {
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => MULTIPLICATIVE,
            BinaryOp::Add | BinaryOp::Sub => ADDITIVE,
            BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Ge
            | BinaryOp::Gt
            | BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::In => RELATION,
            BinaryOp::And => LOGICAL_AND,
            BinaryOp::Or => LOGICAL_OR,
        }
    }
}

///
/// Immutable parser configuration, the active language extensions together
/// with the operator table. Passed explicitly to every parse call.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    pub extensions: BitFlags<Extension>,
    pub precedence: PrecedenceTable,
}

impl Grammar {
    pub fn new(dialect: Dialect) -> Self {
        Grammar {
            extensions: dialect.extensions(),
            precedence: PrecedenceTable::standard(),
        }
    }

    pub fn with(mut self, extension: Extension) -> Self {
        self.extensions.insert(extension);
        self
    }

    pub fn without(mut self, extension: Extension) -> Self {
        self.extensions.remove(extension);
        self
    }

    pub fn allows(&self, extension: Extension) -> bool {
        self.extensions.contains(extension)
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Grammar::new(Dialect::Current)
    }
}

impl From<Dialect> for Grammar {
    fn from(dialect: Dialect) -> Self {
        Grammar::new(dialect)
    }
}

impl TryFrom<&str> for Grammar {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(Grammar::new(Dialect::from_str(value)?))
    }
}
