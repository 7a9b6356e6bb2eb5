use std::fmt::Formatter;

use serde::{Deserialize, Serialize};

///
/// Position inside a rules file. `line` and `column` are 1-based, `column` counts
/// UTF-8 characters, `offset` is the byte offset from the start of the input.
///
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, Serialize, Deserialize, Hash)]
pub struct Location {
    pub offset: usize,
    pub line: u32,
    pub column: usize,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line:{}, column:{}", self.line, self.column)
    }
}

///
/// Half open source range `[start, end)` attached to every token and AST node so
/// that tooling can map a node back into the text it came from.
///
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, Serialize, Deserialize, Hash)]
pub struct SourceSpan {
    pub start: Location,
    pub end: Location,
}

impl SourceSpan {
    pub fn new(start: Location, end: Location) -> Self {
        SourceSpan { start, end }
    }

    pub fn point(at: Location) -> Self {
        SourceSpan { start: at, end: at }
    }

    pub fn to(&self, other: SourceSpan) -> SourceSpan {
        SourceSpan {
            start: self.start,
            end: other.end,
        }
    }
}

impl std::fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Location[{} to {}]", self.start, self.end)
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub span: SourceSpan,
}

impl Identifier {
    pub fn new(name: &str, span: SourceSpan) -> Self {
        Identifier {
            name: name.to_string(),
            span,
        }
    }
}

///
/// Root of the tree: the optional `rules_version` header, the `service`
/// declaration and the top level body of that service.
///
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub rules_version: Option<RulesVersion>,
    pub service: ServiceName,
    pub body: MatchBody,
    pub span: SourceSpan,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RulesVersion {
    pub version: String,
    pub span: SourceSpan,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ServiceName {
    pub name: String,
    pub span: SourceSpan,
}

///
/// The braces delimited list of declarations of a service or of a match block.
/// Declarations are kept in source order, interleaved as written.
///
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MatchBody {
    pub declarations: Vec<Declaration>,
    pub span: SourceSpan,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub enum Declaration {
    Function(FunctionDef),
    Match(MatchBlock),
    Rule(RuleDef),
}

impl Declaration {
    pub fn span(&self) -> SourceSpan {
        match self {
            Declaration::Function(function) => function.span,
            Declaration::Match(block) => block.span,
            Declaration::Rule(rule) => rule.span,
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MatchBlock {
    pub pattern: PathPattern,
    pub body: MatchBody,
    pub span: SourceSpan,
}

///
/// Pattern of a `match` block, e.g. `/databases/{database}/documents/{path=**}`
///
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PathPattern {
    pub segments: Vec<PathSegment>,
    pub span: SourceSpan,
}

///
/// Path used as a value inside an expression, e.g. `/databases/$(database)/documents/users`
///
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PathLiteral {
    pub segments: Vec<PathSegment>,
    pub span: SourceSpan,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PathSegment {
    pub kind: SegmentKind,
    pub span: SourceSpan,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub enum SegmentKind {
    /// fixed collection or document id
    Literal(String),
    /// `{name}` binds exactly one path component
    SingleCapture(String),
    /// `{name=**}` binds the remainder of the path
    MultiCapture(String),
    /// `$(expr)` evaluated to produce the component
    Evaluated(Expr),
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: Identifier,
    pub parameters: Vec<Identifier>,
    pub bindings: Vec<VariableBinding>,
    pub result: Expr,
    pub span: SourceSpan,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VariableBinding {
    pub name: Identifier,
    pub value: Expr,
    pub span: SourceSpan,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RuleDef {
    pub methods: Vec<MethodRef>,
    pub guard: Option<Expr>,
    pub span: SourceSpan,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MethodRef {
    pub method: Method,
    pub span: SourceSpan,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize, Hash)]
pub enum Method {
    Read,
    Write,
    Get,
    List,
    Create,
    Update,
    Delete,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Method> {
        Some(match name {
            "read" => Method::Read,
            "write" => Method::Write,
            "get" => Method::Get,
            "list" => Method::List,
            "create" => Method::Create,
            "update" => Method::Update,
            "delete" => Method::Delete,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Method::Read => "read",
            Method::Write => "write",
            Method::Get => "get",
            Method::List => "list",
            Method::Create => "create",
            Method::Update => "update",
            Method::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

///
/// Right hand side of an `is` type test
///
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize, Hash)]
pub enum TypeName {
    Bool,
    Bytes,
    Constraint,
    Duration,
    Float,
    Int,
    LatLng,
    List,
    Map,
    Number,
    Path,
    Set,
    String,
    Timestamp,
}

impl TypeName {
    pub fn from_name(name: &str) -> Option<TypeName> {
        Some(match name {
            "bool" => TypeName::Bool,
            "bytes" => TypeName::Bytes,
            "constraint" => TypeName::Constraint,
            "duration" => TypeName::Duration,
            "float" => TypeName::Float,
            "int" => TypeName::Int,
            "latlng" => TypeName::LatLng,
            "list" => TypeName::List,
            "map" => TypeName::Map,
            "number" => TypeName::Number,
            "path" => TypeName::Path,
            "set" => TypeName::Set,
            "string" => TypeName::String,
            "timestamp" => TypeName::Timestamp,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            TypeName::Bool => "bool",
            TypeName::Bytes => "bytes",
            TypeName::Constraint => "constraint",
            TypeName::Duration => "duration",
            TypeName::Float => "float",
            TypeName::Int => "int",
            TypeName::LatLng => "latlng",
            TypeName::List => "list",
            TypeName::Map => "map",
            TypeName::Number => "number",
            TypeName::Path => "path",
            TypeName::Set => "set",
            TypeName::String => "string",
            TypeName::Timestamp => "timestamp",
        }
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    String(String),
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Lt,
    Le,
    Ge,
    Gt,
    Eq,
    Ne,
    In,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Gt => ">",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::In => "in",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: SourceSpan,
}

impl Expr {
    pub fn new(kind: ExprKind, span: SourceSpan) -> Self {
        Expr { kind, span }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    Variable(String),
    List(Vec<Expr>),
    Map(Vec<MapEntry>),
    Call(FunctionCall),
    Member {
        object: Box<Expr>,
        field: MemberField,
    },
    Index {
        object: Box<Expr>,
        index: IndexOperand,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    TypeTest {
        operand: Box<Expr>,
        type_name: TypeName,
    },
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Path(PathLiteral),
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: Expr,
    pub value: Expr,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: Identifier,
    pub arguments: CallArguments,
}

///
/// A call either takes a comma separated list of expressions or exactly one
/// path, e.g. `exists(/databases/$(database)/documents/users/$(uid))`
///
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub enum CallArguments {
    Exprs(Vec<Expr>),
    Path(PathLiteral),
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub enum MemberField {
    Variable(Identifier),
    Method(FunctionCall),
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub enum IndexOperand {
    Element(Box<Expr>),
    Range { start: Box<Expr>, end: Box<Expr> },
    Field(String),
}

//
// Queries over the tree
//

impl MatchBody {
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.declarations.iter().filter_map(|each| match each {
            Declaration::Function(function) => Some(function),
            _ => None,
        })
    }

    pub fn matches(&self) -> impl Iterator<Item = &MatchBlock> {
        self.declarations.iter().filter_map(|each| match each {
            Declaration::Match(block) => Some(block),
            _ => None,
        })
    }

    pub fn rules(&self) -> impl Iterator<Item = &RuleDef> {
        self.declarations.iter().filter_map(|each| match each {
            Declaration::Rule(rule) => Some(rule),
            _ => None,
        })
    }

    fn collect_functions<'a>(&'a self, into: &mut Vec<&'a FunctionDef>) {
        for each in &self.declarations {
            match each {
                Declaration::Function(function) => into.push(function),
                Declaration::Match(block) => block.body.collect_functions(into),
                Declaration::Rule(_) => {}
            }
        }
    }
}

impl MatchBlock {
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.body.functions()
    }

    pub fn matches(&self) -> impl Iterator<Item = &MatchBlock> {
        self.body.matches()
    }

    pub fn rules(&self) -> impl Iterator<Item = &RuleDef> {
        self.body.rules()
    }
}

impl Expr {
    ///
    /// Free variables referenced by the expression, in source order. Member
    /// fields, method names and callee names are not variables.
    ///
    pub fn variable_references(&self) -> Vec<(&str, SourceSpan)> {
        let mut references = Vec::new();
        self.collect_references(&mut references);
        references
    }

    fn collect_references<'a>(&'a self, into: &mut Vec<(&'a str, SourceSpan)>) {
        match &self.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Variable(name) => into.push((name.as_str(), self.span)),
            ExprKind::List(items) => items.iter().for_each(|e| e.collect_references(into)),
            ExprKind::Map(entries) => {
                for entry in entries {
                    entry.key.collect_references(into);
                    entry.value.collect_references(into);
                }
            }
            ExprKind::Call(call) => call.collect_references(into),
            ExprKind::Member { object, field } => {
                object.collect_references(into);
                if let MemberField::Method(call) = field {
                    call.collect_references(into);
                }
            }
            ExprKind::Index { object, index } => {
                object.collect_references(into);
                match index {
                    IndexOperand::Element(element) => element.collect_references(into),
                    IndexOperand::Range { start, end } => {
                        start.collect_references(into);
                        end.collect_references(into);
                    }
                    IndexOperand::Field(_) => {}
                }
            }
            ExprKind::Unary { operand, .. } | ExprKind::TypeTest { operand, .. } => {
                operand.collect_references(into)
            }
            ExprKind::Binary { left, right, .. } => {
                left.collect_references(into);
                right.collect_references(into);
            }
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.collect_references(into);
                then_branch.collect_references(into);
                else_branch.collect_references(into);
            }
            ExprKind::Path(path) => path.collect_references(into),
        }
    }
}

impl FunctionCall {
    fn collect_references<'a>(&'a self, into: &mut Vec<(&'a str, SourceSpan)>) {
        match &self.arguments {
            CallArguments::Exprs(arguments) => {
                arguments.iter().for_each(|e| e.collect_references(into))
            }
            CallArguments::Path(path) => path.collect_references(into),
        }
    }
}

impl PathLiteral {
    fn collect_references<'a>(&'a self, into: &mut Vec<(&'a str, SourceSpan)>) {
        for segment in &self.segments {
            if let SegmentKind::Evaluated(expr) = &segment.kind {
                expr.collect_references(into);
            }
        }
    }
}

impl SourceFile {
    ///
    /// All function definitions of the file at any nesting depth, in the order
    /// they are declared
    ///
    pub fn functions(&self) -> Vec<&FunctionDef> {
        let mut functions = Vec::new();
        self.body.collect_functions(&mut functions);
        functions
    }

    ///
    /// Names bound with `let` across every function of the file
    ///
    pub fn variables(&self) -> Vec<&str> {
        self.functions()
            .into_iter()
            .flat_map(|function| function.bindings.iter().map(|b| b.name.name.as_str()))
            .collect()
    }

    ///
    /// Compares two trees ignoring source positions, useful to check that
    /// re-printed source parses back into the same structure.
    ///
    pub fn same_structure(&self, other: &SourceFile) -> bool {
        without_spans(self) == without_spans(other)
    }
}

//
// Span erasure, spans are reset to their default value so that equality only
// looks at the shape of the tree.
//

pub trait ClearSpans {
    fn clear_spans(&mut self);
}

pub fn without_spans<T: ClearSpans + Clone>(node: &T) -> T {
    let mut copy = node.clone();
    copy.clear_spans();
    copy
}

impl ClearSpans for Identifier {
    fn clear_spans(&mut self) {
        self.span = SourceSpan::default();
    }
}

impl ClearSpans for SourceFile {
    fn clear_spans(&mut self) {
        self.span = SourceSpan::default();
        if let Some(version) = &mut self.rules_version {
            version.span = SourceSpan::default();
        }
        self.service.span = SourceSpan::default();
        self.body.clear_spans();
    }
}

impl ClearSpans for MatchBody {
    fn clear_spans(&mut self) {
        self.span = SourceSpan::default();
        for each in &mut self.declarations {
            match each {
                Declaration::Function(function) => function.clear_spans(),
                Declaration::Match(block) => block.clear_spans(),
                Declaration::Rule(rule) => rule.clear_spans(),
            }
        }
    }
}

impl ClearSpans for MatchBlock {
    fn clear_spans(&mut self) {
        self.span = SourceSpan::default();
        self.pattern.span = SourceSpan::default();
        self.pattern.segments.iter_mut().for_each(ClearSpans::clear_spans);
        self.body.clear_spans();
    }
}

impl ClearSpans for PathSegment {
    fn clear_spans(&mut self) {
        self.span = SourceSpan::default();
        if let SegmentKind::Evaluated(expr) = &mut self.kind {
            expr.clear_spans();
        }
    }
}

impl ClearSpans for PathLiteral {
    fn clear_spans(&mut self) {
        self.span = SourceSpan::default();
        self.segments.iter_mut().for_each(ClearSpans::clear_spans);
    }
}

impl ClearSpans for FunctionDef {
    fn clear_spans(&mut self) {
        self.span = SourceSpan::default();
        self.name.clear_spans();
        self.parameters.iter_mut().for_each(ClearSpans::clear_spans);
        for binding in &mut self.bindings {
            binding.span = SourceSpan::default();
            binding.name.clear_spans();
            binding.value.clear_spans();
        }
        self.result.clear_spans();
    }
}

impl ClearSpans for RuleDef {
    fn clear_spans(&mut self) {
        self.span = SourceSpan::default();
        for method in &mut self.methods {
            method.span = SourceSpan::default();
        }
        if let Some(guard) = &mut self.guard {
            guard.clear_spans();
        }
    }
}

impl ClearSpans for FunctionCall {
    fn clear_spans(&mut self) {
        self.name.clear_spans();
        match &mut self.arguments {
            CallArguments::Exprs(arguments) => {
                arguments.iter_mut().for_each(ClearSpans::clear_spans)
            }
            CallArguments::Path(path) => path.clear_spans(),
        }
    }
}

impl ClearSpans for Expr {
    fn clear_spans(&mut self) {
        self.span = SourceSpan::default();
        match &mut self.kind {
            ExprKind::Literal(_) | ExprKind::Variable(_) => {}
            ExprKind::List(elements) => elements.iter_mut().for_each(ClearSpans::clear_spans),
            ExprKind::Map(entries) => {
                for entry in entries {
                    entry.key.clear_spans();
                    entry.value.clear_spans();
                }
            }
            ExprKind::Call(call) => call.clear_spans(),
            ExprKind::Member { object, field } => {
                object.clear_spans();
                match field {
                    MemberField::Variable(name) => name.clear_spans(),
                    MemberField::Method(call) => call.clear_spans(),
                }
            }
            ExprKind::Index { object, index } => {
                object.clear_spans();
                match index {
                    IndexOperand::Element(element) => element.clear_spans(),
                    IndexOperand::Range { start, end } => {
                        start.clear_spans();
                        end.clear_spans();
                    }
                    IndexOperand::Field(_) => {}
                }
            }
            ExprKind::Unary { operand, .. } => operand.clear_spans(),
            ExprKind::Binary { left, right, .. } => {
                left.clear_spans();
                right.clear_spans();
            }
            ExprKind::TypeTest { operand, .. } => operand.clear_spans(),
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.clear_spans();
                then_branch.clear_spans();
                else_branch.clear_spans();
            }
            ExprKind::Path(path) => path.clear_spans(),
        }
    }
}
