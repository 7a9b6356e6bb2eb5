use std::fmt::Formatter;

use crate::rules::exprs::*;
use crate::rules::grammar::{POSTFIX, TERNARY, TYPE_TEST, UNARY};

const INDENT: &str = "  ";

//
// Canonical source printer. Output re-parses into the same tree, parentheses
// are emitted only where the operator levels demand them.
//

fn level(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Ternary { .. } => TERNARY,
        ExprKind::Binary { op, .. } => op.precedence(),
        ExprKind::TypeTest { .. } => TYPE_TEST,
        ExprKind::Unary { .. } => UNARY,
        _ => POSTFIX,
    }
}

fn write_operand(f: &mut Formatter<'_>, expr: &Expr, parenthesize: bool) -> std::fmt::Result {
    if parenthesize {
        f.write_fmt(format_args!("({})", expr))
    } else {
        f.write_fmt(format_args!("{}", expr))
    }
}

fn write_list<T: std::fmt::Display>(f: &mut Formatter<'_>, items: &[T]) -> std::fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        f.write_fmt(format_args!("{}", item))?;
    }
    Ok(())
}

pub(crate) fn quoted(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Int(value) => f.write_fmt(format_args!("{}", value))?,
            Literal::Float(value) => {
                let text = value.to_string();
                f.write_str(&text)?;
                if !text.contains('.') {
                    f.write_str(".0")?;
                }
            }
            Literal::Bool(value) => f.write_fmt(format_args!("{}", value))?,
            Literal::Null => f.write_str("null")?,
            Literal::String(value) => f.write_str(&quoted(value))?,
        }
        Ok(())
    }
}

impl std::fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}(", self.name.name))?;
        match &self.arguments {
            CallArguments::Exprs(arguments) => write_list(f, arguments)?,
            CallArguments::Path(path) => f.write_fmt(format_args!("{}", path))?,
        }
        f.write_str(")")
    }
}

impl std::fmt::Display for MapEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}: {}", self.key, self.value))
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ExprKind::Literal(literal) => f.write_fmt(format_args!("{}", literal))?,
            ExprKind::Variable(name) => f.write_str(name)?,
            ExprKind::List(elements) => {
                f.write_str("[")?;
                write_list(f, elements)?;
                f.write_str("]")?;
            }
            ExprKind::Map(entries) => {
                f.write_str("{")?;
                write_list(f, entries)?;
                f.write_str("}")?;
            }
            ExprKind::Call(call) => f.write_fmt(format_args!("{}", call))?,
            ExprKind::Member { object, field } => {
                write_operand(f, object, level(object) < POSTFIX)?;
                match field {
                    MemberField::Variable(name) => f.write_fmt(format_args!(".{}", name.name))?,
                    MemberField::Method(call) => f.write_fmt(format_args!(".{}", call))?,
                }
            }
            ExprKind::Index { object, index } => {
                write_operand(f, object, level(object) < POSTFIX)?;
                match index {
                    // a lone string element would re-parse as a field index
                    IndexOperand::Element(element) => match &element.kind {
                        ExprKind::Literal(Literal::String(_)) => {
                            f.write_fmt(format_args!("[({})]", element))?
                        }
                        _ => f.write_fmt(format_args!("[{}]", element))?,
                    },
                    IndexOperand::Range { start, end } => {
                        f.write_fmt(format_args!("[{}:{}]", start, end))?
                    }
                    IndexOperand::Field(name) => f.write_fmt(format_args!("[{}]", quoted(name)))?,
                }
            }
            ExprKind::Unary { op, operand } => {
                f.write_str(op.symbol())?;
                write_operand(f, operand, level(operand) < UNARY)?;
            }
            ExprKind::Binary { op, left, right } => {
                let own = op.precedence();
                write_operand(f, left, level(left) < own)?;
                f.write_fmt(format_args!(" {} ", op))?;
                write_operand(f, right, level(right) <= own)?;
            }
            ExprKind::TypeTest { operand, type_name } => {
                write_operand(f, operand, level(operand) < TYPE_TEST)?;
                f.write_fmt(format_args!(" is {}", type_name))?;
            }
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                write_operand(f, condition, level(condition) <= TERNARY)?;
                f.write_fmt(format_args!(" ? {} : {}", then_branch, else_branch))?;
            }
            ExprKind::Path(path) => f.write_fmt(format_args!("{}", path))?,
        }
        Ok(())
    }
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            SegmentKind::Literal(name) => f.write_fmt(format_args!("/{}", name)),
            SegmentKind::SingleCapture(name) => f.write_fmt(format_args!("/{{{}}}", name)),
            SegmentKind::MultiCapture(name) => f.write_fmt(format_args!("/{{{}=**}}", name)),
            SegmentKind::Evaluated(expr) => f.write_fmt(format_args!("/$({})", expr)),
        }
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for segment in &self.segments {
            f.write_fmt(format_args!("{}", segment))?;
        }
        Ok(())
    }
}

impl std::fmt::Display for PathLiteral {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for segment in &self.segments {
            f.write_fmt(format_args!("{}", segment))?;
        }
        Ok(())
    }
}

impl std::fmt::Display for RuleDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("allow ")?;
        let methods = self.methods.iter().map(|m| m.method).collect::<Vec<Method>>();
        write_list(f, &methods)?;
        if let Some(guard) = &self.guard {
            f.write_fmt(format_args!(": if {}", guard))?;
        }
        f.write_str(";")
    }
}

//
// Declarations are printed one per line, nested bodies indented two spaces
// per level.
//

fn write_indent(f: &mut Formatter<'_>, depth: usize) -> std::fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn write_function(f: &mut Formatter<'_>, function: &FunctionDef, depth: usize) -> std::fmt::Result {
    write_indent(f, depth)?;
    f.write_fmt(format_args!("function {}(", function.name.name))?;
    let parameters = function
        .parameters
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<&str>>();
    write_list(f, &parameters)?;
    f.write_str(") {\n")?;
    for binding in &function.bindings {
        write_indent(f, depth + 1)?;
        f.write_fmt(format_args!("let {} = {};\n", binding.name.name, binding.value))?;
    }
    write_indent(f, depth + 1)?;
    f.write_fmt(format_args!("return {};\n", function.result))?;
    write_indent(f, depth)?;
    f.write_str("}")
}

fn write_body(f: &mut Formatter<'_>, body: &MatchBody, depth: usize) -> std::fmt::Result {
    f.write_str("{\n")?;
    for declaration in &body.declarations {
        match declaration {
            Declaration::Function(function) => write_function(f, function, depth + 1)?,
            Declaration::Match(block) => write_match(f, block, depth + 1)?,
            Declaration::Rule(rule) => {
                write_indent(f, depth + 1)?;
                f.write_fmt(format_args!("{}", rule))?;
            }
        }
        f.write_str("\n")?;
    }
    write_indent(f, depth)?;
    f.write_str("}")
}

fn write_match(f: &mut Formatter<'_>, block: &MatchBlock, depth: usize) -> std::fmt::Result {
    write_indent(f, depth)?;
    f.write_fmt(format_args!("match {} ", block.pattern))?;
    write_body(f, &block.body, depth)
}

impl std::fmt::Display for FunctionDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write_function(f, self, 0)
    }
}

impl std::fmt::Display for MatchBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write_match(f, self, 0)
    }
}

impl std::fmt::Display for SourceFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(version) = &self.rules_version {
            f.write_fmt(format_args!("rules_version = {};\n", quoted(&version.version)))?;
        }
        f.write_fmt(format_args!("service {} ", self.service.name))?;
        write_body(f, &self.body, 0)?;
        f.write_str("\n")
    }
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod display_tests;
