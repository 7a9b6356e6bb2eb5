use std::io::Write;

use clap::{Arg, ArgAction, ArgMatches};

use crate::command::Command;
use crate::commands::{
    dialect_arg, grammar_from, read_rules, ERROR_STATUS_CODE, FMT, OUTPUT, RULES,
    SUCCESS_STATUS_CODE,
};
use crate::rules::parser::parse_with;
use crate::rules::Result;
use crate::utils::reader::Reader;
use crate::utils::writer::Writer;

///
/// Re-prints a rules file in canonical form, two space indentation, one
/// declaration per line and only the parentheses operator precedence needs.
/// Comments are not preserved.
///
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Fmt {}

#[allow(clippy::new_without_default)]
impl Fmt {
    pub fn new() -> Self {
        Fmt {}
    }
}

impl Command for Fmt {
    fn name(&self) -> &'static str {
        FMT
    }

    fn command(&self) -> clap::Command {
        clap::Command::new(FMT)
            .about("Prints the rules file in canonical form.")
            .arg(
                Arg::new(RULES.0)
                    .long(RULES.0)
                    .short(RULES.1)
                    .help("Provide a rules file, reads from stdin when omitted")
                    .action(ArgAction::Set)
                    .required(false),
            )
            .arg(
                Arg::new(OUTPUT.0)
                    .long(OUTPUT.0)
                    .short(OUTPUT.1)
                    .help("Write to output file")
                    .action(ArgAction::Set)
                    .required(false),
            )
            .arg(dialect_arg())
    }

    fn execute(&self, app: &ArgMatches, writer: &mut Writer, reader: &mut Reader) -> Result<i32> {
        let grammar = grammar_from(app)?;
        let (content, name) = read_rules(app, reader)?;
        match parse_with(&content, &grammar) {
            Ok(rules) => {
                write!(writer, "{}", rules)?;
                Ok(SUCCESS_STATUS_CODE)
            }
            Err(diagnostic) => {
                writer.write_err(diagnostic.render(&content, &name))?;
                Ok(ERROR_STATUS_CODE)
            }
        }
    }
}
