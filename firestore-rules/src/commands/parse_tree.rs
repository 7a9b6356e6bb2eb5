use clap::{Arg, ArgAction, ArgMatches};

use crate::command::Command;
use crate::commands::{
    dialect_arg, grammar_from, read_rules, ERROR_STATUS_CODE, OUTPUT, PARSE_TREE, PRINT_JSON,
    PRINT_YAML, RULES, SUCCESS_STATUS_CODE,
};
use crate::rules::parser::parse_with;
use crate::rules::Result;
use crate::utils::reader::Reader;
use crate::utils::writer::Writer;

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct ParseTree {}

#[allow(clippy::new_without_default)]
impl ParseTree {
    pub fn new() -> Self {
        ParseTree {}
    }
}

impl Command for ParseTree {
    fn name(&self) -> &'static str {
        PARSE_TREE
    }

    fn command(&self) -> clap::Command {
        clap::Command::new(PARSE_TREE)
            .about("Prints out the parse tree for the rules defined in the file.")
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
            .arg(
                Arg::new(PRINT_JSON.0)
                    .long(PRINT_JSON.0)
                    .short(PRINT_JSON.1)
                    .action(ArgAction::SetTrue)
                    .conflicts_with(PRINT_YAML.0)
                    .help("Print output in JSON format"),
            )
            .arg(
                Arg::new(PRINT_YAML.0)
                    .long(PRINT_YAML.0)
                    .short(PRINT_YAML.1)
                    .action(ArgAction::SetTrue)
                    .required(false)
                    .help("Print output in YAML format, the default"),
            )
            .arg(dialect_arg())
    }

    fn execute(&self, app: &ArgMatches, writer: &mut Writer, reader: &mut Reader) -> Result<i32> {
        let grammar = grammar_from(app)?;
        let (content, name) = read_rules(app, reader)?;
        let yaml = !app.get_flag(PRINT_JSON.0);

        match parse_with(&content, &grammar) {
            Err(diagnostic) => {
                writer.write_err(diagnostic.render(&content, &name))?;
                Ok(ERROR_STATUS_CODE)
            }

            Ok(rules) => {
                if yaml {
                    serde_yaml::to_writer(writer, &rules)?;
                } else {
                    serde_json::to_writer_pretty(writer, &rules)?;
                }
                Ok(SUCCESS_STATUS_CODE)
            }
        }
    }
}
