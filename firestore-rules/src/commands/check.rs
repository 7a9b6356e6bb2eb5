use std::fs::File;
use std::io::Write;
use std::path::Path;

use clap::{Arg, ArgAction, ArgMatches};

use crate::command::Command;
use crate::commands::files::{alphabetical, get_files_with_filter, has_extension, read_file_content};
use crate::commands::{
    dialect_arg, grammar_from, CHECK, ERROR_STATUS_CODE, FAILURE_STATUS_CODE, RULES,
    RULE_FILE_SUPPORTED_EXTENSIONS, SUCCESS_STATUS_CODE,
};
use crate::rules::grammar::Grammar;
use crate::rules::parser::parse_with;
use crate::rules::{Result, Status};
use crate::utils::reader::Reader;
use crate::utils::writer::Writer;

///
/// Parses every rules file named on the command line, directories are
/// searched recursively for `.rules` files. Prints one PASS/FAIL line per file
/// and the diagnostic of every failure.
///
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Check {}

#[allow(clippy::new_without_default)]
impl Check {
    pub fn new() -> Self {
        Check {}
    }
}

impl Command for Check {
    fn name(&self) -> &'static str {
        CHECK
    }

    fn command(&self) -> clap::Command {
        clap::Command::new(CHECK)
            .about("Checks that rules files parse, reporting the first error in each file.")
            .arg(
                Arg::new(RULES.0)
                    .long(RULES.0)
                    .short(RULES.1)
                    .help("Provide a rules file or a directory of rules files. Can be repeated")
                    .action(ArgAction::Append)
                    .required(true),
            )
            .arg(dialect_arg())
            .arg_required_else_help(true)
    }

    fn execute(&self, app: &ArgMatches, writer: &mut Writer, _reader: &mut Reader) -> Result<i32> {
        let grammar = grammar_from(app)?;
        let mut exit_code = SUCCESS_STATUS_CODE;

        let list_of_file_or_dir = app
            .get_many::<String>(RULES.0)
            .map(|values| values.cloned().collect::<Vec<String>>())
            .unwrap_or_default();

        for file_or_dir in list_of_file_or_dir {
            let files = match get_files_with_filter(&file_or_dir, alphabetical, |entry| {
                has_extension(entry, &RULE_FILE_SUPPORTED_EXTENSIONS)
            }) {
                Ok(files) => files,
                Err(e) => {
                    writer.write_err(format!("{}", e))?;
                    exit_code = ERROR_STATUS_CODE;
                    continue;
                }
            };

            for file in files {
                match check_file(&file, &grammar, writer) {
                    Ok(Status::PASS) => {}
                    Ok(Status::FAIL) => {
                        if exit_code == SUCCESS_STATUS_CODE {
                            exit_code = FAILURE_STATUS_CODE;
                        }
                    }
                    Err(e) => {
                        writer.write_err(format!("Unable to read {}: {}", file.display(), e))?;
                        exit_code = ERROR_STATUS_CODE;
                    }
                }
            }
        }

        Ok(exit_code)
    }
}

fn check_file(file: &Path, grammar: &Grammar, writer: &mut Writer) -> Result<Status> {
    let content = read_file_content(File::open(file)?)?;
    let name = file.display().to_string();
    match parse_with(&content, grammar) {
        Ok(rules) => {
            log::debug!(
                "{} parsed with {} function(s)",
                name,
                rules.functions().len()
            );
            writeln!(writer, "{} {}", Status::PASS, name)?;
            Ok(Status::PASS)
        }
        Err(diagnostic) => {
            writeln!(writer, "{} {}", Status::FAIL, name)?;
            write!(writer, "{}", diagnostic.render(&content, &name))?;
            Ok(Status::FAIL)
        }
    }
}

