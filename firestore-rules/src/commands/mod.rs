pub mod check;
pub(crate) mod files;
pub mod fmt;
pub mod parse_tree;

use std::fs::File;
use std::io::Read;
use std::str::FromStr;

use clap::{Arg, ArgAction, ArgMatches};

use crate::rules::errors::Error;
use crate::rules::grammar::{Dialect, Grammar};
use crate::rules::Result;
use crate::utils::reader::Reader;

//
// Constants
//
// Application metadata
pub const APP_NAME: &str = "firestore-rules";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
// Commands
pub const PARSE_TREE: &str = "parse-tree";
pub const FMT: &str = "fmt";
pub const CHECK: &str = "check";
// Arguments for every command
pub const RULES: (&str, char) = ("rules", 'r');
pub const DIALECT: (&str, char) = ("dialect", 'd');
pub const VERBOSE: (&str, char) = ("verbose", 'v');
// Arguments for parse-tree, fmt
pub const OUTPUT: (&str, char) = ("output", 'o');
// Arguments for parse-tree
pub const PRINT_JSON: (&str, char) = ("print-json", 'p');
pub const PRINT_YAML: (&str, char) = ("print-yaml", 'y');

pub(crate) const RULE_FILE_SUPPORTED_EXTENSIONS: [&str; 1] = [".rules"];
pub(crate) const STDIN_NAME: &str = "stdin";

pub const FAILURE_STATUS_CODE: i32 = 19;
pub const SUCCESS_STATUS_CODE: i32 = 0;
pub const ERROR_STATUS_CODE: i32 = 5;

pub(crate) fn dialect_arg() -> Arg {
    Arg::new(DIALECT.0)
        .long(DIALECT.0)
        .short(DIALECT.1)
        .help("Grammar revision to parse with")
        .value_parser(["legacy", "current"])
        .default_value("current")
        .action(ArgAction::Set)
}

pub(crate) fn grammar_from(args: &ArgMatches) -> Result<Grammar> {
    match args.get_one::<String>(DIALECT.0) {
        Some(dialect) => Ok(Grammar::new(Dialect::from_str(dialect)?)),
        None => Ok(Grammar::default()),
    }
}

///
/// Rules content named by `--rules`, or everything on the reader when the
/// argument is absent. Returns the content together with a display name.
///
pub(crate) fn read_rules(args: &ArgMatches, reader: &mut Reader) -> Result<(String, String)> {
    let mut content = String::new();
    let name = match args.get_one::<String>(RULES.0) {
        Some(file) => {
            let handle = File::open(file).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::FileNotFoundError(file.to_string()),
                _ => Error::IoError(e),
            })?;
            content = files::read_file_content(handle)?;
            file.to_string()
        }
        None => {
            reader.read_to_string(&mut content)?;
            STDIN_NAME.to_string()
        }
    };
    Ok((content, name))
}
