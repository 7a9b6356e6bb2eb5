use std::collections::HashMap;
use std::fs::File;
use std::process::exit;

use clap::{Arg, ArgAction};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use firestore_rules::command::Command;
use firestore_rules::commands::{APP_NAME, APP_VERSION, FMT, OUTPUT, PARSE_TREE, VERBOSE};
use firestore_rules::rules::errors::Error;
use firestore_rules::utils;
use firestore_rules::utils::reader::{ReadBuffer, Reader};
use firestore_rules::utils::writer::WriteBuffer::Stderr;
use firestore_rules::utils::writer::{WriteBuffer::File as WBFile, WriteBuffer::Stdout, Writer};

fn main() -> Result<(), Error> {
    let mut app = clap::Command::new(APP_NAME)
        .version(APP_VERSION)
        .about(
            r#"
  Lexer and parser for Cloud Firestore security rules. Parses rules files into
  a syntax tree, reports the first lexical, syntax or structural error with its
  exact position, and re-prints rules in canonical form."#,
        )
        .arg(
            Arg::new(VERBOSE.0)
                .long(VERBOSE.0)
                .short(VERBOSE.1)
                .action(ArgAction::Count)
                .global(true)
                .help("Increase logging, -v for debug and -vv for trace output"),
        )
        .arg_required_else_help(true);

    let commands: Vec<Box<dyn Command>> = utils::get_commands();

    let mappings = commands.iter().map(|s| (s.name(), s)).fold(
        HashMap::with_capacity(commands.len()),
        |mut map, entry| {
            map.insert(entry.0, entry.1.as_ref());
            map
        },
    );

    for each in &commands {
        app = app.subcommand(each.command());
    }

    let help = app.render_usage();
    let app = app.get_matches();

    let level = match app.get_count(VERBOSE.0) {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("Unable to initialize logging {e}");
    }

    match app.subcommand() {
        Some((name, value)) => {
            if let Some(command) = mappings.get(name) {
                let mut output_writer: Writer = if [PARSE_TREE, FMT].contains(&command.name()) {
                    match value.get_one::<String>(OUTPUT.0) {
                        Some(file) => {
                            Writer::new(WBFile(File::create(file)?), Stderr(std::io::stderr()))
                        }
                        None => Writer::new(Stdout(std::io::stdout()), Stderr(std::io::stderr())),
                    }
                } else {
                    Writer::new(Stdout(std::io::stdout()), Stderr(std::io::stderr()))
                };

                match (*command).execute(
                    value,
                    &mut output_writer,
                    &mut Reader::new(ReadBuffer::Stdin(std::io::stdin())),
                ) {
                    Err(e) => {
                        if output_writer
                            .write_err(format!("Error occurred {e}"))
                            .is_err()
                        {
                            eprintln!("Error occurred {e}");
                        }

                        exit(-1);
                    }
                    Ok(code) => exit(code),
                }
            } else {
                println!("{}", help);
            }
        }
        None => {
            println!("{}", help);
        }
    }

    Ok(())
}
