use crate::{command::Command, commands};

pub mod reader;
pub mod writer;

pub fn get_commands() -> Vec<Box<dyn Command>> {
    vec![
        Box::new(commands::parse_tree::ParseTree::new()),
        Box::new(commands::fmt::Fmt::new()),
        Box::new(commands::check::Check::new()),
    ]
}
