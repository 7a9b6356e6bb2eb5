pub mod display;
pub mod errors;
pub mod expr_parser;
pub mod exprs;
pub mod grammar;
pub mod lexer;
pub mod parser;

use std::fmt::Formatter;

use colored::*;
use errors::Error;

pub type Result<R> = std::result::Result<R, Error>;

#[derive(Debug, Clone, PartialEq, Copy)]
pub enum Status {
    PASS,
    FAIL,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::PASS => f.write_str(&"PASS".green())?,
            Status::FAIL => f.write_str(&"FAIL".red())?,
        }
        Ok(())
    }
}
