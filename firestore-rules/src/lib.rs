// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Lexer and parser for Cloud Firestore security rules.
//!
//! ```
//! let rules = firestore_rules::parse(r#"
//!     rules_version = "2";
//!     service cloud.firestore {
//!       match /databases/{database}/documents {
//!         allow read: if request.auth != null;
//!       }
//!     }
//! "#).unwrap();
//! assert_eq!(rules.body.matches().count(), 1);
//! ```

pub mod command;
pub mod commands;
pub mod rules;
pub mod utils;

pub use crate::rules::errors::{Diagnostic, DiagnosticKind, Error};
pub use crate::rules::exprs::*;
pub use crate::rules::grammar::{Dialect, Extension, Grammar, PrecedenceTable};
pub use crate::rules::lexer::{Keyword, Lexer, Token, TokenKind};
pub use crate::rules::parser::{parse, parse_expr, parse_expr_with, parse_with, Parser};
