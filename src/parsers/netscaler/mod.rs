//! Citrix NetScaler command-language parser
//!
//! Each line is tokenized, parsed into a [`Command`], and folded into a
//! [`ParseState`]. The first failing line aborts the run.

mod command;
mod lexer;
mod parser;
mod processor;

pub use command::{parse_command_line, Command, CommandError, CommandParser};
pub use lexer::{tokenize, tokenize_at, Action, ObjectKeyword, Token, TokenKind, Tokenizer};
pub use parser::NetScalerParser;
pub use processor::{CommandKind, ParseState, SemanticError};
