//! NetScaler command parser
//!
//! Grammar, left to right with one token of lookahead:
//!
//! ```text
//! command     := action object-type name argument* parameter*
//! object-type := (keyword | identifier) keyword*
//! parameter   := flag value?
//! ```

use super::lexer::{tokenize_at, Action, Token, TokenKind};
use super::processor::SemanticError;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Nothing but whitespace; callers skip these lines
    #[error("empty command")]
    Empty,

    #[error("tokenization error: {message} at column {column}")]
    Lexical {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("expected {expected}, got {found} at column {column}")]
    Syntax {
        expected: &'static str,
        found: String,
        line: usize,
        column: usize,
    },

    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

impl CommandError {
    /// 1-based column of the offending token, when known
    pub fn column(&self) -> Option<usize> {
        match self {
            Self::Lexical { column, .. } | Self::Syntax { column, .. } => Some(*column),
            Self::Empty | Self::Semantic(_) => None,
        }
    }
}

/// One parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub action: Action,
    /// Object type words joined by single spaces, as written (`lb vserver`)
    pub object_type: String,
    pub name: String,
    /// Positional arguments after the name
    pub arguments: Vec<String>,
    /// Named parameters keyed by flag, dash included (`-comment`)
    pub parameters: BTreeMap<String, String>,
    /// 1-based source line
    pub line: usize,
}

impl Command {
    /// Object type lower-cased with spaces removed: `LB VServer` -> `lbvserver`
    pub fn normalized_object_type(&self) -> String {
        self.object_type
            .chars()
            .filter(|c| *c != ' ')
            .flat_map(char::to_lowercase)
            .collect()
    }

    /// Get positional argument at index
    pub fn argument(&self, index: usize) -> Option<&str> {
        self.arguments.get(index).map(|s| s.as_str())
    }

    /// Get a named parameter by flag (`-comment`)
    pub fn parameter(&self, flag: &str) -> Option<&str> {
        self.parameters.get(flag).map(|s| s.as_str())
    }

    /// Named parameter value, empty when absent
    pub fn parameter_or_default(&self, flag: &str) -> String {
        self.parameter(flag).unwrap_or_default().to_string()
    }

    /// Check if a flag was given, with or without a value
    pub fn has_parameter(&self, flag: &str) -> bool {
        self.parameters.contains_key(flag)
    }
}

/// Recursive-descent parser over the tokens of a single line
pub struct CommandParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    eof: Token,
}

impl<'a> CommandParser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        let (line, column) = tokens
            .last()
            .map(|t| (t.line, t.column))
            .unwrap_or((1, 1));
        Self {
            tokens,
            pos: 0,
            eof: Token {
                kind: TokenKind::Eof,
                value: String::new(),
                line,
                column,
            },
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn syntax_error(&self, expected: &'static str) -> CommandError {
        let token = self.current();
        let found = match token.kind {
            TokenKind::Eof => token.kind.to_string(),
            kind => format!("{} `{}`", kind, token.value),
        };
        CommandError::Syntax {
            expected,
            found,
            line: token.line,
            column: token.column,
        }
    }

    /// Parse the complete command
    pub fn parse(mut self) -> Result<Command, CommandError> {
        if self.current().kind == TokenKind::Eof {
            return Err(CommandError::Empty);
        }

        let line = self.current().line;
        let action = self.parse_action()?;
        let object_type = self.parse_object_type()?;
        let name = self.parse_object_name()?;
        let arguments = self.parse_arguments();
        let parameters = self.parse_parameters();

        Ok(Command {
            action,
            object_type,
            name,
            arguments,
            parameters,
            line,
        })
    }

    fn parse_action(&mut self) -> Result<Action, CommandError> {
        match self.current().kind {
            TokenKind::Action(action) => {
                self.advance();
                Ok(action)
            }
            _ => Err(self.syntax_error("action (add, bind, set, etc.)")),
        }
    }

    /// Greedily join object-type words. The first word may be any keyword
    /// or identifier; later words must be keywords that extend compounds.
    fn parse_object_type(&mut self) -> Result<String, CommandError> {
        let mut parts: Vec<String> = Vec::new();

        loop {
            match self.current().kind {
                TokenKind::Object(_) | TokenKind::Identifier => {
                    parts.push(self.advance().value);
                }
                _ => break,
            }

            match self.current().kind {
                TokenKind::Object(keyword) if keyword.extends_compound() => {}
                _ => break,
            }
        }

        if parts.is_empty() {
            return Err(self.syntax_error("object type (server, lb vserver, serviceGroup, etc.)"));
        }

        Ok(parts.join(" "))
    }

    /// Names are usually strings, identifiers, numbers or addresses, but any
    /// other non-empty token is accepted too so that names colliding with
    /// keywords still parse.
    fn parse_object_name(&mut self) -> Result<String, CommandError> {
        let token = self.current();
        let accepted = token.is_value()
            || (!matches!(token.kind, TokenKind::Eof | TokenKind::ParameterFlag)
                && !token.value.is_empty());

        if accepted {
            Ok(self.advance().value)
        } else {
            Err(self.syntax_error("object name (string, identifier, number, or IP)"))
        }
    }

    fn parse_arguments(&mut self) -> Vec<String> {
        let mut args = Vec::new();

        while !matches!(
            self.current().kind,
            TokenKind::Eof | TokenKind::ParameterFlag
        ) {
            // An empty quoted string ends the positional run
            if self.current().value.is_empty() {
                break;
            }
            args.push(self.advance().value);
        }

        args
    }

    fn parse_parameters(&mut self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();

        while self.current().kind == TokenKind::ParameterFlag {
            let flag = self.advance().value;
            let value = if self.current().is_value() {
                self.advance().value
            } else {
                String::new()
            };
            params.insert(flag, value);
        }

        params
    }
}

/// Parse one source line. Blank and `#` comment lines yield `Ok(None)`.
pub fn parse_command_line(line: &str, line_number: usize) -> Result<Option<Command>, CommandError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let tokens = tokenize_at(trimmed, line_number);
    if let Some(error) = tokens.iter().find(|t| t.kind == TokenKind::Error) {
        return Err(CommandError::Lexical {
            message: error.value.clone(),
            line: error.line,
            column: error.column,
        });
    }

    match CommandParser::new(&tokens).parse() {
        Ok(command) => Ok(Some(command)),
        Err(CommandError::Empty) => Ok(None),
        Err(e) => Err(e),
    }
}
