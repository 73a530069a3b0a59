//! NetScaler command lexer

use nom::{
    bytes::complete::{take_while, take_while1},
    character::complete::{char, one_of},
    combinator::recognize,
    sequence::pair,
    IResult,
};

/// Command verbs that may start a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Add,
    Bind,
    Set,
    Unbind,
    Remove,
    Link,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Bind => "bind",
            Self::Set => "set",
            Self::Unbind => "unbind",
            Self::Remove => "remove",
            Self::Link => "link",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object-type nouns recognised by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKeyword {
    Server,
    Lb,
    Vserver,
    ServiceGroup,
    Monitor,
    Audit,
    Authentication,
    Cache,
    Cs,
    Dns,
    Route,
    Responder,
    Rewrite,
    Policy,
    PolicyLabel,
    Action,
    ContentGroup,
    NameServer,
    AddRec,
    NsRec,
    Ssl,
    System,
    Tm,
    Tunnel,
    Aaa,
    Appflow,
    Cmp,
    Ns,
    Subscriber,
    Vpn,
    Db,
    NslogAction,
    SyslogAction,
    SyslogPolicy,
    NoAuthAction,
    TacacsAction,
    TacacsPolicy,
    CertKey,
    CmdPolicy,
    NslogGlobal,
    SyslogGlobal,
    Global,
    Patset,
    Service,
    User,
    Group,
    Param,
    Diameter,
    EncryptionParams,
    HttpParam,
    HttpProfile,
    RpcNode,
    TcpbufParam,
    GxInterface,
}

impl ObjectKeyword {
    /// Whether the keyword can continue a compound object type such as
    /// `lb vserver` or `audit nslogAction`. Keywords outside this set only
    /// ever start an object type, so `add system user bob` parses with
    /// object type `system` and name `user`.
    pub fn extends_compound(self) -> bool {
        !matches!(
            self,
            Self::PolicyLabel
                | Self::NslogGlobal
                | Self::SyslogGlobal
                | Self::Global
                | Self::Patset
                | Self::Service
                | Self::User
                | Self::Group
                | Self::Param
                | Self::Diameter
                | Self::EncryptionParams
                | Self::HttpParam
                | Self::HttpProfile
                | Self::RpcNode
                | Self::TcpbufParam
                | Self::GxInterface
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Action(Action),
    Object(ObjectKeyword),
}

/// Keyword table, matched case-insensitively
const KEYWORDS: &[(&str, Keyword)] = &[
    ("add", Keyword::Action(Action::Add)),
    ("bind", Keyword::Action(Action::Bind)),
    ("set", Keyword::Action(Action::Set)),
    ("unbind", Keyword::Action(Action::Unbind)),
    ("remove", Keyword::Action(Action::Remove)),
    ("link", Keyword::Action(Action::Link)),
    ("server", Keyword::Object(ObjectKeyword::Server)),
    ("lb", Keyword::Object(ObjectKeyword::Lb)),
    ("vserver", Keyword::Object(ObjectKeyword::Vserver)),
    ("servicegroup", Keyword::Object(ObjectKeyword::ServiceGroup)),
    ("monitor", Keyword::Object(ObjectKeyword::Monitor)),
    ("audit", Keyword::Object(ObjectKeyword::Audit)),
    ("authentication", Keyword::Object(ObjectKeyword::Authentication)),
    ("cache", Keyword::Object(ObjectKeyword::Cache)),
    ("cs", Keyword::Object(ObjectKeyword::Cs)),
    ("dns", Keyword::Object(ObjectKeyword::Dns)),
    ("route", Keyword::Object(ObjectKeyword::Route)),
    ("responder", Keyword::Object(ObjectKeyword::Responder)),
    ("rewrite", Keyword::Object(ObjectKeyword::Rewrite)),
    ("policy", Keyword::Object(ObjectKeyword::Policy)),
    ("policylabel", Keyword::Object(ObjectKeyword::PolicyLabel)),
    ("action", Keyword::Object(ObjectKeyword::Action)),
    ("contentgroup", Keyword::Object(ObjectKeyword::ContentGroup)),
    ("nameserver", Keyword::Object(ObjectKeyword::NameServer)),
    ("addrec", Keyword::Object(ObjectKeyword::AddRec)),
    ("nsrec", Keyword::Object(ObjectKeyword::NsRec)),
    ("ssl", Keyword::Object(ObjectKeyword::Ssl)),
    ("system", Keyword::Object(ObjectKeyword::System)),
    ("tm", Keyword::Object(ObjectKeyword::Tm)),
    ("tunnel", Keyword::Object(ObjectKeyword::Tunnel)),
    ("aaa", Keyword::Object(ObjectKeyword::Aaa)),
    ("appflow", Keyword::Object(ObjectKeyword::Appflow)),
    ("cmp", Keyword::Object(ObjectKeyword::Cmp)),
    ("ns", Keyword::Object(ObjectKeyword::Ns)),
    ("subscriber", Keyword::Object(ObjectKeyword::Subscriber)),
    ("vpn", Keyword::Object(ObjectKeyword::Vpn)),
    ("db", Keyword::Object(ObjectKeyword::Db)),
    ("nslogaction", Keyword::Object(ObjectKeyword::NslogAction)),
    ("syslogaction", Keyword::Object(ObjectKeyword::SyslogAction)),
    ("syslogpolicy", Keyword::Object(ObjectKeyword::SyslogPolicy)),
    ("noauthaction", Keyword::Object(ObjectKeyword::NoAuthAction)),
    ("tacacsaction", Keyword::Object(ObjectKeyword::TacacsAction)),
    ("tacacspolicy", Keyword::Object(ObjectKeyword::TacacsPolicy)),
    ("certkey", Keyword::Object(ObjectKeyword::CertKey)),
    ("cmdpolicy", Keyword::Object(ObjectKeyword::CmdPolicy)),
    ("nslogglobal", Keyword::Object(ObjectKeyword::NslogGlobal)),
    ("syslogglobal", Keyword::Object(ObjectKeyword::SyslogGlobal)),
    ("global", Keyword::Object(ObjectKeyword::Global)),
    ("patset", Keyword::Object(ObjectKeyword::Patset)),
    ("service", Keyword::Object(ObjectKeyword::Service)),
    ("user", Keyword::Object(ObjectKeyword::User)),
    ("group", Keyword::Object(ObjectKeyword::Group)),
    ("parameter", Keyword::Object(ObjectKeyword::Param)),
    ("param", Keyword::Object(ObjectKeyword::Param)),
    ("diameter", Keyword::Object(ObjectKeyword::Diameter)),
    ("encryptionparams", Keyword::Object(ObjectKeyword::EncryptionParams)),
    ("httpparam", Keyword::Object(ObjectKeyword::HttpParam)),
    ("httpprofile", Keyword::Object(ObjectKeyword::HttpProfile)),
    ("rpcnode", Keyword::Object(ObjectKeyword::RpcNode)),
    ("tcpbufparam", Keyword::Object(ObjectKeyword::TcpbufParam)),
    ("gxinterface", Keyword::Object(ObjectKeyword::GxInterface)),
];

fn lookup_keyword(word: &str) -> Option<Keyword> {
    KEYWORDS
        .iter()
        .find(|(keyword, _)| keyword.eq_ignore_ascii_case(word))
        .map(|(_, kind)| *kind)
}

/// Token classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Command verb (add, bind, ...)
    Action(Action),
    /// Object-type noun (server, lb, vserver, ...)
    Object(ObjectKeyword),
    /// Any other bare word
    Identifier,
    /// Quoted string, quotes and escapes removed
    String,
    /// All-digit word
    Number,
    /// Dotted-quad address
    Ip,
    /// `-name` flag
    ParameterFlag,
    /// End of input
    Eof,
    /// Unrecognised character
    Error,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Action(_) => write!(f, "action"),
            Self::Object(_) => write!(f, "object type"),
            Self::Identifier => write!(f, "identifier"),
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Ip => write!(f, "IP address"),
            Self::ParameterFlag => write!(f, "parameter"),
            Self::Eof => write!(f, "end of input"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A classified token with its position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal text (string contents for quoted tokens, message for errors)
    pub value: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, value: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            line,
            column,
        }
    }

    /// Tokens that may serve as a value: object names, parameter values
    pub fn is_value(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::String | TokenKind::Identifier | TokenKind::Number | TokenKind::Ip
        )
    }
}

/// Single-pass scanner over one command line
pub struct Tokenizer<'a> {
    remaining: &'a str,
    line: usize,
    column: usize,
}

impl<'a> Tokenizer<'a> {
    /// Start numbering lines at `line` so tokens report source positions
    pub fn at_line(input: &'a str, line: usize) -> Self {
        Self {
            remaining: input,
            line,
            column: 1,
        }
    }

    /// Produce the next token. Returns `Eof` forever once input is exhausted.
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            let (line, column) = (self.line, self.column);
            let Some(c) = self.remaining.chars().next() else {
                return Token::new(TokenKind::Eof, "", line, column);
            };

            match c {
                // Callers feed one line at a time; stray line breaks are skipped
                '\n' | '\r' => {
                    self.advance(c.len_utf8());
                    continue;
                }
                '"' | '\'' => {
                    return match parse_quoted_string(self.remaining) {
                        Ok((rest, s)) => {
                            self.advance(self.remaining.len() - rest.len());
                            Token::new(TokenKind::String, s, line, column)
                        }
                        Err(_) => self.error_token(c, line, column),
                    };
                }
                '-' => {
                    return match parse_parameter(self.remaining) {
                        Ok((rest, flag)) => {
                            self.advance(self.remaining.len() - rest.len());
                            Token::new(TokenKind::ParameterFlag, flag, line, column)
                        }
                        Err(_) => self.error_token(c, line, column),
                    };
                }
                // DNS root and similar
                '.' => {
                    self.advance(1);
                    return Token::new(TokenKind::Identifier, ".", line, column);
                }
                c if c.is_alphanumeric() || c == '_' => {
                    return match parse_word(self.remaining) {
                        Ok((rest, word)) => {
                            let kind = classify_word(word);
                            self.advance(self.remaining.len() - rest.len());
                            Token::new(kind, word, line, column)
                        }
                        Err(_) => self.error_token(c, line, column),
                    };
                }
                _ => return self.error_token(c, line, column),
            }
        }
    }

    fn error_token(&mut self, c: char, line: usize, column: usize) -> Token {
        self.advance(c.len_utf8());
        Token::new(
            TokenKind::Error,
            format!("unexpected character: {}", c),
            line,
            column,
        )
    }

    fn skip_whitespace(&mut self) {
        if let Ok((_, ws)) = skip_horizontal_whitespace(self.remaining) {
            self.advance(ws.len());
        }
    }

    /// Consume `len` bytes, keeping line/column in step
    fn advance(&mut self, len: usize) {
        let (consumed, rest) = self.remaining.split_at(len);
        for c in consumed.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.remaining = rest;
    }
}

/// Tokenize a command line. The result always ends with an `Eof` or an
/// `Error` token; nothing is produced after the first error.
pub fn tokenize(input: &str) -> Vec<Token> {
    tokenize_at(input, 1)
}

/// Tokenize a command line that sits at `line` in its source file
pub fn tokenize_at(input: &str, line: usize) -> Vec<Token> {
    let mut tokenizer = Tokenizer::at_line(input, line);
    let mut tokens = Vec::new();

    loop {
        let token = tokenizer.next_token();
        let done = matches!(token.kind, TokenKind::Eof | TokenKind::Error);
        tokens.push(token);
        if done {
            break;
        }
    }

    tokens
}

/// Resolve a bare word: keyword, then IP address, then number, else identifier
fn classify_word(word: &str) -> TokenKind {
    match lookup_keyword(word) {
        Some(Keyword::Action(action)) => TokenKind::Action(action),
        Some(Keyword::Object(object)) => TokenKind::Object(object),
        None if is_ip_address(word) => TokenKind::Ip,
        None if word.chars().all(|c| c.is_ascii_digit()) => TokenKind::Number,
        None => TokenKind::Identifier,
    }
}

/// Four dot-separated groups of one to three digits
fn is_ip_address(word: &str) -> bool {
    let parts: Vec<&str> = word.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|p| (1..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_digit()))
}

fn skip_horizontal_whitespace(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c.is_whitespace() && c != '\n')(input)
}

fn parse_word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))(input)
}

fn parse_parameter(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        char('-'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

/// Quoted string with backslash escapes. An unterminated string runs to
/// the end of input.
fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    let (rest, quote) = one_of("\"'")(input)?;
    let mut result = String::new();
    let mut chars = rest.char_indices();

    while let Some((idx, c)) = chars.next() {
        if c == quote {
            return Ok((&rest[idx + c.len_utf8()..], result));
        }
        if c == '\\' {
            if let Some((_, escaped)) = chars.next() {
                result.push(escaped);
            }
        } else {
            result.push(c);
        }
    }

    Ok(("", result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_add_server() {
        let tokens = tokenize("add server web01 10.1.2.121");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0].kind, TokenKind::Action(Action::Add));
        assert_eq!(tokens[1].kind, TokenKind::Object(ObjectKeyword::Server));
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].value, "web01");
        assert_eq!(tokens[3].kind, TokenKind::Ip);
        assert_eq!(tokens[3].value, "10.1.2.121");
        assert_eq!(tokens[4].kind, TokenKind::Eof);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("BIND serviceGroup LB VServer"),
            vec![
                TokenKind::Action(Action::Bind),
                TokenKind::Object(ObjectKeyword::ServiceGroup),
                TokenKind::Object(ObjectKeyword::Lb),
                TokenKind::Object(ObjectKeyword::Vserver),
                TokenKind::Eof,
            ]
        );
        let tokens = tokenize("LB");
        assert_eq!(tokens[0].value, "LB");
    }

    #[test]
    fn test_tokenize_quoted_string() {
        let tokens = tokenize(r#"add server "my server" 10.0.0.1"#);
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].value, "my server");

        let tokens = tokenize(r#"-comment 'it\'s \"here\"'"#);
        assert_eq!(tokens[1].kind, TokenKind::String);
        assert_eq!(tokens[1].value, r#"it's "here""#);
    }

    #[test]
    fn test_unterminated_string_runs_to_end() {
        let tokens = tokenize(r#"-comment "open ended"#);
        assert_eq!(tokens[1].value, "open ended");
        assert_eq!(tokens[2].kind, TokenKind::Eof);
    }

    #[test]
    fn test_numbers_ips_and_identifiers() {
        assert_eq!(
            kinds("80 10.0.28.130 1.2.3 1.2.3.4567 app:80 _x"),
            vec![
                TokenKind::Number,
                TokenKind::Ip,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_dash_always_starts_a_parameter() {
        let tokens = tokenize("-monitorName tcp -1 -gotoPriorityExpression END");
        assert_eq!(tokens[0].kind, TokenKind::ParameterFlag);
        assert_eq!(tokens[0].value, "-monitorName");
        assert_eq!(tokens[2].kind, TokenKind::ParameterFlag);
        assert_eq!(tokens[2].value, "-1");
        assert_eq!(tokens[3].value, "-gotoPriorityExpression");
    }

    #[test]
    fn test_parameter_stops_at_punctuation() {
        let tokens = tokenize("-port_2.5");
        assert_eq!(tokens[0].value, "-port_2");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].value, ".");
        assert_eq!(tokens[2].kind, TokenKind::Number);
        assert_eq!(tokens[2].value, "5");
    }

    #[test]
    fn test_unexpected_character_ends_stream() {
        let tokens = tokenize("add server web01 @ 10.0.0.1");
        let last = tokens.last().unwrap();
        assert_eq!(last.kind, TokenKind::Error);
        assert_eq!(last.value, "unexpected character: @");
        assert_eq!(last.column, 18);
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn test_standalone_dot() {
        let tokens = tokenize("add dns nameServer .");
        assert_eq!(tokens[3].kind, TokenKind::Identifier);
        assert_eq!(tokens[3].value, ".");
    }

    #[test]
    fn test_newlines_are_skipped() {
        let tokens = tokenize("add\r\nserver");
        assert_eq!(tokens[0].kind, TokenKind::Action(Action::Add));
        assert_eq!(tokens[1].kind, TokenKind::Object(ObjectKeyword::Server));
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].column, 1);
    }

    #[test]
    fn test_positions_follow_start_line() {
        let tokens = tokenize_at("  bind lb", 42);
        assert_eq!(tokens[0].line, 42);
        assert_eq!(tokens[0].column, 3);
        assert_eq!(tokens[1].column, 8);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   \t"), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_compound_keyword_continuation() {
        assert!(ObjectKeyword::Vserver.extends_compound());
        assert!(ObjectKeyword::CertKey.extends_compound());
        assert!(!ObjectKeyword::User.extends_compound());
        assert!(!ObjectKeyword::NslogGlobal.extends_compound());
    }
}
