//! NetScaler configuration parser

use super::command::parse_command_line;
use super::processor::{CommandKind, ParseState};
use crate::ir::{ConvertedItem, Diagnostics, LoadBalancerConfig, SkippedItem, SourceFormat, SourceLocation};
use crate::parsers::{FormatSignature, ParseContext, ParseError, ParseOutput, Parser};
use std::io::{self, BufRead};
use std::path::Path;

/// NetScaler configuration parser
pub struct NetScalerParser;

impl NetScalerParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse lines into the model. Line numbers are 1-based over every
    /// input line, blank and comment lines included.
    pub fn parse_lines<I, S>(
        lines: I,
        file: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<LoadBalancerConfig, ParseError>
    where
        I: IntoIterator<Item = io::Result<S>>,
        S: AsRef<str>,
    {
        let mut state = ParseState::new();

        for (idx, line) in lines.into_iter().enumerate() {
            let line_number = idx + 1;
            let line = line?;

            let command = match parse_command_line(line.as_ref(), line_number) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(source) => {
                    return Err(ParseError::Line {
                        line: line_number,
                        source,
                    })
                }
            };

            let kind = CommandKind::of(&command);
            state = state.apply(&command).map_err(|e| ParseError::Line {
                line: line_number,
                source: e.into(),
            })?;

            let location = SourceLocation::new(file.to_path_buf(), line_number);
            if kind.is_recorded() {
                diagnostics.converted.push(ConvertedItem {
                    item_type: kind.describe().to_string(),
                    name: command.name,
                    source_location: Some(location),
                });
            } else {
                tracing::debug!(
                    line = line_number,
                    "skipping {} {} {}",
                    command.action,
                    command.object_type,
                    command.name
                );
                diagnostics.skipped.push(SkippedItem {
                    directive: format!("{} {}", command.action, command.object_type),
                    reason: match kind {
                        CommandKind::BindMonitor => "Monitor binding".to_string(),
                        CommandKind::Set => "set commands are not modeled".to_string(),
                        _ => "Unsupported command".to_string(),
                    },
                    source_location: Some(location),
                });
            }
        }

        Ok(state.into_config())
    }

    /// Parse a readable stream line by line
    pub fn parse_reader<R: BufRead>(
        reader: R,
        file: &Path,
    ) -> Result<ParseOutput, ParseError> {
        let mut diagnostics = Diagnostics::default();
        let config = Self::parse_lines(reader.lines(), file, &mut diagnostics)?;
        Ok(ParseOutput {
            config,
            diagnostics,
        })
    }
}

impl Default for NetScalerParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for NetScalerParser {
    fn format(&self) -> SourceFormat {
        SourceFormat::NetScaler
    }

    fn parse(&self, ctx: &ParseContext) -> Result<ParseOutput, ParseError> {
        let mut diagnostics = Diagnostics::default();
        let config = Self::parse_lines(
            ctx.content.lines().map(Ok::<_, io::Error>),
            &ctx.path,
            &mut diagnostics,
        )?;

        tracing::info!(
            servers = config.servers.len(),
            virtual_servers = config.virtual_servers.len(),
            service_groups = config.service_group_definitions.len(),
            members = config.service_group_bindings.len(),
            vserver_bindings = config.virtual_server_bindings.len(),
            skipped = diagnostics.skipped.len(),
            "parsed NetScaler configuration"
        );

        Ok(ParseOutput {
            config,
            diagnostics,
        })
    }

    fn signatures(&self) -> &[FormatSignature] {
        &[
            FormatSignature {
                pattern: r"^add server ",
                weight: 5,
                description: "NetScaler add server command",
            },
            FormatSignature {
                pattern: r"^add lb vserver ",
                weight: 5,
                description: "NetScaler add lb vserver command",
            },
            FormatSignature {
                pattern: r"^add serviceGroup ",
                weight: 5,
                description: "NetScaler add serviceGroup command",
            },
            FormatSignature {
                pattern: r"^bind serviceGroup ",
                weight: 5,
                description: "NetScaler bind serviceGroup command",
            },
            FormatSignature {
                pattern: r"^bind lb vserver ",
                weight: 5,
                description: "NetScaler bind lb vserver command",
            },
            FormatSignature {
                pattern: r"^set (.* )?v?server ",
                weight: 3,
                description: "NetScaler set command on a server or vserver",
            },
        ]
    }
}
