//! F5 tmsh block extractor

use super::mapping::map_f5_to_model;
use super::{strip_partition, F5Config, F5Node, F5Pool, F5PoolMember, F5Virtual};
use crate::ir::{Diagnostics, SourceFormat, SourceLocation};
use crate::parsers::{FormatSignature, ParseContext, ParseError, ParseOutput, Parser};
use regex::Regex;
use std::path::Path;

/// F5 BIG-IP configuration parser
pub struct F5Parser;

/// Line patterns, compiled once per parse
struct Patterns {
    header: Regex,
    address: Regex,
    description: Regex,
    destination: Regex,
    pool: Regex,
    monitor: Regex,
    lb_mode: Regex,
    member: Regex,
    ratio: Regex,
    disabled: Regex,
}

impl Patterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            header: Regex::new(r"^ltm\s+(node|pool|virtual)\s+(\S+)\s*\{(.*)$")?,
            address: Regex::new(r"^address\s+([^\s{}]+)")?,
            description: Regex::new(r"^description\s+(.+)$")?,
            destination: Regex::new(r"^destination\s+(\S+?):(\d+)")?,
            pool: Regex::new(r"^pool\s+([^\s{}]+)")?,
            monitor: Regex::new(r"^monitor\s+(.+)$")?,
            lb_mode: Regex::new(r"^load-balancing-mode\s+(\S+)")?,
            member: Regex::new(r"^(\S+):(\d+)\s*\{")?,
            ratio: Regex::new(r"^ratio\s+(\d+)")?,
            disabled: Regex::new(r"^(session\s+user-disabled|state\s+user-down)\b")?,
        })
    }
}

/// The `ltm` block currently being read
enum Block {
    Node(F5Node),
    Pool(F5Pool),
    Virtual(F5Virtual),
}

impl F5Parser {
    pub fn new() -> Self {
        Self
    }

    /// Extract nodes, pools and virtuals from tmsh text.
    ///
    /// Blocks are tracked by counting braces. Attributes are only read at
    /// the nesting level where they belong, so a member's `description`
    /// never overwrites its pool's.
    pub fn parse_content(
        content: &str,
        file: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<F5Config, ParseError> {
        let patterns = Patterns::new()?;

        let mut config = F5Config::default();
        let mut current: Option<Block> = None;
        let mut depth: i64 = 0;

        for (idx, line) in content.lines().enumerate() {
            let line_number = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if depth == 0 {
                if let Some(caps) = patterns.header.captures(trimmed) {
                    let location = SourceLocation::new(file.to_path_buf(), line_number);
                    let name = strip_partition(&caps[2]).to_string();
                    let mut block = match &caps[1] {
                        "node" => Block::Node(F5Node {
                            name,
                            address: String::new(),
                            location,
                        }),
                        "pool" => Block::Pool(F5Pool {
                            name,
                            description: String::new(),
                            load_balancing_mode: String::new(),
                            monitor: String::new(),
                            members: Vec::new(),
                            location,
                        }),
                        _ => Block::Virtual(F5Virtual {
                            name,
                            description: String::new(),
                            destination: None,
                            pool: String::new(),
                            location,
                        }),
                    };

                    // Single-line blocks: `ltm node /Common/a { address 10.0.0.1 }`
                    let rest = caps[3].trim();
                    depth = 1 + brace_delta(rest);
                    if !rest.is_empty() {
                        read_attribute(&patterns, &mut block, rest, 1);
                    }

                    if depth <= 0 {
                        depth = 0;
                        finish(&mut config, block);
                    } else {
                        current = Some(block);
                    }
                } else {
                    depth = (depth + brace_delta(trimmed)).max(0);
                }
                continue;
            }

            let level = depth;
            depth += brace_delta(trimmed);

            if let Some(block) = current.as_mut() {
                read_attribute(&patterns, block, trimmed, level);
            }

            if depth <= 0 {
                depth = 0;
                if let Some(block) = current.take() {
                    finish(&mut config, block);
                }
            }
        }

        if let Some(block) = current {
            let (kind, name) = match &block {
                Block::Node(n) => ("ltm node", n.name.clone()),
                Block::Pool(p) => ("ltm pool", p.name.clone()),
                Block::Virtual(v) => ("ltm virtual", v.name.clone()),
            };
            diagnostics.warn(kind, format!("block `{}` is not closed before end of input", name));
            finish(&mut config, block);
        }

        Ok(config)
    }
}

/// Net change in nesting depth for a line
fn brace_delta(line: &str) -> i64 {
    let opens = line.matches('{').count() as i64;
    let closes = line.matches('}').count() as i64;
    opens - closes
}

fn finish(config: &mut F5Config, block: Block) {
    match block {
        Block::Node(node) => config.nodes.push(node),
        Block::Pool(pool) => config.pools.push(pool),
        Block::Virtual(virtual_server) => config.virtuals.push(virtual_server),
    }
}

/// Read one attribute line at the given nesting level (1 = block body)
fn read_attribute(patterns: &Patterns, block: &mut Block, line: &str, level: i64) {
    match block {
        Block::Node(node) => {
            if level == 1 {
                if let Some(caps) = patterns.address.captures(line) {
                    node.address = caps[1].to_string();
                }
            }
        }
        Block::Pool(pool) => match level {
            1 => {
                if let Some(caps) = patterns.description.captures(line) {
                    pool.description = unquote(&caps[1]);
                } else if let Some(caps) = patterns.lb_mode.captures(line) {
                    pool.load_balancing_mode = caps[1].to_string();
                } else if let Some(caps) = patterns.monitor.captures(line) {
                    pool.monitor = caps[1].trim().to_string();
                }
            }
            2 => {
                if let Some(caps) = patterns.member.captures(line) {
                    let mut member = F5PoolMember {
                        name: strip_partition(&caps[1]).to_string(),
                        port: caps[2].to_string(),
                        address: String::new(),
                        disabled: false,
                        ratio: None,
                    };
                    // `/Common/a:80 { address 10.0.0.1 }` on one line
                    if let Some(open) = line.find('{') {
                        let inline = line[open + 1..].trim();
                        read_member_attribute(patterns, &mut member, inline);
                    }
                    pool.members.push(member);
                }
            }
            3 => {
                if let Some(member) = pool.members.last_mut() {
                    read_member_attribute(patterns, member, line);
                }
            }
            _ => {}
        },
        Block::Virtual(virtual_server) => {
            if level != 1 {
                return;
            }
            if let Some(caps) = patterns.description.captures(line) {
                virtual_server.description = unquote(&caps[1]);
            } else if let Some(caps) = patterns.destination.captures(line) {
                virtual_server.destination = Some((
                    strip_partition(&caps[1]).to_string(),
                    caps[2].to_string(),
                ));
            } else if let Some(caps) = patterns.pool.captures(line) {
                virtual_server.pool = strip_partition(&caps[1]).to_string();
            }
        }
    }
}

fn read_member_attribute(patterns: &Patterns, member: &mut F5PoolMember, line: &str) {
    if let Some(caps) = patterns.address.captures(line) {
        member.address = caps[1].to_string();
    } else if let Some(caps) = patterns.ratio.captures(line) {
        member.ratio = caps[1].parse().ok();
    } else if patterns.disabled.is_match(line) {
        member.disabled = true;
    }
}

/// Strip one pair of surrounding double quotes
fn unquote(value: &str) -> String {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

impl Default for F5Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for F5Parser {
    fn format(&self) -> SourceFormat {
        SourceFormat::F5
    }

    fn parse(&self, ctx: &ParseContext) -> Result<ParseOutput, ParseError> {
        let mut diagnostics = Diagnostics::default();
        let f5 = Self::parse_content(&ctx.content, &ctx.path, &mut diagnostics)?;

        tracing::debug!(
            nodes = f5.nodes.len(),
            pools = f5.pools.len(),
            virtuals = f5.virtuals.len(),
            "extracted F5 blocks"
        );

        let config = map_f5_to_model(&f5, &mut diagnostics);

        tracing::info!(
            servers = config.servers.len(),
            virtual_servers = config.virtual_servers.len(),
            service_groups = config.service_group_definitions.len(),
            members = config.service_group_bindings.len(),
            "parsed F5 configuration"
        );

        Ok(ParseOutput {
            config,
            diagnostics,
        })
    }

    fn signatures(&self) -> &[FormatSignature] {
        &[
            FormatSignature {
                pattern: r"^#TMSH-VERSION",
                weight: 10,
                description: "tmsh version header",
            },
            FormatSignature {
                pattern: r"^ltm ",
                weight: 5,
                description: "F5 ltm stanza",
            },
            FormatSignature {
                pattern: r"^(apm|sys) ",
                weight: 2,
                description: "F5 apm or sys stanza",
            },
            FormatSignature {
                pattern: r"/Common/",
                weight: 1,
                description: "F5 /Common/ partition path",
            },
        ]
    }
}
