//! Output generation: Traefik file-provider services and the VIP mapping

pub mod mapping;
pub mod traefik;

pub use mapping::{MappingConfig, MappingEntry};
pub use traefik::{TraefikConfig, TraefikServer, TraefikService};

use thiserror::Error;

/// File name of the generated Traefik services document
pub const SERVICES_FILE: &str = "traefik-services.yaml";
/// File name of the generated VIP mapping document
pub const MAPPING_FILE: &str = "mapping.yaml";

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("formatting failed: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Options for document generation
#[derive(Debug, Clone)]
pub struct EmitterOptions {
    /// Write `# comment` lines for services, servers and mapping entries
    pub include_comments: bool,
    /// Traefik provider suffix appended to mapping values (`name@provider`)
    pub provider: String,
    /// URL scheme for backend servers
    pub scheme: String,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            include_comments: true,
            provider: "nacoscs".to_string(),
            scheme: "http".to_string(),
        }
    }
}

/// Render a YAML key or value, double-quoting it only when a plain scalar
/// would be misread or would resolve to something other than a string.
pub(crate) fn yaml_scalar(value: &str) -> std::borrow::Cow<'_, str> {
    const INDICATORS: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%',
        '@', '`',
    ];

    let needs_quotes = value.is_empty()
        || value.starts_with(INDICATORS)
        || value.ends_with(':')
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.contains(": ")
        || value.contains(" #")
        || value.contains(&['\n', '\r', '\t'][..])
        || resolves_to_non_string(value);

    if needs_quotes {
        std::borrow::Cow::Owned(quoted(value))
    } else {
        std::borrow::Cow::Borrowed(value)
    }
}

/// Whether a plain scalar resolves to null, bool, int or float under the
/// YAML 1.2 core or YAML 1.1 schemas
fn resolves_to_non_string(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    if matches!(
        lower.as_str(),
        "~" | "null" | "true" | "false" | "y" | "n" | "yes" | "no" | "on" | "off"
    ) {
        return true;
    }

    let unsigned = lower.strip_prefix(&['+', '-'][..]).unwrap_or(lower.as_str());
    if matches!(unsigned, ".inf" | ".nan") {
        return true;
    }

    let radix_digits = [("0x", 16), ("0o", 8), ("0b", 2)]
        .iter()
        .find_map(|(prefix, radix)| unsigned.strip_prefix(*prefix).map(|rest| (rest, *radix)));
    if let Some((digits, radix)) = radix_digits {
        return !digits.is_empty() && digits.chars().all(|c| c == '_' || c.is_digit(radix));
    }

    // Decimal int or float, underscores allowed as in YAML 1.1
    let compact = unsigned.replace('_', "");
    if compact.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && compact.parse::<f64>().is_ok()
    {
        return true;
    }

    is_sexagesimal(unsigned)
}

/// YAML 1.1 base-60 numbers such as `1:30` or `1:30.5`
fn is_sexagesimal(value: &str) -> bool {
    let parts: Vec<&str> = value.split(':').collect();
    let Some((last, leading)) = parts.split_last() else {
        return false;
    };
    let is_digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit() || c == '_');

    !leading.is_empty()
        && leading.iter().all(|part| is_digits(*part))
        && match last.split_once('.') {
            Some((whole, fraction)) => is_digits(whole) && fraction.chars().all(|c| c.is_ascii_digit() || c == '_'),
            None => is_digits(*last),
        }
}

/// Double-quoted YAML scalar
pub(crate) fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_stay_plain() {
        assert_eq!(yaml_scalar("app:80"), "app:80");
        assert_eq!(yaml_scalar("svc_web-01"), "svc_web-01");
        assert_eq!(yaml_scalar("10.0.0.1:443"), "10.0.0.1:443");
    }

    #[test]
    fn test_ambiguous_names_are_quoted() {
        assert_eq!(yaml_scalar(""), "\"\"");
        assert_eq!(yaml_scalar("-dash"), "\"-dash\"");
        assert_eq!(yaml_scalar("ends:"), "\"ends:\"");
        assert_eq!(yaml_scalar("a: b"), "\"a: b\"");
        assert_eq!(yaml_scalar("my app"), "my app");
        assert_eq!(yaml_scalar("say \"hi\" #now"), "\"say \\\"hi\\\" #now\"");
        assert_eq!(yaml_scalar("8080"), "\"8080\"");
        assert_eq!(yaml_scalar("true"), "\"true\"");
        assert_eq!(yaml_scalar("null"), "\"null\"");
        assert_eq!(yaml_scalar("~"), "\"~\"");
        assert_eq!(yaml_scalar("1.5"), "\"1.5\"");
        assert_eq!(yaml_scalar("yes"), "\"yes\"");
        assert_eq!(yaml_scalar("OFF"), "\"OFF\"");
        assert_eq!(yaml_scalar("0x1F"), "\"0x1F\"");
        assert_eq!(yaml_scalar("1_000"), "\"1_000\"");
        assert_eq!(yaml_scalar("1:30"), "\"1:30\"");
    }

    #[test]
    fn test_near_miss_names_stay_plain() {
        assert_eq!(yaml_scalar("nullable"), "nullable");
        assert_eq!(yaml_scalar("yes-pool"), "yes-pool");
        assert_eq!(yaml_scalar("8080a"), "8080a");
        assert_eq!(yaml_scalar("0xZZ"), "0xZZ");
        assert_eq!(yaml_scalar("10.0.0.1"), "10.0.0.1");
        assert_eq!(yaml_scalar("1:30:x"), "1:30:x");
    }
}
