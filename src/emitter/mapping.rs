//! VIP mapping document: `"address:port": "service@provider"`

use super::{quoted, EmitError, EmitterOptions};
use crate::ir::LoadBalancerConfig;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub key: String,
    pub value: String,
    pub comment: String,
}

/// One entry per virtual server, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingConfig {
    pub entries: Vec<MappingEntry>,
}

impl MappingConfig {
    pub fn generate(config: &LoadBalancerConfig, options: &EmitterOptions) -> Self {
        let entries = config
            .virtual_servers
            .iter()
            .map(|vserver| MappingEntry {
                key: format!("{}:{}", vserver.address, vserver.port),
                value: format!("{}@{}", vserver.name, options.provider),
                comment: config
                    .group_comment(&vserver.name)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect();

        Self { entries }
    }

    /// Entries ordered by key; equal keys keep declaration order
    pub fn sorted(&self) -> Vec<&MappingEntry> {
        let mut entries: Vec<&MappingEntry> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    pub fn render(&self, options: &EmitterOptions) -> Result<String, EmitError> {
        let mut out = String::new();
        self.write(&mut out, options)?;
        Ok(out)
    }

    pub fn write<W: Write>(&self, out: &mut W, options: &EmitterOptions) -> std::fmt::Result {
        for entry in self.sorted() {
            if options.include_comments && !entry.comment.is_empty() {
                writeln!(out, "# {}", entry.comment)?;
            }
            writeln!(out, "{}: {}", quoted(&entry.key), quoted(&entry.value))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ServiceGroupBinding, ServiceGroupDefinition, VirtualServerInfo};

    fn vserver(name: &str, address: &str, port: &str) -> VirtualServerInfo {
        VirtualServerInfo {
            name: name.to_string(),
            protocol: "HTTP".to_string(),
            address: address.to_string(),
            port: port.to_string(),
        }
    }

    #[test]
    fn test_generate_in_declaration_order() {
        let config = LoadBalancerConfig {
            virtual_servers: vec![
                vserver("web:443", "10.0.0.20", "443"),
                vserver("app:80", "10.0.0.10", "80"),
            ],
            ..Default::default()
        };

        let mapping = MappingConfig::generate(&config, &EmitterOptions::default());
        assert_eq!(mapping.entries[0].key, "10.0.0.20:443");
        assert_eq!(mapping.entries[0].value, "web:443@nacoscs");
        assert_eq!(mapping.entries[1].key, "10.0.0.10:80");
    }

    #[test]
    fn test_comment_sources() {
        let config = LoadBalancerConfig {
            virtual_servers: vec![
                vserver("a", "10.0.0.1", "80"),
                vserver("b", "10.0.0.2", "80"),
                vserver("c", "10.0.0.3", "80"),
            ],
            service_group_definitions: vec![ServiceGroupDefinition {
                name: "a".to_string(),
                protocol: "HTTP".to_string(),
                comment: "defined".to_string(),
            }],
            service_group_bindings: vec![
                ServiceGroupBinding {
                    group_name: "a".to_string(),
                    comment: "bound a".to_string(),
                    ..Default::default()
                },
                ServiceGroupBinding {
                    group_name: "b".to_string(),
                    comment: "bound b".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let mapping = MappingConfig::generate(&config, &EmitterOptions::default());
        let comments: Vec<&str> = mapping.entries.iter().map(|e| e.comment.as_str()).collect();
        assert_eq!(comments, vec!["defined", "bound b", ""]);
    }

    #[test]
    fn test_render_sorted_by_key() {
        let config = LoadBalancerConfig {
            virtual_servers: vec![
                vserver("web:443", "10.0.0.20", "443"),
                vserver("app:80", "10.0.0.10", "80"),
            ],
            service_group_definitions: vec![ServiceGroupDefinition {
                name: "web:443".to_string(),
                protocol: "SSL".to_string(),
                comment: "Public site".to_string(),
            }],
            ..Default::default()
        };

        let options = EmitterOptions {
            provider: "file".to_string(),
            ..Default::default()
        };
        let yaml = MappingConfig::generate(&config, &options)
            .render(&options)
            .unwrap();
        assert_eq!(
            yaml,
            "\"10.0.0.10:80\": \"app:80@file\"\n\
             # Public site\n\
             \"10.0.0.20:443\": \"web:443@file\"\n"
        );

        let parsed: serde_yaml::Mapping = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_empty_mapping_renders_nothing() {
        let mapping = MappingConfig::generate(&LoadBalancerConfig::default(), &EmitterOptions::default());
        assert_eq!(mapping.render(&EmitterOptions::default()).unwrap(), "");
    }
}
