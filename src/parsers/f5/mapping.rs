//! F5 objects to load-balancer model mapping
//!
//! Each virtual server becomes its own service group, named after the
//! virtual, whose members are the referenced pool's members.

use super::{F5Config, F5Pool, F5PoolMember};
use crate::ir::*;
use std::collections::HashMap;
use std::net::IpAddr;

const NODE_COMMENT: &str = "F5 Node";
const AUTO_SERVER_COMMENT: &str = "Auto-generated from F5 pool member";
const NO_POOL_COMMENT: &str = "F5 Virtual Server without pool";
const DEFAULT_PROTOCOL: &str = "HTTP";

/// Convert extracted F5 objects into the shared model
pub fn map_f5_to_model(f5: &F5Config, diagnostics: &mut Diagnostics) -> LoadBalancerConfig {
    let mut config = LoadBalancerConfig::default();
    let mut servers = ServerIndex::default();

    for node in &f5.nodes {
        if node.address.is_empty() {
            diagnostics.skipped.push(SkippedItem {
                directive: "ltm node".to_string(),
                reason: format!("node `{}` has no address", node.name),
                source_location: Some(node.location.clone()),
            });
            continue;
        }
        servers.insert_node(&mut config, &node.name, &node.address);
        diagnostics.converted.push(ConvertedItem {
            item_type: "server".to_string(),
            name: node.name.clone(),
            source_location: Some(node.location.clone()),
        });
    }

    for virtual_server in &f5.virtuals {
        let Some((address, port)) = &virtual_server.destination else {
            diagnostics.skipped.push(SkippedItem {
                directive: "ltm virtual".to_string(),
                reason: format!("virtual `{}` has no destination", virtual_server.name),
                source_location: Some(virtual_server.location.clone()),
            });
            continue;
        };

        let name = virtual_server.name.clone();
        config.virtual_servers.push(VirtualServerInfo {
            name: name.clone(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            address: address.clone(),
            port: port.clone(),
        });
        diagnostics.converted.push(ConvertedItem {
            item_type: "virtual server".to_string(),
            name: name.clone(),
            source_location: Some(virtual_server.location.clone()),
        });

        if virtual_server.pool.is_empty() {
            diagnostics.warnings.push(ConversionWarning {
                severity: Severity::Info,
                source_location: Some(virtual_server.location.clone()),
                source_directive: "ltm virtual".to_string(),
                message: format!("virtual `{}` has no pool; it is mapped without a Traefik service", name),
                suggestion: None,
            });
            config.service_group_definitions.push(ServiceGroupDefinition {
                name,
                protocol: DEFAULT_PROTOCOL.to_string(),
                comment: NO_POOL_COMMENT.to_string(),
            });
            continue;
        }

        let Some(pool) = f5.pool(&virtual_server.pool) else {
            diagnostics.warnings.push(ConversionWarning {
                severity: Severity::Warning,
                source_location: Some(virtual_server.location.clone()),
                source_directive: "ltm virtual".to_string(),
                message: format!(
                    "virtual `{}` references undefined pool `{}`",
                    name, virtual_server.pool
                ),
                suggestion: None,
            });
            continue;
        };

        config.service_group_definitions.push(ServiceGroupDefinition {
            name: name.clone(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            comment: pool.description.clone(),
        });

        for member in &pool.members {
            match servers.resolve(&mut config, member) {
                Some(server_name) => {
                    config.service_group_bindings.push(member_binding(&name, server_name, member, pool))
                }
                None => diagnostics.warnings.push(ConversionWarning {
                    severity: Severity::Warning,
                    source_location: Some(pool.location.clone()),
                    source_directive: "ltm pool".to_string(),
                    message: format!(
                        "member `{}:{}` of pool `{}` has no resolvable address",
                        member.name, member.port, pool.name
                    ),
                    suggestion: Some(format!("declare `ltm node /Common/{}`", member.name)),
                }),
            }
        }

        config.virtual_server_bindings.push(VirtualServerBinding {
            vserver_name: name.clone(),
            service_name: name,
            comment: virtual_server.description.clone(),
            ..Default::default()
        });
    }

    config
}

fn member_binding(
    group: &str,
    server_name: String,
    member: &F5PoolMember,
    pool: &F5Pool,
) -> ServiceGroupBinding {
    ServiceGroupBinding {
        group_name: group.to_string(),
        server_name,
        port: member.port.clone(),
        comment: pool.description.clone(),
        disabled: member.disabled,
        ratio: member.ratio,
        load_balancing_mode: pool.load_balancing_mode.clone(),
    }
}

/// Server names by node name and by address
#[derive(Default)]
struct ServerIndex {
    by_name: HashMap<String, String>,
    by_address: HashMap<String, String>,
}

impl ServerIndex {
    fn insert_node(&mut self, config: &mut LoadBalancerConfig, name: &str, address: &str) {
        config.servers.push(ServerInfo {
            name: name.to_string(),
            address: address.to_string(),
            comment: NODE_COMMENT.to_string(),
        });
        self.by_name.insert(name.to_string(), name.to_string());
        self.by_address
            .entry(address.to_string())
            .or_insert_with(|| name.to_string());
    }

    /// Server name for a pool member: a node of that name, else a node at
    /// the member's address, else a new server named by its address.
    fn resolve(&mut self, config: &mut LoadBalancerConfig, member: &F5PoolMember) -> Option<String> {
        if let Some(name) = self.by_name.get(&member.name) {
            return Some(name.clone());
        }

        let address = if !member.address.is_empty() {
            member.address.as_str()
        } else if member.name.parse::<IpAddr>().is_ok() {
            member.name.as_str()
        } else {
            return None;
        };

        if let Some(name) = self.by_address.get(address) {
            return Some(name.clone());
        }

        config.servers.push(ServerInfo {
            name: address.to_string(),
            address: address.to_string(),
            comment: AUTO_SERVER_COMMENT.to_string(),
        });
        self.by_name.insert(address.to_string(), address.to_string());
        self.by_address.insert(address.to_string(), address.to_string());
        Some(address.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::f5::F5Parser;
    use std::path::Path;

    fn map(content: &str) -> (LoadBalancerConfig, Diagnostics) {
        let mut diagnostics = Diagnostics::default();
        let f5 = F5Parser::parse_content(content, Path::new("bigip.conf"), &mut diagnostics).unwrap();
        let config = map_f5_to_model(&f5, &mut diagnostics);
        (config, diagnostics)
    }

    #[test]
    fn test_virtual_with_pool() {
        let (config, _) = map(
            "ltm node /Common/web01 {\n    address 10.0.1.10\n}\n\
             ltm pool /Common/pool_web {\n    description Web tier\n    members {\n        /Common/10.0.1.10:8080 {\n            address 10.0.1.10\n        }\n        /Common/10.0.1.20:8080 {\n            address 10.0.1.20\n        }\n    }\n}\n\
             ltm virtual /Common/vs_web {\n    description Public web\n    destination /Common/10.0.0.100:443\n    pool /Common/pool_web\n}\n",
        );

        assert_eq!(
            config.servers,
            vec![
                ServerInfo {
                    name: "web01".to_string(),
                    address: "10.0.1.10".to_string(),
                    comment: "F5 Node".to_string(),
                },
                ServerInfo {
                    name: "10.0.1.20".to_string(),
                    address: "10.0.1.20".to_string(),
                    comment: "Auto-generated from F5 pool member".to_string(),
                },
            ]
        );
        assert_eq!(
            config.virtual_servers,
            vec![VirtualServerInfo {
                name: "vs_web".to_string(),
                protocol: "HTTP".to_string(),
                address: "10.0.0.100".to_string(),
                port: "443".to_string(),
            }]
        );
        assert_eq!(config.service_group_definitions[0].name, "vs_web");
        assert_eq!(config.service_group_definitions[0].comment, "Web tier");

        let servers: Vec<&str> = config
            .service_group_bindings
            .iter()
            .map(|b| b.server_name.as_str())
            .collect();
        assert_eq!(servers, vec!["web01", "10.0.1.20"]);
        assert!(config.service_group_bindings.iter().all(|b| b.group_name == "vs_web"));

        assert_eq!(config.virtual_server_bindings.len(), 1);
        assert_eq!(config.virtual_server_bindings[0].service_name, "vs_web");
        assert_eq!(config.virtual_server_bindings[0].comment, "Public web");
    }

    #[test]
    fn test_member_named_after_node() {
        let (config, _) = map(
            "ltm node /Common/app01 {\n    address 10.0.2.1\n}\n\
             ltm pool /Common/p {\n    members {\n        /Common/app01:80 {\n        }\n    }\n}\n\
             ltm virtual /Common/vs {\n    destination /Common/10.0.0.1:80\n    pool /Common/p\n}\n",
        );
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.service_group_bindings[0].server_name, "app01");
    }

    #[test]
    fn test_virtual_without_pool() {
        let (config, diagnostics) = map("ltm virtual /Common/vs_redirect {\n    destination /Common/10.0.0.1:80\n}\n");
        assert_eq!(config.virtual_servers.len(), 1);
        assert_eq!(diagnostics.warnings.len(), 1);
        assert_eq!(diagnostics.warnings[0].severity, Severity::Info);
        assert_eq!(
            config.service_group_definitions[0].comment,
            "F5 Virtual Server without pool"
        );
        assert!(config.service_group_bindings.is_empty());
        assert!(config.virtual_server_bindings.is_empty());
    }

    #[test]
    fn test_virtual_without_destination_is_skipped() {
        let (config, diagnostics) = map("ltm virtual /Common/vs_internal {\n    pool /Common/p\n}\n");
        assert!(config.virtual_servers.is_empty());
        assert_eq!(diagnostics.skipped.len(), 1);
    }

    #[test]
    fn test_undefined_pool_warns() {
        let (config, diagnostics) = map(
            "ltm virtual /Common/vs {\n    destination /Common/10.0.0.1:80\n    pool /Common/missing\n}\n",
        );
        assert_eq!(config.virtual_servers.len(), 1);
        assert!(config.service_group_definitions.is_empty());
        assert_eq!(diagnostics.warnings.len(), 1);
        assert!(diagnostics.warnings[0].message.contains("missing"));
    }

    #[test]
    fn test_unresolvable_member_warns() {
        let (config, diagnostics) = map(
            "ltm pool /Common/p {\n    members {\n        /Common/ghost:80 {\n        }\n    }\n}\n\
             ltm virtual /Common/vs {\n    destination /Common/10.0.0.1:80\n    pool /Common/p\n}\n",
        );
        assert!(config.service_group_bindings.is_empty());
        assert_eq!(diagnostics.warnings.len(), 1);
    }

    #[test]
    fn test_pool_settings_carried_to_bindings() {
        let (config, _) = map(
            "ltm pool /Common/p {\n    load-balancing-mode ratio-member\n    members {\n        /Common/10.0.3.1:80 {\n            ratio 5\n            state user-down\n        }\n    }\n}\n\
             ltm virtual /Common/vs {\n    destination /Common/10.0.0.1:80\n    pool /Common/p\n}\n",
        );
        let binding = &config.service_group_bindings[0];
        assert_eq!(binding.load_balancing_mode, "ratio-member");
        assert_eq!(binding.ratio, Some(5));
        assert!(binding.disabled);
    }
}
