//! Load-balancer domain objects

use serde::{Deserialize, Serialize};

/// A backend server declared with `add server <name> <address>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub address: String,
    pub comment: String,
}

/// A virtual server declared with `add lb vserver <name> <protocol> <address> <port>`
///
/// The port is kept as written in the source so that generated keys
/// reproduce the original formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualServerInfo {
    pub name: String,
    pub protocol: String,
    pub address: String,
    pub port: String,
}

/// Declaration of a service group, independent of its members
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceGroupDefinition {
    pub name: String,
    pub protocol: String,
    pub comment: String,
}

/// One `server:port` member of a service group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceGroupBinding {
    pub group_name: String,
    pub server_name: String,
    pub port: String,
    pub comment: String,
    /// Member bound with `-state DISABLED`
    pub disabled: bool,
    /// Member weight from `-weight`
    pub ratio: Option<u32>,
    pub load_balancing_mode: String,
}

/// A `bind lb vserver` line: a service reference, a policy, or both
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualServerBinding {
    pub vserver_name: String,
    /// Empty for policy-only bindings
    pub service_name: String,
    pub policy_name: String,
    pub priority: String,
    pub goto_expression: String,
    pub binding_type: String,
    pub comment: String,
}

impl VirtualServerBinding {
    pub fn is_policy_only(&self) -> bool {
        self.service_name.is_empty()
    }
}

/// The five collections produced by a parse run, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerConfig {
    pub servers: Vec<ServerInfo>,
    pub virtual_servers: Vec<VirtualServerInfo>,
    pub service_group_definitions: Vec<ServiceGroupDefinition>,
    pub service_group_bindings: Vec<ServiceGroupBinding>,
    pub virtual_server_bindings: Vec<VirtualServerBinding>,
}

impl LoadBalancerConfig {
    /// Find a server by name (first declaration wins)
    pub fn server(&self, name: &str) -> Option<&ServerInfo> {
        self.servers.iter().find(|s| s.name == name)
    }

    /// Find a virtual server by name
    pub fn virtual_server(&self, name: &str) -> Option<&VirtualServerInfo> {
        self.virtual_servers.iter().find(|v| v.name == name)
    }

    /// Find a service group definition by name
    pub fn definition(&self, name: &str) -> Option<&ServiceGroupDefinition> {
        self.service_group_definitions.iter().find(|d| d.name == name)
    }

    /// All member bindings of a service group, in insertion order
    pub fn bindings_for<'a>(
        &'a self,
        group: &'a str,
    ) -> impl Iterator<Item = &'a ServiceGroupBinding> + 'a {
        self.service_group_bindings
            .iter()
            .filter(move |b| b.group_name == group)
    }

    /// Comment for a service group: the definition comment takes priority
    /// over the first non-empty binding comment.
    pub fn group_comment(&self, group: &str) -> Option<&str> {
        self.definition(group)
            .map(|d| d.comment.as_str())
            .filter(|c| !c.is_empty())
            .or_else(|| {
                self.service_group_bindings
                    .iter()
                    .filter(|b| b.group_name == group && !b.comment.is_empty())
                    .map(|b| b.comment.as_str())
                    .next()
            })
    }

    /// Check if nothing was parsed
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
            && self.virtual_servers.is_empty()
            && self.service_group_definitions.is_empty()
            && self.service_group_bindings.is_empty()
            && self.virtual_server_bindings.is_empty()
    }
}
