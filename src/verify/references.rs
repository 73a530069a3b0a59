//! Cross-reference checks over a parsed configuration

use crate::ir::LoadBalancerConfig;
use std::collections::HashSet;
use std::fmt;

/// A dangling or duplicated reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceIssue {
    DuplicateServer { name: String },
    UndefinedGroup { group: String },
    UndefinedServer { group: String, server: String },
    UnknownVirtualServer { vserver: String },
    UndefinedService { vserver: String, service: String },
}

impl fmt::Display for ReferenceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateServer { name } => {
                write!(f, "server `{}` is declared more than once", name)
            }
            Self::UndefinedGroup { group } => write!(
                f,
                "service group `{}` has members but no definition or virtual server",
                group
            ),
            Self::UndefinedServer { group, server } => write!(
                f,
                "service group `{}` binds undefined server `{}`",
                group, server
            ),
            Self::UnknownVirtualServer { vserver } => {
                write!(f, "binding targets unknown virtual server `{}`", vserver)
            }
            Self::UndefinedService { vserver, service } => write!(
                f,
                "virtual server `{}` binds undefined service `{}`",
                vserver, service
            ),
        }
    }
}

/// Collect every reference issue, in configuration order
pub fn check_references(config: &LoadBalancerConfig) -> Vec<ReferenceIssue> {
    let mut issues = Vec::new();

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for server in &config.servers {
        if !seen.insert(server.name.as_str()) && reported.insert(server.name.as_str()) {
            issues.push(ReferenceIssue::DuplicateServer {
                name: server.name.clone(),
            });
        }
    }

    let mut groups_reported = HashSet::new();
    for binding in &config.service_group_bindings {
        let group = binding.group_name.as_str();
        if config.definition(group).is_none()
            && config.virtual_server(group).is_none()
            && groups_reported.insert(group)
        {
            issues.push(ReferenceIssue::UndefinedGroup {
                group: group.to_string(),
            });
        }
        if config.server(&binding.server_name).is_none() {
            issues.push(ReferenceIssue::UndefinedServer {
                group: group.to_string(),
                server: binding.server_name.clone(),
            });
        }
    }

    for binding in &config.virtual_server_bindings {
        if config.virtual_server(&binding.vserver_name).is_none() {
            issues.push(ReferenceIssue::UnknownVirtualServer {
                vserver: binding.vserver_name.clone(),
            });
        }
        if !binding.is_policy_only()
            && config.definition(&binding.service_name).is_none()
            && config.bindings_for(&binding.service_name).next().is_none()
        {
            issues.push(ReferenceIssue::UndefinedService {
                vserver: binding.vserver_name.clone(),
                service: binding.service_name.clone(),
            });
        }
    }

    issues
}
