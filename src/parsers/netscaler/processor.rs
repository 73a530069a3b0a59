//! Folds parsed commands into the load-balancer model

use super::command::Command;
use super::lexer::Action;
use crate::ir::{
    LoadBalancerConfig, ServerInfo, ServiceGroupBinding, ServiceGroupDefinition,
    VirtualServerBinding, VirtualServerInfo,
};
use thiserror::Error;

/// A recognised command missing the arguments its object needs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("add server command requires IP address argument")]
    MissingServerAddress { name: String },

    #[error("add lb vserver command requires protocol, IP, and port arguments")]
    MissingVirtualServerArguments { name: String },

    #[error("bind serviceGroup command requires server name and port arguments")]
    MissingMemberArguments { group: String },
}

/// What a command means for the model, from its action and normalized object type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    AddServer,
    AddVirtualServer,
    AddServiceGroup,
    BindServiceGroupMember,
    /// `bind serviceGroup ... -monitorName`: health check, not a member
    BindMonitor,
    BindVirtualServer,
    /// `set` modifies existing objects and is not modeled
    Set,
    /// Any other action or object type
    Unmodeled,
}

impl CommandKind {
    pub fn of(command: &Command) -> Self {
        let object_type = command.normalized_object_type();
        match (command.action, object_type.as_str()) {
            (Action::Add, "server") => Self::AddServer,
            (Action::Add, "lbvserver") => Self::AddVirtualServer,
            (Action::Add, "servicegroup") => Self::AddServiceGroup,
            (Action::Bind, "servicegroup") if command.has_parameter("-monitorName") => {
                Self::BindMonitor
            }
            (Action::Bind, "servicegroup") => Self::BindServiceGroupMember,
            (Action::Bind, "lbvserver") => Self::BindVirtualServer,
            (Action::Set, _) => Self::Set,
            _ => Self::Unmodeled,
        }
    }

    /// Whether applying this kind appends to one of the collections
    pub fn is_recorded(&self) -> bool {
        !matches!(self, Self::BindMonitor | Self::Set | Self::Unmodeled)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::AddServer => "server",
            Self::AddVirtualServer => "virtual server",
            Self::AddServiceGroup => "service group",
            Self::BindServiceGroupMember => "service group member",
            Self::BindMonitor => "monitor binding",
            Self::BindVirtualServer => "virtual server binding",
            Self::Set => "set command",
            Self::Unmodeled => "unmodeled command",
        }
    }
}

/// Accumulated parse output, threaded through [`ParseState::apply`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseState {
    config: LoadBalancerConfig,
}

impl ParseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_config(self) -> LoadBalancerConfig {
        self.config
    }

    /// Apply one command. Unmodeled commands, `set` and monitor bindings
    /// leave the state unchanged; a command missing required arguments
    /// is an error and appends nothing.
    pub fn apply(self, command: &Command) -> Result<Self, SemanticError> {
        match CommandKind::of(command) {
            CommandKind::AddServer => self.add_server(command),
            CommandKind::AddVirtualServer => self.add_virtual_server(command),
            CommandKind::AddServiceGroup => Ok(self.add_service_group(command)),
            CommandKind::BindServiceGroupMember => self.bind_service_group(command),
            CommandKind::BindVirtualServer => Ok(self.bind_virtual_server(command)),
            CommandKind::BindMonitor | CommandKind::Set | CommandKind::Unmodeled => Ok(self),
        }
    }

    fn add_server(mut self, command: &Command) -> Result<Self, SemanticError> {
        let address = command
            .argument(0)
            .ok_or_else(|| SemanticError::MissingServerAddress {
                name: command.name.clone(),
            })?;

        self.config.servers.push(ServerInfo {
            name: command.name.clone(),
            address: address.to_string(),
            comment: command.parameter_or_default("-comment"),
        });

        Ok(self)
    }

    fn add_virtual_server(mut self, command: &Command) -> Result<Self, SemanticError> {
        let [protocol, address, port] = match command.arguments.as_slice() {
            [protocol, address, port, ..] => [protocol, address, port],
            _ => {
                return Err(SemanticError::MissingVirtualServerArguments {
                    name: command.name.clone(),
                })
            }
        };

        self.config.virtual_servers.push(VirtualServerInfo {
            name: command.name.clone(),
            protocol: protocol.clone(),
            address: address.clone(),
            port: port.clone(),
        });

        Ok(self)
    }

    fn add_service_group(mut self, command: &Command) -> Self {
        self.config
            .service_group_definitions
            .push(ServiceGroupDefinition {
                name: command.name.clone(),
                protocol: command.argument(0).unwrap_or_default().to_string(),
                comment: command.parameter_or_default("-comment"),
            });

        self
    }

    fn bind_service_group(mut self, command: &Command) -> Result<Self, SemanticError> {
        let (server, port) = match command.arguments.as_slice() {
            [server, port, ..] => (server, port),
            _ => {
                return Err(SemanticError::MissingMemberArguments {
                    group: command.name.clone(),
                })
            }
        };

        let disabled = command
            .parameter("-state")
            .is_some_and(|state| state.eq_ignore_ascii_case("DISABLED"));

        self.config.service_group_bindings.push(ServiceGroupBinding {
            group_name: command.name.clone(),
            server_name: server.clone(),
            port: port.clone(),
            comment: command.parameter_or_default("-comment"),
            disabled,
            ratio: command.parameter("-weight").and_then(|w| w.parse().ok()),
            load_balancing_mode: String::new(),
        });

        Ok(self)
    }

    fn bind_virtual_server(mut self, command: &Command) -> Self {
        let service_name = command
            .argument(0)
            .filter(|arg| !arg.starts_with('-'))
            .unwrap_or_default()
            .to_string();

        self.config
            .virtual_server_bindings
            .push(VirtualServerBinding {
                vserver_name: command.name.clone(),
                service_name,
                policy_name: command.parameter_or_default("-policyName"),
                priority: command.parameter_or_default("-priority"),
                goto_expression: command.parameter_or_default("-gotoPriorityExpression"),
                binding_type: command.parameter_or_default("-type"),
                comment: command.parameter_or_default("-comment"),
            });

        self
    }
}
