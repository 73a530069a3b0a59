//! Traefik file-provider services document

use super::{yaml_scalar, EmitError, EmitterOptions};
use crate::ir::{Diagnostics, LoadBalancerConfig};
use std::collections::BTreeMap;
use std::fmt::Write;

/// `http.services`, keyed and therefore ordered by service name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraefikConfig {
    pub services: BTreeMap<String, TraefikService>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraefikService {
    pub comment: String,
    pub load_balancing_mode: String,
    /// Sorted by URL
    pub servers: Vec<TraefikServer>,
}

impl TraefikService {
    pub fn active_servers(&self) -> impl Iterator<Item = &TraefikServer> {
        self.servers.iter().filter(|s| !s.disabled)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraefikServer {
    pub url: String,
    pub comment: String,
    pub weight: Option<u32>,
    pub disabled: bool,
}

impl TraefikConfig {
    /// Build one service per service group with at least one active member.
    ///
    /// Members whose server was never declared are dropped with a warning.
    pub fn generate(
        config: &LoadBalancerConfig,
        options: &EmitterOptions,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut groups: BTreeMap<&str, TraefikService> = BTreeMap::new();

        for binding in &config.service_group_bindings {
            let service = groups.entry(binding.group_name.as_str()).or_default();

            let Some(server) = config.server(&binding.server_name) else {
                tracing::warn!(
                    group = %binding.group_name,
                    server = %binding.server_name,
                    "service group member references an undefined server"
                );
                diagnostics.warn(
                    "service group member",
                    format!(
                        "server `{}` bound to `{}` is not defined; member dropped",
                        binding.server_name, binding.group_name
                    ),
                );
                continue;
            };

            if service.comment.is_empty() && !binding.comment.is_empty() {
                service.comment = binding.comment.clone();
            }
            if service.load_balancing_mode.is_empty() {
                service.load_balancing_mode = binding.load_balancing_mode.clone();
            }

            service.servers.push(TraefikServer {
                url: format!("{}://{}:{}", options.scheme, server.address, binding.port),
                comment: server.comment.clone(),
                weight: binding.ratio,
                disabled: binding.disabled,
            });
        }

        let mut services = BTreeMap::new();
        for (name, mut service) in groups {
            if service.active_servers().next().is_none() {
                if !service.servers.is_empty() {
                    diagnostics.warn(
                        "service group",
                        format!("every member of `{}` is disabled; service omitted", name),
                    );
                }
                continue;
            }

            // A definition comment outranks member comments
            if let Some(definition) = config.definition(name) {
                if !definition.comment.is_empty() {
                    service.comment = definition.comment.clone();
                }
            }

            service.servers.sort_by(|a, b| a.url.cmp(&b.url));
            services.insert(name.to_string(), service);
        }

        tracing::debug!(services = services.len(), "generated Traefik services");

        Self { services }
    }

    /// Render the document
    pub fn render(&self, options: &EmitterOptions) -> Result<String, EmitError> {
        let mut out = String::new();
        self.write(&mut out, options)?;
        Ok(out)
    }

    /// Write the document to any formatter sink
    pub fn write<W: Write>(&self, out: &mut W, options: &EmitterOptions) -> std::fmt::Result {
        writeln!(out, "http:")?;
        writeln!(out, "  services:")?;

        for (name, service) in &self.services {
            if options.include_comments {
                if !service.comment.is_empty() {
                    writeln!(out, "    # {}", service.comment)?;
                }
                if !service.load_balancing_mode.is_empty() {
                    writeln!(out, "    # load balancing: {}", service.load_balancing_mode)?;
                }
            }

            writeln!(out, "    {}:", yaml_scalar(name))?;
            writeln!(out, "      loadBalancer:")?;
            writeln!(out, "        servers:")?;

            for server in &service.servers {
                if options.include_comments && !server.comment.is_empty() {
                    writeln!(out, "          # {}", server.comment)?;
                }
                if server.disabled {
                    if options.include_comments {
                        writeln!(out, "          # disabled: - url: {}", server.url)?;
                    }
                    continue;
                }
                writeln!(out, "          - url: {}", server.url)?;
                if let Some(weight) = server.weight {
                    writeln!(out, "            weight: {}", weight)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ServerInfo, ServiceGroupBinding, ServiceGroupDefinition};

    fn server(name: &str, address: &str, comment: &str) -> ServerInfo {
        ServerInfo {
            name: name.to_string(),
            address: address.to_string(),
            comment: comment.to_string(),
        }
    }

    fn member(group: &str, server: &str, port: &str, comment: &str) -> ServiceGroupBinding {
        ServiceGroupBinding {
            group_name: group.to_string(),
            server_name: server.to_string(),
            port: port.to_string(),
            comment: comment.to_string(),
            ..Default::default()
        }
    }

    fn generate(config: &LoadBalancerConfig) -> (TraefikConfig, Diagnostics) {
        let mut diagnostics = Diagnostics::default();
        let traefik = TraefikConfig::generate(config, &EmitterOptions::default(), &mut diagnostics);
        (traefik, diagnostics)
    }

    #[test]
    fn test_urls_and_sorting() {
        let config = LoadBalancerConfig {
            servers: vec![
                server("web02", "10.0.0.2", ""),
                server("web01", "10.0.0.1", "primary"),
            ],
            service_group_bindings: vec![
                member("zeta", "web02", "8080", ""),
                member("alpha", "web02", "80", ""),
                member("alpha", "web01", "80", ""),
            ],
            ..Default::default()
        };

        let (traefik, diagnostics) = generate(&config);
        assert!(diagnostics.warnings.is_empty());

        let names: Vec<&str> = traefik.services.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        let urls: Vec<&str> = traefik.services["alpha"]
            .servers
            .iter()
            .map(|s| s.url.as_str())
            .collect();
        assert_eq!(urls, vec!["http://10.0.0.1:80", "http://10.0.0.2:80"]);
        assert_eq!(traefik.services["alpha"].servers[0].comment, "primary");
    }

    #[test]
    fn test_undefined_server_dropped_with_warning() {
        let config = LoadBalancerConfig {
            servers: vec![server("web01", "10.0.0.1", "")],
            service_group_bindings: vec![
                member("app", "ghost", "80", ""),
                member("orphan", "ghost", "80", ""),
                member("app", "web01", "80", ""),
            ],
            ..Default::default()
        };

        let (traefik, diagnostics) = generate(&config);
        assert_eq!(traefik.services.len(), 1);
        assert_eq!(traefik.services["app"].servers.len(), 1);
        assert_eq!(diagnostics.warnings.len(), 2);
    }

    #[test]
    fn test_comment_precedence() {
        let config = LoadBalancerConfig {
            servers: vec![server("web01", "10.0.0.1", "")],
            service_group_definitions: vec![ServiceGroupDefinition {
                name: "defined".to_string(),
                protocol: "HTTP".to_string(),
                comment: "from definition".to_string(),
            }],
            service_group_bindings: vec![
                member("defined", "web01", "80", "from member"),
                member("bound", "ghost", "80", "unresolved member"),
                member("bound", "web01", "80", ""),
                member("bound", "web01", "81", "from member"),
            ],
            ..Default::default()
        };

        let (traefik, _) = generate(&config);
        assert_eq!(traefik.services["defined"].comment, "from definition");
        assert_eq!(traefik.services["bound"].comment, "from member");
    }

    #[test]
    fn test_render() {
        let config = LoadBalancerConfig {
            servers: vec![
                server("web01", "10.0.0.1", "Web server 1"),
                server("web02", "10.0.0.2", ""),
            ],
            service_group_bindings: vec![
                member("app:80", "web02", "80", "Application tier"),
                member("app:80", "web01", "80", ""),
            ],
            ..Default::default()
        };

        let (traefik, _) = generate(&config);
        let yaml = traefik.render(&EmitterOptions::default()).unwrap();
        assert_eq!(
            yaml,
            "http:\n\
             \x20 services:\n\
             \x20   # Application tier\n\
             \x20   app:80:\n\
             \x20     loadBalancer:\n\
             \x20       servers:\n\
             \x20         # Web server 1\n\
             \x20         - url: http://10.0.0.1:80\n\
             \x20         - url: http://10.0.0.2:80\n"
        );

        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(
            parsed["http"]["services"]["app:80"]["loadBalancer"]["servers"][1]["url"],
            serde_yaml::Value::String("http://10.0.0.2:80".to_string())
        );
    }

    #[test]
    fn test_reserved_group_names_stay_strings() {
        let config = LoadBalancerConfig {
            servers: vec![server("web01", "10.0.0.1", "")],
            service_group_bindings: vec![
                member("8080", "web01", "80", ""),
                member("true", "web01", "81", ""),
                member("null", "web01", "82", ""),
            ],
            ..Default::default()
        };

        let (traefik, _) = generate(&config);
        let yaml = traefik.render(&EmitterOptions::default()).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        let services = parsed["http"]["services"].as_mapping().unwrap();

        let keys: Vec<&serde_yaml::Value> = services.keys().collect();
        assert!(keys.iter().all(|k| k.is_string()), "non-string keys: {:?}", keys);
        assert_eq!(
            parsed["http"]["services"]["8080"]["loadBalancer"]["servers"][0]["url"],
            serde_yaml::Value::String("http://10.0.0.1:80".to_string())
        );
    }

    #[test]
    fn test_weight_disabled_and_mode() {
        let mut weighted = member("pool", "web01", "80", "");
        weighted.ratio = Some(3);
        weighted.load_balancing_mode = "round-robin".to_string();
        let mut disabled = member("pool", "web02", "80", "");
        disabled.disabled = true;

        let config = LoadBalancerConfig {
            servers: vec![server("web01", "10.0.0.1", ""), server("web02", "10.0.0.2", "")],
            service_group_bindings: vec![weighted, disabled],
            ..Default::default()
        };

        let (traefik, _) = generate(&config);
        let yaml = traefik.render(&EmitterOptions::default()).unwrap();
        assert!(yaml.contains("    # load balancing: round-robin\n"));
        assert!(yaml.contains("          - url: http://10.0.0.1:80\n            weight: 3\n"));
        assert!(yaml.contains("          # disabled: - url: http://10.0.0.2:80\n"));
    }

    #[test]
    fn test_all_disabled_service_omitted() {
        let mut disabled = member("pool", "web01", "80", "");
        disabled.disabled = true;
        let config = LoadBalancerConfig {
            servers: vec![server("web01", "10.0.0.1", "")],
            service_group_bindings: vec![disabled],
            ..Default::default()
        };

        let (traefik, diagnostics) = generate(&config);
        assert!(traefik.services.is_empty());
        assert_eq!(diagnostics.warnings.len(), 1);
    }

    #[test]
    fn test_comments_can_be_disabled() {
        let config = LoadBalancerConfig {
            servers: vec![server("web01", "10.0.0.1", "noted")],
            service_group_bindings: vec![member("app", "web01", "80", "noted")],
            ..Default::default()
        };
        let options = EmitterOptions {
            include_comments: false,
            scheme: "https".to_string(),
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::default();
        let yaml = TraefikConfig::generate(&config, &options, &mut diagnostics)
            .render(&options)
            .unwrap();
        assert!(!yaml.contains('#'));
        assert!(yaml.contains("- url: https://10.0.0.1:80"));
    }
}
