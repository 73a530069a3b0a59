//! Structural comparison of regenerated output against files on disk

use super::VerifyError;
use crate::emitter::{MappingConfig, TraefikConfig, MAPPING_FILE, SERVICES_FILE};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ServicesDocument {
    http: Option<HttpSection>,
}

#[derive(Debug, Deserialize)]
struct HttpSection {
    services: Option<BTreeMap<String, ServiceDocument>>,
}

#[derive(Debug, Deserialize)]
struct ServiceDocument {
    #[serde(rename = "loadBalancer")]
    load_balancer: Option<LoadBalancerDocument>,
}

#[derive(Debug, Deserialize)]
struct LoadBalancerDocument {
    servers: Option<Vec<ServerDocument>>,
}

#[derive(Debug, Deserialize)]
struct ServerDocument {
    url: String,
}

/// A service whose server URLs differ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceChange {
    pub name: String,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
}

/// A mapping key whose value differs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingChange {
    pub key: String,
    pub expected: String,
    pub actual: String,
}

/// Differences between regenerated output and an existing directory.
/// "Missing" entries would be generated but are absent on disk; "extra"
/// entries exist on disk only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReport {
    pub missing_services: Vec<String>,
    pub extra_services: Vec<String>,
    pub changed_services: Vec<ServiceChange>,
    pub missing_keys: Vec<String>,
    pub extra_keys: Vec<String>,
    pub changed_keys: Vec<MappingChange>,
}

impl DiffReport {
    pub fn is_clean(&self) -> bool {
        self.missing_services.is_empty()
            && self.extra_services.is_empty()
            && self.changed_services.is_empty()
            && self.missing_keys.is_empty()
            && self.extra_keys.is_empty()
            && self.changed_keys.is_empty()
    }

    pub fn difference_count(&self) -> usize {
        self.missing_services.len()
            + self.extra_services.len()
            + self.changed_services.len()
            + self.missing_keys.len()
            + self.extra_keys.len()
            + self.changed_keys.len()
    }
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in &self.missing_services {
            writeln!(f, "- service {}", name)?;
        }
        for name in &self.extra_services {
            writeln!(f, "+ service {}", name)?;
        }
        for change in &self.changed_services {
            writeln!(f, "~ service {}", change.name)?;
            for url in change.expected.iter().filter(|u| !change.actual.contains(u)) {
                writeln!(f, "    - {}", url)?;
            }
            for url in change.actual.iter().filter(|u| !change.expected.contains(u)) {
                writeln!(f, "    + {}", url)?;
            }
        }
        for key in &self.missing_keys {
            writeln!(f, "- mapping {}", key)?;
        }
        for key in &self.extra_keys {
            writeln!(f, "+ mapping {}", key)?;
        }
        for change in &self.changed_keys {
            writeln!(
                f,
                "~ mapping {}: {} -> {}",
                change.key, change.expected, change.actual
            )?;
        }
        Ok(())
    }
}

/// Compare generated documents with `traefik-services.yaml` and
/// `mapping.yaml` in `dir`. Comments and formatting are ignored; disabled
/// members are not part of the comparison since they are written as
/// comments.
pub fn diff_against_dir(
    services: &TraefikConfig,
    mapping: &MappingConfig,
    dir: &Path,
) -> Result<DiffReport, VerifyError> {
    let actual_services = read_services(&dir.join(SERVICES_FILE))?;
    let actual_mapping = read_mapping(&dir.join(MAPPING_FILE))?;

    let expected_services: BTreeMap<String, Vec<String>> = services
        .services
        .iter()
        .map(|(name, service)| {
            let mut urls: Vec<String> = service.active_servers().map(|s| s.url.clone()).collect();
            urls.sort();
            (name.clone(), urls)
        })
        .collect();

    let expected_mapping: BTreeMap<String, String> = mapping
        .entries
        .iter()
        .map(|e| (e.key.clone(), e.value.clone()))
        .collect();

    let mut report = DiffReport::default();

    for (name, expected) in &expected_services {
        match actual_services.get(name) {
            None => report.missing_services.push(name.clone()),
            Some(actual) if actual != expected => report.changed_services.push(ServiceChange {
                name: name.clone(),
                expected: expected.clone(),
                actual: actual.clone(),
            }),
            Some(_) => {}
        }
    }
    report.extra_services = actual_services
        .keys()
        .filter(|name| !expected_services.contains_key(*name))
        .cloned()
        .collect();

    for (key, expected) in &expected_mapping {
        match actual_mapping.get(key) {
            None => report.missing_keys.push(key.clone()),
            Some(actual) if actual != expected => report.changed_keys.push(MappingChange {
                key: key.clone(),
                expected: expected.clone(),
                actual: actual.clone(),
            }),
            Some(_) => {}
        }
    }
    report.extra_keys = actual_mapping
        .keys()
        .filter(|key| !expected_mapping.contains_key(*key))
        .cloned()
        .collect();

    tracing::debug!(
        differences = report.difference_count(),
        dir = %dir.display(),
        "compared against existing output"
    );

    Ok(report)
}

fn read(path: &Path) -> Result<String, VerifyError> {
    std::fs::read_to_string(path).map_err(|source| VerifyError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Whether a document holds nothing but comments and blank lines
fn is_blank_document(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'))
}

fn read_services(path: &Path) -> Result<BTreeMap<String, Vec<String>>, VerifyError> {
    let content = read(path)?;
    if is_blank_document(&content) {
        return Ok(BTreeMap::new());
    }

    let document: ServicesDocument =
        serde_yaml::from_str(&content).map_err(|source| VerifyError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

    let services = document
        .http
        .and_then(|http| http.services)
        .unwrap_or_default();

    Ok(services
        .into_iter()
        .map(|(name, service)| {
            let mut urls: Vec<String> = service
                .load_balancer
                .and_then(|lb| lb.servers)
                .unwrap_or_default()
                .into_iter()
                .map(|s| s.url)
                .collect();
            urls.sort();
            (name, urls)
        })
        .collect())
}

fn read_mapping(path: &Path) -> Result<BTreeMap<String, String>, VerifyError> {
    let content = read(path)?;
    if is_blank_document(&content) {
        return Ok(BTreeMap::new());
    }

    serde_yaml::from_str(&content).map_err(|source| VerifyError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}
