//! Verification mode: reference checks and diffing against earlier output

mod diff;
mod references;

pub use diff::{diff_against_dir, DiffReport, MappingChange, ServiceChange};
pub use references::{check_references, ReferenceIssue};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
