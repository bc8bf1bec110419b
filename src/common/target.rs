//! Connection target parsing
//!
//! A target names the coordination service cluster and, optionally, the
//! election namespace:
//!
//! ```text
//! host1:port1[,host2:port2,...][/namespace]
//! ```
//!
//! `127.0.0.1` is a valid target (single endpoint, default namespace).

use crate::common::utils::normalize_path;
use crate::common::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Parsed connection target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    endpoints: Vec<String>,
    namespace: Option<String>,
}

impl ConnectionTarget {
    /// Parse a target string. Reachability is not checked here.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidConfig("empty coordination service address".into()));
        }

        let (servers, namespace) = match input.split_once('/') {
            Some((servers, rest)) => (servers, normalize_path(rest)),
            None => (input, None),
        };

        let endpoints = servers
            .split(',')
            .map(str::trim)
            .map(|endpoint| {
                if endpoint.is_empty() {
                    Err(Error::InvalidConfig(format!(
                        "empty endpoint in address: {}",
                        input
                    )))
                } else {
                    Ok(endpoint.to_string())
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            endpoints,
            namespace,
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Namespace override, always with exactly one leading slash
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Root path to elect under: the namespace if one was given, else `default`.
    pub fn root_path_or(&self, default: &str) -> String {
        self.namespace
            .clone()
            .unwrap_or_else(|| default.to_string())
    }
}

impl FromStr for ConnectionTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoints.join(","))?;
        if let Some(namespace) = &self.namespace {
            write!(f, "{}", namespace)?;
        }
        Ok(())
    }
}
