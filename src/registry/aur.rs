// src/registry/aur.rs

//! AUR RPC v5 backend
//!
//! Uses the `info` endpoint with repeated `arg[]` parameters for batched
//! lookups, `search` for free-text search, and the cgit plain view to fetch
//! PKGBUILDs for review.

use crate::error::{Error, Result};
use crate::package::{Dependency, PackageRecord, PackageSource};
use crate::registry::RegistryBackend;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Default RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://aur.archlinux.org/rpc/";

/// Default PKGBUILD endpoint (package base passed as `h`)
pub const DEFAULT_PKGBUILD_URL: &str = "https://aur.archlinux.org/cgit/aur.git/plain/PKGBUILD";

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// RPC API version spoken by this client
const RPC_VERSION: &str = "5";

/// AUR RPC response wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct AurRpcResponse {
    pub version: Option<u32>,
    #[serde(rename = "type")]
    pub response_type: String,
    #[serde(default)]
    pub resultcount: usize,
    #[serde(default)]
    pub results: Vec<AurPackageInfo>,
    pub error: Option<String>,
}

/// One package as returned by the RPC
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AurPackageInfo {
    pub name: String,
    pub package_base: String,
    pub version: String,
    pub description: Option<String>,
    #[serde(rename = "URL")]
    pub url: Option<String>,
    #[serde(default)]
    pub num_votes: u32,
    #[serde(default)]
    pub popularity: f64,
    /// Unix timestamp of the out-of-date flag
    pub out_of_date: Option<i64>,
    pub maintainer: Option<String>,
    pub last_modified: Option<i64>,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub make_depends: Vec<String>,
    #[serde(default)]
    pub check_depends: Vec<String>,
}

fn timestamp(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}

impl From<AurPackageInfo> for PackageRecord {
    fn from(info: AurPackageInfo) -> Self {
        // check dependencies are only needed while building
        let make_depends = info
            .make_depends
            .iter()
            .chain(info.check_depends.iter())
            .map(|d| Dependency::parse(d))
            .collect();

        Self {
            name: info.name,
            package_base: info.package_base,
            source: PackageSource::Untrusted,
            version: info.version,
            maintainer: info.maintainer,
            description: info.description,
            url: info.url,
            votes: info.num_votes,
            popularity: info.popularity,
            out_of_date: timestamp(info.out_of_date),
            last_modified: timestamp(info.last_modified),
            depends: info.depends.iter().map(|d| Dependency::parse(d)).collect(),
            make_depends,
        }
    }
}

/// Turn an RPC response into records, surfacing RPC-level errors
fn parse_response(response: AurRpcResponse) -> Result<Vec<PackageRecord>> {
    if response.response_type == "error" {
        return Err(Error::ParseError(format!(
            "AUR RPC error: {}",
            response.error.unwrap_or_else(|| "unknown error".to_string())
        )));
    }

    Ok(response.results.into_iter().map(PackageRecord::from).collect())
}

/// Blocking HTTP client for the AUR
pub struct AurRpc {
    client: Client,
    rpc_url: String,
    pkgbuild_url: String,
}

impl AurRpc {
    /// Create a client against the public AUR
    pub fn new() -> Result<Self> {
        Self::with_endpoints(DEFAULT_RPC_URL, DEFAULT_PKGBUILD_URL, DEFAULT_TIMEOUT)
    }

    /// Create a client against custom endpoints
    pub fn with_endpoints(
        rpc_url: impl Into<String>,
        pkgbuild_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("aurweave/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
            pkgbuild_url: pkgbuild_url.into(),
        })
    }

    fn rpc(&self, params: &[(&str, &str)]) -> Result<AurRpcResponse> {
        let response = self
            .client
            .get(&self.rpc_url)
            .query(params)
            .send()
            .map_err(|e| Error::Unavailable(format!("AUR request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Unavailable(format!(
                "HTTP {} from {}",
                status, self.rpc_url
            )));
        }

        response
            .json()
            .map_err(|e| Error::ParseError(format!("Failed to parse AUR response: {e}")))
    }
}

impl RegistryBackend for AurRpc {
    fn query_info(&self, names: &[String]) -> Result<Vec<PackageRecord>> {
        debug!("AUR info request for {} name(s)", names.len());

        let mut params = vec![("v", RPC_VERSION), ("type", "info")];
        params.extend(names.iter().map(|n| ("arg[]", n.as_str())));

        let records = parse_response(self.rpc(&params)?)?;
        debug!("AUR returned {} record(s)", records.len());
        Ok(records)
    }

    fn search(&self, term: &str) -> Result<Vec<PackageRecord>> {
        info!("Searching AUR for '{}'", term);
        let params = [
            ("v", RPC_VERSION),
            ("type", "search"),
            ("by", "name-desc"),
            ("arg", term),
        ];
        parse_response(self.rpc(&params)?)
    }

    fn fetch_pkgbuild(&self, package_base: &str) -> Result<String> {
        debug!("Fetching PKGBUILD for {}", package_base);

        let response = self
            .client
            .get(&self.pkgbuild_url)
            .query(&[("h", package_base)])
            .send()
            .map_err(|e| Error::Unavailable(format!("PKGBUILD request failed: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::NotFound {
                packages: vec![package_base.to_string()],
            }),
            status if !status.is_success() => Err(Error::Unavailable(format!(
                "HTTP {} fetching PKGBUILD for {}",
                status, package_base
            ))),
            _ => response
                .text()
                .map_err(|e| Error::Unavailable(format!("Failed to read PKGBUILD: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO_RESPONSE: &str = r#"{
        "resultcount": 1,
        "results": [{
            "Depends": ["pacman>6.1", "git"],
            "Description": "Yet another yogurt. Pacman wrapper and AUR helper written in go.",
            "FirstSubmitted": 1475688004,
            "ID": 1461166,
            "LastModified": 1717181800,
            "Maintainer": "jguer",
            "MakeDepends": ["go>=1.21"],
            "CheckDepends": ["go-tools"],
            "Name": "yay",
            "NumVotes": 2174,
            "OutOfDate": null,
            "PackageBase": "yay",
            "PackageBaseID": 115973,
            "Popularity": 18.72,
            "URL": "https://github.com/Jguer/yay",
            "URLPath": "/cgit/aur.git/snapshot/yay.tar.gz",
            "Version": "12.3.5-1"
        }],
        "type": "multiinfo",
        "version": 5
    }"#;

    #[test]
    fn test_parse_info_response() {
        let response: AurRpcResponse = serde_json::from_str(INFO_RESPONSE).unwrap();
        let records = parse_response(response).unwrap();

        assert_eq!(records.len(), 1);
        let yay = &records[0];
        assert_eq!(yay.name, "yay");
        assert_eq!(yay.package_base, "yay");
        assert_eq!(yay.source, PackageSource::Untrusted);
        assert_eq!(yay.version, "12.3.5-1");
        assert_eq!(yay.maintainer.as_deref(), Some("jguer"));
        assert_eq!(yay.votes, 2174);
        assert!(!yay.is_out_of_date());
        assert!(yay.last_modified.is_some());
        assert_eq!(yay.depends[0].name, "pacman");
        assert_eq!(yay.depends[0].constraint.as_deref(), Some(">6.1"));
        assert_eq!(yay.dependency_names(), vec!["pacman", "git", "go", "go-tools"]);
    }

    #[test]
    fn test_parse_orphaned_out_of_date() {
        let json = r#"{
            "resultcount": 1,
            "results": [{
                "Name": "old-tool",
                "PackageBase": "old-tool",
                "Version": "0.1-1",
                "Maintainer": null,
                "OutOfDate": 1600000000,
                "NumVotes": 0,
                "Popularity": 0
            }],
            "type": "multiinfo",
            "version": 5
        }"#;

        let response: AurRpcResponse = serde_json::from_str(json).unwrap();
        let records = parse_response(response).unwrap();

        assert!(records[0].is_orphaned());
        assert!(records[0].is_out_of_date());
        assert!(records[0].depends.is_empty());
    }

    #[test]
    fn test_parse_error_response() {
        let json = r#"{
            "error": "Too many package results.",
            "resultcount": 0,
            "results": [],
            "type": "error",
            "version": 5
        }"#;

        let response: AurRpcResponse = serde_json::from_str(json).unwrap();
        let err = parse_response(response).unwrap_err();

        assert!(matches!(err, Error::ParseError(ref msg) if msg.contains("Too many")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_client_creation() {
        assert!(AurRpc::new().is_ok());
    }
}
