//! Decoding of hex.pm package metadata.
//!
//! hex.pm describes a package (and each entry of a search result) with the
//! same JSON object. Like package interfaces, only the package name is
//! required; everything else falls back to a default.

use serde::Serialize;
use serde_json::Value;

use crate::entity::{count, entries, flag, list, text};
use crate::interface::DecodeError;

/// Link names hex.pm packages commonly use for their source repository.
const REPOSITORY_LINKS: [&str; 4] = ["repository", "github", "gitlab", "source"];

/// One entry of a package search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSummary {
    pub name: String,
    pub description: String,
    pub latest_version: String,
    pub downloads: u64,
    pub hex_url: String,
    pub docs_url: String,
}

/// Everything hex.pm knows about a package, apart from its releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    pub name: String,
    pub description: String,
    pub latest_version: String,
    pub latest_stable_version: String,
    pub licenses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    pub hex_url: String,
    pub docs_url: String,
    pub downloads: u64,
    pub release_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub version: String,
    pub inserted_at: String,
    pub has_docs: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retirement: Option<Retirement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Retirement {
    pub reason: String,
    pub message: String,
}

/// The release history of a package, newest first as hex.pm lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageReleases {
    pub name: String,
    pub releases: Vec<Release>,
}

impl PackageReleases {
    pub fn retired(&self) -> impl Iterator<Item = &Release> {
        self.releases.iter().filter(|release| release.retirement.is_some())
    }
}

pub fn decode_package_info(json: &str) -> Result<PackageInfo, DecodeError> {
    let package = parse_package(json)?;
    Ok(package_info(&package))
}

pub fn decode_releases(json: &str) -> Result<PackageReleases, DecodeError> {
    let package = parse_package(json)?;
    let retirements = package.get("retirements").unwrap_or(&Value::Null);

    let releases = list(&package, "releases")
        .iter()
        .map(|release| {
            let version = text(release, "version");
            let retirement = retirements.get(&version).map(|retirement| Retirement {
                reason: text(retirement, "reason"),
                message: text(retirement, "message"),
            });
            Release {
                inserted_at: text(release, "inserted_at"),
                has_docs: flag(release, "has_docs", false),
                version,
                retirement,
            }
        })
        .collect();

    Ok(PackageReleases {
        name: text(&package, "name"),
        releases,
    })
}

/// Decodes a hex.pm search result. Entries without a name are dropped.
pub fn decode_search_results(json: &str) -> Result<Vec<PackageSummary>, DecodeError> {
    let results: Value = serde_json::from_str(json)?;
    let Value::Array(packages) = results else {
        return Err(DecodeError::UnexpectedRoot("array"));
    };

    Ok(packages
        .iter()
        .filter(|package| !text(package, "name").is_empty())
        .map(|package| {
            let meta = package.get("meta").unwrap_or(&Value::Null);
            PackageSummary {
                name: text(package, "name"),
                description: text(meta, "description"),
                latest_version: latest_version(package),
                downloads: downloads(package),
                hex_url: text(package, "html_url"),
                docs_url: text(package, "docs_html_url"),
            }
        })
        .collect())
}

fn parse_package(json: &str) -> Result<Value, DecodeError> {
    let package: Value = serde_json::from_str(json)?;
    if !package.is_object() {
        return Err(DecodeError::UnexpectedRoot("object"));
    }
    match package.get("name") {
        Some(Value::String(_)) => Ok(package),
        None | Some(Value::Null) => Err(DecodeError::MissingField("name")),
        Some(_) => Err(DecodeError::InvalidField {
            field: "name",
            expected: "a string",
        }),
    }
}

fn package_info(package: &Value) -> PackageInfo {
    let meta = package.get("meta").unwrap_or(&Value::Null);
    let licenses = list(meta, "licenses")
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    let repository_url = entries(meta, "links")
        .find(|(name, _)| REPOSITORY_LINKS.contains(&name.to_lowercase().as_str()))
        .and_then(|(_, url)| url.as_str())
        .map(str::to_string);

    PackageInfo {
        name: text(package, "name"),
        description: text(meta, "description"),
        latest_version: latest_version(package),
        latest_stable_version: text(package, "latest_stable_version"),
        licenses,
        repository_url,
        hex_url: text(package, "html_url"),
        docs_url: text(package, "docs_html_url"),
        downloads: downloads(package),
        release_count: list(package, "releases").len(),
    }
}

/// `latest_version`, or the newest listed release when it is missing.
fn latest_version(package: &Value) -> String {
    let latest = text(package, "latest_version");
    if !latest.is_empty() {
        return latest;
    }
    list(package, "releases")
        .first()
        .map(|release| text(release, "version"))
        .unwrap_or_default()
}

fn downloads(package: &Value) -> u64 {
    package
        .get("downloads")
        .map(|downloads| count(downloads, "all"))
        .unwrap_or_default()
}
