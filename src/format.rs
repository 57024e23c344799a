//! Human readable text for tool results.
//!
//! Every tool result carries a text block next to its structured data.
//! The functions here build that text from the same decoded values the
//! structured part is serialized from.

use std::fmt::Write;

use crate::entity::{FunctionInfo, TypeInfo};
use crate::interface::{ModuleInfo, PackageInterface};
use crate::packages::{PackageInfo, PackageReleases, PackageSummary};
use crate::search::Hit;

pub fn search_results(query: &str, packages: &[PackageSummary]) -> String {
    if packages.is_empty() {
        return format!("No packages found matching \"{query}\".");
    }

    let mut out = format!("Found {} packages matching \"{}\":\n", packages.len(), query);
    for package in packages {
        let _ = write!(out, "\n- {}", package.name);
        if !package.latest_version.is_empty() {
            let _ = write!(out, " {}", package.latest_version);
        }
        let _ = writeln!(out, " ({} downloads)", package.downloads);
        if !package.description.is_empty() {
            let _ = writeln!(out, "  {}", package.description);
        }
        if !package.hex_url.is_empty() {
            let _ = writeln!(out, "  {}", package.hex_url);
        }
    }
    out
}

pub fn package_info(info: &PackageInfo) -> String {
    let mut out = format!("# {} {}\n", info.name, info.latest_version);
    if !info.description.is_empty() {
        let _ = write!(out, "\n{}\n", info.description);
    }
    out.push('\n');
    if !info.latest_stable_version.is_empty() {
        let _ = writeln!(out, "- Latest stable version: {}", info.latest_stable_version);
    }
    if !info.licenses.is_empty() {
        let _ = writeln!(out, "- Licenses: {}", info.licenses.join(", "));
    }
    if let Some(repository) = &info.repository_url {
        let _ = writeln!(out, "- Repository: {repository}");
    }
    if !info.hex_url.is_empty() {
        let _ = writeln!(out, "- Hex: {}", info.hex_url);
    }
    if !info.docs_url.is_empty() {
        let _ = writeln!(out, "- Documentation: {}", info.docs_url);
    }
    let _ = writeln!(out, "- Downloads: {}", info.downloads);
    let _ = writeln!(out, "- Releases: {}", info.release_count);
    out
}

pub fn modules(interface: &PackageInterface) -> String {
    let mut out = format!(
        "# {} {}: {} modules\n",
        interface.name,
        interface.version,
        interface.modules.len()
    );
    if !interface.gleam_version_constraint.is_empty() {
        let _ = writeln!(out, "Gleam version: {}", interface.gleam_version_constraint);
    }
    out.push('\n');
    for module in &interface.modules {
        let _ = writeln!(
            out,
            "- {} ({} functions, {} types, {} constants, {} type aliases)",
            module.name,
            module.functions.len(),
            module.types.len(),
            module.constants.len(),
            module.type_aliases.len()
        );
        if let Some(summary) = first_line(&module.documentation) {
            let _ = writeln!(out, "  {summary}");
        }
    }
    out
}

pub fn module_info(interface: &PackageInterface, module: &ModuleInfo) -> String {
    let mut out = format!("# {} ({} {})\n", module.name, interface.name, interface.version);
    if !module.documentation.trim().is_empty() {
        let _ = write!(out, "\n{}\n", module.documentation.trim());
    }

    if !module.types.is_empty() {
        out.push_str("\n## Types\n");
        for ty in &module.types {
            type_section(&mut out, ty);
        }
    }

    if !module.type_aliases.is_empty() {
        out.push_str("\n## Type aliases\n");
        for alias in &module.type_aliases {
            let _ = write!(
                out,
                "\n### {}\n\n`type {} = {}`\n",
                alias.name, alias.name, alias.type_name
            );
            deprecation(&mut out, alias.deprecation.as_deref());
            documentation(&mut out, &alias.documentation);
        }
    }

    if !module.constants.is_empty() {
        out.push_str("\n## Constants\n");
        for constant in &module.constants {
            let _ = write!(
                out,
                "\n### {}\n\n`const {}: {}`\n",
                constant.name, constant.name, constant.type_name
            );
            documentation(&mut out, &constant.documentation);
        }
    }

    if !module.functions.is_empty() {
        out.push_str("\n## Functions\n");
        for function in &module.functions {
            function_section(&mut out, function);
        }
    }
    out
}

pub fn function_hits(package: &str, query: &str, hits: &[Hit<'_, FunctionInfo>]) -> String {
    if hits.is_empty() {
        return format!("No functions found matching \"{query}\" in {package}.");
    }
    let mut out = format!(
        "Found {} functions matching \"{}\" in {}:\n\n",
        hits.len(),
        query,
        package
    );
    for hit in hits {
        let _ = writeln!(out, "- {}.{}: `{}`", hit.module, hit.item.name, hit.item.signature);
        if let Some(summary) = first_line(&hit.item.documentation) {
            let _ = writeln!(out, "  {summary}");
        }
    }
    out
}

pub fn type_hits(package: &str, query: &str, hits: &[Hit<'_, TypeInfo>]) -> String {
    if hits.is_empty() {
        return format!("No types found matching \"{query}\" in {package}.");
    }
    let mut out = format!("Found {} types matching \"{}\" in {}:\n", hits.len(), query, package);
    for hit in hits {
        let _ = write!(
            out,
            "\n{}.{} ({})\n```gleam\n{}\n```\n",
            hit.module,
            hit.item.name,
            hit.item.type_kind.as_str(),
            hit.item.signature
        );
        if let Some(summary) = first_line(&hit.item.documentation) {
            let _ = writeln!(out, "{summary}");
        }
    }
    out
}

pub fn releases(releases: &PackageReleases) -> String {
    let mut out = format!("# {} releases ({})\n\n", releases.name, releases.releases.len());
    for release in &releases.releases {
        let _ = write!(out, "- {}", release.version);
        if !release.inserted_at.is_empty() {
            let _ = write!(out, " ({})", release.inserted_at);
        }
        if !release.has_docs {
            out.push_str(" [no docs]");
        }
        if let Some(retirement) = &release.retirement {
            let _ = write!(out, " RETIRED ({})", retirement.reason);
            if !retirement.message.is_empty() {
                let _ = write!(out, ": {}", retirement.message);
            }
        }
        out.push('\n');
    }
    out
}

fn type_section(out: &mut String, ty: &TypeInfo) {
    let _ = write!(
        out,
        "\n### {} ({})\n\n```gleam\n{}\n```\n",
        ty.name,
        ty.type_kind.as_str(),
        ty.signature
    );
    deprecation(out, ty.deprecation.as_deref());
    documentation(out, &ty.documentation);
}

fn function_section(out: &mut String, function: &FunctionInfo) {
    let _ = write!(out, "\n### {}\n\n```gleam\n{}\n```\n", function.name, function.signature);
    deprecation(out, function.deprecation.as_deref());
    let _ = writeln!(out, "Targets: {}", function.implementations.targets());
    documentation(out, &function.documentation);
}

fn deprecation(out: &mut String, deprecation: Option<&str>) {
    if let Some(message) = deprecation {
        let _ = writeln!(out, "Deprecated: {message}");
    }
}

fn documentation(out: &mut String, documentation: &str) {
    let documentation = documentation.trim();
    if !documentation.is_empty() {
        let _ = write!(out, "\n{documentation}\n");
    }
}

fn first_line(documentation: &str) -> Option<&str> {
    documentation
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::decode;
    use crate::packages::{Release, Retirement};
    use crate::search::search_functions;
    use serde_json::json;

    fn interface() -> PackageInterface {
        let document = json!({
            "name": "gleam_stdlib",
            "version": "0.40.0",
            "modules": {
                "gleam/option": {
                    "documentation": ["", " Optional values."],
                    "types": {"Option": {"parameters": 1, "opaque": false, "constructors": [{"name": "None"}]}},
                    "functions": {
                        "unwrap": {
                            "documentation": " Extracts the value.\n More text.",
                            "deprecation": {"message": "Use lazy_unwrap"},
                            "parameters": [{"label": "or", "type": {"kind": "variable", "id": 0}}],
                            "return": {"kind": "variable", "id": 0},
                        },
                    },
                },
            },
        });
        decode(&document.to_string()).unwrap()
    }

    #[test]
    fn test_module_info_text() {
        let interface = interface();
        let module = interface.module("gleam/option").unwrap();
        let text = module_info(&interface, module);

        assert!(text.starts_with("# gleam/option (gleam_stdlib 0.40.0)"));
        assert!(text.contains("Optional values."));
        assert!(text.contains("## Types"));
        assert!(text.contains("type Option(a) {\n  None\n}"));
        assert!(text.contains("unwrap(or: a) -> a"));
        assert!(text.contains("Deprecated: Use lazy_unwrap"));
        assert!(text.contains("Targets: erlang, javascript"));
        assert!(!text.contains("## Constants"));
    }

    #[test]
    fn test_modules_text() {
        let text = modules(&interface());
        assert!(text.contains("gleam_stdlib 0.40.0: 1 modules"));
        assert!(text.contains("- gleam/option (1 functions, 1 types, 0 constants, 0 type aliases)"));
        assert!(text.contains("  Optional values."));
    }

    #[test]
    fn test_function_hits_text() {
        let interface = interface();
        let hits = search_functions(&interface, "unwrap");
        let text = function_hits("gleam_stdlib", "unwrap", &hits);
        assert!(text.contains("- gleam/option.unwrap: `unwrap(or: a) -> a`"));
        assert!(text.contains("  Extracts the value."));
        assert!(!text.contains("More text."));

        let none = function_hits("gleam_stdlib", "zzz", &[]);
        assert_eq!(none, "No functions found matching \"zzz\" in gleam_stdlib.");
    }

    #[test]
    fn test_releases_text() {
        let releases = PackageReleases {
            name: "lustre".to_string(),
            releases: vec![
                Release {
                    version: "2.0.0".to_string(),
                    inserted_at: "2024-01-01".to_string(),
                    has_docs: true,
                    retirement: None,
                },
                Release {
                    version: "1.0.0".to_string(),
                    inserted_at: String::new(),
                    has_docs: false,
                    retirement: Some(Retirement {
                        reason: "security".to_string(),
                        message: "Upgrade".to_string(),
                    }),
                },
            ],
        };
        let text = super::releases(&releases);
        assert!(text.contains("- 2.0.0 (2024-01-01)\n"));
        assert!(text.contains("- 1.0.0 [no docs] RETIRED (security): Upgrade"));
    }

    #[test]
    fn test_empty_search_results() {
        assert_eq!(search_results("zzz", &[]), "No packages found matching \"zzz\".");
    }
}
