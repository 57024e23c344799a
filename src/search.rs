//! Substring search over a decoded package interface.

use serde::Serialize;

use crate::entity::{FunctionInfo, TypeInfo};
use crate::interface::{ModuleInfo, PackageInterface};

/// A search result together with the module it was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hit<'a, T> {
    pub module: &'a str,
    #[serde(flatten)]
    pub item: &'a T,
}

/// Functions whose name, documentation or signature contain `query`,
/// ignoring case. Results are in module then declaration order.
pub fn search_functions<'a>(
    interface: &'a PackageInterface,
    query: &str,
) -> Vec<Hit<'a, FunctionInfo>> {
    search(interface, query, |module| &module.functions, |function| {
        [&function.name, &function.documentation, &function.signature]
    })
}

/// Types whose name, documentation or signature contain `query`,
/// ignoring case. Results are in module then declaration order.
pub fn search_types<'a>(
    interface: &'a PackageInterface,
    query: &str,
) -> Vec<Hit<'a, TypeInfo>> {
    search(interface, query, |module| &module.types, |ty| {
        [&ty.name, &ty.documentation, &ty.signature]
    })
}

fn search<'a, T>(
    interface: &'a PackageInterface,
    query: &str,
    items: impl Fn(&'a ModuleInfo) -> &'a Vec<T>,
    fields: impl Fn(&T) -> [&String; 3],
) -> Vec<Hit<'a, T>> {
    let query = query.to_lowercase();
    interface
        .modules
        .iter()
        .flat_map(|module| {
            items(module).iter().map(move |item| Hit {
                module: module.name.as_str(),
                item,
            })
        })
        .filter(|hit| {
            fields(hit.item)
                .iter()
                .any(|field| field.to_lowercase().contains(&query))
        })
        .collect()
}
