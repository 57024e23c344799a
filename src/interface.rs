//! Decoding of whole package-interface documents.
//!
//! A package-interface document is the JSON export the Gleam toolchain
//! publishes next to a package's HTML docs on hexdocs.pm. Only the
//! top-level `name`, `version` and `modules` fields are required; all
//! module members are decoded by [`crate::entity`] and never fail.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::entity::{
    self, ConstantInfo, FunctionInfo, TypeAliasInfo, TypeInfo, decode_constant, decode_function,
    decode_type, decode_type_alias,
};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Expected a JSON {0} at the top level")]
    UnexpectedRoot(&'static str),

    #[error("Missing required field `{0}`")]
    MissingField(&'static str),

    #[error("Field `{field}` must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

/// The public API of one version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInterface {
    pub name: String,
    pub version: String,
    pub gleam_version_constraint: String,
    pub modules: Vec<ModuleInfo>,
}

impl PackageInterface {
    pub fn module(&self, name: &str) -> Option<&ModuleInfo> {
        self.modules.iter().find(|module| module.name == name)
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|module| module.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub name: String,
    pub documentation: String,
    pub functions: Vec<FunctionInfo>,
    pub types: Vec<TypeInfo>,
    pub constants: Vec<ConstantInfo>,
    pub type_aliases: Vec<TypeAliasInfo>,
}

/// Decodes a package-interface document.
pub fn decode(json: &str) -> Result<PackageInterface, DecodeError> {
    let document: Value = serde_json::from_str(json)?;
    if !document.is_object() {
        return Err(DecodeError::UnexpectedRoot("object"));
    }

    let name = required_str(&document, "name")?;
    let version = required_str(&document, "version")?;
    let gleam_version_constraint = entity::text(&document, "gleam-version-constraint");

    let modules = match document.get("modules") {
        None | Some(Value::Null) => return Err(DecodeError::MissingField("modules")),
        Some(Value::Object(modules)) => modules,
        Some(_) => {
            return Err(DecodeError::InvalidField {
                field: "modules",
                expected: "an object",
            });
        }
    };

    let modules = modules
        .iter()
        .map(|(name, data)| decode_module(name, data))
        .collect();

    Ok(PackageInterface {
        name,
        version,
        gleam_version_constraint,
        modules,
    })
}

fn decode_module(name: &str, data: &Value) -> ModuleInfo {
    if !data.is_object() {
        tracing::warn!("Module `{}` is not an object, treating it as empty", name);
    }

    ModuleInfo {
        name: name.to_string(),
        documentation: entity::doc_lines(data, "documentation"),
        functions: entity::entries(data, "functions")
            .map(|(name, data)| decode_function(name, data))
            .collect(),
        types: entity::entries(data, "types")
            .map(|(name, data)| decode_type(name, data))
            .collect(),
        constants: entity::entries(data, "constants")
            .map(|(name, data)| decode_constant(name, data))
            .collect(),
        type_aliases: entity::entries(data, "type-aliases")
            .map(|(name, data)| decode_type_alias(name, data))
            .collect(),
    }
}

fn required_str(document: &Value, field: &'static str) -> Result<String, DecodeError> {
    match document.get(field) {
        None | Some(Value::Null) => Err(DecodeError::MissingField(field)),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(DecodeError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::TypeKind;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "name": "gleam_stdlib",
            "version": "0.40.0",
            "gleam-version-constraint": ">= 0.34.0",
            "modules": {
                "gleam/option": {
                    "documentation": [" Optional values.", " Use them."],
                    "types": {
                        "Option": {
                            "parameters": 1,
                            "opaque": false,
                            "constructors": [
                                {"name": "Some", "parameters": [{"label": null, "type": {"kind": "variable", "id": 0}}]},
                                {"name": "None", "parameters": []},
                            ],
                        },
                    },
                    "functions": {
                        "is_some": {
                            "documentation": " Checks for Some.",
                            "parameters": [{"label": null, "type": {"kind": "named", "name": "Option", "module": "gleam/option", "package": "gleam_stdlib", "parameters": [{"kind": "variable", "id": 0}]}}],
                            "return": {"kind": "named", "name": "Bool", "module": "gleam", "package": ""},
                        },
                        "unwrap": {
                            "parameters": [
                                {"label": null, "type": {"kind": "named", "name": "Option", "module": "gleam/option", "package": "gleam_stdlib", "parameters": [{"kind": "variable", "id": 0}]}},
                                {"label": "or", "type": {"kind": "variable", "id": 0}},
                            ],
                            "return": {"kind": "variable", "id": 0},
                        },
                    },
                },
                "gleam/int": {
                    "documentation": [],
                    "constants": {"max_safe": {"type": {"kind": "named", "name": "Int", "module": "gleam", "package": ""}}},
                    "type-aliases": {"Number": {"alias": {"kind": "named", "name": "Int", "module": "gleam", "package": ""}}},
                },
            },
        })
    }

    #[test]
    fn test_decode_document() {
        let interface = decode(&sample().to_string()).unwrap();
        assert_eq!(interface.name, "gleam_stdlib");
        assert_eq!(interface.version, "0.40.0");
        assert_eq!(interface.gleam_version_constraint, ">= 0.34.0");
        assert_eq!(interface.modules.len(), 2);
        let mut names = interface.module_names();
        names.sort();
        assert_eq!(names, vec!["gleam/int", "gleam/option"]);

        let option = interface.module("gleam/option").unwrap();
        assert_eq!(option.documentation, " Optional values.\n Use them.");
        assert_eq!(option.types[0].type_kind, TypeKind::Custom);
        assert_eq!(option.functions.len(), 2);
        assert_eq!(
            option.functions[1].signature,
            "unwrap(gleam_stdlib/gleam/option.Option(a), or: a) -> a"
        );
        assert_eq!(option.functions[1].documentation, "");

        let int = interface.module("gleam/int").unwrap();
        assert_eq!(int.constants[0].type_name, "Int");
        assert_eq!(int.type_aliases[0].type_name, "Int");
        assert!(int.functions.is_empty());
    }

    #[test]
    fn test_missing_constraint_defaults_to_empty() {
        let mut document = sample();
        document["gleam-version-constraint"] = Value::Null;
        let interface = decode(&document.to_string()).unwrap();
        assert_eq!(interface.gleam_version_constraint, "");
    }

    #[test]
    fn test_missing_modules_fails() {
        let error = decode(r#"{"name": "x", "version": "1.0.0"}"#).unwrap_err();
        assert!(matches!(error, DecodeError::MissingField("modules")));
        assert!(!error.to_string().is_empty());
        assert!(error.to_string().contains("modules"));
    }

    #[test]
    fn test_required_fields_are_checked() {
        let missing_name = decode(r#"{"version": "1.0.0", "modules": {}}"#).unwrap_err();
        assert!(matches!(missing_name, DecodeError::MissingField("name")));

        let bad_version = decode(r#"{"name": "x", "version": 1, "modules": {}}"#).unwrap_err();
        assert!(matches!(bad_version, DecodeError::InvalidField { field: "version", .. }));

        let bad_modules = decode(r#"{"name": "x", "version": "1", "modules": []}"#).unwrap_err();
        assert!(matches!(bad_modules, DecodeError::InvalidField { field: "modules", .. }));
    }

    #[test]
    fn test_invalid_json_fails() {
        assert!(matches!(decode("{not json"), Err(DecodeError::InvalidJson(_))));
        assert!(matches!(decode("[1, 2]"), Err(DecodeError::UnexpectedRoot(_))));
    }

    #[test]
    fn test_malformed_members_do_not_fail_the_document() {
        let document = json!({
            "name": "broken",
            "version": "0.1.0",
            "modules": {
                "a": {"functions": {"f": {"parameters": 7, "return": {"kind": "???"}}}},
                "b": "not a module",
                "c": {"functions": []},
            },
        });
        let interface = decode(&document.to_string()).unwrap();
        assert_eq!(interface.modules.len(), 3);

        let a = interface.module("a").unwrap();
        assert_eq!(a.functions[0].signature, "f() -> unknown");
        assert_eq!(a.documentation, "");
        assert!(interface.module("b").unwrap().functions.is_empty());
        assert!(interface.module("c").unwrap().functions.is_empty());
    }
}
