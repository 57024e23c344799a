//! Decoding of the individual members of a module.
//!
//! Each decoder takes the member's name (the key it is stored under in the
//! module) and its JSON data, and always produces a record. Every nested
//! lookup goes through one of the small field readers below, which return
//! the field's default instead of failing, so one odd field never costs the
//! whole member.

use serde::Serialize;
use serde_json::Value;

use crate::signature::{self, variable_name};

/// A function exported by a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInfo {
    pub name: String,
    pub documentation: String,
    pub signature: String,
    pub parameters: Vec<ParameterInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<String>,
    pub implementations: Implementations,
}

/// A custom type exported by a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeInfo {
    pub name: String,
    pub documentation: String,
    pub signature: String,
    pub type_kind: TypeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstantInfo {
    pub name: String,
    pub documentation: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeAliasInfo {
    pub name: String,
    pub documentation: String,
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<String>,
}

/// A function or constructor parameter. An empty label means positional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterInfo {
    pub label: String,
    pub type_name: String,
}

impl ParameterInfo {
    fn render(&self) -> String {
        if self.label.is_empty() {
            self.type_name.clone()
        } else {
            format!("{}: {}", self.label, self.type_name)
        }
    }
}

/// Which targets a function is implemented for and can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Implementations {
    pub gleam: bool,
    pub uses_erlang_externals: bool,
    pub uses_javascript_externals: bool,
    pub can_run_on_erlang: bool,
    pub can_run_on_javascript: bool,
}

impl Default for Implementations {
    fn default() -> Self {
        Self {
            gleam: false,
            uses_erlang_externals: false,
            uses_javascript_externals: false,
            can_run_on_erlang: true,
            can_run_on_javascript: true,
        }
    }
}

impl Implementations {
    /// Comma separated list of the targets the function can run on.
    pub fn targets(&self) -> String {
        let mut targets = Vec::new();
        if self.can_run_on_erlang {
            targets.push("erlang");
        }
        if self.can_run_on_javascript {
            targets.push("javascript");
        }
        if targets.is_empty() {
            "none".to_string()
        } else {
            targets.join(", ")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Opaque,
    Custom,
    Unknown,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Opaque => "opaque",
            TypeKind::Custom => "custom",
            TypeKind::Unknown => "unknown",
        }
    }
}

pub fn decode_function(name: &str, data: &Value) -> FunctionInfo {
    let parameters = parameters(data, "parameters");
    let return_type = signature::render_json(data.get("return").unwrap_or(&Value::Null));
    let signature = format!("{}({}) -> {}", name, render_parameters(&parameters), return_type);

    FunctionInfo {
        name: name.to_string(),
        documentation: text(data, "documentation"),
        signature,
        parameters,
        deprecation: deprecation(data),
        implementations: implementations(data),
    }
}

pub fn decode_type(name: &str, data: &Value) -> TypeInfo {
    let mut signature = format!("type {}{}", name, type_parameters(count(data, "parameters")));

    let constructors: Vec<String> = list(data, "constructors").iter().map(constructor).collect();
    if !constructors.is_empty() {
        signature.push_str(" {\n  ");
        signature.push_str(&constructors.join("\n  "));
        signature.push_str("\n}");
    }

    let type_kind = match data.get("opaque") {
        Some(Value::Bool(true)) => TypeKind::Opaque,
        Some(Value::Bool(false)) => TypeKind::Custom,
        _ => TypeKind::Unknown,
    };

    TypeInfo {
        name: name.to_string(),
        documentation: text(data, "documentation"),
        signature,
        type_kind,
        deprecation: deprecation(data),
    }
}

pub fn decode_constant(name: &str, data: &Value) -> ConstantInfo {
    ConstantInfo {
        name: name.to_string(),
        documentation: text(data, "documentation"),
        type_name: signature::render_json(data.get("type").unwrap_or(&Value::Null)),
    }
}

pub fn decode_type_alias(name: &str, data: &Value) -> TypeAliasInfo {
    TypeAliasInfo {
        name: name.to_string(),
        documentation: text(data, "documentation"),
        type_name: signature::render_json(data.get("alias").unwrap_or(&Value::Null)),
        deprecation: deprecation(data),
    }
}

fn constructor(data: &Value) -> String {
    let name = match data.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name,
        _ => "unknown",
    };
    let parameters = parameters(data, "parameters");
    if parameters.is_empty() {
        name.to_string()
    } else {
        format!("{}({})", name, render_parameters(&parameters))
    }
}

fn render_parameters(parameters: &[ParameterInfo]) -> String {
    parameters
        .iter()
        .map(ParameterInfo::render)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Type parameters beyond this many are rendered as a single `unknown`.
pub const MAX_TYPE_PARAMETERS: u64 = 64;

fn type_parameters(count: u64) -> String {
    if count == 0 {
        return String::new();
    }
    let mut names: Vec<String> = (0..count.min(MAX_TYPE_PARAMETERS)).map(variable_name).collect();
    if count > MAX_TYPE_PARAMETERS {
        names.push("unknown".to_string());
    }
    format!("({})", names.join(", "))
}

fn parameters(data: &Value, key: &str) -> Vec<ParameterInfo> {
    list(data, key)
        .iter()
        .map(|parameter| ParameterInfo {
            label: text(parameter, "label"),
            type_name: signature::render_json(parameter.get("type").unwrap_or(&Value::Null)),
        })
        .collect()
}

fn implementations(data: &Value) -> Implementations {
    let defaults = Implementations::default();
    let Some(implementations) = data.get("implementations") else {
        return defaults;
    };

    Implementations {
        gleam: flag(implementations, "gleam", defaults.gleam),
        uses_erlang_externals: flag(
            implementations,
            "uses-erlang-externals",
            defaults.uses_erlang_externals,
        ),
        uses_javascript_externals: flag(
            implementations,
            "uses-javascript-externals",
            defaults.uses_javascript_externals,
        ),
        can_run_on_erlang: flag(implementations, "can-run-on-erlang", defaults.can_run_on_erlang),
        can_run_on_javascript: flag(
            implementations,
            "can-run-on-javascript",
            defaults.can_run_on_javascript,
        ),
    }
}

// Field readers shared by every decoder in the crate. None of them fail.

/// A string field, or `""`.
pub(crate) fn text(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Documentation given either as a list of lines or a single string.
pub(crate) fn doc_lines(data: &Value, key: &str) -> String {
    match data.get(key) {
        Some(Value::Array(lines)) => lines
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n"),
        Some(Value::String(doc)) => doc.clone(),
        _ => String::new(),
    }
}

/// A boolean field, or `default`.
pub(crate) fn flag(data: &Value, key: &str, default: bool) -> bool {
    data.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// A non-negative integer field, or `0`.
pub(crate) fn count(data: &Value, key: &str) -> u64 {
    data.get(key).and_then(Value::as_u64).unwrap_or_default()
}

/// An array field, or an empty slice.
pub(crate) fn list<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// The entries of an object field, or nothing.
pub(crate) fn entries<'a>(
    data: &'a Value,
    key: &str,
) -> impl Iterator<Item = (&'a String, &'a Value)> + use<'a> {
    data.get(key)
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|map| map.iter())
}

/// `{"message": "..."}` or a bare string.
pub(crate) fn deprecation(data: &Value) -> Option<String> {
    match data.get("deprecation")? {
        Value::String(message) => Some(message.clone()),
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
