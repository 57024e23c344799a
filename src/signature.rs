//! Rendering of Gleam type expressions.
//!
//! Package-interface documents describe every type that appears in a
//! signature as a small JSON tree. This module turns that tree into a
//! [`TypeNode`] and renders it back into the source-like form a Gleam
//! developer would write, e.g. `fn(List(a), fn(a) -> b) -> List(b)`.
//!
//! Rendering is total: malformed nodes become [`TypeNode::Unknown`] and
//! render as `unknown` instead of failing.

use serde_json::Value;

/// Deepest nesting rendered before falling back to `unknown`.
pub const MAX_DEPTH: usize = 64;

const UNKNOWN: &str = "unknown";

/// A type expression as found in a package-interface document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode {
    Named {
        name: String,
        module: String,
        package: String,
        parameters: Vec<TypeNode>,
    },
    Variable {
        id: u64,
    },
    Fn {
        parameters: Vec<TypeNode>,
        return_type: Box<TypeNode>,
    },
    Tuple {
        elements: Vec<TypeNode>,
    },
    Unknown,
}

impl TypeNode {
    /// Builds a node from its JSON form, degrading to [`TypeNode::Unknown`]
    /// wherever the shape is not what the exporter emits.
    pub fn from_json(value: &Value) -> Self {
        Self::from_json_at(value, 0)
    }

    fn from_json_at(value: &Value, depth: usize) -> Self {
        if depth >= MAX_DEPTH {
            return TypeNode::Unknown;
        }
        Self::try_from_json(value, depth).unwrap_or(TypeNode::Unknown)
    }

    fn try_from_json(value: &Value, depth: usize) -> Option<Self> {
        let node = match value.get("kind")?.as_str()? {
            "named" => TypeNode::Named {
                name: value.get("name")?.as_str()?.to_string(),
                module: optional_str(value, "module")?,
                package: optional_str(value, "package")?,
                parameters: optional_nodes(value, "parameters", depth)?,
            },
            "variable" => TypeNode::Variable {
                id: value.get("id")?.as_u64()?,
            },
            "fn" => TypeNode::Fn {
                parameters: optional_nodes(value, "parameters", depth)?,
                return_type: Box::new(Self::from_json_at(value.get("return")?, depth + 1)),
            },
            "tuple" => TypeNode::Tuple {
                elements: nodes(value.get("elements")?, depth)?,
            },
            _ => return None,
        };
        Some(node)
    }
}

/// Absent or null is an empty string, anything but a string is a failure.
fn optional_str(value: &Value, key: &str) -> Option<String> {
    match value.get(key) {
        None | Some(Value::Null) => Some(String::new()),
        Some(v) => v.as_str().map(str::to_string),
    }
}

fn optional_nodes(value: &Value, key: &str, depth: usize) -> Option<Vec<TypeNode>> {
    match value.get(key) {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(v) => nodes(v, depth),
    }
}

fn nodes(value: &Value, depth: usize) -> Option<Vec<TypeNode>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .map(|item| TypeNode::from_json_at(item, depth + 1))
            .collect(),
    )
}

/// Renders a type node. Never fails and never returns an empty string.
pub fn render(node: &TypeNode) -> String {
    render_at(node, 0)
}

/// Shorthand for rendering the JSON form of a type directly.
pub fn render_json(value: &Value) -> String {
    render(&TypeNode::from_json(value))
}

fn render_at(node: &TypeNode, depth: usize) -> String {
    if depth >= MAX_DEPTH {
        return UNKNOWN.to_string();
    }

    match node {
        TypeNode::Named {
            name,
            module,
            package,
            parameters,
        } => {
            if name.is_empty() {
                return UNKNOWN.to_string();
            }
            let mut out = String::new();
            if !package.is_empty() {
                out.push_str(package);
                out.push('/');
            }
            // built-in types live in the `gleam` module and are written bare
            if !module.is_empty() && module != "gleam" {
                out.push_str(module);
                out.push('.');
            }
            out.push_str(name);
            if !parameters.is_empty() {
                out.push('(');
                out.push_str(&render_list(parameters, depth));
                out.push(')');
            }
            out
        }
        TypeNode::Variable { id } => variable_name(*id),
        TypeNode::Fn {
            parameters,
            return_type,
        } => format!(
            "fn({}) -> {}",
            render_list(parameters, depth),
            render_at(return_type, depth + 1)
        ),
        TypeNode::Tuple { elements } => format!("#({})", render_list(elements, depth)),
        TypeNode::Unknown => UNKNOWN.to_string(),
    }
}

fn render_list(nodes: &[TypeNode], depth: usize) -> String {
    nodes
        .iter()
        .map(|node| render_at(node, depth + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Name of the type variable with the given id: `a` to `f`, then `t6`, `t7`...
pub fn variable_name(id: u64) -> String {
    const LETTERS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];
    if id < 6 {
        LETTERS[id as usize].to_string()
    } else {
        format!("t{id}")
    }
}
