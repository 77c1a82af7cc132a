//! Parameter schemas: inference from declared signatures and the
//! `{type: "object", properties, required}` wire shape.

use super::tool::{ParamSpec, ParamType};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;
use tracing::warn;

static CAPITAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([A-Z])").unwrap());
static TOOL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap());

/// `calculateTotal` -> `Calculate Total`
pub fn auto_describe(identifier: &str) -> String {
    let spaced = CAPITAL.replace_all(identifier, " ${1}");
    let mut chars = spaced.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    capitalized.trim().to_string()
}

pub(crate) fn is_valid_tool_name(name: &str) -> bool {
    TOOL_NAME.is_match(name)
}

/// Coarse type from the textual default of a declared parameter.
pub fn infer_type(default: Option<&str>, param: &str) -> ParamType {
    match default {
        Some("true") | Some("false") => ParamType::Boolean,
        Some(d) if serde_json::from_str::<serde_json::Number>(d).is_ok() => ParamType::Number,
        Some(_) => {
            warn!(
                "Weak type information for parameter \"{param}\": inferred \"string\" from its default. \
                 Consider providing type metadata."
            );
            ParamType::String
        }
        None => {
            warn!(
                "No type information provided for parameter \"{param}\". Defaulting to \"string\". \
                 Consider providing type metadata."
            );
            ParamType::String
        }
    }
}

/// Parse a declared signature such as `["price", "taxRate = 0.1"]`.
///
/// Entries without a default are required. Defaults are bound when the model
/// omits the argument: JSON literals as-is, anything else as a string with
/// surrounding quotes removed.
pub fn parse_signature<S: AsRef<str>>(signature: &[S]) -> Vec<ParamSpec> {
    signature
        .iter()
        .filter_map(|entry| {
            let entry = entry.as_ref().trim();
            let (name, default) = match entry.split_once('=') {
                Some((name, default)) => (name.trim(), Some(default.trim())),
                None => (entry, None),
            };
            if name.is_empty() {
                return None;
            }
            let default = default.filter(|d| !d.is_empty());
            let mut spec = ParamSpec::new(name, infer_type(default, name))
                .description(auto_describe(name));
            if let Some(text) = default {
                spec = spec.default_value(default_literal(text));
            }
            Some(spec)
        })
        .collect()
}

fn default_literal(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| {
        let unquoted = text
            .strip_prefix('\'')
            .and_then(|t| t.strip_suffix('\''))
            .or_else(|| text.strip_prefix('`').and_then(|t| t.strip_suffix('`')))
            .unwrap_or(text);
        Value::String(unquoted.to_string())
    })
}

/// Required = every parameter not marked optional.
pub fn parameters_schema(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for p in params {
        properties.insert(
            p.name.clone(),
            serde_json::to_value(p).unwrap_or_else(|_| json!({ "type": "string" })),
        );
        if !p.optional {
            required.push(Value::String(p.name.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}
