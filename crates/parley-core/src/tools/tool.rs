use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A tool that can be registered as an object rather than as a closure.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Vec<ParamSpec>;
    fn accepts_custom_identifier(&self) -> bool {
        false
    }
    async fn call(&self, args: ToolArgs, ctx: ToolContext) -> Result<Value>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn err(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Schema entry handed to providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDef {
    /// `{type: "function", function: {name, description, parameters}}`
    pub fn to_function_json(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

/// Metadata for one declared tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    /// Bound in place of a missing argument.
    #[serde(skip)]
    pub default: Option<Value>,
    /// Extra JSON-schema keywords (`enum`, `items`, ...) passed through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            optional: false,
            default: None,
            extra: Map::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String)
    }
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Number)
    }
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer)
    }
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Boolean)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Marks the parameter optional and binds `value` when it is omitted.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.optional = true;
        self.default = Some(value.into());
        self
    }

    pub fn keyword(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Arguments bound in declared parameter order.
///
/// Every declared parameter has a slot; a parameter the model omitted holds
/// its default or `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    names: Vec<String>,
    values: Vec<Value>,
}

impl ToolArgs {
    pub(crate) fn bind(params: &[ParamSpec], args: &Value) -> Self {
        let mut names = Vec::with_capacity(params.len());
        let mut values = Vec::with_capacity(params.len());
        for p in params {
            let value = match args.get(&p.name) {
                Some(v) => v.clone(),
                None => p.default.clone().unwrap_or(Value::Null),
            };
            names.push(p.name.clone());
            values.push(value);
        }
        Self { names, values }
    }

    /// Positional view in declared order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `None` for undeclared, missing, or `null` arguments.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.values[i])
            .filter(|v| !v.is_null())
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Numbers, or strings holding a number.
    pub fn f64(&self, name: &str) -> Option<f64> {
        let v = self.get(name)?;
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        let v = self.get(name)?;
        v.as_bool().or_else(|| match v.as_str() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        })
    }

    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.str(name)
            .ok_or_else(|| anyhow::anyhow!("missing required argument: {name}"))
    }

    pub fn require_f64(&self, name: &str) -> Result<f64> {
        self.f64(name)
            .ok_or_else(|| anyhow::anyhow!("missing or non-numeric argument: {name}"))
    }

    /// The bound arguments as an object, without `null` slots.
    pub fn to_object(&self) -> Value {
        let map = self
            .names
            .iter()
            .zip(&self.values)
            .filter(|(_, v)| !v.is_null())
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect::<Map<_, _>>();
        Value::Object(map)
    }

    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_object())?)
    }
}

/// Opaque per-conversation context passed through to opted-in tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomIdentifier(pub Value);

impl CustomIdentifier {
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl From<Value> for CustomIdentifier {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Call-time context. The custom identifier is present only when one was
/// supplied and the tool opted in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolContext {
    custom_identifier: Option<CustomIdentifier>,
}

impl ToolContext {
    pub fn new(custom_identifier: Option<CustomIdentifier>) -> Self {
        Self { custom_identifier }
    }

    pub fn custom_identifier(&self) -> Option<&CustomIdentifier> {
        self.custom_identifier.as_ref()
    }
}

pub type ToolFuture = BoxFuture<'static, Result<Value>>;

type ToolFn = dyn Fn(ToolArgs, ToolContext) -> ToolFuture + Send + Sync;

/// A tool body, synchronous or asynchronous, behind one calling convention.
#[derive(Clone)]
pub struct Callable(Arc<ToolFn>);

impl Callable {
    pub fn sync<F, R>(f: F) -> Self
    where
        F: Fn(ToolArgs, ToolContext) -> Result<R> + Send + Sync + 'static,
        R: Into<Value>,
    {
        let f = Arc::new(f);
        Self(Arc::new(move |args: ToolArgs, ctx: ToolContext| -> ToolFuture {
            let f = Arc::clone(&f);
            Box::pin(async move {
                let out: Result<Value> = f(args, ctx).map(Into::into);
                out
            })
        }))
    }

    pub fn from_async<F, Fut, R>(f: F) -> Self
    where
        F: Fn(ToolArgs, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Into<Value>,
    {
        Self(Arc::new(move |args: ToolArgs, ctx: ToolContext| -> ToolFuture {
            let fut = f(args, ctx);
            Box::pin(async move {
                let out: Result<Value> = fut.await.map(Into::into);
                out
            })
        }))
    }

    pub(crate) fn from_tool(tool: Arc<dyn Tool>) -> Self {
        Self(Arc::new(move |args: ToolArgs, ctx: ToolContext| -> ToolFuture {
            let tool = Arc::clone(&tool);
            Box::pin(async move { tool.call(args, ctx).await })
        }))
    }

    pub(crate) fn invoke(&self, args: ToolArgs, ctx: ToolContext) -> ToolFuture {
        (self.0)(args, ctx)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> Vec<ParamSpec> {
        vec![
            ParamSpec::number("price"),
            ParamSpec::number("taxRate").default_value(0.1),
            ParamSpec::string("note").optional(),
        ]
    }

    #[test]
    fn bind_follows_declared_order_with_placeholders() {
        let args = ToolArgs::bind(&params(), &json!({ "note": "gift", "price": 10 }));
        assert_eq!(args.values(), &[json!(10), json!(0.1), json!("gift")]);
        assert_eq!(args.f64("price"), Some(10.0));
        assert_eq!(args.f64("taxRate"), Some(0.1));
    }

    #[test]
    fn missing_argument_without_default_is_null() {
        let args = ToolArgs::bind(&params(), &json!({}));
        assert_eq!(args.values()[0], Value::Null);
        assert!(args.get("price").is_none());
        assert!(args.require_f64("price").is_err());
    }

    #[test]
    fn undeclared_arguments_are_not_bound() {
        let args = ToolArgs::bind(&params(), &json!({ "price": 1, "extra": true }));
        assert!(args.get("extra").is_none());
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn non_object_arguments_bind_nothing() {
        let args = ToolArgs::bind(&params(), &json!([1, 2, 3]));
        assert!(args.get("price").is_none());
    }

    #[test]
    fn parse_into_typed_struct() {
        #[derive(Deserialize)]
        struct Order {
            price: f64,
            #[serde(rename = "taxRate")]
            tax_rate: f64,
        }
        let args = ToolArgs::bind(&params(), &json!({ "price": 20 }));
        let order: Order = args.parse().unwrap();
        assert_eq!(order.price, 20.0);
        assert_eq!(order.tax_rate, 0.1);
    }

    #[test]
    fn param_spec_serializes_schema_keywords_verbatim() {
        let spec = ParamSpec::string("unit")
            .description("Temperature unit")
            .optional()
            .keyword("enum", json!(["c", "f"]));
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({
                "type": "string",
                "description": "Temperature unit",
                "optional": true,
                "enum": ["c", "f"]
            })
        );
    }

    #[tokio::test]
    async fn sync_and_async_callables_share_a_convention() {
        let sync = Callable::sync(|args, _| Ok(args.require_f64("price")? * 2.0));
        let asynchronous = Callable::from_async(|args: ToolArgs, _| async move {
            Ok::<_, anyhow::Error>(format!("{} items", args.require_f64("price")?))
        });
        let args = ToolArgs::bind(&params(), &json!({ "price": 3 }));
        assert_eq!(
            sync.invoke(args.clone(), ToolContext::default()).await.unwrap(),
            json!(6.0)
        );
        assert_eq!(
            asynchronous
                .invoke(args, ToolContext::default())
                .await
                .unwrap(),
            json!("3 items")
        );
    }
}
