use super::date::GetDateTool;
use super::spec::{ToolDescriptor, ToolSpec};
use super::tool::{CustomIdentifier, Tool, ToolArgs, ToolContext, ToolDef, ToolResult};
use crate::error::{Error, Result};
use futures_util::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

/// Ordered set of tools keyed by name. Cloning is cheap; callables are shared.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of tools, optionally followed by the built-in
    /// diagnostic tools.
    pub fn from_specs<I, T>(tools: I, add_test_tools: bool) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<ToolSpec>,
    {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        if add_test_tools {
            registry.add_test_tools()?;
        }
        Ok(registry)
    }

    pub fn with_test_tools() -> Result<Self> {
        let mut registry = Self::new();
        registry.add_test_tools()?;
        Ok(registry)
    }

    fn add_test_tools(&mut self) -> Result<()> {
        self.register_tool(GetDateTool)
    }

    /// Add one tool. A name that is already registered is rejected.
    pub fn register(&mut self, tool: impl Into<ToolSpec>) -> Result<()> {
        let descriptor = tool.into().into_descriptor()?;
        if self.index.contains_key(&descriptor.name) {
            return Err(Error::DuplicateTool(descriptor.name));
        }
        debug!("registered tool {}", descriptor.name);
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    pub fn register_tool(&mut self, tool: impl Tool + 'static) -> Result<()> {
        self.register(ToolSpec::object(tool))
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Schema list in registration order.
    pub fn tool_defs(&self) -> Vec<ToolDef> {
        self.tools.iter().map(ToolDescriptor::def).collect()
    }

    /// Schema list in the `{type: "function", function: {...}}` wire shape.
    pub fn tools_json(&self) -> Vec<Value> {
        self.tool_defs()
            .iter()
            .map(ToolDef::to_function_json)
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name. Never fails: unknown tools, errors and panics
    /// inside the callable all come back as error results.
    pub async fn call(
        &self,
        name: &str,
        args: &Value,
        custom_identifier: Option<&CustomIdentifier>,
    ) -> ToolResult {
        let Some(tool) = self.get(name) else {
            warn!("Tool not found: {}", name);
            return ToolResult::err(format!("Tool not found: {name}"));
        };

        let bound = ToolArgs::bind(&tool.params, args);
        let ctx = ToolContext::new(
            custom_identifier
                .filter(|_| tool.accepts_custom_identifier)
                .cloned(),
        );
        debug!("Calling tool: {} with args: {}", name, args);

        let outcome = AssertUnwindSafe(async { tool.callable.invoke(bound, ctx).await })
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(value)) => ToolResult::ok(render(value)),
            Ok(Err(e)) => {
                warn!("Tool call failed: {} ({:#})", name, e);
                ToolResult::err(format!("Tool call failed: {e:#}"))
            }
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                warn!("Tool call failed: {} panicked ({})", name, detail);
                ToolResult::err(format!("Tool call failed: {detail}"))
            }
        }
    }
}

fn render(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "tool panicked".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::spec::{AnnotatedTool, BareTool};
    use crate::tools::tool::{Callable, ParamSpec};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn calculate_total() -> BareTool {
        BareTool::new(
            "calculateTotal",
            &["price", "taxRate=0.1"],
            Callable::sync(|args, _| {
                let price = args.require_f64("price")?;
                let rate = args.f64("taxRate").unwrap_or(0.0);
                Ok(price * (1.0 + rate))
            }),
        )
    }

    #[tokio::test]
    async fn unknown_tool_returns_not_found_text() {
        let registry = ToolRegistry::new();
        let result = registry.call("nope", &json!({}), None).await;
        assert!(result.is_error);
        assert_eq!(result.content, "Tool not found: nope");
    }

    #[tokio::test]
    async fn failing_tool_returns_failure_text_with_detail() {
        let mut registry = ToolRegistry::new();
        registry
            .register(AnnotatedTool::new(
                "explode",
                Callable::sync(|_, _| -> anyhow::Result<Value> { anyhow::bail!("disk on fire") }),
            ))
            .unwrap();
        let result = registry.call("explode", &json!({}), None).await;
        assert!(result.is_error);
        assert!(result.content.starts_with("Tool call failed: "));
        assert!(result.content.contains("disk on fire"));
    }

    #[tokio::test]
    async fn panicking_tool_is_contained() {
        let mut registry = ToolRegistry::new();
        registry
            .register(AnnotatedTool::new(
                "panics",
                Callable::sync(|_, _| -> anyhow::Result<Value> { panic!("index out of range") }),
            ))
            .unwrap();
        let result = registry.call("panics", &json!({}), None).await;
        assert!(result.is_error);
        assert!(result.content.contains("index out of range"));
    }

    #[tokio::test]
    async fn bound_defaults_apply_to_missing_arguments() {
        let registry = ToolRegistry::from_specs([calculate_total()], false).unwrap();
        let result = registry
            .call("calculateTotal", &json!({ "price": 100 }), None)
            .await;
        assert!(!result.is_error);
        assert_eq!(result.content.parse::<f64>().unwrap().round(), 110.0);
    }

    #[tokio::test]
    async fn string_results_are_not_json_quoted() {
        let mut registry = ToolRegistry::new();
        registry
            .register(AnnotatedTool::new("hello", Callable::sync(|_, _| Ok("hi there"))))
            .unwrap();
        assert_eq!(registry.call("hello", &json!({}), None).await.content, "hi there");
    }

    #[tokio::test]
    async fn identifier_only_tool_receives_exactly_the_identifier() {
        let seen: Arc<Mutex<Option<(usize, Option<CustomIdentifier>)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let mut registry = ToolRegistry::new();
        registry
            .register(
                AnnotatedTool::new(
                    "whoAmI",
                    Callable::sync(move |args, ctx| {
                        *sink.lock().unwrap() = Some((args.len(), ctx.custom_identifier().cloned()));
                        Ok("ok")
                    }),
                )
                .accepts_custom_identifier(),
            )
            .unwrap();
        let id = CustomIdentifier::new(json!({ "userId": "u-42", "plan": "pro" }));
        registry.call("whoAmI", &json!({}), Some(&id)).await;
        let (arg_count, received) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(arg_count, 0);
        assert_eq!(received, Some(id));
    }

    #[tokio::test]
    async fn identifier_travels_alongside_business_arguments() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                AnnotatedTool::new(
                    "greet",
                    Callable::sync(|args, ctx| {
                        let user = ctx
                            .custom_identifier()
                            .and_then(|id| id.get("name"))
                            .and_then(Value::as_str)
                            .unwrap_or("stranger")
                            .to_string();
                        Ok(format!("{}, {user}", args.require_str("greeting")?))
                    }),
                )
                .param(ParamSpec::string("greeting"))
                .accepts_custom_identifier(),
            )
            .unwrap();
        let id = CustomIdentifier::new(json!({ "name": "Sam" }));
        let result = registry
            .call("greet", &json!({ "greeting": "Hello" }), Some(&id))
            .await;
        assert_eq!(result.content, "Hello, Sam");
    }

    #[tokio::test]
    async fn identifier_is_withheld_from_tools_that_did_not_opt_in() {
        let mut registry = ToolRegistry::new();
        registry
            .register(AnnotatedTool::new(
                "peek",
                Callable::sync(|_, ctx| Ok(ctx.custom_identifier().is_some())),
            ))
            .unwrap();
        let id = CustomIdentifier::new(json!("secret"));
        assert_eq!(registry.call("peek", &json!({}), Some(&id)).await.content, "false");
    }

    #[tokio::test]
    async fn async_tools_are_awaited() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                AnnotatedTool::new(
                    "slowDouble",
                    Callable::from_async(|args: ToolArgs, _| async move {
                        tokio::task::yield_now().await;
                        Ok::<_, anyhow::Error>(args.require_f64("n")? * 2.0)
                    }),
                )
                .param(ParamSpec::number("n")),
            )
            .unwrap();
        assert_eq!(registry.call("slowDouble", &json!({ "n": 4 }), None).await.content, "8.0");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(calculate_total()).unwrap();
        let err = registry.register(calculate_total()).unwrap_err();
        assert!(matches!(err, Error::DuplicateTool(name) if name == "calculateTotal"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn tools_json_matches_wire_shape_in_registration_order() {
        let registry = ToolRegistry::from_specs([calculate_total()], true).unwrap();
        let tools = registry.tools_json();
        assert_eq!(registry.names(), ["calculateTotal", "getDate"]);
        assert_eq!(tools[0]["type"], "function");
        assert_eq!(tools[0]["function"]["name"], "calculateTotal");
        assert_eq!(tools[0]["function"]["description"], "Calculate Total");
        assert_eq!(tools[0]["function"]["parameters"]["type"], "object");
        assert_eq!(tools[1]["function"]["name"], "getDate");
    }
}
