use super::tool::{ParamSpec, Tool, ToolArgs, ToolContext};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

/// Built-in diagnostic tool: today's date, optionally with the time.
pub struct GetDateTool;

#[async_trait]
impl Tool for GetDateTool {
    fn name(&self) -> &str {
        "getDate"
    }
    fn description(&self) -> &str {
        "Get the current date, optionally including the time"
    }
    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::boolean("includeTime")
            .description("Include the time of day (UTC) in the result")
            .optional()]
    }
    async fn call(&self, args: ToolArgs, _ctx: ToolContext) -> Result<Value> {
        let now = Utc::now();
        let text = if args.bool("includeTime").unwrap_or(false) {
            now.to_rfc3339_opts(SecondsFormat::Millis, true)
        } else {
            now.format("%Y-%m-%d").to_string()
        };
        Ok(Value::String(text))
    }
}

#[cfg(test)]
mod tests {
    use crate::tools::registry::ToolRegistry;
    use chrono::{DateTime, NaiveDate};
    use serde_json::json;

    #[tokio::test]
    async fn date_only_by_default() {
        let registry = ToolRegistry::with_test_tools().unwrap();
        let result = registry.call("getDate", &json!({}), None).await;
        assert!(!result.is_error);
        assert!(NaiveDate::parse_from_str(&result.content, "%Y-%m-%d").is_ok());
    }

    #[tokio::test]
    async fn include_time_yields_rfc3339() {
        let registry = ToolRegistry::with_test_tools().unwrap();
        let result = registry
            .call("getDate", &json!({ "includeTime": true }), None)
            .await;
        assert!(result.content.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&result.content).is_ok());
    }

    #[test]
    fn include_time_is_optional_in_schema() {
        let registry = ToolRegistry::with_test_tools().unwrap();
        let def = &registry.tool_defs()[0];
        assert_eq!(def.parameters["required"], json!([]));
        assert_eq!(def.parameters["properties"]["includeTime"]["type"], "boolean");
    }
}
