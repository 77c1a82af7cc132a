use super::schema::{auto_describe, is_valid_tool_name, parameters_schema, parse_signature};
use super::tool::{Callable, ParamSpec, Tool, ToolDef};
use crate::error::{Error, Result};
use std::sync::Arc;

/// A callable registered with only a declared signature; its schema and
/// description are inferred.
#[derive(Debug, Clone)]
pub struct BareTool {
    name: String,
    signature: Vec<String>,
    callable: Callable,
}

impl BareTool {
    pub fn new<S: AsRef<str>>(name: impl Into<String>, signature: &[S], callable: Callable) -> Self {
        Self {
            name: name.into(),
            signature: signature.iter().map(|s| s.as_ref().to_string()).collect(),
            callable,
        }
    }
}

/// A callable with explicit metadata. This is the preferred registration path.
#[derive(Debug, Clone)]
pub struct AnnotatedTool {
    name: String,
    description: Option<String>,
    parameters: Vec<ParamSpec>,
    accepts_custom_identifier: bool,
    callable: Callable,
}

impl AnnotatedTool {
    pub fn new(name: impl Into<String>, callable: Callable) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters: Vec::new(),
            accepts_custom_identifier: false,
            callable,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = ParamSpec>) -> Self {
        self.parameters.extend(params);
        self
    }

    pub fn accepts_custom_identifier(mut self) -> Self {
        self.accepts_custom_identifier = true;
        self
    }
}

/// Everything the registry accepts, tagged by shape.
#[derive(Clone)]
pub enum ToolSpec {
    Bare(BareTool),
    Annotated(AnnotatedTool),
    Object(Arc<dyn Tool>),
}

impl ToolSpec {
    pub fn object(tool: impl Tool + 'static) -> Self {
        Self::Object(Arc::new(tool))
    }

    pub(crate) fn into_descriptor(self) -> Result<ToolDescriptor> {
        let descriptor = match self {
            Self::Bare(bare) => ToolDescriptor {
                description: auto_describe(&bare.name),
                params: parse_signature(bare.signature.as_slice()),
                accepts_custom_identifier: false,
                callable: bare.callable,
                name: bare.name,
            },
            Self::Annotated(tool) => ToolDescriptor {
                description: tool
                    .description
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| auto_describe(&tool.name)),
                params: tool.parameters.into_iter().map(fill_description).collect(),
                accepts_custom_identifier: tool.accepts_custom_identifier,
                callable: tool.callable,
                name: tool.name,
            },
            Self::Object(tool) => ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                params: tool.parameters().into_iter().map(fill_description).collect(),
                accepts_custom_identifier: tool.accepts_custom_identifier(),
                callable: Callable::from_tool(tool),
            },
        };
        if !is_valid_tool_name(&descriptor.name) {
            return Err(Error::config(format!(
                "Invalid tool name '{}': use 1-64 letters, digits, '_' or '-'",
                descriptor.name
            )));
        }
        Ok(descriptor)
    }
}

fn fill_description(mut param: ParamSpec) -> ParamSpec {
    if param.description.is_empty() {
        param.description = auto_describe(&param.name);
    }
    param
}

impl From<BareTool> for ToolSpec {
    fn from(tool: BareTool) -> Self {
        Self::Bare(tool)
    }
}

impl From<AnnotatedTool> for ToolSpec {
    fn from(tool: AnnotatedTool) -> Self {
        Self::Annotated(tool)
    }
}

impl From<Arc<dyn Tool>> for ToolSpec {
    fn from(tool: Arc<dyn Tool>) -> Self {
        Self::Object(tool)
    }
}

/// The canonical registry record every registration shape is normalized into.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    pub accepts_custom_identifier: bool,
    pub(crate) callable: Callable,
}

impl ToolDescriptor {
    pub fn def(&self) -> ToolDef {
        ToolDef {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: parameters_schema(&self.params),
        }
    }
}
