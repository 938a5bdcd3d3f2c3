//! Tool registration and dispatch

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::llm::{ToolCallRequest, ToolDefinition};

use super::builtin;
use super::{Tool, ToolContext, ToolError, ToolResult};

/// Holds the tools a run advertises and routes invocations to them
///
/// Registration is where invalid tools are caught; dispatch never fails the
/// run. An unknown name or a failing tool becomes an error-flagged result the
/// model can read and recover from.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, so advertised definitions are stable
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// The standard toolset for a summarization run
    pub fn standard() -> Result<Self, ToolError> {
        let mut registry = Self::new();
        registry.register(Arc::new(builtin::GetDocumentInfo))?;
        registry.register(Arc::new(builtin::ReadLines))?;
        registry.register(Arc::new(builtin::SearchDocument))?;
        registry.register(Arc::new(builtin::ReadSummary))?;
        registry.register(Arc::new(builtin::FillSection))?;
        registry.register(Arc::new(builtin::EditSummary))?;
        registry.register(Arc::new(builtin::GetProgress))?;
        Ok(registry)
    }

    /// Register a tool, validating its name and parameter schema
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        debug!(%name, "ToolRegistry::register: called");

        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateName(name));
        }
        validate_schema(&name, &tool.input_schema())?;

        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool definitions to advertise, in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .map(|name| {
                let tool = &self.tools[name];
                ToolDefinition::new(tool.name(), tool.description(), tool.input_schema())
            })
            .collect()
    }

    /// Execute one tool call, rendering the outcome for the model
    pub async fn dispatch(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            warn!(%name, "ToolRegistry::dispatch: unknown tool");
            return ToolResult::error(format!("Function {name} not recognized."));
        };

        info!(%name, "ToolRegistry::dispatch: executing");
        match tool.execute(args, ctx).await {
            Ok(output) => ToolResult::ok(output.render()),
            Err(e) => {
                warn!(%name, error = %e, "ToolRegistry::dispatch: tool failed");
                ToolResult::error(format!("Error executing {name}: {e}"))
            }
        }
    }

    /// Execute a batch of tool calls sequentially, in request order
    ///
    /// Sequential on purpose: tools share the tracker and the summary file,
    /// and the model may rely on earlier calls in the batch having happened.
    pub async fn dispatch_all(
        &self,
        calls: &[ToolCallRequest],
        ctx: &ToolContext,
    ) -> Vec<(String, ToolResult)> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let result = self.dispatch(&call.name, call.arguments.clone(), ctx).await;
            results.push((call.id.clone(), result));
        }
        results
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A parameter schema must be a JSON Schema object whose `required` names
/// all exist under `properties`
fn validate_schema(tool: &str, schema: &serde_json::Value) -> Result<(), ToolError> {
    let invalid = |reason: &str| ToolError::InvalidSchema {
        tool: tool.to_string(),
        reason: reason.to_string(),
    };

    let obj = schema.as_object().ok_or_else(|| invalid("schema is not an object"))?;
    if obj.get("type").and_then(|t| t.as_str()) != Some("object") {
        return Err(invalid("schema type must be \"object\""));
    }
    let properties = obj
        .get("properties")
        .and_then(|p| p.as_object())
        .ok_or_else(|| invalid("schema has no properties object"))?;

    if let Some(required) = obj.get("required") {
        let required = required
            .as_array()
            .ok_or_else(|| invalid("required must be an array"))?;
        for entry in required {
            let name = entry
                .as_str()
                .ok_or_else(|| invalid("required entries must be strings"))?;
            if !properties.contains_key(name) {
                return Err(invalid(&format!("required property {name} not in properties")));
            }
        }
    }

    Ok(())
}
