use serde::{Deserialize, Serialize};
use serde_json::Value;

const MISSING_DESCRIPTION: &str = "No description";

/// One invocable tool as advertised by an MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Newline-terminated text block describing the tool for the model's
    /// system context.
    ///
    /// Parameters are listed in schema declaration order; a parameter named
    /// in the schema's `required` list gets a `(required)` suffix. Only a
    /// parameter without a `description` key gets the placeholder text.
    pub fn render_for_prompt(&self) -> String {
        let mut out = format!(
            "Tool: {}\nDescription: {}\nArguments:",
            self.name, self.description
        );

        let required: Vec<&str> = self
            .input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        if let Some(properties) = self.input_schema.get("properties").and_then(Value::as_object) {
            for (param, property) in properties {
                let param_description = property
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or(MISSING_DESCRIPTION);
                out.push_str(&format!("\n- {param}: {param_description}"));
                if required.contains(&param.as_str()) {
                    out.push_str(" (required)");
                }
            }
        }
        out.push('\n');
        out
    }
}
