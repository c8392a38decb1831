use serde_json::{Map, Value};

/// What the model's reply asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyDirective {
    /// `{"tool": "<name>", "arguments": {...}}`, nothing else.
    ToolCall { tool: String, arguments: Value },
    PlainText(String),
    /// Looked like an envelope but could not be used as one.
    Malformed { reason: String },
}

impl ReplyDirective {
    pub fn is_tool_call(&self) -> bool {
        matches!(self, ReplyDirective::ToolCall { .. })
    }
}

/// Classifies a completion reply. Only the whole reply, or the whole body of a
/// single fenced code block, is considered as an envelope.
pub fn parse_reply(content: &str) -> ReplyDirective {
    let trimmed = content.trim();
    let candidate = strip_code_fence(trimmed).unwrap_or(trimmed);

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => classify_object(map, content),
        Ok(_) => ReplyDirective::PlainText(content.to_string()),
        Err(err) if candidate.starts_with('{') => ReplyDirective::Malformed {
            reason: format!("invalid JSON object: {err}"),
        },
        Err(_) => ReplyDirective::PlainText(content.to_string()),
    }
}

fn classify_object(map: Map<String, Value>, content: &str) -> ReplyDirective {
    if !map.contains_key("tool") {
        return ReplyDirective::PlainText(content.to_string());
    }
    if map.len() != 2 {
        return ReplyDirective::Malformed {
            reason: "tool envelope must contain exactly 'tool' and 'arguments'".to_string(),
        };
    }
    match (map.get("tool"), map.get("arguments")) {
        (Some(Value::String(tool)), Some(arguments @ Value::Object(_))) if !tool.trim().is_empty() => {
            ReplyDirective::ToolCall {
                tool: tool.clone(),
                arguments: arguments.clone(),
            }
        }
        (Some(Value::String(_)), Some(Value::Object(_))) => ReplyDirective::Malformed {
            reason: "tool name is empty".to_string(),
        },
        (Some(Value::String(_)), _) => ReplyDirective::Malformed {
            reason: "'arguments' must be a JSON object".to_string(),
        },
        _ => ReplyDirective::Malformed {
            reason: "'tool' must be a string".to_string(),
        },
    }
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let body = text.strip_prefix("```")?.strip_suffix("```")?;
    let body = body
        .strip_prefix("json")
        .or_else(|| body.strip_prefix("JSON"))
        .unwrap_or(body);
    if body.contains("```") {
        return None;
    }
    Some(body.trim())
}
