const TOOL_USE_INSTRUCTIONS: &str = "You have access to the tools listed below. \
Choose the appropriate tool based on the user's request. \
If no tool is needed, reply directly.\n\n\
IMPORTANT: When you need to use a tool, respond with nothing but a single JSON object \
in exactly this format:\n\
{\"tool\": \"<tool-name>\", \"arguments\": {\"<argument-name>\": <value>}}\n\n\
After the tool runs you will receive its result. Use it to write a natural, \
helpful answer that focuses on the information the user asked for.";

const PLAIN_TEXT_INSTRUCTIONS: &str =
    "Respond in plain text without Markdown formatting; the answer is printed to a terminal.";

/// Static formatting guidance for the system turn, if any.
pub fn formatting_instructions(markdown_formatting: bool) -> Option<String> {
    (!markdown_formatting).then(|| PLAIN_TEXT_INSTRUCTIONS.to_string())
}

/// System turn content: tool-use protocol and catalog (when tools are
/// available) followed by formatting guidance. `None` when both are absent.
pub fn system_preamble(tool_catalog: Option<&str>, formatting: Option<&str>) -> Option<String> {
    let mut sections = Vec::new();
    if let Some(catalog) = tool_catalog.filter(|text| !text.trim().is_empty()) {
        sections.push(format!("{TOOL_USE_INSTRUCTIONS}\n\nAvailable tools:\n{catalog}"));
    }
    if let Some(formatting) = formatting.filter(|text| !text.trim().is_empty()) {
        sections.push(formatting.to_string());
    }
    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

/// User turn text, with piped input labelled as context.
pub fn compose_user_turn(prompt: &str, injected_context: Option<&str>) -> String {
    match injected_context.map(str::trim).filter(|context| !context.is_empty()) {
        Some(context) => format!("Context:\n{context}\n\nPrompt: {prompt}"),
        None => prompt.to_string(),
    }
}

/// Text of a tool result as shown to the model: MCP text content blocks,
/// a bare string, or compact JSON for anything else.
pub fn tool_result_text(payload: &serde_json::Value) -> String {
    use serde_json::Value;

    if let Value::String(text) = payload {
        return text.clone();
    }
    if let Some(blocks) = payload.get("content").and_then(Value::as_array) {
        let texts: Vec<&str> = blocks
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect();
        if !texts.is_empty() {
            return texts.join("\n");
        }
    }
    payload.to_string()
}

pub fn tool_result_turn(tool: &str, payload: &serde_json::Value) -> String {
    format!("Tool '{tool}' returned:\n{}", tool_result_text(payload))
}
