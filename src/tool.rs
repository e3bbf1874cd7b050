//! The tool boundary contract: the shape a caller (an LLM runtime wiring up
//! `winbash` as a tool) sends requests in, and the JSON tool definition it
//! registers against, per `SPEC_FULL.md` §6.

use serde::Deserialize;
use serde_json::{Value, json};

/// A content block as it would appear on either side of the tool boundary.
/// Only [`ContentBlock::ToolUse`] and [`ContentBlock::ToolResult`] are part
/// of the core boundary this crate implements; the other variants are
/// carried so the type can round-trip a full conversation transcript
/// without losing data it doesn't otherwise interpret.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        text: String,
        signature: Option<String>,
    },
    RedactedThinking {
        data: String,
    },
    ToolUse {
        tool_name: String,
        tool_id: String,
        tool_input: Value,
    },
    ToolResult {
        tool_id: String,
        content: String,
        is_error: bool,
    },
}

/// The request payload for one `execute` call.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolInput {
    pub command: String,
    pub description: String,
}

/// The tool definition this crate registers, matching `SPEC_FULL.md` §6's
/// literal JSON schema byte-for-byte.
pub fn get_definition() -> Value {
    json!({
        "name": "bash_tool",
        "description": "Run a bash command in the container",
        "input_schema": {
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "Bash command to run in container" },
                "description": { "type": "string", "description": "Why I'm running this command" }
            },
            "required": ["command", "description"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_matches_literal_schema() {
        let definition = get_definition();
        assert_eq!(definition["name"], "bash_tool");
        assert_eq!(
            definition["input_schema"]["required"],
            json!(["command", "description"])
        );
    }

    #[test]
    fn tool_input_deserializes_from_json() {
        let input: ToolInput =
            serde_json::from_str(r#"{"command": "ls", "description": "list files"}"#).unwrap();
        assert_eq!(input.command, "ls");
        assert_eq!(input.description, "list files");
    }
}
