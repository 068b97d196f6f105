//! Diagnostics profile: tools for checking a federation end to end.

use super::Profile;
use crate::protocol::{Args, Content, ToolError, ToolOutput, ToolSpec};
use serde_json::json;

/// A 1x1 transparent PNG.
const PIXEL_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

#[derive(Debug, Default)]
pub struct Diagnostics;

impl Profile for Diagnostics {
    fn server_name(&self) -> &'static str {
        "diagnostics"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        let no_args = json!({"type": "object", "properties": {}});
        vec![
            ToolSpec {
                name: "ping",
                description: "Answer with pong.",
                input_schema: no_args.clone(),
            },
            ToolSpec {
                name: "snapshot",
                description: "Return a caption and a tiny image.",
                input_schema: no_args,
            },
            ToolSpec {
                name: "fail",
                description: "Always report a tool failure.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "message": {"type": "string", "description": "Failure text"}
                    }
                }),
            },
        ]
    }

    fn call_tool(&mut self, name: &str, args: &Args) -> Result<ToolOutput, ToolError> {
        match name {
            "ping" => Ok(ToolOutput::text("pong")),
            "snapshot" => Ok(ToolOutput {
                content: vec![
                    Content::Text {
                        text: "Snapshot taken".to_string(),
                    },
                    Content::Image {
                        data: PIXEL_PNG.to_string(),
                        mime_type: "image/png".to_string(),
                    },
                ],
                is_error: false,
            }),
            "fail" => {
                let message = args.opt_str("message")?.unwrap_or("Diagnostic failure");
                Ok(ToolOutput::failure(message))
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }
}
