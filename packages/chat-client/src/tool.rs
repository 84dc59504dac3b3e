//! Tool calling traits and types.
//!
//! Tools have typed arguments whose JSON schema is generated with `schemars`
//! and sent to the model; the model answers with a [`ToolCall`] naming the
//! tool and carrying arguments that conform to that schema.
//!
//! # Example
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//! use chat_client::Tool;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct SaveArgs {
//!     text: String,
//! }
//!
//! struct Save;
//!
//! #[async_trait]
//! impl Tool for Save {
//!     const NAME: &'static str = "Save";
//!     type Args = SaveArgs;
//!     type Output = String;
//!     type Error = std::convert::Infallible;
//!
//!     fn description(&self) -> &str {
//!         "Save the text"
//!     }
//!
//!     async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
//!         Ok(args.text)
//!     }
//! }
//! ```

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::ToolSchema;

/// A tool that can be called by the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    const NAME: &'static str;

    /// Argument type (must derive `Deserialize` and `JsonSchema`).
    type Args: DeserializeOwned + JsonSchema + Send;

    /// Output type (must derive `Serialize`).
    type Output: Serialize + Send;

    type Error: std::error::Error + Send + Sync + 'static;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// Execute the tool with the given arguments.
    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error>;

    /// Definition sent to the model.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: self.description().to_string(),
            parameters: Self::Args::parameters_schema(),
        }
    }
}

/// Tool definition as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,

    /// JSON schema for the tool's parameters
    pub parameters: Value,
}

impl ToolDefinition {
    /// Convert to the chat-completions `tools` entry format.
    pub fn to_openai_format(&self) -> Value {
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

/// A tool call issued by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireToolCall", into = "WireToolCall")]
pub struct ToolCall {
    /// Id used to match the tool result to this call
    pub id: String,

    /// Name of the tool to call
    pub name: String,

    /// Decoded arguments
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Parse arguments into a typed struct.
    pub fn parse_args<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.arguments.clone())
    }
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunction,
}

#[derive(Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

fn function_kind() -> String {
    "function".to_string()
}

impl From<WireToolCall> for ToolCall {
    fn from(wire: WireToolCall) -> Self {
        // Providers send arguments as a JSON-encoded string; some send the object itself.
        let arguments = match wire.function.arguments {
            Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        Self {
            id: wire.id,
            name: wire.function.name,
            arguments,
        }
    }
}

impl From<ToolCall> for WireToolCall {
    fn from(call: ToolCall) -> Self {
        let arguments = match call.arguments {
            Value::String(raw) => raw,
            other => other.to_string(),
        };
        Self {
            id: call.id,
            kind: function_kind(),
            function: WireFunction {
                name: call.name,
                arguments: Value::String(arguments),
            },
        }
    }
}
