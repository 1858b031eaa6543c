//! Prompt templates and tool errors behind the JSON-RPC facade.

use derive_more::{Display, Error};
use rmcp::model::{Prompt, PromptArgument};
use std::collections::BTreeMap;

/// One template placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Placeholder name, written `{name}` in the template.
    pub name: &'static str,
    /// Meaning.
    pub description: &'static str,
    /// Whether rendering fails without it.
    pub required: bool,
}

impl Placeholder {
    /// A required argument.
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        Self { name, description, required: true }
    }

    /// An optional argument; renders empty when missing.
    pub const fn optional(name: &'static str, description: &'static str) -> Self {
        Self { name, description, required: false }
    }
}

/// A prompt template an agent sends to its model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSpec {
    /// Prompt name.
    pub name: &'static str,
    /// What the prompt asks for.
    pub description: &'static str,
    /// Arguments substituted into the template.
    pub arguments: Vec<Placeholder>,
    /// Template text.
    pub template: &'static str,
}

impl PromptSpec {
    /// The `prompts/list` entry.
    pub fn to_prompt(&self) -> Prompt {
        let arguments = self
            .arguments
            .iter()
            .map(|arg| {
                PromptArgument::new(arg.name)
                    .with_description(arg.description)
                    .with_required(arg.required)
            })
            .collect();
        Prompt::new(self.name, Some(self.description), Some(arguments))
    }

    /// Substitutes `{name}` placeholders.
    ///
    /// # Errors
    ///
    /// [`ToolError::InvalidArguments`] when a required argument is missing.
    pub fn render(&self, args: &BTreeMap<String, String>) -> Result<String, ToolError> {
        let mut text = self.template.to_string();
        for arg in &self.arguments {
            let value = match args.get(arg.name) {
                Some(value) => value.as_str(),
                None if arg.required => {
                    return Err(ToolError::InvalidArguments {
                        message: format!("Prompt {} requires argument {}", self.name, arg.name),
                    });
                }
                None => "",
            };
            text = text.replace(&format!("{{{}}}", arg.name), value);
        }
        Ok(text)
    }
}

/// Why a tool or prompt call failed.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No tool, resource or prompt by that name.
    #[display("Unknown {kind}: {name}")]
    NotFound {
        /// `tool`, `resource` or `prompt`.
        kind: &'static str,
        /// Requested name.
        name: String,
    },
    /// Arguments did not match the schema.
    #[display("Invalid arguments: {message}")]
    InvalidArguments {
        /// Details.
        message: String,
    },
    /// The tool ran and failed.
    #[display("Tool failed: {message}")]
    Failed {
        /// Details.
        message: String,
    },
}

impl ToolError {
    /// Unknown tool.
    pub fn unknown_tool(name: &str) -> Self {
        Self::NotFound { kind: "tool", name: name.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> PromptSpec {
        PromptSpec {
            name: "demo",
            description: "demo",
            arguments: vec![
                Placeholder::required("board", "board"),
                Placeholder::optional("note", "note"),
            ],
            template: "Board:\n{board}\nNote: {note}",
        }
    }

    #[test]
    fn test_render_substitutes_and_blanks_optional() {
        let args = BTreeMap::from([("board".to_string(), "X..".to_string())]);
        assert_eq!(spec().render(&args).unwrap(), "Board:\nX..\nNote: ");
    }

    #[test]
    fn test_render_requires_required() {
        let err = spec().render(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn test_listed_prompt_marks_required_arguments() {
        let listed = serde_json::to_value(spec().to_prompt()).unwrap();
        assert_eq!(listed["name"], "demo");
        assert_eq!(listed["arguments"][0]["required"], true);
        assert_eq!(listed["arguments"][1]["required"], false);
    }
}
