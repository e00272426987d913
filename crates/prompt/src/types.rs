//! Prompt types for DocQA.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Input specification
    #[serde(default)]
    pub input: PromptInputSpec,

    /// Ordered chat messages, each a Handlebars template
    pub messages: Vec<PromptMessage>,

    /// Output specification
    #[serde(default)]
    pub output: PromptOutputSpec,
}

/// One templated chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Role name: system, human/user or ai/assistant
    pub role: String,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// Input specification for the prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptInputSpec {
    /// Variables that must be supplied when building
    #[serde(default)]
    pub variables: Vec<String>,
}

/// Output specification for the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    /// Output format (e.g., "text", "lines")
    pub format: String,
}

impl Default for PromptOutputSpec {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
        }
    }
}

/// A rendered chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltMessage {
    pub role: String,
    pub content: String,
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Rendered messages in definition order
    pub messages: Vec<BuiltMessage>,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        messages: Vec<BuiltMessage>,
        source_prompt_id: String,
        resolved_variables: HashMap<String, String>,
    ) -> Self {
        Self {
            messages,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                resolved_variables,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: test.prompt
title: Test Prompt
apiVersion: "1.0"
createdBy: test
input:
  variables: [question]
messages:
  - role: system
    template: "Be brief."
  - role: human
    template: "{{question}}"
output:
  format: text
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "test.prompt");
        assert_eq!(def.messages.len(), 2);
        assert_eq!(def.messages[1].role, "human");
        assert_eq!(def.input.variables, vec!["question".to_string()]);
    }

    #[test]
    fn test_output_defaults_to_text() {
        let yaml = r#"
id: bare
title: Bare
apiVersion: "1.0"
messages:
  - role: human
    template: "hi"
"#;
        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.output.format, "text");
        assert!(def.input.variables.is_empty());
    }
}
