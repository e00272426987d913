//! Prompt builder for rendering message templates.

use crate::types::{BuiltMessage, BuiltPrompt, PromptDefinition};
use docqa_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Every variable declared under `input.variables` must be present; an
/// empty string counts as present. Each message template is rendered with
/// HTML escaping disabled.
///
/// # Example
/// ```no_run
/// use docqa_prompt::{build_prompt, load_prompt};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = load_prompt(None, "qa.answer")?;
/// let mut vars = HashMap::new();
/// vars.insert("instruction".to_string(), String::new());
/// vars.insert("context".to_string(), "The sky is blue.".to_string());
/// vars.insert("question".to_string(), "What color is the sky?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("First message: {}", built.messages[0].content);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    if let Some(missing) = definition
        .input
        .variables
        .iter()
        .find(|name| !variables.contains_key(*name))
    {
        return Err(AppError::Prompt(format!(
            "Prompt {} requires variable '{}'",
            definition.id, missing
        )));
    }

    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    let mut messages = Vec::with_capacity(definition.messages.len());
    for (i, message) in definition.messages.iter().enumerate() {
        let name = format!("{}#{}", definition.id, i);
        handlebars
            .register_template_string(&name, &message.template)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

        let content = handlebars
            .render(&name, &variables)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

        messages.push(BuiltMessage {
            role: message.role.clone(),
            content,
        });
    }

    Ok(BuiltPrompt::new(messages, definition.id.clone(), variables))
}
