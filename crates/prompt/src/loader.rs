//! Prompt loader for built-in and overridden YAML prompt definitions.

use crate::types::PromptDefinition;
use docqa_core::{AppError, AppResult};
use std::path::Path;

/// Prompt used to answer a question from retrieved context.
pub const ANSWER_PROMPT_ID: &str = "qa.answer";

/// Prompt used to expand a question into retrieval queries.
pub const EXPAND_PROMPT_ID: &str = "qa.expand";

const BUILTIN_PROMPTS: [(&str, &str); 2] = [
    (ANSWER_PROMPT_ID, include_str!("../prompts/qa.answer.yml")),
    (EXPAND_PROMPT_ID, include_str!("../prompts/qa.expand.yml")),
];

const KNOWN_ROLES: [&str; 5] = ["system", "human", "user", "ai", "assistant"];

/// Load a prompt definition by ID.
///
/// When `overrides_dir` is given and contains `<id>.yml`, that file wins.
/// Otherwise the built-in definition is used.
///
/// # Example
/// ```no_run
/// use docqa_prompt::load_prompt;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(None, "qa.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(overrides_dir: Option<&Path>, prompt_id: &str) -> AppResult<PromptDefinition> {
    if let Some(dir) = overrides_dir {
        let prompt_file = dir.join(format!("{}.yml", prompt_id));
        if prompt_file.exists() {
            tracing::debug!("Loading prompt from: {:?}", prompt_file);

            let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
                AppError::Prompt(format!(
                    "Failed to read prompt file {:?}: {}",
                    prompt_file, e
                ))
            })?;

            let definition = parse_prompt(&contents, &prompt_file.display().to_string())?;
            tracing::info!(
                "Loaded prompt override: {} ({})",
                definition.id,
                definition.title
            );
            return Ok(definition);
        }
    }

    let (_, contents) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Prompt not found: {}", prompt_id)))?;

    let definition = parse_prompt(contents, prompt_id)?;
    tracing::debug!("Loaded built-in prompt: {}", definition.id);

    Ok(definition)
}

/// List all available prompt IDs, built-in and overridden, sorted.
pub fn list_prompts(overrides_dir: Option<&Path>) -> AppResult<Vec<String>> {
    let mut prompt_ids: Vec<String> = BUILTIN_PROMPTS
        .iter()
        .map(|(id, _)| id.to_string())
        .collect();

    if let Some(dir) = overrides_dir.filter(|dir| dir.exists()) {
        for entry in walkdir::WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    prompt_ids.push(stem.to_string());
                }
            }
        }
    }

    prompt_ids.sort();
    prompt_ids.dedup();
    Ok(prompt_ids)
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e))
    })?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.api_version.is_empty() {
        return Err(AppError::Prompt(
            "Prompt apiVersion cannot be empty".to_string(),
        ));
    }

    // Validate API version format (simple check)
    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if def.messages.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt {} has no messages",
            def.id
        )));
    }

    for message in &def.messages {
        if !KNOWN_ROLES.contains(&message.role.to_lowercase().as_str()) {
            return Err(AppError::Prompt(format!(
                "Prompt {} uses unknown role '{}'",
                def.id, message.role
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_prompt(dir: &Path, id: &str, valid: bool) -> PathBuf {
        let content = if valid {
            format!(
                r#"
id: {}
title: "Test Prompt"
apiVersion: "1.0"
createdBy: test
messages:
  - role: human
    template: "Test template: {{{{question}}}}"
"#,
                id
            )
        } else {
            "invalid: yaml: content:".to_string()
        };

        let file_path = dir.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    #[test]
    fn test_builtins_are_valid() {
        let answer = load_prompt(None, ANSWER_PROMPT_ID).unwrap();
        assert_eq!(answer.messages.len(), 2);
        assert_eq!(answer.messages[1].template, "Response:");

        let expand = load_prompt(None, EXPAND_PROMPT_ID).unwrap();
        assert!(expand.messages[0].template.contains("{{count}}"));
    }

    #[test]
    fn test_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), ANSWER_PROMPT_ID, true);

        let prompt = load_prompt(Some(temp_dir.path()), ANSWER_PROMPT_ID).unwrap();
        assert_eq!(prompt.title, "Test Prompt");
    }

    #[test]
    fn test_missing_override_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_prompt(Some(temp_dir.path()), EXPAND_PROMPT_ID).unwrap();
        assert_eq!(prompt.id, EXPAND_PROMPT_ID);
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_prompt(Some(temp_dir.path()), "nonexistent");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "invalid", false);

        let result = load_prompt(Some(temp_dir.path()), "invalid");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let yaml = r#"
id: bad.role
title: Bad
apiVersion: "1.0"
messages:
  - role: narrator
    template: "x"
"#;
        assert!(parse_prompt(yaml, "inline").is_err());
    }

    #[test]
    fn test_list_prompts() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "custom.one", true);
        create_test_prompt(temp_dir.path(), ANSWER_PROMPT_ID, true);

        let prompts = list_prompts(Some(temp_dir.path())).unwrap();
        assert_eq!(
            prompts,
            vec![
                "custom.one".to_string(),
                ANSWER_PROMPT_ID.to_string(),
                EXPAND_PROMPT_ID.to_string(),
            ]
        );
    }
}
