//! Prompt templates that wrap entries in ready-made instructions.

use std::collections::HashMap;

use mcpedia_core::KnowledgeStore;
use serde::Deserialize;
use serde_json::{Value, json};
use strum::{AsRefStr, EnumString};

use crate::{
  guide,
  rpc::{self, RpcError},
  tools,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Prompt {
  ApplyEntry,
  ReviewWithEntry,
  SaveLearnings,
}

const SAVE_LEARNINGS: &str = "\
Analyze what was accomplished in this conversation and identify reusable knowledge that \
should be saved. For each piece of knowledge:

1. Determine if it's a skill, rule, context, pattern, reference, or guide
2. Choose a descriptive slug (e.g. \"rust-error-handling\", \"project-foo-auth-flow\")
3. Write concise, actionable content (under 32KB)
4. Assign appropriate language, domain, project, and tags

Use the create_entry tool to save each piece. Keep entries granular: one concept per entry.";

impl Prompt {
  pub const ALL: [Prompt; 3] = [Self::ApplyEntry, Self::ReviewWithEntry, Self::SaveLearnings];

  fn definition(self) -> Value {
    let (title, description, slug_help) = match self {
      Self::ApplyEntry => (
        "Apply Entry",
        "Apply a knowledge entry's guidelines to the current task",
        Some("The slug of the entry to apply"),
      ),
      Self::ReviewWithEntry => (
        "Review With Entry",
        "Review code against a knowledge entry's guidelines",
        Some("The slug of the entry to review against"),
      ),
      Self::SaveLearnings => (
        "Save Learnings",
        "Extract and save reusable knowledge from the current task",
        None,
      ),
    };
    let arguments: Vec<Value> = slug_help
      .map(|help| json!({ "name": "slug", "description": help, "required": true }))
      .into_iter()
      .collect();
    json!({
      "name":        self.as_ref(),
      "title":       title,
      "description": description,
      "arguments":   arguments,
    })
  }
}

fn user_message(description: String, text: String) -> Value {
  json!({
    "description": description,
    "messages": [{
      "role":    "user",
      "content": { "type": "text", "text": text },
    }],
  })
}

/// `prompts/list`
pub fn list() -> Value {
  let prompts: Vec<Value> = Prompt::ALL.iter().map(|p| p.definition()).collect();
  tracing::info!(prompt = "list", items = prompts.len(), "prompt call");
  json!({ "prompts": prompts })
}

#[derive(Deserialize)]
struct GetParams {
  name:      String,
  #[serde(default)]
  arguments: HashMap<String, String>,
}

/// `prompts/get`
///
/// An unknown prompt name yields a failure result rather than a protocol
/// error, mirroring unknown tools.
pub async fn get<S: KnowledgeStore>(store: &S, params: Option<Value>) -> Result<Value, RpcError> {
  let GetParams { name, arguments } = rpc::parse_params(params)?;

  let Ok(prompt) = name.parse::<Prompt>() else {
    tracing::info!(prompt = %name, "unknown prompt");
    return Ok(tools::failure("unknown_prompt", &format!("Unknown prompt: {name}")));
  };

  if prompt == Prompt::SaveLearnings {
    tracing::info!(prompt = prompt.as_ref(), "prompt call");
    return Ok(user_message(
      "Save learnings from the current task".into(),
      SAVE_LEARNINGS.into(),
    ));
  }

  let slug = arguments
    .get("slug")
    .filter(|s| !s.trim().is_empty())
    .ok_or_else(|| RpcError::invalid_params("slug argument is required"))?;
  let entry = guide::resolve_entry(store, slug).await?;
  tracing::info!(prompt = prompt.as_ref(), %slug, "prompt call");

  Ok(match prompt {
    Prompt::ApplyEntry => user_message(
      format!("Apply entry: {}", entry.title),
      format!(
        "You have been given the following guide to follow:\n\n# {}\n\n{}\n\n\
         Apply these guidelines to the current task. Follow them precisely.",
        entry.title, entry.content
      ),
    ),
    _ => user_message(
      format!("Review with entry: {}", entry.title),
      format!(
        "Review the code in this conversation against the following guidelines:\n\n# {}\n\n{}\n\n\
         Point out any violations and suggest fixes. Be specific with line references.",
        entry.title, entry.content
      ),
    ),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn prompt_names_are_kebab_case() {
    assert_eq!(Prompt::ReviewWithEntry.as_ref(), "review-with-entry");
    assert_eq!("apply-entry".parse::<Prompt>().unwrap(), Prompt::ApplyEntry);
    assert!("apply_entry".parse::<Prompt>().is_err());
  }

  #[test]
  fn only_entry_prompts_take_a_slug() {
    let listed = list();
    let prompts = listed["prompts"].as_array().unwrap();
    assert_eq!(prompts.len(), 3);
    for p in prompts {
      let args = p["arguments"].as_array().unwrap();
      if p["name"] == "save-learnings" {
        assert!(args.is_empty());
      } else {
        assert_eq!(args[0]["name"], "slug");
        assert_eq!(args[0]["required"], true);
      }
    }
  }
}
