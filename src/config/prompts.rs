//! Prompt templates for Lectern.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub assistant: AssistantPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the tool-calling assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantPrompts {
    /// Base policy. `{{round_protocol}}` is replaced by the rendered round clause.
    pub system: String,
    /// Round budget clause. `{{max_rounds}}` is replaced by the actual budget.
    pub round_protocol: String,
    /// Header placed before prior conversation text.
    pub history_header: String,
}

impl Default for AssistantPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an AI assistant specialized in course materials and educational content with access to comprehensive search tools for course information.

Tool Usage Guidelines:
- **Content Search Tool**: Use `search_course_content` for questions about specific course content, lessons, or detailed educational materials
- **Course Outline Tool**: Use `get_course_outline` for questions about course structure, lesson lists, course overview, or complete course outlines
{{round_protocol}}
- Synthesize tool results into accurate, fact-based responses
- If search yields no results, state this clearly without offering alternatives

Response Protocol:
- **General knowledge questions**: Answer using existing knowledge without using tools
- **Course content questions**: Use content search tool first, then answer
- **Course outline/structure questions**: Use outline tool first, then answer - include course title, course link, and complete lesson list with numbers and titles
- **No meta-commentary**:
 - Provide direct answers only, with no reasoning process, tool explanations, or question-type analysis
 - Do not mention "based on the search results" or "using the tool"

All responses must be:
1. **Brief, Concise and focused** - Get to the point quickly
2. **Educational** - Maintain instructional value
3. **Clear** - Use accessible language
4. **Example-supported** - Include relevant examples when they aid understanding
Provide only the direct answer to what was asked."#
                .to_string(),

            round_protocol: r#"
Tool Usage Protocol (Sequential):
- You can make up to {{max_rounds}} tool calls across separate rounds
- After each tool call, you'll see the results and can decide next actions
- Use additional tool calls to gather more specific information if needed
- Provide your final response when you have sufficient information

Multi-Round Strategy:
- Round 1: Use tools for initial information gathering
- Later rounds: Use tools for follow-up questions or specific details if needed
- Always synthesize information from all rounds in your final response"#
                .to_string(),

            history_header: "Previous conversation:".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let assistant_path = custom_path.join("assistant.toml");
            if assistant_path.exists() {
                let content = std::fs::read_to_string(&assistant_path)?;
                prompts.assistant = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// Assemble the system instructions for one conversation.
    ///
    /// The round clause is rendered with the actual budget and spliced into
    /// the base policy; prior history text, when present, is appended verbatim.
    pub fn system_instructions(&self, max_rounds: usize, history: Option<&str>) -> String {
        let mut vars = HashMap::new();
        vars.insert("max_rounds".to_string(), max_rounds.to_string());
        let round_clause = self.render_with_custom(&self.assistant.round_protocol, &vars);

        vars.insert("round_protocol".to_string(), round_clause);
        let base = self.render_with_custom(&self.assistant.system, &vars);

        match history {
            Some(h) if !h.is_empty() => {
                format!("{}\n\n{}\n{}", base, self.assistant.history_header, h)
            }
            _ => base,
        }
    }
}
