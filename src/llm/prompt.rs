//! Routing prompt construction
//!
//! The system prompt tells the model which agents exist and how to answer. The
//! agent list is rendered either as XML or as the registry's JSON form.

use crate::error::ResolverError;
use crate::protocol::{Context, UserMessage};
use crate::registry::AgentSpecSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Builds the system prompt for one routing call
pub trait ModelPromptProvider: Send + Sync {
    fn provide_prompt(
        &self,
        context: &Context,
        specs: &AgentSpecSet,
        input: &UserMessage,
    ) -> Result<String, ResolverError>;
}

/// Rendering of the candidate agents inside a prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRoutingSpecListType {
    #[default]
    Xml,
    Json,
}

impl AgentRoutingSpecListType {
    /// Template placeholder name, used as `${keyword}`
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Xml => "agents_list_xml",
            Self::Json => "agents_list_json",
        }
    }

    fn render(&self, specs: &AgentSpecSet) -> Result<String, ResolverError> {
        match self {
            Self::Xml => Ok(generate_agent_routing_specs_xml(specs)),
            Self::Json => generate_agent_routing_specs_json(specs),
        }
    }
}

impl FromStr for AgentRoutingSpecListType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xml" => Ok(Self::Xml),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown agents list type: {other}")),
        }
    }
}

/// Built-in routing instructions asking for `{"agentName": ...}` inside an `<answer>` block
#[derive(Debug, Clone, Default)]
pub struct DefaultModelPromptProvider {
    list_type: AgentRoutingSpecListType,
}

impl DefaultModelPromptProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list_type(list_type: AgentRoutingSpecListType) -> Self {
        Self { list_type }
    }
}

impl ModelPromptProvider for DefaultModelPromptProvider {
    fn provide_prompt(
        &self,
        _context: &Context,
        specs: &AgentSpecSet,
        _input: &UserMessage,
    ) -> Result<String, ResolverError> {
        let agents = self.list_type.render(specs)?;
        Ok(format!(
            r#"You are an AI tasked with selecting the most suitable agent to address a user query based on the agents' capabilities.
You will be provided with a list of agents and their capabilities, followed by a user query.
Your goal is to analyze the query and match it with the most appropriate agent.

First, here is the list of agents and their capabilities:

{agents}

To select the most suitable agent, follow these steps:

1. Carefully read and understand the user query.
2. Review the list of agents and their capabilities.
3. Analyze how well each agent's capabilities match the requirements of the user query.
4. Consider factors such as relevance, expertise, and specificity of the agent's capabilities in relation to the query.
5. Select the agent whose capabilities best align with the user's needs.

Once you have determined the most suitable agent, provide your answer in the following JSON format:

<answer>
```json
{{"agentName": "name-of-agent"}}
```
</answer>

Ensure that the agent name you provide exactly matches the name given in the agents list.
Do not include any additional explanation or justification in your response; only provide the JSON object as specified."#
        ))
    }
}

/// Prompt read from a template file on every call
///
/// The template's `${agents_list_xml}` or `${agents_list_json}` placeholder
/// (matching the configured list type) is replaced by the rendered agents.
#[derive(Debug, Clone)]
pub struct ExternalModelPromptProvider {
    path: PathBuf,
    list_type: AgentRoutingSpecListType,
}

impl ExternalModelPromptProvider {
    pub fn new<P: Into<PathBuf>>(path: P, list_type: AgentRoutingSpecListType) -> Self {
        Self {
            path: path.into(),
            list_type,
        }
    }
}

impl ModelPromptProvider for ExternalModelPromptProvider {
    fn provide_prompt(
        &self,
        _context: &Context,
        specs: &AgentSpecSet,
        _input: &UserMessage,
    ) -> Result<String, ResolverError> {
        let template = std::fs::read_to_string(&self.path).map_err(|e| {
            ResolverError::prompt_with_source(
                format!("Failed to read prompt file: {}", self.path.display()),
                e,
            )
        })?;

        let placeholder = format!("${{{}}}", self.list_type.keyword());
        Ok(template.replace(&placeholder, &self.list_type.render(specs)?))
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render agents as the `<agents_list>` XML block used by the routing prompt
pub fn generate_agent_routing_specs_xml(specs: &AgentSpecSet) -> String {
    let mut xml = String::from("<agents_list>\n");
    for spec in specs {
        xml.push_str("<agent>\n");
        xml.push_str(&format!("<name>{}</name>\n", escape_xml(&spec.name)));
        xml.push_str(&format!(
            "<description>{}</description>\n",
            escape_xml(&spec.description)
        ));
        xml.push_str("<capabilities>\n");
        for capability in &spec.capabilities {
            xml.push_str(&format!(
                "<capability>\n<name>{}</name>\n<description>{}</description>\n</capability>\n",
                escape_xml(&capability.name),
                escape_xml(&capability.description)
            ));
        }
        xml.push_str("</capabilities>\n</agent>\n");
    }
    xml.push_str("</agents_list>\n");
    xml
}

/// Render agents in the registry file's JSON form
pub fn generate_agent_routing_specs_json(specs: &AgentSpecSet) -> Result<String, ResolverError> {
    serde_json::to_string(specs)
        .map_err(|e| ResolverError::prompt_with_source("Failed to serialize agent list", e))
}
