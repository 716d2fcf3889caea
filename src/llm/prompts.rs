//! Prompt templates for the analysis tasks

use std::collections::HashMap;

use super::ChatMessage;

/// Template with `{{name}}` placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<String>,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let variables = extract_variables(&template);
        Self {
            template,
            variables,
        }
    }

    /// Fill in the template. Placeholders without a value are left as written.
    #[must_use]
    pub fn render(&self, values: &HashMap<&str, String>) -> String {
        let mut result = self.template.clone();
        for var in &self.variables {
            if let Some(value) = values.get(var.as_str()) {
                result = result.replace(&format!("{{{{{var}}}}}"), value);
            }
        }
        result
    }

    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

/// Extract variable names from template
fn extract_variables(template: &str) -> Vec<String> {
    let mut variables = Vec::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '{' && chars.peek() == Some(&'{') {
            chars.next(); // skip second '{'
            let mut var_name = String::new();
            while let Some(&ch) = chars.peek() {
                if ch == '}' {
                    chars.next();
                    if chars.peek() == Some(&'}') {
                        chars.next();
                        break;
                    }
                } else {
                    var_name.push(ch);
                    chars.next();
                }
            }
            if !var_name.is_empty() && !variables.contains(&var_name) {
                variables.push(var_name);
            }
        }
    }

    variables
}

/// System instruction plus user template for one task
#[derive(Debug, Clone)]
pub struct TaskPrompt {
    pub system: &'static str,
    pub user: PromptTemplate,
}

impl TaskPrompt {
    fn new(system: &'static str, user: &str) -> Self {
        Self {
            system,
            user: PromptTemplate::new(user),
        }
    }

    pub fn messages(&self, values: &HashMap<&str, String>) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system),
            ChatMessage::user(self.user.render(values)),
        ]
    }
}

/// Prompts used by [`super::LlmAnalyst`]
pub struct ResearchPrompts;

impl ResearchPrompts {
    #[must_use]
    pub fn summary() -> TaskPrompt {
        TaskPrompt::new(
            "You are an expert at creating concise, informative summaries. \
             Summarize the following content in a clear and comprehensive way.",
            "Please provide a comprehensive summary of the following content \
             in approximately {{max_length}} words:\n\n{{text}}",
        )
    }

    #[must_use]
    pub fn entities() -> TaskPrompt {
        TaskPrompt::new(
            "You are an expert at named entity recognition. \
             Extract key entities from the text and categorize them as \
             PERSON, ORGANIZATION, LOCATION, PRODUCT, EVENT, or OTHER.",
            "Extract and list all named entities from the following text. \
             Format each entity as 'Entity Name | Type':\n\n{{text}}",
        )
    }

    #[must_use]
    pub fn sentiment() -> TaskPrompt {
        TaskPrompt::new(
            "You are an expert at sentiment analysis. \
             Analyze the sentiment of the given text and provide a score.",
            "Analyze the sentiment of the following text. \
             Respond with only: SENTIMENT | POLARITY | CONFIDENCE\n\
             where SENTIMENT is positive/negative/neutral, \
             POLARITY is a number from -1.0 to 1.0, \
             and CONFIDENCE is a number from 0.0 to 1.0.\n\n{{text}}",
        )
    }

    #[must_use]
    pub fn topics() -> TaskPrompt {
        TaskPrompt::new(
            "You are an expert at topic extraction. \
             Identify the main topics and themes in the given text.",
            "Extract the top {{num_topics}} topics from the following text. \
             For each topic, provide: Topic Name | Key Words (comma-separated)\n\n{{text}}",
        )
    }

    #[must_use]
    pub fn related_queries() -> TaskPrompt {
        TaskPrompt::new(
            "You are an expert at generating related search queries. \
             Create relevant follow-up queries based on the given content.",
            "Based on the following content, generate {{num_queries}} related \
             search queries that would help explore this topic further. \
             List only the queries, one per line:\n\n{{text}}",
        )
    }

    #[must_use]
    pub fn credibility() -> TaskPrompt {
        TaskPrompt::new(
            "You are an expert at assessing source credibility and information quality. \
             Evaluate the credibility of sources based on their title, snippet, and domain. \
             Consider factors like domain authority, content quality, bias indicators, and trustworthiness.",
            "Assess the credibility of the following search result. \
             Respond with only a credibility score from 0.0 to 1.0:\n\n\
             Title: {{title}}\n\
             Snippet: {{snippet}}\n\
             Source: {{source}}\n\
             URL: {{url}}",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_variables() {
        let template = PromptTemplate::new("Summarize {{text}} in {{max_length}} words, {{text}}");
        assert_eq!(template.variables(), &["text", "max_length"]);
    }

    #[test]
    fn test_template_render_leaves_unknown_placeholders() {
        let template = PromptTemplate::new("Hello {{name}}, {{missing}}!");
        let values = HashMap::from([("name", "Ada".to_string())]);
        assert_eq!(template.render(&values), "Hello Ada, {{missing}}!");
    }

    #[test]
    fn test_credibility_prompt_renders_all_fields() {
        let values = HashMap::from([
            ("title", "Rust 1.80 released".to_string()),
            ("snippet", "The Rust team is happy".to_string()),
            ("source", "blog.rust-lang.org".to_string()),
            ("url", "https://blog.rust-lang.org/".to_string()),
        ]);
        let messages = ResearchPrompts::credibility().messages(&values);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("domain authority"));
        assert!(messages[1].content.contains("Title: Rust 1.80 released\n"));
        assert!(messages[1].content.contains("URL: https://blog.rust-lang.org/"));
        assert!(!messages[1].content.contains("{{"));
    }

    #[test]
    fn test_task_prompts_declare_their_inputs() {
        assert_eq!(ResearchPrompts::summary().user.variables(), &["max_length", "text"]);
        assert_eq!(ResearchPrompts::topics().user.variables(), &["num_topics", "text"]);
        assert_eq!(ResearchPrompts::related_queries().user.variables(), &["num_queries", "text"]);
        assert_eq!(ResearchPrompts::entities().user.variables(), &["text"]);
        assert!(ResearchPrompts::sentiment().user.render(&HashMap::new()).contains("SENTIMENT | POLARITY | CONFIDENCE"));
    }
}
