// Prompt templates with `{name}` placeholders; `{{` and `}}` are literal braces.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("missing template variable: {0}")]
    MissingVariable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("template pattern is valid")
    })
}

impl PromptTemplate {
    /// Braces that do not form a placeholder or an escape are kept verbatim.
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut last = 0;

        for caps in token_pattern().captures_iter(source) {
            let Some(whole) = caps.get(0) else { continue };
            literal.push_str(&source[last..whole.start()]);
            last = whole.end();

            match caps.get(1) {
                Some(name) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Variable(name.as_str().to_string()));
                }
                None => literal.push_str(&whole.as_str()[..1]),
            }
        }

        literal.push_str(&source[last..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { segments }
    }

    /// Placeholder names in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Variable(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn render(&self, values: &HashMap<String, String>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let value = values
                        .get(name)
                        .ok_or_else(|| TemplateError::MissingVariable(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_every_occurrence() {
        let template = PromptTemplate::parse("<info>{info}</info>\nQ: {question}\nAgain: {question}");
        assert_eq!(template.variables(), vec!["info", "question"]);

        let rendered = template
            .render(&vars(&[("info", "Kakao Sync"), ("question", "what?")]))
            .unwrap();
        assert_eq!(rendered, "<info>Kakao Sync</info>\nQ: what?\nAgain: what?");
    }

    #[test]
    fn missing_variable_is_an_error() {
        let template = PromptTemplate::parse("{history}\n{question}");
        assert_eq!(
            template.render(&vars(&[("question", "q")])),
            Err(TemplateError::MissingVariable("history".to_string()))
        );
    }

    #[test]
    fn doubled_braces_are_literal() {
        let template = PromptTemplate::parse(r#"Reply as {{"intent": "{intent}"}}"#);
        assert_eq!(template.variables(), vec!["intent"]);
        assert_eq!(
            template.render(&vars(&[("intent", "default")])).unwrap(),
            r#"Reply as {"intent": "default"}"#
        );
    }

    #[test]
    fn stray_braces_are_kept() {
        let template = PromptTemplate::parse("a { b } {not valid}");
        assert!(template.variables().is_empty());
        assert_eq!(template.render(&HashMap::new()).unwrap(), "a { b } {not valid}");
    }

    #[test]
    fn values_are_not_reinterpreted() {
        let template = PromptTemplate::parse("{a}");
        assert_eq!(
            template.render(&vars(&[("a", "{b} {{c}}")])).unwrap(),
            "{b} {{c}}"
        );
    }
}
