use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-request knobs for text generation.
///
/// Each field left as `None` is omitted from the outbound query string and
/// from the cache key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextGenerationOptions {
    /// Sent as `model=<name>`: which provider model answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Sent as `temperature=<value>`: sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Sent as `maxTokens=<n>`: upper bound on the answer length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl TextGenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.model.is_none() && self.temperature.is_none() && self.max_tokens.is_none()
    }

    /// Query parameters keyed by wire name, sorted by name.
    pub fn query_params(&self) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        if let Some(model) = &self.model {
            params.insert("model", model.clone());
        }
        if let Some(t) = self.temperature {
            params.insert("temperature", t.to_string());
        }
        if let Some(n) = self.max_tokens {
            params.insert("maxTokens", n.to_string());
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_options_have_no_params() {
        let options = TextGenerationOptions::new();
        assert!(options.is_empty());
        assert!(options.query_params().is_empty());
    }

    #[test]
    fn test_params_use_wire_names_in_sorted_order() {
        let options = TextGenerationOptions::new()
            .with_temperature(0.7)
            .with_max_tokens(256)
            .with_model("openai");
        let params: Vec<(&str, String)> = options.query_params().into_iter().collect();
        assert_eq!(
            params,
            vec![
                ("maxTokens", "256".to_string()),
                ("model", "openai".to_string()),
                ("temperature", "0.7".to_string()),
            ]
        );
    }

    #[test]
    fn test_zero_temperature_is_still_sent() {
        let options = TextGenerationOptions::new().with_temperature(0.0);
        assert_eq!(options.query_params().get("temperature").map(String::as_str), Some("0"));
    }

    #[test]
    fn test_json_uses_camel_case() {
        let options: TextGenerationOptions =
            serde_json::from_str(r#"{"model":"mistral","maxTokens":50}"#).unwrap();
        assert_eq!(options.model.as_deref(), Some("mistral"));
        assert_eq!(options.max_tokens, Some(50));
        assert_eq!(options.temperature, None);
    }
}
