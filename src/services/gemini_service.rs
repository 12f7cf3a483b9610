/// Thin client for the Google Gemini generateContent endpoint.
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

fn build_url(model: &str, api_key: &str) -> String {
    format!(
        "{}/models/{}:generateContent?key={}",
        GEMINI_API_BASE, model, api_key
    )
}

pub fn model_from_env() -> String {
    std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string())
}

/// Sends a single-turn prompt and returns the first candidate's text.
pub async fn generate_content(api_key: &str, model: &str, prompt: &str) -> Result<String, String> {
    let request = GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: prompt.to_string(),
            }],
        }],
        generation_config: Some(GenerationConfig {
            temperature: 0.3,
            max_output_tokens: 1024,
        }),
    };

    let client = reqwest::Client::new();
    let response = client
        .post(build_url(model, api_key))
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(20))
        .json(&request)
        .send()
        .await
        // without_url keeps the API key out of error messages
        .map_err(|e| format!("Failed to reach Gemini API: {}", e.without_url()))?;

    if !response.status().is_success() {
        return Err(format!("Gemini API error: HTTP {}", response.status()));
    }

    let body: GeminiResponse = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse Gemini response: {}", e.without_url()))?;

    if let Some(error) = body.error {
        return Err(format!("Gemini API error: {}", error.message));
    }

    body.candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or_else(|| "Gemini returned no candidates".to_string())
}

/// Extracts the first JSON object from a model reply. Tolerates markdown
/// code fences and prose around the object.
pub fn extract_json_block(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(text[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let url = build_url("gemini-1.5-flash", "test-key");
        assert_eq!(
            url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent?key=test-key"
        );
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: "hello".to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: 0.3,
                max_output_tokens: 1024,
            }),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["generation_config"]["max_output_tokens"], 1024);
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "{\"ok\":true}"}]}}
            ]
        }"#;

        let body: GeminiResponse = serde_json::from_str(raw).unwrap();
        let text = body
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text);
        assert_eq!(text.as_deref(), Some("{\"ok\":true}"));
    }

    #[test]
    fn test_extract_json_block_with_fences() {
        let fenced = "```json\n{\"urgency\": \"low\"}\n```";
        assert_eq!(
            extract_json_block(fenced).as_deref(),
            Some("{\"urgency\": \"low\"}")
        );
    }

    #[test]
    fn test_extract_json_block_plain_and_garbage() {
        assert_eq!(
            extract_json_block("{\"a\":1}").as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(extract_json_block("no json here"), None);
        assert_eq!(extract_json_block("} reversed {"), None);
    }
}
