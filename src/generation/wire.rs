//! JSON shapes exchanged with the Gemini REST API.
//!
//! Responses are deserialized leniently (every field optional) and then
//! reduced to a [`Frame`] so the rest of the crate never touches raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sources::Source;

use super::GenerationRequest;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

impl From<&GenerationRequest> for GenerateContentRequest {
    fn from(request: &GenerationRequest) -> Self {
        let tools = if request.web_grounding {
            vec![Tool {
                google_search: GoogleSearch {},
            }]
        } else {
            Vec::new()
        };

        let thinking_config = request
            .thinking_budget
            .map(|thinking_budget| ThinkingConfig { thinking_budget });
        let (response_mime_type, response_schema) = match &request.response_schema {
            Some(schema) => (Some("application/json"), Some(schema.clone())),
            None => (None, None),
        };
        let generation_config = if thinking_config.is_none() && response_schema.is_none() {
            None
        } else {
            Some(GenerationConfig {
                thinking_config,
                response_mime_type,
                response_schema,
            })
        };

        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            tools,
            generation_config,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    message: Option<String>,
    status: Option<String>,
}

/// Validated content of one response (or one streamed SSE frame).
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Frame {
    /// Concatenated visible text of the first candidate.
    pub(crate) text: String,
    /// Web grounding sources reported with this frame.
    pub(crate) sources: Vec<Source>,
}

impl GenerateContentResponse {
    /// Reduces the response to a [`Frame`], or returns the API error payload
    /// re-serialized as an error envelope.
    pub(crate) fn into_frame(self) -> Result<Frame, String> {
        if let Some(error) = self.error {
            let envelope = serde_json::json!({
                "error": { "message": error.message, "status": error.status }
            });
            return Err(envelope.to_string());
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Ok(Frame::default());
        };

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let sources = candidate
            .grounding_metadata
            .map(|metadata| {
                metadata
                    .grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web)
                    .filter_map(|web| {
                        let uri = web.uri?;
                        Some(Source::new(uri, web.title.unwrap_or_default()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Frame { text, sources })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::generation::GenerationKind;

    fn sample_request(kind: GenerationKind) -> GenerationRequest {
        GenerationRequest {
            kind,
            topic: "Flux".to_string(),
            prompt: "Define flux".to_string(),
            model: "m".to_string(),
            web_grounding: true,
            thinking_budget: Some(0),
            response_schema: None,
        }
    }

    #[test]
    fn test_request_serializes_grounding_and_thinking_budget() {
        let body = serde_json::to_value(GenerateContentRequest::from(&sample_request(
            GenerationKind::Definition,
        )))
        .unwrap();

        assert_eq!(body["contents"][0]["parts"][0]["text"], "Define flux");
        assert_eq!(body["contents"][0]["role"], "user");
        assert!(body["tools"][0]["googleSearch"].is_object());
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], 0);
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_request_without_options_omits_config() {
        let mut request = sample_request(GenerationKind::Definition);
        request.web_grounding = false;
        request.thinking_budget = None;
        let body = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_request_with_schema_sets_json_mime_type() {
        let mut request = sample_request(GenerationKind::Synonyms);
        request.response_schema = Some(serde_json::json!({"type": "OBJECT"}));
        let body = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_frame_concatenates_text_and_skips_thoughts() {
        let raw = r#"{"candidates":[{"content":{"parts":[
            {"text":"thinking...","thought":true},
            {"text":"Par"},{"text":"is"}]}}]}"#;
        let frame = serde_json::from_str::<GenerateContentResponse>(raw)
            .unwrap()
            .into_frame()
            .unwrap();
        assert_eq!(frame.text, "Paris");
        assert!(frame.sources.is_empty());
    }

    #[test]
    fn test_frame_extracts_web_sources() {
        let raw = r#"{"candidates":[{"groundingMetadata":{"groundingChunks":[
            {"web":{"uri":"https://a.example","title":"A"}},
            {"retrievedContext":{"uri":"ignored"}},
            {"web":{"title":"no uri"}}]}}]}"#;
        let frame = serde_json::from_str::<GenerateContentResponse>(raw)
            .unwrap()
            .into_frame()
            .unwrap();
        assert_eq!(frame.sources, vec![Source::new("https://a.example", "A")]);
    }

    #[test]
    fn test_frame_surfaces_error_payload() {
        let raw = r#"{"error":{"code":429,"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = serde_json::from_str::<GenerateContentResponse>(raw)
            .unwrap()
            .into_frame()
            .unwrap_err();
        assert!(err.contains("RESOURCE_EXHAUSTED"));
    }

    #[test]
    fn test_frame_without_candidates_is_empty() {
        let frame = GenerateContentResponse::default().into_frame().unwrap();
        assert_eq!(frame, Frame::default());
    }
}
