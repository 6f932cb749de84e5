use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExtractionEvent {
    Starting,
    Encoding { mime_type: String, bytes: usize },
    Requesting { model: String },
    ProcessingResponse,
    Success { found: usize, requested: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blob {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Base64-encoded document bytes.
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// A user turn carrying an inline document followed by the instruction text.
    pub fn user_with_document(document: Blob, text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![
                Part::InlineData {
                    inline_data: document,
                },
                Part::Text { text: text.into() },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Content,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_gemini_field_names() {
        let request = GenerateContentRequest {
            contents: vec![Content::user_with_document(
                Blob {
                    mime_type: "application/pdf".to_string(),
                    data: "AAAA".to_string(),
                },
                "extract",
            )],
            system_instruction: Some(Content::user("system")),
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: None,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(json["contents"][0]["parts"][1]["text"], "extract");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "system");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert!(json["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn test_response_text_part_deserializes() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{}"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let candidates = response.candidates.unwrap();
        assert!(matches!(&candidates[0].content.parts[0], Part::Text { text } if text == "{}"));
    }
}
