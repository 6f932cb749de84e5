use crate::error::{FinancialRatioError, Result};
use crate::extraction::{parse_extraction_response, target_entities, ExtractedEntities};
use crate::llm::prompts::{entity_extraction_prompt, entity_response_schema, SYSTEM_PROMPT_ENTITY_EXTRACT};
use crate::llm::{client::GeminiClient, types::*};
use crate::sanitize::{assess, Provenance};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::info;
use std::path::Path;
use tokio::fs;
use tokio::sync::mpsc::Sender;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Turns a financial document into canonical entity values via Gemini.
///
/// EBITDA and PBIT are never requested, and are dropped if the model returns
/// them anyway.
pub struct EntityExtractor {
    client: GeminiClient,
    model: String,
    system_prompt: String,
}

impl EntityExtractor {
    pub fn new(client: GeminiClient) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
            system_prompt: SYSTEM_PROMPT_ENTITY_EXTRACT.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Replaces the system instruction sent with every extraction request.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub async fn extract_file(
        &self,
        path: &Path,
        progress: Option<Sender<ExtractionEvent>>,
    ) -> Result<ExtractedEntities> {
        let bytes = fs::read(path).await?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        self.extract_bytes(&bytes, &mime_type, progress).await
    }

    pub async fn extract_bytes(
        &self,
        document: &[u8],
        mime_type: &str,
        progress: Option<Sender<ExtractionEvent>>,
    ) -> Result<ExtractedEntities> {
        self.send_event(&progress, ExtractionEvent::Starting).await;

        if document.is_empty() {
            let reason = "Document is empty".to_string();
            self.send_event(&progress, ExtractionEvent::Failed { reason: reason.clone() })
                .await;
            return Err(FinancialRatioError::ExtractionFailed(reason));
        }

        self.send_event(
            &progress,
            ExtractionEvent::Encoding {
                mime_type: mime_type.to_string(),
                bytes: document.len(),
            },
        )
        .await;

        let blob = Blob {
            mime_type: mime_type.to_string(),
            data: STANDARD.encode(document),
        };
        let messages = vec![Content::user_with_document(blob, entity_extraction_prompt())];

        self.send_event(
            &progress,
            ExtractionEvent::Requesting {
                model: self.model.clone(),
            },
        )
        .await;

        let raw = match self
            .client
            .generate_content(
                &self.model,
                &self.system_prompt,
                messages,
                Some(entity_response_schema()),
            )
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                self.send_event(&progress, ExtractionEvent::Failed { reason: e.to_string() })
                    .await;
                return Err(e);
            }
        };

        self.send_event(&progress, ExtractionEvent::ProcessingResponse)
            .await;

        let entities = match parse_extraction_response(&raw) {
            Ok(entities) => entities,
            Err(e) => {
                self.send_event(&progress, ExtractionEvent::Failed { reason: e.to_string() })
                    .await;
                return Err(e);
            }
        };

        let requested = target_entities().len();
        let found = entities
            .values()
            .filter(|v| assess(Some(*v)) == Provenance::Present)
            .count();
        info!(
            "Extraction finished: {} of {} entities found",
            found, requested
        );
        self.send_event(&progress, ExtractionEvent::Success { found, requested })
            .await;

        Ok(entities)
    }

    async fn send_event(&self, sender: &Option<Sender<ExtractionEvent>>, event: ExtractionEvent) {
        if let Some(tx) = sender {
            let _ = tx.send(event).await;
        }
    }
}
