use dotenv::dotenv;
use financial_ratio_builder::llm::{EntityExtractor, ExtractionEvent, GeminiClient};
use financial_ratio_builder::{EntitySheet, RatioEngine, RatioReport};
use std::path::PathBuf;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let path: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("usage: gemini_ratio_extraction <statement.pdf>"))?;

    println!("🚀 Extracting financial entities from {}", path.display());

    let client = GeminiClient::from_env()?;
    let extractor = EntityExtractor::new(client);

    let (tx, mut rx) = mpsc::channel(16);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ExtractionEvent::Starting => println!("  ⏳ Starting"),
                ExtractionEvent::Encoding { mime_type, bytes } => {
                    println!("  📦 Encoding {} bytes as {}", bytes, mime_type)
                }
                ExtractionEvent::Requesting { model } => println!("  🤖 Asking {}", model),
                ExtractionEvent::ProcessingResponse => println!("  🔍 Processing response"),
                ExtractionEvent::Success { found, requested } => {
                    println!("  ✅ Found {} of {} entities", found, requested)
                }
                ExtractionEvent::Failed { reason } => println!("  ❌ {}", reason),
            }
        }
    });

    let entities = extractor.extract_file(&path, Some(tx)).await?;
    printer.await?;

    let mut sheet = EntitySheet::new();
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let status = sheet.apply_extraction(entities, source)?;
    println!("📋 Extraction status: {:?}", status);

    let report = RatioReport::from_sheet(&sheet, &RatioEngine::default());
    println!("{}", report.to_markdown());

    Ok(())
}
