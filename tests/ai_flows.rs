use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;

use toolbench::ai::flows::{
    self, BackgroundInput, BookSummaryInput, FormatInput, FormatStyle, ImageTextInput, SummarizeInput,
    SummaryLength, TRANSLATION_FALLBACK, TranscribeInput, TranslateInput,
};
use toolbench::ai::{
    AiError, AiFlow, FlowError, FlowOutcome, MediaPart, ModelProvider, ModelReply, ModelRequest, ResponseFormat,
};
use toolbench::storage::Storage;

const PNG_URI: &str = "data:image/png;base64,aGVsbG8=";

/// Replays one scripted reply and keeps the last request for inspection
struct MockProvider {
    reply: Box<dyn Fn() -> Result<ModelReply, AiError> + Send + Sync>,
    last_request: Mutex<Option<ModelRequest>>,
    calls: Mutex<usize>,
}

impl MockProvider {
    fn replying(text: &'static str) -> Self {
        Self::with(move || Ok(ModelReply::text(text)))
    }

    fn failing() -> Self {
        Self::with(|| {
            Err(AiError::Status {
                status: 500,
                body: "upstream exploded".to_string(),
            })
        })
    }

    fn with(reply: impl Fn() -> Result<ModelReply, AiError> + Send + Sync + 'static) -> Self {
        Self {
            reply: Box::new(reply),
            last_request: Mutex::new(None),
            calls: Mutex::new(0),
        }
    }

    fn last_request(&self) -> ModelRequest {
        self.last_request.lock().unwrap().clone().expect("no request was sent")
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, AiError> {
        *self.calls.lock().unwrap() += 1;
        *self.last_request.lock().unwrap() = Some(request);
        (self.reply)()
    }
}

fn translate_input(text: &str) -> TranslateInput {
    TranslateInput {
        text: text.to_string(),
        target_language: "French".to_string(),
        source_language: None,
    }
}

#[tokio::test]
async fn translation_parses_the_declared_shape() {
    let provider = MockProvider::replying(r#"{"translatedText": "Bonjour"}"#);
    let outcome = flows::translate_text(&provider, &translate_input("Hello")).await;
    assert_eq!(outcome.ok().map(|o| o.translated_text), Some("Bonjour".to_string()));

    let request = provider.last_request();
    assert!(request.prompt.contains("French"));
    assert!(request.prompt.contains("Hello"));
    assert!(request.media.is_none());
    match request.format {
        ResponseFormat::Json(schema) => assert_eq!(schema["required"], json!(["translatedText"])),
        ResponseFormat::Image => panic!("translation should ask for JSON"),
    }
}

#[tokio::test]
async fn fenced_json_is_accepted() {
    let provider = MockProvider::replying("```json\n{\"summary\": \"Short.\"}\n```");
    let input = SummarizeInput {
        text: "A long text".to_string(),
        length: SummaryLength::Short,
    };
    let outcome = flows::summarize_text(&provider, &input).await;
    assert!(outcome.is_ok());
    assert!(provider.last_request().prompt.contains("one or two sentences"));
}

#[tokio::test]
async fn off_schema_reply_is_a_schema_mismatch() {
    let provider = MockProvider::replying("Sure! Here is your translation: Bonjour");
    let outcome = flows::translate_text(&provider, &translate_input("Hello")).await;
    match outcome {
        FlowOutcome::SchemaMismatch(raw) => assert!(raw.contains("Bonjour")),
        other => panic!("expected a schema mismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn blank_required_field_is_a_schema_mismatch() {
    let provider = MockProvider::replying(r#"{"translatedText": "   "}"#);
    let outcome = flows::translate_text(&provider, &translate_input("Hello")).await;
    assert!(matches!(outcome, FlowOutcome::SchemaMismatch(_)));

    let error = outcome.into_result().unwrap_err();
    assert_eq!(error.to_string(), "AI did not return expected output");
}

#[tokio::test]
async fn provider_failures_are_kept_apart() {
    let provider = MockProvider::failing();
    let outcome = flows::translate_text(&provider, &translate_input("Hello")).await;
    assert!(matches!(
        outcome,
        FlowOutcome::ProviderError(AiError::Status { status: 500, .. })
    ));
}

#[tokio::test]
async fn fallback_replaces_either_failure() {
    let provider = MockProvider::failing();
    let output = flows::translate_text(&provider, &translate_input("Hello"))
        .await
        .map(|o| o.translated_text)
        .or_fallback(TRANSLATION_FALLBACK.to_string());
    assert_eq!(output, TRANSLATION_FALLBACK);

    assert_eq!(
        AiFlow::Translate.fallback(),
        Some(json!({ "translatedText": TRANSLATION_FALLBACK }))
    );
    assert!(AiFlow::BookSummary.fallback().is_none());
}

#[tokio::test]
async fn media_flows_reject_bad_data_uris_before_calling() {
    let provider = MockProvider::replying(r#"{"transcription": "hi"}"#);

    let not_audio = TranscribeInput {
        audio_data_uri: PNG_URI.to_string(),
        language: None,
    };
    let outcome = flows::transcribe_audio(&provider, &not_audio).await;
    assert!(matches!(outcome, FlowOutcome::ProviderError(AiError::InvalidDataUri(_))));

    let garbage = ImageTextInput {
        image_data_uri: "https://example.com/cat.png".to_string(),
    };
    let outcome = flows::extract_text_from_image(&provider, &garbage).await;
    assert!(matches!(outcome, FlowOutcome::ProviderError(AiError::InvalidDataUri(_))));

    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn ocr_sends_the_image_inline() {
    let provider = MockProvider::replying(r#"{"extractedText": "STOP"}"#);
    let input = ImageTextInput {
        image_data_uri: PNG_URI.to_string(),
    };
    let outcome = flows::extract_text_from_image(&provider, &input).await;
    assert_eq!(outcome.ok().map(|o| o.extracted_text).as_deref(), Some("STOP"));

    let media = provider.last_request().media.expect("image was not attached");
    assert_eq!(media.mime_type, "image/png");
    assert_eq!(media.data, "aGVsbG8=");
}

#[tokio::test]
async fn background_removal_prefers_returned_image() {
    let provider = MockProvider::with(|| {
        Ok(ModelReply {
            text: "done".to_string(),
            media: vec![MediaPart {
                mime_type: "image/png".to_string(),
                data: "d29ybGQ=".to_string(),
            }],
        })
    });
    let input = BackgroundInput {
        image_data_uri: PNG_URI.to_string(),
    };
    let outcome = flows::remove_background(&provider, &input).await;
    assert_eq!(
        outcome.ok().map(|o| o.image_data_uri).as_deref(),
        Some("data:image/png;base64,d29ybGQ=")
    );
    assert_eq!(provider.last_request().format, ResponseFormat::Image);
}

#[tokio::test]
async fn background_removal_without_image_needs_valid_json() {
    let provider = MockProvider::replying("I cannot edit images");
    let input = BackgroundInput {
        image_data_uri: PNG_URI.to_string(),
    };
    let outcome = flows::remove_background(&provider, &input).await;
    assert!(matches!(outcome, FlowOutcome::SchemaMismatch(_)));
}

#[tokio::test]
async fn format_style_reaches_the_prompt() {
    let provider = MockProvider::replying(r#"{"formattedText": "- one\n- two"}"#);
    let input = FormatInput {
        text: "one two".to_string(),
        style: FormatStyle::BulletList,
    };
    assert!(flows::format_text(&provider, &input).await.is_ok());
    assert!(provider.last_request().prompt.contains("bullet list"));
}

#[tokio::test]
async fn book_summary_is_remembered() {
    let provider = MockProvider::replying(
        r#"{"title": "Dune", "summary": "Spice.", "keyPoints": ["Arrakis"], "themes": ["Power"]}"#,
    );
    let input = BookSummaryInput {
        title: "Dune".to_string(),
        author: Some("Frank Herbert".to_string()),
        text: None,
    };
    let summary = flows::summarize_book(&provider, &input).await.ok().unwrap();
    assert_eq!(summary.key_points, vec!["Arrakis".to_string()]);
    assert!(provider.last_request().prompt.contains("by Frank Herbert"));

    let mut storage = Storage::in_memory();
    assert!(flows::last_book_summary(&storage).is_none());
    flows::remember_book_summary(&mut storage, &summary).unwrap();
    assert_eq!(flows::last_book_summary(&storage), Some(summary));
}

#[tokio::test]
async fn run_json_validates_input_before_calling() {
    let provider = MockProvider::replying(r#"{"translatedText": "Hola"}"#);

    let missing_field = AiFlow::Translate.run_json(&provider, json!({ "text": "hi" })).await;
    assert!(matches!(
        missing_field,
        Err(FlowError::Provider(AiError::InvalidInput(_)))
    ));
    let blank = AiFlow::Translate
        .run_json(&provider, json!({ "text": "  ", "targetLanguage": "Spanish" }))
        .await;
    assert!(matches!(blank, Err(FlowError::Provider(AiError::InvalidInput(_)))));
    assert_eq!(provider.calls(), 0);

    let output = AiFlow::Translate
        .run_json(&provider, json!({ "text": "hi", "targetLanguage": "Spanish" }))
        .await
        .unwrap();
    assert_eq!(output, json!({ "translatedText": "Hola" }));
}

#[test]
fn flow_names_round_trip() {
    for flow in AiFlow::ALL {
        assert_eq!(AiFlow::from_name(flow.name()), Some(flow));
        assert!(toolbench::catalog::find(flow.tool_id()).is_some(), "{} has no tool", flow.name());
    }
}
