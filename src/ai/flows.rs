use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    AiError, FlowError, FlowOutcome, FlowOutput, MediaPart, ModelProvider, ModelReply, ModelRequest,
    ResponseFormat, object_schema, parse_data_uri, string_list_schema, string_schema,
};
use crate::storage::{Storage, StorageError, StorageKey};

pub const TRANSLATION_FALLBACK: &str = "Translation unavailable. Please try again.";
pub const SUMMARY_FALLBACK: &str = "Summary unavailable. Please try again.";
pub const TRANSCRIPTION_FALLBACK: &str = "No speech could be transcribed.";
pub const IMAGE_TEXT_FALLBACK: &str = "No text found in the image.";

// Translate

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateInput {
    pub text: String,
    pub target_language: String,
    #[serde(default)]
    pub source_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateOutput {
    pub translated_text: String,
}

impl FlowOutput for TranslateOutput {
    fn is_complete(&self) -> bool {
        !self.translated_text.trim().is_empty()
    }
}

pub async fn translate_text(
    provider: &dyn ModelProvider,
    input: &TranslateInput,
) -> FlowOutcome<TranslateOutput> {
    let source = match &input.source_language {
        Some(language) if !language.trim().is_empty() => format!("from {language} "),
        _ => String::new(),
    };
    let prompt = format!(
        "Translate the following text {source}into {}. Preserve meaning, tone and formatting. \
         Respond only with the translation.\n\nText:\n{}",
        input.target_language, input.text
    );
    let schema = object_schema(&[("translatedText", string_schema())]);
    ask(provider, prompt, None, schema).await
}

// Summarize

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    fn instruction(&self) -> &'static str {
        match self {
            SummaryLength::Short => "in one or two sentences",
            SummaryLength::Medium => "in one short paragraph",
            SummaryLength::Long => "in several paragraphs covering every main point",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeInput {
    pub text: String,
    #[serde(default)]
    pub length: SummaryLength,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizeOutput {
    pub summary: String,
}

impl FlowOutput for SummarizeOutput {
    fn is_complete(&self) -> bool {
        !self.summary.trim().is_empty()
    }
}

pub async fn summarize_text(
    provider: &dyn ModelProvider,
    input: &SummarizeInput,
) -> FlowOutcome<SummarizeOutput> {
    let prompt = format!(
        "Summarize the following text {}. Keep the key facts and leave out filler.\n\nText:\n{}",
        input.length.instruction(),
        input.text
    );
    let schema = object_schema(&[("summary", string_schema())]);
    ask(provider, prompt, None, schema).await
}

// Transcribe

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeInput {
    pub audio_data_uri: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscribeOutput {
    pub transcription: String,
}

impl FlowOutput for TranscribeOutput {}

pub async fn transcribe_audio(
    provider: &dyn ModelProvider,
    input: &TranscribeInput,
) -> FlowOutcome<TranscribeOutput> {
    let media = match media_of_kind(&input.audio_data_uri, "audio/") {
        Ok(media) => media,
        Err(e) => return FlowOutcome::ProviderError(e),
    };
    let language = input
        .language
        .as_deref()
        .map(|l| format!(" The speech is in {l}."))
        .unwrap_or_default();
    let prompt = format!(
        "Transcribe the speech in this audio recording word for word.{language} \
         Return an empty transcription if there is no speech."
    );
    let schema = object_schema(&[("transcription", string_schema())]);
    ask(provider, prompt, Some(media), schema).await
}

// Image to text

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTextInput {
    pub image_data_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTextOutput {
    pub extracted_text: String,
}

impl FlowOutput for ImageTextOutput {}

pub async fn extract_text_from_image(
    provider: &dyn ModelProvider,
    input: &ImageTextInput,
) -> FlowOutcome<ImageTextOutput> {
    let media = match media_of_kind(&input.image_data_uri, "image/") {
        Ok(media) => media,
        Err(e) => return FlowOutcome::ProviderError(e),
    };
    let prompt = "Extract all text visible in this image, keeping line breaks and reading order. \
                  Return an empty string if the image has no text."
        .to_string();
    let schema = object_schema(&[("extractedText", string_schema())]);
    ask(provider, prompt, Some(media), schema).await
}

// Background removal

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundInput {
    pub image_data_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundOutput {
    pub image_data_uri: String,
}

impl FlowOutput for BackgroundOutput {
    fn is_complete(&self) -> bool {
        parse_data_uri(&self.image_data_uri).is_ok()
    }
}

/// Asks for an image back; a JSON `imageDataUri` reply is also accepted
pub async fn remove_background(
    provider: &dyn ModelProvider,
    input: &BackgroundInput,
) -> FlowOutcome<BackgroundOutput> {
    let media = match media_of_kind(&input.image_data_uri, "image/") {
        Ok(media) => media,
        Err(e) => return FlowOutcome::ProviderError(e),
    };
    let request = ModelRequest {
        prompt: "Remove the background from this image. Keep the main subject unchanged and \
                 make everything else transparent. Return the edited image as PNG."
            .to_string(),
        media: Some(media),
        format: ResponseFormat::Image,
    };

    match provider.generate(request).await {
        Ok(ModelReply { media, text }) => match media.into_iter().find(|m| m.mime_type.starts_with("image/")) {
            Some(image) => FlowOutcome::Ok(BackgroundOutput {
                image_data_uri: image.to_data_uri(),
            }),
            None => FlowOutcome::from_reply(Ok(ModelReply::text(text))),
        },
        Err(e) => FlowOutcome::from_reply(Err(e)),
    }
}

// Text formatting

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatStyle {
    #[default]
    Clean,
    Paragraphs,
    BulletList,
    Formal,
    Casual,
    Markdown,
}

impl FormatStyle {
    fn instruction(&self) -> &'static str {
        match self {
            FormatStyle::Clean => "Fix spacing, punctuation, capitalization and obvious typos without changing the wording",
            FormatStyle::Paragraphs => "Split the text into well-formed paragraphs",
            FormatStyle::BulletList => "Rewrite the text as a concise bullet list",
            FormatStyle::Formal => "Rewrite the text in a formal, professional tone",
            FormatStyle::Casual => "Rewrite the text in a friendly, casual tone",
            FormatStyle::Markdown => "Format the text as clean Markdown with headings and lists where they fit",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatInput {
    pub text: String,
    #[serde(default)]
    pub style: FormatStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOutput {
    pub formatted_text: String,
}

impl FlowOutput for FormatOutput {
    fn is_complete(&self) -> bool {
        !self.formatted_text.trim().is_empty()
    }
}

pub async fn format_text(provider: &dyn ModelProvider, input: &FormatInput) -> FlowOutcome<FormatOutput> {
    let prompt = format!(
        "{}. Do not add new information.\n\nText:\n{}",
        input.style.instruction(),
        input.text
    );
    let schema = object_schema(&[("formattedText", string_schema())]);
    ask(provider, prompt, None, schema).await
}

// Book summaries

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummaryInput {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    /// Excerpt or full text; without it the model works from the title
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub title: String,
    pub summary: String,
    pub key_points: Vec<String>,
    pub themes: Vec<String>,
}

impl FlowOutput for BookSummary {
    fn is_complete(&self) -> bool {
        !self.summary.trim().is_empty()
    }
}

pub async fn summarize_book(provider: &dyn ModelProvider, input: &BookSummaryInput) -> FlowOutcome<BookSummary> {
    let author = input
        .author
        .as_deref()
        .filter(|a| !a.trim().is_empty())
        .map(|a| format!(" by {a}"))
        .unwrap_or_default();
    let mut prompt = format!(
        "Write a structured summary of the book \"{}\"{author}: an overview of a few paragraphs, \
         the key points a reader should remember, and the main themes.",
        input.title
    );
    if let Some(text) = input.text.as_deref().filter(|t| !t.trim().is_empty()) {
        prompt.push_str("\n\nBase the summary on this text:\n");
        prompt.push_str(text);
    }

    let schema = object_schema(&[
        ("title", string_schema()),
        ("summary", string_schema()),
        ("keyPoints", string_list_schema()),
        ("themes", string_list_schema()),
    ]);
    ask(provider, prompt, None, schema).await
}

pub fn remember_book_summary(storage: &mut Storage, summary: &BookSummary) -> Result<(), StorageError> {
    storage.set(&StorageKey::BookSummaryLast, summary)
}

pub fn last_book_summary(storage: &Storage) -> Option<BookSummary> {
    storage.get(&StorageKey::BookSummaryLast)
}

// Shared plumbing

fn media_of_kind(uri: &str, prefix: &str) -> Result<MediaPart, AiError> {
    let media = parse_data_uri(uri)?;
    if !media.mime_type.starts_with(prefix) {
        return Err(AiError::InvalidDataUri(format!(
            "expected {prefix}* content, got {}",
            media.mime_type
        )));
    }
    Ok(media)
}

async fn ask<T: FlowOutput>(
    provider: &dyn ModelProvider,
    prompt: String,
    media: Option<MediaPart>,
    schema: Value,
) -> FlowOutcome<T> {
    let request = ModelRequest {
        prompt,
        media,
        format: ResponseFormat::Json(schema),
    };
    FlowOutcome::from_reply(provider.generate(request).await)
}

/// Flows reachable by name from the HTTP API and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiFlow {
    Translate,
    Summarize,
    Transcribe,
    ImageToText,
    RemoveBackground,
    FormatText,
    BookSummary,
}

impl AiFlow {
    pub const ALL: [AiFlow; 7] = [
        AiFlow::Translate,
        AiFlow::Summarize,
        AiFlow::Transcribe,
        AiFlow::ImageToText,
        AiFlow::RemoveBackground,
        AiFlow::FormatText,
        AiFlow::BookSummary,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AiFlow::Translate => "translate",
            AiFlow::Summarize => "summarize",
            AiFlow::Transcribe => "transcribe",
            AiFlow::ImageToText => "image-to-text",
            AiFlow::RemoveBackground => "remove-background",
            AiFlow::FormatText => "format-text",
            AiFlow::BookSummary => "book-summary",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flow| flow.name() == name)
    }

    /// Output shown in place of a result when the model answers off-schema.
    /// Only the plain text flows have one.
    pub fn fallback(&self) -> Option<Value> {
        let value = match self {
            AiFlow::Translate => serde_json::to_value(TranslateOutput {
                translated_text: TRANSLATION_FALLBACK.to_string(),
            }),
            AiFlow::Summarize => serde_json::to_value(SummarizeOutput {
                summary: SUMMARY_FALLBACK.to_string(),
            }),
            AiFlow::Transcribe => serde_json::to_value(TranscribeOutput {
                transcription: TRANSCRIPTION_FALLBACK.to_string(),
            }),
            AiFlow::ImageToText => serde_json::to_value(ImageTextOutput {
                extracted_text: IMAGE_TEXT_FALLBACK.to_string(),
            }),
            AiFlow::RemoveBackground | AiFlow::FormatText | AiFlow::BookSummary => return None,
        };
        value.ok()
    }

    /// Catalog id of the tool page backed by this flow
    pub fn tool_id(&self) -> &'static str {
        match self {
            AiFlow::Translate => "ai-translator",
            AiFlow::Summarize => "ai-summarizer",
            AiFlow::Transcribe => "audio-transcriber",
            AiFlow::ImageToText => "image-to-text",
            AiFlow::RemoveBackground => "background-remover",
            AiFlow::FormatText => "text-formatter",
            AiFlow::BookSummary => "book-summary-creator",
        }
    }

    /// Decode a JSON input for this flow, run it, and encode the output
    pub async fn run_json(&self, provider: &dyn ModelProvider, input: Value) -> Result<Value, FlowError> {
        match self {
            AiFlow::Translate => {
                let input: TranslateInput = decode_input(input)?;
                require_text(&input.text)?;
                encode_output(translate_text(provider, &input).await)
            }
            AiFlow::Summarize => {
                let input: SummarizeInput = decode_input(input)?;
                require_text(&input.text)?;
                encode_output(summarize_text(provider, &input).await)
            }
            AiFlow::Transcribe => {
                let input: TranscribeInput = decode_input(input)?;
                encode_output(transcribe_audio(provider, &input).await)
            }
            AiFlow::ImageToText => {
                let input: ImageTextInput = decode_input(input)?;
                encode_output(extract_text_from_image(provider, &input).await)
            }
            AiFlow::RemoveBackground => {
                let input: BackgroundInput = decode_input(input)?;
                encode_output(remove_background(provider, &input).await)
            }
            AiFlow::FormatText => {
                let input: FormatInput = decode_input(input)?;
                require_text(&input.text)?;
                encode_output(format_text(provider, &input).await)
            }
            AiFlow::BookSummary => {
                let input: BookSummaryInput = decode_input(input)?;
                require_text(&input.title)?;
                encode_output(summarize_book(provider, &input).await)
            }
        }
    }
}

fn decode_input<T: serde::de::DeserializeOwned>(input: Value) -> Result<T, FlowError> {
    serde_json::from_value(input).map_err(|e| FlowError::Provider(AiError::InvalidInput(e.to_string())))
}

fn require_text(text: &str) -> Result<(), FlowError> {
    if text.trim().is_empty() {
        return Err(FlowError::Provider(AiError::InvalidInput("text must not be empty".to_string())));
    }
    Ok(())
}

fn encode_output<T: Serialize>(outcome: FlowOutcome<T>) -> Result<Value, FlowError> {
    let value = outcome.into_result()?;
    serde_json::to_value(value).map_err(|e| FlowError::Provider(AiError::ResponseParsing(e.to_string())))
}
