//! Static catalog of every tool the site offers.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCategory {
    Converters,
    Documents,
    Security,
    Text,
    Ai,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 5] = [
        ToolCategory::Converters,
        ToolCategory::Documents,
        ToolCategory::Security,
        ToolCategory::Text,
        ToolCategory::Ai,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ToolCategory::Converters => "Converters",
            ToolCategory::Documents => "Document Tools",
            ToolCategory::Security => "Security",
            ToolCategory::Text => "Text Tools",
            ToolCategory::Ai => "AI Tools",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.slug() == name || c.label().eq_ignore_ascii_case(name))
    }

    pub fn slug(&self) -> &'static str {
        match self {
            ToolCategory::Converters => "converters",
            ToolCategory::Documents => "documents",
            ToolCategory::Security => "security",
            ToolCategory::Text => "text",
            ToolCategory::Ai => "ai",
        }
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Icon shown next to a tool. Each variant maps to exactly one glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolIcon {
    Ruler,
    Coins,
    Key,
    ShieldCheck,
    Braces,
    FileText,
    FileSpreadsheet,
    Presentation,
    Lock,
    Languages,
    Sparkles,
    Mic,
    ScanText,
    Eraser,
    AlignLeft,
    BookOpen,
}

impl ToolIcon {
    pub fn glyph(&self) -> &'static str {
        match self {
            ToolIcon::Ruler => "📏",
            ToolIcon::Coins => "💱",
            ToolIcon::Key => "🔑",
            ToolIcon::ShieldCheck => "🛡️",
            ToolIcon::Braces => "{ }",
            ToolIcon::FileText => "📄",
            ToolIcon::FileSpreadsheet => "📊",
            ToolIcon::Presentation => "📽️",
            ToolIcon::Lock => "🔒",
            ToolIcon::Languages => "🌐",
            ToolIcon::Sparkles => "✨",
            ToolIcon::Mic => "🎙️",
            ToolIcon::ScanText => "🔍",
            ToolIcon::Eraser => "🧽",
            ToolIcon::AlignLeft => "📝",
            ToolIcon::BookOpen => "📖",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub route: &'static str,
    pub category: ToolCategory,
    pub icon: ToolIcon,
    pub ai_powered: bool,
    pub tags: &'static [&'static str],
}

macro_rules! tool {
    ($id:literal, $title:literal, $description:literal, $category:ident, $icon:ident, $ai:literal, [$($tag:literal),*]) => {
        ToolDescriptor {
            id: $id,
            title: $title,
            description: $description,
            route: concat!("/tools/", $id),
            category: ToolCategory::$category,
            icon: ToolIcon::$icon,
            ai_powered: $ai,
            tags: &[$($tag),*],
        }
    };
}

pub static TOOLS: &[ToolDescriptor] = &[
    tool!("unit-converter", "Unit Converter",
        "Convert length, mass, volume, area, speed, time, data storage and temperature units",
        Converters, Ruler, false, ["units", "length", "temperature", "measurement"]),
    tool!("currency-converter", "Currency Converter",
        "Convert between major currencies using fixed reference rates",
        Converters, Coins, false, ["currency", "money", "exchange"]),
    tool!("password-generator", "Password Generator",
        "Generate strong random or pronounceable passwords",
        Security, Key, false, ["password", "random", "security"]),
    tool!("password-strength-checker", "Password Strength Checker",
        "Score a password and estimate how long it would take to crack",
        Security, ShieldCheck, false, ["password", "strength", "security"]),
    tool!("csv-json-converter", "CSV to JSON Converter",
        "Convert CSV data to JSON and back",
        Converters, Braces, false, ["csv", "json", "data"]),
    tool!("docx-to-pdf", "Word to PDF",
        "Convert DOCX documents to PDF",
        Documents, FileText, false, ["docx", "word", "pdf"]),
    tool!("pdf-to-docx", "PDF to Word",
        "Extract the text of a PDF into an editable document",
        Documents, FileText, false, ["pdf", "docx", "word"]),
    tool!("xlsx-to-pdf", "Excel to PDF",
        "Render the first worksheet of a spreadsheet as a PDF table",
        Documents, FileSpreadsheet, false, ["xlsx", "excel", "pdf"]),
    tool!("pdf-to-xlsx", "PDF to Excel",
        "Extract PDF text into spreadsheet rows",
        Documents, FileSpreadsheet, false, ["pdf", "xlsx", "excel"]),
    tool!("pptx-to-pdf", "PowerPoint to PDF",
        "Convert the text of a presentation to PDF",
        Documents, Presentation, false, ["pptx", "powerpoint", "pdf"]),
    tool!("pdf-to-pptx", "PDF to PowerPoint",
        "Turn each PDF page into a presentation slide",
        Documents, Presentation, false, ["pdf", "pptx", "slides"]),
    tool!("secure-notes", "Secure Notes",
        "Keep notes encrypted behind a master password",
        Security, Lock, false, ["notes", "encryption", "private"]),
    tool!("ai-translator", "AI Translator",
        "Translate text into another language",
        Ai, Languages, true, ["translate", "language", "ai"]),
    tool!("ai-summarizer", "AI Summarizer",
        "Summarize long text into a few sentences",
        Ai, Sparkles, true, ["summary", "text", "ai"]),
    tool!("audio-transcriber", "Audio Transcriber",
        "Transcribe speech from an audio file",
        Ai, Mic, true, ["audio", "speech", "transcription", "ai"]),
    tool!("image-to-text", "Image to Text",
        "Extract text from an image",
        Ai, ScanText, true, ["ocr", "image", "text", "ai"]),
    tool!("background-remover", "Background Remover",
        "Remove the background from a photo",
        Ai, Eraser, true, ["image", "background", "ai"]),
    tool!("text-formatter", "Text Formatter",
        "Clean up and format text in a chosen style",
        Text, AlignLeft, true, ["text", "format", "ai"]),
    tool!("book-summary-creator", "Book Summary Creator",
        "Produce a structured summary of a book",
        Ai, BookOpen, true, ["book", "summary", "reading", "ai"]),
];

pub fn all() -> &'static [ToolDescriptor] {
    TOOLS
}

pub fn find(id: &str) -> Option<&'static ToolDescriptor> {
    TOOLS.iter().find(|t| t.id == id)
}

pub fn by_category(category: ToolCategory) -> Vec<&'static ToolDescriptor> {
    TOOLS.iter().filter(|t| t.category == category).collect()
}

/// Case-insensitive match against title, description and tags
pub fn search(query: &str) -> Vec<&'static ToolDescriptor> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return TOOLS.iter().collect();
    }
    TOOLS
        .iter()
        .filter(|t| {
            t.title.to_lowercase().contains(&query)
                || t.description.to_lowercase().contains(&query)
                || t.tags.iter().any(|tag| tag.contains(query.as_str()))
        })
        .collect()
}

/// Search results narrowed to one category; either filter may be absent
pub fn filter(query: Option<&str>, category: Option<ToolCategory>) -> Vec<&'static ToolDescriptor> {
    let mut tools = match query {
        Some(query) => search(query),
        None => TOOLS.iter().collect(),
    };
    if let Some(category) = category {
        tools.retain(|t| t.category == category);
    }
    tools
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_routes_follow_ids() {
        let mut seen = HashSet::new();
        for tool in TOOLS {
            assert!(seen.insert(tool.id), "duplicate tool id {}", tool.id);
            assert_eq!(tool.route, format!("/tools/{}", tool.id));
        }
    }

    #[test]
    fn ai_tools_are_flagged() {
        assert!(find("ai-translator").is_some_and(|t| t.ai_powered));
        assert!(find("unit-converter").is_some_and(|t| !t.ai_powered));
        assert!(find("no-such-tool").is_none());
    }

    #[test]
    fn search_matches_tags() {
        let hits = search("OCR");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "image-to-text");
    }

    #[test]
    fn query_and_category_narrow_together() {
        let text_hits = filter(Some("text"), None);
        assert!(text_hits.iter().any(|t| t.category == ToolCategory::Documents));

        let narrowed = filter(Some("text"), Some(ToolCategory::Text));
        let ids: Vec<_> = narrowed.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["text-formatter"]);

        let ids = |tools: Vec<&ToolDescriptor>| tools.iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(
            ids(filter(None, Some(ToolCategory::Security))),
            ids(by_category(ToolCategory::Security))
        );
        assert_eq!(filter(None, None).len(), TOOLS.len());
    }
}
