//! Reading text out of Office Open XML packages (DOCX and PPTX).

use lazy_static::lazy_static;
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use std::io::{Cursor, Read};
use zip::ZipArchive;

use super::ConvertError;

lazy_static! {
    static ref SLIDE_PART: Regex = Regex::new(r"^ppt/slides/slide(\d+)\.xml$").unwrap();
}

fn open_archive(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, ConvertError> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| ConvertError::Archive(e.to_string()))
}

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String, ConvertError> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| ConvertError::Archive(format!("{name}: {e}")))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| ConvertError::Archive(format!("{name}: {e}")))?;
    Ok(xml)
}

/// Text of every `<*:p>` paragraph, built from its `<*:t>` runs.
///
/// WordprocessingML (`w:`) and DrawingML (`a:`) share these local names, so
/// the same walk serves documents and slides. Tabs and breaks are kept.
pub fn paragraph_texts(xml: &str) -> Result<Vec<String>, ConvertError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| ConvertError::Xml(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::CData(t)) if in_text => {
                current.push_str(&String::from_utf8_lossy(&t));
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ConvertError::Xml(format!(
                    "at position {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs)
}

/// Paragraphs of the main body of a DOCX file
pub fn docx_paragraphs(bytes: &[u8]) -> Result<Vec<String>, ConvertError> {
    let mut archive = open_archive(bytes)?;
    let xml = read_part(&mut archive, "word/document.xml")?;
    paragraph_texts(&xml)
}

/// Non-empty paragraphs of each slide, ordered by slide number
pub fn pptx_slide_texts(bytes: &[u8]) -> Result<Vec<Vec<String>>, ConvertError> {
    let mut archive = open_archive(bytes)?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = SLIDE_PART.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort_by_key(|(number, _)| *number);

    let mut texts = Vec::with_capacity(slides.len());
    for (_, name) in slides {
        let xml = read_part(&mut archive, &name)?;
        let paragraphs = paragraph_texts(&xml)?
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect();
        texts.push(paragraphs);
    }
    Ok(texts)
}
