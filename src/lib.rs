/*!
# Toolbench

A catalog of everyday utility tools served over HTTP and from the command line.

## Overview

Each tool is a small, mostly pure function: unit and currency conversion,
password generation and strength checking, CSV/JSON conversion, document
format conversion and an encrypted note keeper. A handful of AI tools
(translation, summaries, transcription, OCR, background removal, text
formatting, book summaries) forward one request to a hosted generative model.

## Architecture

### Tool Layer
- Pure conversion and scoring functions, no I/O
- Document converters reading and writing DOCX, XLSX, PPTX and PDF
- AI flows behind the `ModelProvider` trait

### Persistence Layer
- Typed keys over a string key/value store, JSON values in a versioned envelope
- Capped per-tool conversion history
- Notes sealed with AES-256-GCM under an Argon2-derived key, gzip + bincode backups

### Web Layer (`web` feature)
- axum router exposing every tool, JSON errors, multipart uploads
- Shared async task tracker reporting progress for long-running work

## Modules

- **catalog**: Tool descriptors, categories and icons
- **units**: Unit and currency conversion
- **password**: Password generator and strength scorer
- **csv_json**: CSV to JSON and back
- **converter**: Document conversion dispatcher
- **history**: Conversion history per tool
- **storage**: Key-scoped, versioned persistence
- **notes**: Secure note keeper
- **task**: Async task state tracking
- **ai**: Generative model flows
- **sitemap**: Sitemap XML
- **config**: TOML configuration with environment overrides
- **error**: Crate-wide error type
- **app**: HTTP routing (web feature only)
*/

pub mod ai;
pub mod catalog;
pub mod config;
pub mod converter;
pub mod csv_json;
pub mod error;
pub mod history;
pub mod notes;
pub mod password;
pub mod sitemap;
pub mod storage;
pub mod task;
pub mod units;

// Web-specific modules only included when the web feature is enabled
#[cfg(feature = "web")]
pub mod app;

pub use error::{Error, Result};
