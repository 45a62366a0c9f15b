use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvJsonError {
    #[error("CSV input is empty")]
    EmptyCsv,

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("JSON input must be an array of objects")]
    NotArrayOfObjects,
}

/// Convert CSV text to a JSON array of objects
///
/// The first record provides the keys. Every later non-blank record becomes
/// one object whose values are kept as strings; short rows are padded with empty
/// strings and surplus fields are dropped.
///
/// # Arguments
/// * `csv` - CSV text, header line first
///
/// # Returns
/// * `Result<Value, CsvJsonError>` - JSON array or an error
///
/// # Examples
/// ```
/// use toolbench::csv_json::csv_to_json;
///
/// let json = csv_to_json("name,age\nAlice,30").unwrap();
/// assert_eq!(json.to_string(), r#"[{"name":"Alice","age":"30"}]"#);
/// ```
pub fn csv_to_json(csv: &str) -> Result<Value, CsvJsonError> {
    let mut rows = parse_csv_records(csv).into_iter();
    let headers: Vec<String> = rows
        .next()
        .ok_or(CsvJsonError::EmptyCsv)?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for fields in rows {
        let mut record = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let value = fields.get(i).cloned().unwrap_or_default();
            record.insert(header.clone(), Value::String(value));
        }
        records.push(Value::Object(record));
    }

    log::debug!("parsed {} CSV records with {} columns", records.len(), headers.len());
    Ok(Value::Array(records))
}

/// Same as [`csv_to_json`] but rendered to text, pretty-printed when asked
pub fn csv_to_json_string(csv: &str, pretty: bool) -> Result<String, CsvJsonError> {
    let value = csv_to_json(csv)?;
    let text = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(text)
}

/// Convert a JSON array of objects to CSV text
///
/// The header is the union of all keys in first-seen order. Strings are
/// written as-is, other scalars and nested values use their JSON text, and
/// `null` becomes an empty field.
///
/// # Arguments
/// * `json` - JSON text holding an array of objects
///
/// # Returns
/// * `Result<String, CsvJsonError>` - CSV lines joined by `\n`
pub fn json_to_csv(json: &str) -> Result<String, CsvJsonError> {
    let value: Value = serde_json::from_str(json)?;
    let rows = value.as_array().ok_or(CsvJsonError::NotArrayOfObjects)?;

    let mut objects = Vec::with_capacity(rows.len());
    for row in rows {
        objects.push(row.as_object().ok_or(CsvJsonError::NotArrayOfObjects)?);
    }

    let mut headers: Vec<&String> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !headers.contains(&key) {
                headers.push(key);
            }
        }
    }

    let mut lines = Vec::with_capacity(objects.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| escape_field(h))
            .collect::<Vec<_>>()
            .join(","),
    );

    for object in &objects {
        let line = headers
            .iter()
            .map(|h| match object.get(h.as_str()) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => escape_field(s),
                Some(other) => escape_field(&other.to_string()),
            })
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }

    Ok(lines.join("\n"))
}

// Quote fields holding commas, quotes or line breaks; double inner quotes
pub(crate) fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// Split CSV text into records. A newline inside quotes stays in its field;
// blank lines outside quotes are skipped.
fn parse_csv_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Doubled quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                    quoted = true;
                }
            }
            ',' if !in_quotes => {
                record.push(std::mem::take(&mut current_field));
            }
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut current_field));
                push_record(&mut records, std::mem::take(&mut record), quoted);
                quoted = false;
            }
            _ => current_field.push(c),
        }
    }

    record.push(current_field);
    push_record(&mut records, record, quoted);
    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>, quoted: bool) {
    let blank = !quoted && record.len() == 1 && record[0].trim().is_empty();
    if !blank {
        records.push(record);
    }
}
