use lazy_static::lazy_static;
use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::storage::{Storage, StorageError, StorageKey};

pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
pub const DIGITS: &str = "0123456789";
pub const SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Characters dropped when `exclude_similar` is set
pub const SIMILAR_CHARACTERS: &[char] = &['I', 'l', '1', 'O', '0'];

pub const MIN_LENGTH: usize = 4;
pub const MAX_LENGTH: usize = 128;
pub const MAX_BATCH: usize = 50;

/// Sentinel returned when every character class is switched off
pub const NO_CHARACTER_TYPES: &str = "Please select at least one character type";

const CONSONANTS: &str = "bcdfghjklmnpqrstvwxyz";
const VOWELS: &str = "aeiou";
const UPPERCASE_CHANCE: f64 = 0.3;
const GUESSES_PER_SECOND: f64 = 1e9;

// Every entry sits inside a single character class; see `score`.
const KEYBOARD_PATTERNS: &[&str] = &[
    "qwerty", "qwertz", "azerty", "asdf", "zxcv", "qazwsx", "1234", "2345", "3456", "4567",
    "5678", "6789", "7890", "abcd", "bcde", "cdef", "defg", "!@#$", "QWERTY", "ASDF", "ABCD",
];

const COMMON_PASSWORDS: &[&str] = &[
    "password", "123456", "12345678", "123456789", "1234567890", "qwerty", "111111",
    "123123", "letmein", "welcome", "monkey", "dragon", "football", "iloveyou", "admin",
    "login", "princess", "sunshine", "master", "shadow", "baseball", "superman", "starwars",
    "whatever", "000000", "654321", "696969", "PASSWORD", "QWERTY",
];

lazy_static! {
    static ref KEYBOARD_REGEX: Regex = Regex::new(
        &KEYBOARD_PATTERNS
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|")
    )
    .expect("keyboard pattern list is a valid alternation");
}

/// Options of the generator form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorOptions {
    pub length: usize,
    pub uppercase: bool,
    pub lowercase: bool,
    pub numbers: bool,
    pub symbols: bool,
    pub exclude_similar: bool,
    pub pronounceable: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            length: 16,
            uppercase: true,
            lowercase: true,
            numbers: true,
            symbols: true,
            exclude_similar: false,
            pronounceable: false,
        }
    }
}

impl GeneratorOptions {
    pub fn clamped_length(&self) -> usize {
        self.length.clamp(MIN_LENGTH, MAX_LENGTH)
    }

    fn any_class(&self) -> bool {
        self.uppercase || self.lowercase || self.numbers || self.symbols
    }
}

/// Either a password or the error sentinel shown in place of one
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum GenerationResult {
    Password(String),
    Error(String),
}

impl GenerationResult {
    pub fn password(&self) -> Option<&str> {
        match self {
            GenerationResult::Password(p) => Some(p),
            GenerationResult::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, GenerationResult::Error(_))
    }
}

fn filtered(chars: &str, exclude_similar: bool) -> impl Iterator<Item = char> + '_ {
    chars
        .chars()
        .filter(move |c| !(exclude_similar && SIMILAR_CHARACTERS.contains(c)))
}

/// Concatenation of the enabled classes, minus look-alikes when requested
pub fn build_charset(options: &GeneratorOptions) -> Vec<char> {
    let mut charset = Vec::new();
    let classes = [
        (options.uppercase, UPPERCASE),
        (options.lowercase, LOWERCASE),
        (options.numbers, DIGITS),
        (options.symbols, SYMBOLS),
    ];
    for (enabled, chars) in classes {
        if enabled {
            charset.extend(filtered(chars, options.exclude_similar));
        }
    }
    charset
}

pub fn generate(options: &GeneratorOptions) -> GenerationResult {
    generate_with(options, &mut rand::thread_rng())
}

/// Generate one password drawing from `rng`.
///
/// Never panics: with every class disabled the `Error` sentinel comes back.
pub fn generate_with<R: Rng + ?Sized>(options: &GeneratorOptions, rng: &mut R) -> GenerationResult {
    if !options.any_class() {
        return GenerationResult::Error(NO_CHARACTER_TYPES.to_string());
    }

    let length = options.clamped_length();
    if options.pronounceable && (options.uppercase || options.lowercase) {
        return GenerationResult::Password(pronounceable(options, length, rng));
    }

    let charset = build_charset(options);
    let password = (0..length)
        .filter_map(|_| charset.choose(rng).copied())
        .collect();
    GenerationResult::Password(password)
}

fn pronounceable<R: Rng + ?Sized>(options: &GeneratorOptions, length: usize, rng: &mut R) -> String {
    let upper_only = options.uppercase && !options.lowercase;
    // Letters whose upper or lower form is a look-alike never get picked
    let usable = |c: &char| {
        !options.exclude_similar
            || !(SIMILAR_CHARACTERS.contains(c) || SIMILAR_CHARACTERS.contains(&c.to_ascii_uppercase()))
    };
    let consonants: Vec<char> = CONSONANTS.chars().filter(usable).collect();
    let vowels: Vec<char> = VOWELS.chars().filter(usable).collect();

    let mut tail = Vec::new();
    if length >= 6 {
        if options.numbers {
            let digits: Vec<char> = filtered(DIGITS, options.exclude_similar).collect();
            tail.extend((0..2).filter_map(|_| digits.choose(rng).copied()));
        }
        if options.symbols {
            let symbols: Vec<char> = SYMBOLS.chars().collect();
            tail.extend(symbols.choose(rng).copied());
        }
    }

    let mut password = String::with_capacity(length);
    for i in 0..length - tail.len() {
        let pool = if i % 2 == 0 { &consonants } else { &vowels };
        let Some(&letter) = pool.choose(rng) else {
            continue;
        };
        let letter = if upper_only || (options.uppercase && rng.gen_bool(UPPERCASE_CHANCE)) {
            letter.to_ascii_uppercase()
        } else {
            letter
        };
        password.push(letter);
    }
    password.extend(tail);
    password
}

/// Generate `count` passwords (capped at 50).
///
/// # Returns
/// * `Result<Vec<String>, String>` - The batch, or the error sentinel message
pub fn generate_batch_with<R: Rng + ?Sized>(
    options: &GeneratorOptions,
    count: usize,
    rng: &mut R,
) -> Result<Vec<String>, String> {
    let mut batch = Vec::new();
    for _ in 0..count.clamp(1, MAX_BATCH) {
        match generate_with(options, rng) {
            GenerationResult::Password(p) => batch.push(p),
            GenerationResult::Error(message) => return Err(message),
        }
    }
    Ok(batch)
}

pub fn generate_batch(options: &GeneratorOptions, count: usize) -> Result<Vec<String>, String> {
    generate_batch_with(options, count, &mut rand::thread_rng())
}

/// Keep the batch so the generator page can show it again
pub fn remember_batch(storage: &mut Storage, batch: &[String]) -> Result<(), StorageError> {
    storage.set(&StorageKey::PasswordLastBatch, &batch)
}

pub fn last_batch(storage: &Storage) -> Vec<String> {
    storage.get(&StorageKey::PasswordLastBatch).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum StrengthLevel {
    VeryWeak,
    Weak,
    Fair,
    Strong,
    VeryStrong,
}

impl StrengthLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=19 => StrengthLevel::VeryWeak,
            20..=39 => StrengthLevel::Weak,
            40..=59 => StrengthLevel::Fair,
            60..=79 => StrengthLevel::Strong,
            _ => StrengthLevel::VeryStrong,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StrengthLevel::VeryWeak => "Very Weak",
            StrengthLevel::Weak => "Weak",
            StrengthLevel::Fair => "Fair",
            StrengthLevel::Strong => "Strong",
            StrengthLevel::VeryStrong => "Very Strong",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Classes {
    lower: bool,
    upper: bool,
    digit: bool,
    symbol: bool,
}

impl Classes {
    fn of(password: &str) -> Self {
        let mut classes = Classes::default();
        for c in password.chars() {
            if c.is_ascii_lowercase() {
                classes.lower = true;
            } else if c.is_ascii_uppercase() {
                classes.upper = true;
            } else if c.is_ascii_digit() {
                classes.digit = true;
            } else {
                classes.symbol = true;
            }
        }
        classes
    }

    fn count(&self) -> usize {
        [self.lower, self.upper, self.digit, self.symbol]
            .iter()
            .filter(|present| **present)
            .count()
    }

    fn charset_size(&self) -> usize {
        let mut size = 0;
        if self.lower {
            size += LOWERCASE.len();
        }
        if self.upper {
            size += UPPERCASE.len();
        }
        if self.digit {
            size += DIGITS.len();
        }
        if self.symbol {
            size += SYMBOLS.len();
        }
        size
    }
}

fn has_repeated_run(password: &str) -> bool {
    let chars: Vec<char> = password.chars().collect();
    chars.windows(3).any(|w| w[0] == w[1] && w[1] == w[2])
}

fn has_keyboard_pattern(password: &str) -> bool {
    KEYBOARD_REGEX.is_match(password)
}

pub fn is_common_password(password: &str) -> bool {
    COMMON_PASSWORDS.contains(&password)
}

/// Additive strength heuristic clamped to 0..=100.
///
/// Patterns and common passwords are matched case-sensitively and each sits
/// inside one character class, so appending a character of a class the
/// password lacks never lowers the score.
pub fn score(password: &str) -> u8 {
    if password.is_empty() {
        return 0;
    }

    let length = password.chars().count() as i32;
    let classes = Classes::of(password);

    let mut score = (length * 2).min(20);
    for threshold in [8, 12, 16] {
        if length >= threshold {
            score += 10;
        }
    }

    score += classes.count() as i32 * 10;
    if classes.count() == 4 {
        score += 10;
    }

    if has_repeated_run(password) {
        score -= 15;
    }
    if has_keyboard_pattern(password) {
        score -= 15;
    }
    if is_common_password(password) {
        score = score.min(5);
    }

    score.clamp(0, 100) as u8
}

/// Order-of-magnitude brute-force estimate at a billion guesses per second
pub fn estimate_crack_seconds(password: &str) -> f64 {
    let size = Classes::of(password).charset_size() as f64;
    let length = password.chars().count() as i32;
    size.powi(length) / GUESSES_PER_SECOND
}

pub fn format_crack_time(seconds: f64) -> String {
    const MINUTE: f64 = 60.0;
    const HOUR: f64 = 60.0 * MINUTE;
    const DAY: f64 = 24.0 * HOUR;
    const YEAR: f64 = 365.0 * DAY;
    const CENTURY: f64 = 100.0 * YEAR;

    let bucket = |value: f64, unit: &str| {
        let n = value.floor() as u64;
        if n == 1 {
            format!("1 {unit}")
        } else {
            format!("{n} {unit}s")
        }
    };

    if !seconds.is_finite() || seconds >= CENTURY {
        "Centuries".to_string()
    } else if seconds < 1.0 {
        "Instant".to_string()
    } else if seconds < MINUTE {
        bucket(seconds, "second")
    } else if seconds < HOUR {
        bucket(seconds / MINUTE, "minute")
    } else if seconds < DAY {
        bucket(seconds / HOUR, "hour")
    } else if seconds < YEAR {
        bucket(seconds / DAY, "day")
    } else {
        bucket(seconds / YEAR, "year")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrengthReport {
    pub score: u8,
    pub level: StrengthLevel,
    pub label: &'static str,
    pub crack_time: String,
    pub feedback: Vec<String>,
}

/// Score a password and explain what would improve it
pub fn evaluate(password: &str) -> StrengthReport {
    let score = score(password);
    let level = StrengthLevel::from_score(score);
    let classes = Classes::of(password);

    let mut feedback = Vec::new();
    if password.chars().count() < 12 {
        feedback.push("Use at least 12 characters".to_string());
    }
    if !classes.lower {
        feedback.push("Add lowercase letters".to_string());
    }
    if !classes.upper {
        feedback.push("Add uppercase letters".to_string());
    }
    if !classes.digit {
        feedback.push("Add numbers".to_string());
    }
    if !classes.symbol {
        feedback.push("Add symbols".to_string());
    }
    if has_repeated_run(password) {
        feedback.push("Avoid repeating the same character".to_string());
    }
    if has_keyboard_pattern(password) {
        feedback.push("Avoid keyboard patterns and sequences".to_string());
    }
    if is_common_password(password) {
        feedback.push("This is a commonly used password".to_string());
    }

    StrengthReport {
        score,
        level,
        label: level.label(),
        crack_time: format_crack_time(estimate_crack_seconds(password)),
        feedback,
    }
}
