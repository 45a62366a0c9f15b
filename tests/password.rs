use rand::SeedableRng;
use rand::rngs::StdRng;

use toolbench::password::{
    self, DIGITS, GenerationResult, build_charset, GeneratorOptions, LOWERCASE, MAX_BATCH, NO_CHARACTER_TYPES, SYMBOLS,
    SIMILAR_CHARACTERS, StrengthLevel, UPPERCASE, evaluate, generate_batch_with, generate_with, score,
};
use toolbench::storage::Storage;

fn options() -> GeneratorOptions {
    GeneratorOptions::default()
}

fn generated(options: &GeneratorOptions, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    match generate_with(options, &mut rng) {
        GenerationResult::Password(p) => p,
        GenerationResult::Error(e) => panic!("unexpected error: {e}"),
    }
}

#[test]
fn generated_length_is_clamped() {
    let mut opts = options();
    for (requested, expected) in [(16, 16), (1, 4), (500, 128), (4, 4)] {
        opts.length = requested;
        assert_eq!(generated(&opts, 7).chars().count(), expected);
    }
}

#[test]
fn only_enabled_classes_are_used() {
    let opts = GeneratorOptions {
        length: 64,
        uppercase: false,
        lowercase: false,
        numbers: true,
        symbols: false,
        ..options()
    };
    for seed in 0..20 {
        assert!(generated(&opts, seed).chars().all(|c| DIGITS.contains(c)));
    }
}

#[test]
fn every_class_combination_respects_charset_and_length() {
    for mask in 1u8..16 {
        for exclude_similar in [false, true] {
            for pronounceable in [false, true] {
                for length in [4, 5, 12, 33] {
                    let opts = GeneratorOptions {
                        length,
                        uppercase: mask & 1 != 0,
                        lowercase: mask & 2 != 0,
                        numbers: mask & 4 != 0,
                        symbols: mask & 8 != 0,
                        exclude_similar,
                        pronounceable,
                    };
                    let charset = build_charset(&opts);
                    for seed in 0..5 {
                        let password = generated(&opts, seed);
                        assert_eq!(password.chars().count(), length, "{password} for mask {mask:04b}");
                        assert!(
                            password.chars().all(|c| charset.contains(&c)),
                            "{password} leaves the charset for mask {mask:04b}"
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn similar_characters_can_be_excluded() {
    let opts = GeneratorOptions {
        length: 128,
        exclude_similar: true,
        ..options()
    };
    for seed in 0..20 {
        let password = generated(&opts, seed);
        assert!(
            !password.chars().any(|c| SIMILAR_CHARACTERS.contains(&c)),
            "{password} contains a look-alike"
        );
    }
}

#[test]
fn no_classes_returns_error_sentinel() {
    let opts = GeneratorOptions {
        uppercase: false,
        lowercase: false,
        numbers: false,
        symbols: false,
        ..options()
    };
    let result = password::generate(&opts);
    assert_eq!(result, GenerationResult::Error(NO_CHARACTER_TYPES.to_string()));
    assert!(result.is_error());
}

#[test]
fn pronounceable_passwords_alternate_letters() {
    let opts = GeneratorOptions {
        length: 12,
        uppercase: false,
        numbers: false,
        symbols: false,
        pronounceable: true,
        ..options()
    };
    let password = generated(&opts, 3);
    assert_eq!(password.len(), 12);
    for (i, c) in password.chars().enumerate() {
        let vowel = "aeiou".contains(c);
        assert_eq!(vowel, i % 2 == 1, "{password} breaks the pattern at {i}");
    }
}

#[test]
fn pronounceable_tail_holds_digits_and_symbol() {
    let opts = GeneratorOptions {
        length: 10,
        uppercase: false,
        pronounceable: true,
        ..options()
    };
    let password: Vec<char> = generated(&opts, 11).chars().collect();
    assert_eq!(password.len(), 10);
    assert!(DIGITS.contains(password[7]));
    assert!(DIGITS.contains(password[8]));
    assert!(SYMBOLS.contains(password[9]));
    assert!(password[..7].iter().all(|c| LOWERCASE.contains(*c)));
}

#[test]
fn batches_are_capped() {
    let mut rng = StdRng::seed_from_u64(1);
    let batch = generate_batch_with(&options(), 500, &mut rng).unwrap();
    assert_eq!(batch.len(), MAX_BATCH);
    let batch = generate_batch_with(&options(), 0, &mut rng).unwrap();
    assert_eq!(batch.len(), 1);
}

#[test]
fn last_batch_is_remembered() {
    let mut storage = Storage::in_memory();
    assert!(password::last_batch(&storage).is_empty());

    let batch = vec!["abc".to_string(), "def".to_string()];
    password::remember_batch(&mut storage, &batch).unwrap();
    assert_eq!(password::last_batch(&storage), batch);
}

#[test]
fn common_passwords_score_very_weak() {
    assert!(score("password") < 20);
    assert_eq!(evaluate("password").level, StrengthLevel::VeryWeak);
    assert_eq!(score(""), 0);
}

#[test]
fn long_mixed_passwords_score_very_strong() {
    let report = evaluate("T7#mVq!9zR$2wLp@");
    assert_eq!(report.level, StrengthLevel::VeryStrong);
    assert_eq!(report.label, "Very Strong");
    assert!(report.feedback.is_empty());
    assert_eq!(report.crack_time, "Centuries");
}

#[test]
fn adding_a_missing_class_never_lowers_the_score() {
    let samples = ["abcdefgh", "hello", "Zebra", "1234", "aaa", "qwerty"];
    for base in samples {
        let before = score(base);
        for extra in [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS] {
            let Some(c) = extra.chars().nth(7) else { continue };
            if base.chars().any(|b| extra.contains(b)) {
                continue;
            }
            let after = score(&format!("{base}{c}"));
            assert!(after >= before, "{base} -> {base}{c}: {before} > {after}");
        }
    }
}

#[test]
fn feedback_names_what_is_missing() {
    let report = evaluate("abc");
    assert!(report.feedback.iter().any(|f| f.contains("12 characters")));
    assert!(report.feedback.iter().any(|f| f.contains("uppercase")));
    assert!(report.feedback.iter().any(|f| f.contains("numbers")));
    assert!(report.feedback.iter().any(|f| f.contains("symbols")));
}
