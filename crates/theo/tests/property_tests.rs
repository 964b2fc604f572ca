//! Property tests for masking.
//!
//! Randomized inputs from a small xorshift generator, no external crates.
//!
//! - Round-trip: unmask(masked, mapping) == original on the parsed path
//! - Idempotent mapping: one placeholder and one entity per distinct value
//! - Numbering: per category, contiguous from 1 in first-seen order
//! - Degradation: any truncated response yields confidence <= 0.7, never an error
//! - No orphans: every placeholder in masked text is mapped or was in the input

use std::collections::{BTreeMap, HashSet};
use theo::masking::{classify, resolve};
use theo_shared::masking::RECOVERED_OVERALL_CONFIDENCE;
use theo_shared::{unmask, Placeholder, Recovery};

/// Simple pseudo-random number generator for test inputs
/// Uses xorshift64 algorithm
struct TestRng {
    state: u64,
}

impl TestRng {
    fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_range(&mut self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        min + (self.next_u64() % (max - min))
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.next_range(0, items.len() as u64) as usize]
    }
}

/// Sensitive values; none is a substring of another
const SENSITIVE: [(&str, &str); 10] = [
    ("Hans Müller", "PERSON"),
    ("Eva Schmidt", "PERSON"),
    ("Dr. Thomas Weber", "PERSON"),
    ("eva.schmidt@acme.de", "EMAIL"),
    ("+49 171 8834521", "PHONE"),
    ("DE89 3704 0044 0532 0130 00", "IBAN"),
    ("Siemens Energy AG", "COMPANY"),
    ("Projekt Phoenix", "PROJECT"),
    ("2.500.000 EUR", "FINANCIAL"),
    ("Petuelring 130", "ADDRESS"),
];

const FILLER: [&str; 8] = [
    "bitte", "prüfen", "und", "dann", "Angebot", "für", "Termin", "weiterleiten.",
];

/// Random document plus the entity list a well-behaved model would return
fn generate(rng: &mut TestRng) -> (String, Vec<(&'static str, &'static str)>) {
    let mut words = Vec::new();
    let mut used = Vec::new();
    for _ in 0..rng.next_range(3, 30) {
        if rng.next_range(0, 3) == 0 {
            let entry = *rng.pick(&SENSITIVE);
            words.push(entry.0);
            if !used.contains(&entry) {
                used.push(entry);
            }
        } else {
            words.push(*rng.pick(&FILLER));
        }
    }
    (words.join(" "), used)
}

/// Detection payload with deliberately scrambled numbering
fn response_for(rng: &mut TestRng, entities: &[(&str, &str)]) -> String {
    let listed: Vec<serde_json::Value> = entities
        .iter()
        .map(|(original, category)| {
            serde_json::json!({
                "original": original,
                "masked": format!("[{}_{}]", category, rng.next_range(1, 9)),
                "category": category,
                "confidence": 0.9
            })
        })
        .collect();
    serde_json::json!({
        "masked_text": "ignored",
        "entities": listed,
        "overall_confidence": 0.9
    })
    .to_string()
}

#[test]
fn test_prop_round_trip_on_parsed_path() {
    let mut rng = TestRng::new(42);
    for _ in 0..500 {
        let (text, entities) = generate(&mut rng);
        let raw = response_for(&mut rng, &entities);

        let result = resolve(&text, classify(&raw));

        assert_eq!(result.recovery, Recovery::Parsed);
        assert_eq!(unmask(&result.masked_text, &result.mask_mapping), text);
        for (original, _) in &entities {
            assert!(!result.masked_text.contains(original), "{} leaked", original);
        }
    }
}

#[test]
fn test_prop_one_placeholder_per_distinct_value() {
    let mut rng = TestRng::new(7);
    for _ in 0..500 {
        let (text, entities) = generate(&mut rng);
        let raw = response_for(&mut rng, &entities);
        let result = resolve(&text, classify(&raw));

        assert_eq!(result.mask_mapping.len(), entities.len());
        assert_eq!(result.entity_count(), entities.len());

        let originals: HashSet<&str> = result.mask_mapping.iter().map(|(_, v)| v).collect();
        assert_eq!(originals.len(), entities.len());
    }
}

#[test]
fn test_prop_numbering_contiguous_in_first_seen_order() {
    let mut rng = TestRng::new(1234);
    for _ in 0..500 {
        let (text, entities) = generate(&mut rng);
        let raw = response_for(&mut rng, &entities);
        let result = resolve(&text, classify(&raw));

        // Order of first appearance in masked text must be 1, 2, 3... per category
        let mut next: BTreeMap<String, u32> = BTreeMap::new();
        for p in Placeholder::find_all(&result.masked_text) {
            let expected = next.entry(p.category().to_string()).or_insert(0);
            *expected += 1;
            assert_eq!(p.index(), *expected, "in {}", result.masked_text);
        }
    }
}

#[test]
fn test_prop_truncation_degrades() {
    let mut rng = TestRng::new(99);
    for _ in 0..200 {
        let (text, entities) = generate(&mut rng);
        if entities.is_empty() {
            continue;
        }
        // Model-style payload with masked_text first, as models emit it
        let (masked, _, _) = theo::masking::substitute(
            &text,
            &entities
                .iter()
                .map(|(o, c)| theo::masking::DetectedSpan {
                    original: o.to_string(),
                    category: theo_shared::Category::from_label(c),
                    confidence: 0.9,
                })
                .collect::<Vec<_>>(),
        );
        let full = format!(
            "{{\"masked_text\": {}, \"entities\": {}}}",
            serde_json::to_string(&masked).unwrap(),
            serde_json::to_string(
                &entities
                    .iter()
                    .map(|(o, c)| serde_json::json!({"original": o, "masked": format!("[{}_1]", c), "category": c}))
                    .collect::<Vec<_>>()
            )
            .unwrap()
        );

        let boundaries: Vec<usize> = full.char_indices().map(|(i, _)| i).collect();
        let cut = boundaries[rng.next_range(1, boundaries.len() as u64 - 1) as usize];
        let result = resolve(&text, classify(&full[..cut]));

        assert_ne!(result.recovery, Recovery::Parsed, "cut at {}", cut);
        assert!(result.confidence <= RECOVERED_OVERALL_CONFIDENCE);

        // Only values really present in the input are ever mapped
        for (_, original) in result.mask_mapping.iter() {
            assert!(text.contains(original));
        }
    }
}

#[test]
fn test_prop_no_orphan_placeholders() {
    let mut rng = TestRng::new(2024);
    for _ in 0..500 {
        let (text, entities) = generate(&mut rng);
        let raw = response_for(&mut rng, &entities);
        let result = resolve(&text, classify(&raw));

        for p in Placeholder::find_all(&result.masked_text) {
            assert!(result.mask_mapping.contains(&p) || text.contains(&p.token()));
        }
    }
}
