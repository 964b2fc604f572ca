//! Entity masking engine.
//!
//! Sends text to the detection model and turns the answer into a
//! `MaskingResult`. The model is treated as an untrusted oracle: its payload
//! is validated, and when it cannot be parsed the engine walks a fixed
//! fallback chain (parsed → salvaged → passthrough) instead of failing.
//!
//! On the parsed path the model's own `masked_text` is not used. Placeholders
//! are assigned locally from the validated entity originals, so numbering and
//! substitution are deterministic for a given entity list.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use theo_shared::masking::{
    DEFAULT_ENTITY_CONFIDENCE, RECOVERED_ENTITY_CONFIDENCE, RECOVERED_OVERALL_CONFIDENCE,
};
use theo_shared::{Category, DetectedEntities, Entity, MaskMapping, MaskingResult, Placeholder, Recovery};
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::llm::{ChatRequest, LlmClient};
use crate::prompts::{build_masking_message, MASKING_SYSTEM_PROMPT};

const MASKING_TEMPERATURE: f32 = 0.3;

/// Long documents need room for the full JSON echo
const MASKING_MAX_TOKENS: u32 = 16_384;

static MASKED_TEXT_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""masked_text"\s*:\s*""#).unwrap());

static ENTITIES_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""entities"\s*:\s*\["#).unwrap());

static FLAT_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^{}]*\}").unwrap());

/// Detection service
pub struct MaskingEngine {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl MaskingEngine {
    pub fn new(client: Arc<dyn LlmClient>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Detect and mask sensitive data in `text`.
    ///
    /// Only a failed model call is an error. Malformed output always yields a
    /// result, possibly degraded (see `Recovery`).
    pub async fn analyze_and_mask(
        &self,
        text: &str,
        context: Option<&str>,
    ) -> Result<MaskingResult, ServiceError> {
        let request = ChatRequest::new(&self.model)
            .system(MASKING_SYSTEM_PROMPT)
            .user(&build_masking_message(text, context))
            .temperature(MASKING_TEMPERATURE)
            .max_tokens(MASKING_MAX_TOKENS);

        info!(
            "Masking: analyzing {} chars with {}",
            text.chars().count(),
            self.model
        );

        let raw = self
            .client
            .complete(&request)
            .await
            .map_err(ServiceError::Masking)?;

        debug!("Masking: response {} chars", raw.len());

        let result = resolve(text, classify(&raw));

        info!(
            "Masking: recovery={}, entities={}, confidence={:.2}",
            result.recovery,
            result.entity_count(),
            result.confidence
        );

        Ok(result)
    }
}

/// Entity as reported by the model, before validation
#[derive(Debug, Deserialize)]
struct RawEntity {
    original: String,
    masked: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    confidence: Option<Value>,
}

/// Top-level detection payload
#[derive(Debug, Deserialize)]
struct DetectionPayload {
    #[serde(default)]
    masked_text: Option<String>,
    #[serde(default)]
    entities: Option<Vec<Value>>,
    #[serde(default)]
    overall_confidence: Option<Value>,
    #[serde(default)]
    total_entities_found: Option<Value>,
}

/// A validated detection: exact original plus category
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedSpan {
    pub original: String,
    pub category: Category,
    pub confidence: f32,
}

/// Entity recovered from a broken payload, keeping the model's placeholder
#[derive(Debug, Clone, PartialEq)]
pub struct SalvagedEntity {
    pub placeholder: Placeholder,
    pub original: String,
    pub confidence: f32,
}

/// What could be recovered from a malformed payload
#[derive(Debug, Clone, PartialEq)]
pub struct Salvage {
    pub masked_text: String,
    pub entities: Vec<SalvagedEntity>,
}

/// Interpretation of one detection response
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    /// Structured payload parsed and validated
    Parsed {
        spans: Vec<DetectedSpan>,
        overall_confidence: f32,
    },
    /// Payload broken, but masked text could be recovered
    Recoverable(Salvage),
    /// Nothing usable in the response
    Unrecoverable,
}

/// Classify a raw detection response
pub fn classify(raw: &str) -> DetectionOutcome {
    let payload = match parse_payload(raw) {
        Ok(payload) => payload,
        Err(reason) => {
            warn!("Masking: unparseable detection response ({})", reason);
            return match salvage(raw) {
                Some(s) => DetectionOutcome::Recoverable(s),
                None => DetectionOutcome::Unrecoverable,
            };
        }
    };

    let values = payload.entities.unwrap_or_default();
    let spans = validate_entities(&values);

    if let Some(reported) = payload.total_entities_found.as_ref().and_then(Value::as_u64) {
        if reported as usize != values.len() {
            debug!(
                "Masking: model reported {} entities, listed {}",
                reported,
                values.len()
            );
        }
    }

    // Model masked something but listed nothing usable: keep its text
    if spans.is_empty() {
        if let Some(masked) = payload.masked_text {
            if !Placeholder::find_all(&masked).is_empty() {
                warn!("Masking: placeholders without usable entities, salvaging masked text");
                return DetectionOutcome::Recoverable(Salvage {
                    masked_text: masked,
                    entities: Vec::new(),
                });
            }
        }
    }

    let overall_confidence = payload
        .overall_confidence
        .as_ref()
        .and_then(as_confidence)
        .unwrap_or(DEFAULT_ENTITY_CONFIDENCE);

    DetectionOutcome::Parsed {
        spans,
        overall_confidence,
    }
}

/// Turn a classified response into the final result
pub fn resolve(text: &str, outcome: DetectionOutcome) -> MaskingResult {
    match outcome {
        DetectionOutcome::Parsed {
            spans,
            overall_confidence,
        } => {
            let (masked_text, detected_entities, mask_mapping) = substitute(text, &spans);
            let dropped_entities = missing_originals(text, &spans);
            let confidence = if dropped_entities > 0 {
                warn!(
                    "Masking: {} detected values not found verbatim, flagging for review",
                    dropped_entities
                );
                overall_confidence.min(RECOVERED_OVERALL_CONFIDENCE)
            } else {
                overall_confidence
            };
            MaskingResult {
                original_text: text.to_string(),
                masked_text,
                detected_entities,
                mask_mapping,
                confidence,
                recovery: Recovery::Parsed,
                dropped_entities,
            }
        }
        DetectionOutcome::Recoverable(s) => build_salvaged(text, s),
        DetectionOutcome::Unrecoverable => {
            warn!("Masking: nothing recoverable, returning input unmasked");
            MaskingResult::passthrough(text)
        }
    }
}

fn parse_payload(raw: &str) -> Result<DetectionPayload, String> {
    // Clean answers parse as-is; masked_text may itself contain fences
    if let Ok(payload) = serde_json::from_str(raw.trim()) {
        return Ok(payload);
    }
    let json_str = extract_json(raw)?;
    serde_json::from_str(json_str).map_err(|e| e.to_string())
}

/// Extract the JSON object from an LLM response wrapped in prose or
/// markdown code fences: the outermost `{`..`}` span
fn extract_json(response: &str) -> Result<&str, String> {
    let t = response.trim();
    if t.is_empty() {
        return Err("empty response".to_string());
    }
    match (t.find('{'), t.rfind('}')) {
        (Some(s), Some(e)) if s < e => Ok(&t[s..=e]),
        _ => Err("no JSON object found".to_string()),
    }
}

fn as_confidence(value: &Value) -> Option<f32> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    if n.is_finite() {
        Some((n as f32).clamp(0.0, 1.0))
    } else {
        None
    }
}

fn validate_entities(values: &[Value]) -> Vec<DetectedSpan> {
    let mut spans = Vec::new();
    for value in values {
        let raw: RawEntity = match serde_json::from_value(value.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Masking: dropping entity with invalid shape ({})", e);
                continue;
            }
        };
        let placeholder = match Placeholder::parse(raw.masked.trim()) {
            Ok(p) => p,
            Err(e) => {
                warn!("Masking: dropping entity: {}", e);
                continue;
            }
        };
        if raw.original.trim().is_empty() {
            warn!("Masking: dropping {} entity with empty original", placeholder);
            continue;
        }
        let category = if raw.category.trim().is_empty() {
            Category::from_label(placeholder.category())
        } else {
            Category::from_label(&raw.category)
        };
        spans.push(DetectedSpan {
            original: raw.original,
            category,
            confidence: raw
                .confidence
                .as_ref()
                .and_then(as_confidence)
                .unwrap_or(DEFAULT_ENTITY_CONFIDENCE),
        });
    }
    spans
}

/// Replace every occurrence of each detected original with its placeholder.
///
/// Matching is exact and case-sensitive. At each position the longest
/// original wins; matches never overlap. Placeholders are numbered per
/// category in order of first occurrence, skipping tokens that already
/// appear literally in the source text.
pub fn substitute(text: &str, spans: &[DetectedSpan]) -> (String, DetectedEntities, MaskMapping) {
    let mut candidates: Vec<&DetectedSpan> = Vec::new();
    for span in spans {
        if candidates.iter().any(|c| c.original == span.original) {
            continue;
        }
        if !text.contains(span.original.as_str()) {
            warn!(
                "Masking: dropping {} entity not found verbatim in text",
                span.category
            );
            continue;
        }
        candidates.push(span);
    }
    candidates.sort_by(|a, b| b.original.len().cmp(&a.original.len()));

    let mut masked = String::with_capacity(text.len());
    let mut detected = DetectedEntities::new();
    let mut mapping = MaskMapping::new();
    let mut assigned: HashMap<&str, Placeholder> = HashMap::new();
    let mut counters: HashMap<String, u32> = HashMap::new();

    let mut i = 0;
    while i < text.len() {
        let tail = &text[i..];
        match candidates.iter().find(|c| tail.starts_with(c.original.as_str())) {
            Some(span) => {
                let placeholder = match assigned.get(span.original.as_str()) {
                    Some(p) => p.clone(),
                    None => {
                        let p = next_placeholder(text, &span.category, &mut counters);
                        if let Err(e) = mapping.insert(p.clone(), &span.original) {
                            warn!("Masking: {}", e);
                        }
                        detected.push(Entity::new(
                            &span.original,
                            p.clone(),
                            span.category.clone(),
                            span.confidence,
                        ));
                        assigned.insert(span.original.as_str(), p.clone());
                        p
                    }
                };
                masked.push_str(&placeholder.token());
                i += span.original.len();
            }
            None => match tail.chars().next() {
                Some(ch) => {
                    masked.push(ch);
                    i += ch.len_utf8();
                }
                None => break,
            },
        }
    }

    (masked, detected, mapping)
}

/// Distinct detected originals that do not occur in `text`
fn missing_originals(text: &str, spans: &[DetectedSpan]) -> usize {
    let mut missing: Vec<&str> = Vec::new();
    for span in spans {
        let original = span.original.as_str();
        if !text.contains(original) && !missing.contains(&original) {
            missing.push(original);
        }
    }
    missing.len()
}

fn next_placeholder(text: &str, category: &Category, counters: &mut HashMap<String, u32>) -> Placeholder {
    let code = match Placeholder::new(category.code(), 1) {
        Ok(_) => category.code().to_string(),
        Err(_) => "OTHER".to_string(),
    };
    let counter = counters.entry(code.clone()).or_insert(0);
    loop {
        *counter += 1;
        let Ok(p) = Placeholder::new(&code, *counter) else {
            continue;
        };
        if !text.contains(&p.token()) {
            return p;
        }
    }
}

/// Recover `masked_text` and any complete entity objects from a broken
/// (typically truncated) payload
pub fn salvage(raw: &str) -> Option<Salvage> {
    let key = MASKED_TEXT_KEY.find(raw)?;
    let (masked_text, terminated) = read_json_string(&raw[key.end()..]);
    if masked_text.trim().is_empty() {
        return None;
    }
    if !terminated {
        warn!("Masking: masked_text was cut off, salvaged {} chars", masked_text.len());
    }

    Some(Salvage {
        masked_text,
        entities: salvage_entities(raw),
    })
}

fn salvage_entities(raw: &str) -> Vec<SalvagedEntity> {
    let Some(list) = ENTITIES_KEY.find(raw) else {
        return Vec::new();
    };

    FLAT_OBJECT
        .find_iter(&raw[list.end()..])
        .filter_map(|m| serde_json::from_str::<RawEntity>(m.as_str()).ok())
        .filter_map(|e| {
            let placeholder = Placeholder::parse(e.masked.trim()).ok()?;
            if e.original.trim().is_empty() {
                return None;
            }
            Some(SalvagedEntity {
                placeholder,
                confidence: e
                    .confidence
                    .as_ref()
                    .and_then(as_confidence)
                    .unwrap_or(DEFAULT_ENTITY_CONFIDENCE),
                original: e.original,
            })
        })
        .collect()
}

/// Decode a JSON string body that starts right after its opening quote.
///
/// Returns the decoded text and whether the closing quote was reached. A
/// truncated body yields everything decoded so far.
fn read_json_string(s: &str) -> (String, bool) {
    let mut out = String::new();
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => return (out, true),
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('b') => out.push('\u{8}'),
                Some('f') => out.push('\u{c}'),
                Some('u') => {
                    let hex: String = chars.by_ref().take(4).collect();
                    if hex.len() < 4 {
                        break;
                    }
                    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        Some(ch) => out.push(ch),
                        None => out.push(char::REPLACEMENT_CHARACTER),
                    }
                }
                Some(other) => out.push(other),
                None => break,
            },
            _ => out.push(c),
        }
    }
    (out, false)
}

fn build_salvaged(text: &str, salvage: Salvage) -> MaskingResult {
    let placeholders = Placeholder::find_all(&salvage.masked_text);

    let mut mapping = MaskMapping::new();
    for p in &placeholders {
        mapping.mark_unresolved(p.clone());
    }

    let mut recovered = MaskMapping::new();
    let mut confidences: HashMap<Placeholder, f32> = HashMap::new();
    for e in &salvage.entities {
        if !placeholders.contains(&e.placeholder) || !text.contains(e.original.as_str()) {
            continue;
        }
        match recovered.insert(e.placeholder.clone(), &e.original) {
            Ok(()) => {
                confidences.insert(
                    e.placeholder.clone(),
                    e.confidence.min(RECOVERED_ENTITY_CONFIDENCE),
                );
            }
            Err(err) => warn!("Masking: skipping salvaged entity: {}", err),
        }
    }
    for err in mapping.merge(recovered) {
        warn!("Masking: salvage merge rejected: {}", err);
    }

    let mut detected = DetectedEntities::new();
    for p in placeholders {
        let category = Category::from_label(p.category());
        match mapping.get(&p) {
            Some(original) => {
                let confidence = confidences
                    .get(&p)
                    .copied()
                    .unwrap_or(RECOVERED_ENTITY_CONFIDENCE);
                detected.push(Entity::new(original, p.clone(), category, confidence));
            }
            None => detected.push(Entity::sentinel(p, RECOVERED_ENTITY_CONFIDENCE)),
        }
    }

    info!(
        "Masking: salvaged {} placeholders ({} with known originals)",
        detected.len(),
        mapping.len()
    );

    MaskingResult {
        original_text: text.to_string(),
        masked_text: salvage.masked_text,
        detected_entities: detected,
        mask_mapping: mapping,
        confidence: RECOVERED_OVERALL_CONFIDENCE,
        recovery: Recovery::Salvaged,
        dropped_entities: 0,
    }
}
