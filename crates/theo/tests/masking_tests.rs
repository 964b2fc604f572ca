//! Masking engine scenarios against a scripted detection model.

use std::collections::BTreeMap;
use std::sync::Arc;
use theo::masking::MaskingEngine;
use theo::{FakeLlmClient, LlmError};
use theo_shared::masking::RECOVERED_OVERALL_CONFIDENCE;
use theo_shared::{unmask, Category, Recovery};

fn detection(masked_text: &str, entities: &[(&str, &str, &str)]) -> String {
    let entities: Vec<serde_json::Value> = entities
        .iter()
        .map(|(original, masked, category)| {
            serde_json::json!({
                "original": original,
                "masked": masked,
                "category": category,
                "confidence": 0.95
            })
        })
        .collect();
    serde_json::json!({
        "masked_text": masked_text,
        "entities": entities,
        "overall_confidence": 0.92,
        "total_entities_found": entities.len()
    })
    .to_string()
}

fn engine(response: &str) -> MaskingEngine {
    MaskingEngine::new(Arc::new(FakeLlmClient::always(response)), "openai/gpt-5.2")
}

#[tokio::test]
async fn kontakt_scenario_masks_name_and_email() {
    let text = "Kontakt: Hans Müller, hans.mueller@firma.de";
    let response = detection(
        "Kontakt: [PERSON_1], [EMAIL_1]",
        &[
            ("Hans Müller", "[PERSON_1]", "PERSON"),
            ("hans.mueller@firma.de", "[EMAIL_1]", "EMAIL"),
        ],
    );

    let result = engine(&response).analyze_and_mask(text, None).await.unwrap();

    assert_eq!(result.masked_text, "Kontakt: [PERSON_1], [EMAIL_1]");
    assert_eq!(
        result.mask_mapping.to_token_map(),
        [
            ("[EMAIL_1]".to_string(), "hans.mueller@firma.de".to_string()),
            ("[PERSON_1]".to_string(), "Hans Müller".to_string()),
        ]
        .into_iter()
        .collect::<BTreeMap<_, _>>()
    );
    assert_eq!(unmask(&result.masked_text, &result.mask_mapping), text);
}

#[tokio::test]
async fn repeated_value_gets_one_placeholder_and_one_entity() {
    let text = "VW liefert an VW, und VW zahlt.";
    // Model numbers every occurrence separately; the engine must not
    let response = detection(
        "[COMPANY_1] liefert an [COMPANY_2], und [COMPANY_3] zahlt.",
        &[
            ("VW", "[COMPANY_1]", "COMPANY"),
            ("VW", "[COMPANY_2]", "COMPANY"),
            ("VW", "[COMPANY_3]", "COMPANY"),
        ],
    );

    let result = engine(&response).analyze_and_mask(text, None).await.unwrap();

    assert_eq!(
        result.masked_text,
        "[COMPANY_1] liefert an [COMPANY_1], und [COMPANY_1] zahlt."
    );
    assert_eq!(result.detected_entities.get(&Category::Company).unwrap().len(), 1);
    assert_eq!(result.mask_mapping.len(), 1);
}

#[tokio::test]
async fn model_masked_text_is_not_trusted() {
    let text = "Eva Schmidt arbeitet bei ACME GmbH.";
    // Model forgot to mask the company in its rendering
    let response = detection(
        "[PERSON_1] arbeitet bei ACME GmbH.",
        &[
            ("Eva Schmidt", "[PERSON_1]", "PERSON"),
            ("ACME GmbH", "[COMPANY_1]", "COMPANY"),
        ],
    );

    let result = engine(&response).analyze_and_mask(text, None).await.unwrap();
    assert_eq!(result.masked_text, "[PERSON_1] arbeitet bei [COMPANY_1].");
}

#[tokio::test]
async fn invalid_structured_data_degrades_without_error() {
    let text = "Bitte Dr. Thomas Weber anrufen.";
    for response in [
        "Das kann ich nicht beantworten.",
        "{\"masked_text\": \"Bitte [PERSON_1] anrufen.\", \"entities\": [",
        "```json\n{\"masked_text\": \"Bitte [PERSON_1] anrufen.\"",
        "{\"entities\": \"keine\"}",
        "",
    ] {
        let result = engine(response).analyze_and_mask(text, None).await.unwrap();
        assert!(
            result.confidence <= RECOVERED_OVERALL_CONFIDENCE,
            "confidence {} for {:?}",
            result.confidence,
            response
        );
        assert_ne!(result.recovery, Recovery::Parsed);
    }
}

#[tokio::test]
async fn truncated_response_merges_recovered_entities() {
    let text = "Dr. Thomas Weber (thomas.weber@acme.de) leitet Projekt Phoenix.";
    // Output budget ran out inside the last entity object
    let truncated = r#"{"masked_text": "[PERSON_1] ([EMAIL_1]) leitet [PROJECT_1].", "entities": [{"original": "Dr. Thomas Weber", "masked": "[PERSON_1]", "category": "PERSON", "confidence": 0.95}, {"original": "thomas.weber@acme.de", "masked": "[EMAIL_1]", "category": "EMAIL", "confidence": 0.9}, {"original": "Projekt Phoe"#;

    let result = engine(truncated).analyze_and_mask(text, None).await.unwrap();

    assert_eq!(result.recovery, Recovery::Salvaged);
    assert_eq!(result.confidence, RECOVERED_OVERALL_CONFIDENCE);
    assert_eq!(result.masked_text, "[PERSON_1] ([EMAIL_1]) leitet [PROJECT_1].");
    assert_eq!(result.mask_mapping.get_token("[PERSON_1]"), Some("Dr. Thomas Weber"));
    assert_eq!(
        result.mask_mapping.get_token("[EMAIL_1]"),
        Some("thomas.weber@acme.de")
    );
    assert_eq!(result.mask_mapping.get_token("[PROJECT_1]"), None);
    assert!(result.mask_mapping.is_degraded());

    // Recovered originals come back, the unknown one stays a placeholder
    assert_eq!(
        unmask(&result.masked_text, &result.mask_mapping),
        "Dr. Thomas Weber (thomas.weber@acme.de) leitet [PROJECT_1]."
    );
}

#[tokio::test]
async fn salvage_never_maps_values_absent_from_input() {
    let text = "Treffen mit [PERSON_1] und Eva";
    let raw = r#"{"masked_text": "Treffen mit [PERSON_1] und [PERSON_2]", "entities": [{"original": "Mallory", "masked": "[PERSON_2]", "category": "PERSON"}"#;

    let result = engine(raw).analyze_and_mask(text, None).await.unwrap();

    assert_eq!(result.recovery, Recovery::Salvaged);
    assert!(result.mask_mapping.iter().all(|(_, v)| text.contains(v)));
}

#[tokio::test]
async fn long_clean_document_needs_review() {
    let text = "Allgemeine Beschreibung ohne Namen. ".repeat(20);
    let response = format!(
        "{{\"masked_text\": {}, \"entities\": [], \"overall_confidence\": 0.97}}",
        serde_json::to_string(&text).unwrap()
    );

    let result = engine(&response).analyze_and_mask(&text, None).await.unwrap();

    assert_eq!(result.recovery, Recovery::Parsed);
    assert!(!result.has_detections());
    assert!(result.needs_manual_review(500));
    assert!(!result.needs_manual_review(10_000));
}

#[tokio::test]
async fn context_reaches_the_model() {
    let client = Arc::new(FakeLlmClient::always(&detection("x", &[])));
    let engine = MaskingEngine::new(client.clone(), "m");

    engine
        .analyze_and_mask("Hallo", Some("Kundenanfrage"))
        .await
        .unwrap();

    let sent = client.requests()[0].last_user_message().unwrap().to_string();
    assert!(sent.starts_with("Kontext: Kundenanfrage"));
    assert!(sent.ends_with("Hallo"));
}

#[tokio::test]
async fn transport_failure_is_a_masking_error() {
    let engine = MaskingEngine::new(
        Arc::new(FakeLlmClient::always_error(LlmError::Transport(
            "connection refused".to_string(),
        ))),
        "m",
    );
    let err = engine.analyze_and_mask("Hallo", None).await.unwrap_err();
    assert_eq!(err.stage(), "masking");
    assert!(!err.to_string().contains("Hallo"));
}

#[tokio::test]
async fn attachment_query_parses_cleanly() {
    let text = theo::attachments::compose_input(
        "Bitte prüfen",
        &[theo::attachments::Attachment::text("notiz.txt", "Kontakt: Hans Müller")],
        5000,
    );
    let masked = text.replace("Hans Müller", "[PERSON_1]");
    let response = detection(&masked, &[("Hans Müller", "[PERSON_1]", "PERSON")]);

    let result = engine(&response).analyze_and_mask(&text, None).await.unwrap();

    assert_eq!(result.recovery, Recovery::Parsed);
    assert!((result.confidence - 0.92).abs() < 1e-6);
    assert_eq!(result.masked_text, masked);
    assert_eq!(result.mask_mapping.get_token("[PERSON_1]"), Some("Hans Müller"));
}

#[tokio::test]
async fn unlocated_detection_is_flagged_not_trusted() {
    let text = "Kontakt: Hans Müller";
    // Model normalised the umlaut, so the value cannot be located
    let response = detection("Kontakt: [PERSON_1]", &[("Hans Mueller", "[PERSON_1]", "PERSON")]);

    let result = engine(&response).analyze_and_mask(text, None).await.unwrap();

    assert_eq!(result.masked_text, text);
    assert_eq!(result.dropped_entities, 1);
    assert!(result.confidence <= RECOVERED_OVERALL_CONFIDENCE);
    assert!(result.needs_manual_review(10_000));
}
