//! User-facing message text.
//!
//! Everything here is markdown for the chat surface. Raw originals appear
//! only in the entity summary, which is shown to the user who typed them.

use theo_shared::{DetectedEntities, MaskingResult, Mode, Recovery};

use crate::error::ServiceError;

/// Sanitized text in warnings is cut to this length
const WARNING_PREVIEW_CHARS: usize = 500;

/// Cut to `max` characters, appending "..." when something was dropped
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Markdown blockquote, one `> ` per line
fn quote(text: &str) -> String {
    text.lines()
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-category listing of what was masked
pub fn entity_summary(entities: &DetectedEntities) -> String {
    if entities.is_empty() {
        return "Keine sensiblen Daten erkannt.".to_string();
    }

    let mut lines = vec!["**Erkannte sensible Daten:**\n".to_string()];
    for (category, group) in entities.iter() {
        lines.push(format!(
            "\n**{}:** ({} gefunden)",
            category.display_label(),
            group.len()
        ));
        for entity in group {
            lines.push(format!("  - `{}` -> `{}`", entity.original, entity.masked));
        }
    }
    lines.join("\n")
}

/// Masking outcome as shown before approval
fn dropped_note(count: usize) -> String {
    format!(
        "⚠️ **{} erkannte Werte** kamen im Text nicht wörtlich vor und wurden **nicht maskiert**. \
         **Bitte prüfe manuell**, bevor du die Anfrage freigibst!",
        count
    )
}

pub fn analysis_message(result: &MaskingResult, review_threshold_chars: usize) -> String {
    let chars = result.original_text.chars().count();

    if result.recovery == Recovery::Passthrough {
        return format!(
            "## ⚠️ Warnung: Maskierung fehlgeschlagen\n\n\
             Die Analyse lieferte kein verwertbares Ergebnis. Die Anfrage ist **nicht maskiert**.\n\n\
             **Bitte prüfe manuell**, bevor du sie freigibst!\n\n\
             ### 📤 Anfrage für externe Recherche:\n\n{}",
            quote(&truncate_chars(&result.masked_text, WARNING_PREVIEW_CHARS))
        );
    }

    if result.dropped_entities > 0 && !result.has_detections() {
        return format!(
            "## ⚠️ Warnung: Erkannte Daten nicht gefunden\n\n{}\n\n\
             ### 📤 Anfrage für externe Recherche:\n\n{}",
            dropped_note(result.dropped_entities),
            quote(&truncate_chars(&result.masked_text, WARNING_PREVIEW_CHARS))
        );
    }

    if result.has_detections() {
        let mut message = format!(
            "## 🔍 Datenschutz-Analyse abgeschlossen (Konfidenz: {:.0}%)\n\n{}\n\n---\n\n\
             ### 📤 Bereinigte Anfrage für externe Recherche:\n\n{}\n\n---\n\n\
             **⚠️ Bitte prüfe die bereinigte Anfrage oben.**\n\
             Die maskierten Platzhalter (z.B. `[PERSON_1]`, `[COMPANY_1]`) ersetzen sensible Daten.",
            result.confidence * 100.0,
            entity_summary(&result.detected_entities),
            quote(&result.masked_text)
        );
        if result.mask_mapping.is_degraded() {
            message.push_str(
                "\n\n⚠️ Die Analyse-Antwort war unvollständig. Platzhalter ohne bekannten \
                 Originalwert bleiben in der Antwort stehen.",
            );
        }
        if result.dropped_entities > 0 {
            message.push_str("\n\n");
            message.push_str(&dropped_note(result.dropped_entities));
        }
        return message;
    }

    if result.is_suspiciously_clean(review_threshold_chars) {
        return format!(
            "## ⚠️ Warnung: Keine sensiblen Daten erkannt\n\n\
             Das Dokument ist **{} Zeichen** lang, aber es wurden keine sensiblen Daten gefunden.\n\n\
             **Bitte prüfe manuell** ob dies korrekt ist, bevor du fortfährst!\n\n\
             Bei Dokumenten mit Namen, E-Mails oder Firmendaten sollten normalerweise Daten erkannt werden.\n\n\
             ### 📤 Anfrage für externe Recherche:\n\n{}",
            chars,
            quote(&truncate_chars(&result.masked_text, WARNING_PREVIEW_CHARS))
        );
    }

    format!(
        "## ✅ Keine sensiblen Daten erkannt\n\n\
         Deine Anfrage enthält keine erkennbaren personenbezogenen oder vertraulichen Daten.\n\n\
         ### 📤 Anfrage für externe Recherche:\n\n{}",
        quote(&result.masked_text)
    )
}

pub fn edit_prompt(masked_query: &str) -> String {
    format!(
        "## ✏️ Bearbeite die Anfrage\n\nAktuelle bereinigte Anfrage:\n```\n{}\n```\n\n\
         **Gib deine bearbeitete Version ein:**",
        masked_query
    )
}

pub fn research_preview(response: &str, max_chars: usize) -> String {
    format!(
        "## 📥 Rechercheergebnis (roh)\n\n{}",
        truncate_chars(response, max_chars)
    )
}

pub fn final_answer(text: &str) -> String {
    format!("## ✨ Finale Antwort\n\n{}", text)
}

pub fn requirements_message(text: &str) -> String {
    format!("## 📋 Generierte Anforderungen\n\n{}", text)
}

/// Failure notice: stage and transport error, never the query
pub fn failure_message(error: &ServiceError) -> String {
    let heading = match error {
        ServiceError::Masking(_) => "Fehler bei der Analyse",
        ServiceError::Research(_) | ServiceError::FollowUp(_) => "Recherche fehlgeschlagen",
        ServiceError::Synthesis(_) => "Verarbeitung fehlgeschlagen",
        ServiceError::Requirements(_) | ServiceError::Internal(_) => "Fehler",
    };
    format!("❌ **{}:** {}", heading, error.llm_error())
}

pub fn mode_banner(mode: Mode) -> &'static str {
    match mode {
        Mode::External => {
            "## 🔄 **Externer Modus** aktiviert\n\n🔒 PII-Maskierung → ✅ Freigabe → 🌐 Recherche"
        }
        Mode::Internal => {
            "## 🔄 **Interner Modus** aktiviert\n\n🔐 Direkte Antworten, keine externe Recherche"
        }
    }
}

pub fn welcome_message(mode: Mode) -> String {
    let current = match mode {
        Mode::Internal => "Intern (keine externe Recherche)",
        Mode::External => "Extern (Web-Recherche mit PII-Maskierung)",
    };
    format!(
        "# 👋 Willkommen bei theo\n\n**Aktueller Modus:** {}\n\n\
         | Modus | Beschreibung |\n|-------|-------------|\n\
         | **Intern** | Direkte Antworten, keine Daten nach extern |\n\
         | **Extern** | Web-Recherche mit automatischer PII-Maskierung |\n\n\
         ---\n\n**Starte jetzt** indem du deine Frage eingibst! 👇",
        current
    )
}
