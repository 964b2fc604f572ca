//! System prompts and user-message builders for every model role.

/// Detection model: find and mask sensitive data, answer with strict JSON
pub const MASKING_SYSTEM_PROMPT: &str = r#"# Aufgabe: Datenschutz-Analyse

Du erkennst ALLE sensiblen Informationen in einem Text und ersetzt sie durch Platzhalter.
Im Zweifel wird maskiert.

## Personenbezogene Daten (PII)
- PERSON: Personennamen mit oder ohne Titel ("Dr. Thomas Weber", "John Smith")
- EMAIL: E-Mail-Adressen
- PHONE: Telefonnummern in jedem Format ("+49 171 8834521", "0171-8834521")
- IBAN / BIC: Bankverbindungen ("DE89 3704 0044 0532 0130 00", "COBADEFFXXX")
- ADDRESS: Straßen und Anschriften ("Petuelring 130", "München, Hauptstraße 42")
- ID_NUMBER: Personal- und Ausweisnummern ("Personalnummer: 48291-SE")

## Vertrauliche Geschäftsdaten (IP)
- COMPANY: Firmennamen und firmenbezogene Abkürzungen ("Siemens Energy AG", "VW")
- PROJECT: Projekt- und Codenamen ("Projekt Phoenix", "Codename: Aurora")
- FINANCIAL: Beträge mit Finanzkontext ("2.500.000 EUR", "Budget: 5 Mio"), keine kontextlosen Zahlen
- CLIENT: als Kunden benannte Organisationen oder Personen

## Ausgabeformat (nur JSON, keine Erklärungen davor oder danach)
{
  "masked_text": "Der vollständige Text mit [KATEGORIE_N] Platzhaltern",
  "entities": [
    {"original": "Dr. Thomas Weber", "masked": "[PERSON_1]", "category": "PERSON", "confidence": 0.95}
  ],
  "overall_confidence": 0.92,
  "total_entities_found": 1
}

## Regeln
1. "original" ist exakt die Zeichenfolge aus dem Text, ohne Änderungen.
2. Gleicher Wert = gleicher Platzhalter, bei jedem Vorkommen.
3. Nummerierung pro Kategorie ab 1: [PERSON_1], [PERSON_2], [EMAIL_1].
4. "total_entities_found" ist die Anzahl der Einträge in "entities".
5. Ein Dokument mit Namen, E-Mails oder Tabellen ohne Treffer ist fast sicher ein Fehler: erneut prüfen."#;

/// Research model: web-grounded answer with sources
pub const RESEARCH_SYSTEM_PROMPT: &str = r#"Du bist ein Recherche-Assistent für präzise, faktenbasierte Recherchen.

## Aufgaben
1. Beantworte die Frage auf Basis aktueller Web-Quellen.
2. Strukturiere die Antwort klar.
3. Zitiere relevante Quellen mit vollständiger URL.
4. Bleibe objektiv; sag ehrlich, wenn du etwas nicht weißt.

## Format
- Markdown, bei langen Antworten mit Überschriften
- Quellenliste am Ende
- Platzhalter wie [PERSON_1] oder [COMPANY_2] unverändert übernehmen"#;

/// Synthesis model: final answer grounded in the research only
pub const REASONING_SYSTEM_PROMPT: &str = r#"Du verarbeitest Rechercheergebnisse zu einer präzisen Antwort.

## Aufgaben
1. Analysiere das Rechercheergebnis und ziehe die relevanten Informationen heraus.
2. Strukturiere die Antwort klar und verständlich.
3. Weise auf Unsicherheiten und fehlende Informationen hin.

## Format
- Zuerst eine Zusammenfassung in 2-3 Sätzen, dann die ausführliche Antwort
- Markdown
- Am Ende Empfehlungen oder nächste Schritte, falls sinnvoll

## Wichtig
- Verwende ausschließlich Fakten aus dem Rechercheergebnis.
- Erfinde keine Informationen.
- Platzhalter wie [PERSON_1] oder [COMPANY_2] unverändert übernehmen."#;

/// Requirements engineering on top of a research result
pub const REQUIREMENTS_SYSTEM_PROMPT: &str =
    "Du bist ein Requirements Engineer, der aus Rechercheergebnissen strukturierte Anforderungen ableitet. Platzhalter wie [PERSON_1] bleiben unverändert.";

/// Internal mode: direct answers, nothing goes out for research
pub const INTERNAL_SYSTEM_PROMPT: &str = r#"Du bist theo, ein interner Assistent.

## Aufgaben
- Beantworte Fragen direkt und präzise aus deinem Wissen.
- Sag offen, wenn du etwas nicht weißt.

## Format
- Klare Struktur, Markdown
- Bei komplexen Themen zuerst eine kurze Zusammenfassung

## Hinweis
- Dies ist der interne Modus ohne externe Recherche.
- Für aktuelle oder externe Informationen empfiehl den externen Modus."#;

/// User message for the detection model
pub fn build_masking_message(text: &str, context: Option<&str>) -> String {
    let message = format!("Analysiere und maskiere folgenden Text:\n\n{}", text);
    with_context(message, context)
}

/// User message for the research model
pub fn build_research_message(query: &str, context: Option<&str>, language: &str) -> String {
    let mut message = match context {
        Some(ctx) => format!("Kontext: {}\n\nFrage: {}", ctx, query),
        None => query.to_string(),
    };
    if language.eq_ignore_ascii_case("de") {
        message.push_str("\n\nBitte antworte auf Deutsch.");
    }
    message
}

/// User message for the synthesis model
pub fn build_synthesis_message(
    original_query: &str,
    research_response: &str,
    context: Option<&str>,
) -> String {
    let message = format!(
        "## Ursprüngliche Frage des Nutzers:\n{}\n\n## Rechercheergebnis:\n{}\n\n---\n\n\
         Erstelle daraus eine finale, gut strukturierte Antwort für den Nutzer. \
         Verwende nur Informationen aus dem Rechercheergebnis.",
        original_query, research_response
    );
    match context {
        Some(ctx) => format!("Zusätzlicher Kontext: {}\n\n{}", ctx, message),
        None => message,
    }
}

/// User message for requirements generation
pub fn build_requirements_message(research_response: &str, context: &str) -> String {
    format!(
        "Erstelle aus folgenden Rechercheergebnissen eine strukturierte Liste von Anforderungen \
         oder Handlungsempfehlungen.\n\n## Kontext:\n{}\n\n## Rechercheergebnis:\n{}\n\n---\n\n\
         Priorisiere in drei Stufen:\n\
         1. **Must-Have** - kritische Anforderungen\n\
         2. **Should-Have** - wichtige Anforderungen\n\
         3. **Nice-to-Have** - optionale Verbesserungen\n\n\
         Formatiere als Markdown mit Checkboxen.",
        context, research_response
    )
}

/// User message for internal answers
pub fn build_internal_message(query: &str, context: Option<&str>) -> String {
    with_context(query.to_string(), context)
}

fn with_context(message: String, context: Option<&str>) -> String {
    match context {
        Some(ctx) => format!("Kontext: {}\n\n{}", ctx, message),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masking_prompt_demands_json_schema() {
        for field in ["masked_text", "entities", "overall_confidence", "total_entities_found"] {
            assert!(MASKING_SYSTEM_PROMPT.contains(field), "missing {}", field);
        }
    }

    #[test]
    fn test_masking_message_context() {
        let msg = build_masking_message("Hallo Hans", Some("interne E-Mail"));
        assert!(msg.starts_with("Kontext: interne E-Mail\n\n"));
        assert!(msg.ends_with("Hallo Hans"));
        assert!(!build_masking_message("x", None).contains("Kontext"));
    }

    #[test]
    fn test_research_message_language() {
        let de = build_research_message("Was ist [COMPANY_1]?", None, "de");
        assert!(de.ends_with("Bitte antworte auf Deutsch."));
        let en = build_research_message("What is [COMPANY_1]?", None, "en");
        assert_eq!(en, "What is [COMPANY_1]?");
        let ctx = build_research_message("q", Some("Markt"), "en");
        assert_eq!(ctx, "Kontext: Markt\n\nFrage: q");
    }

    #[test]
    fn test_synthesis_keeps_grounding_instruction() {
        let msg = build_synthesis_message("Frage", "Ergebnis", None);
        assert!(msg.contains("nur Informationen aus dem Rechercheergebnis"));
        assert!(REASONING_SYSTEM_PROMPT.contains("Erfinde keine Informationen"));
        let with_ctx = build_synthesis_message("Frage", "Ergebnis", Some("Vertrieb"));
        assert!(with_ctx.starts_with("Zusätzlicher Kontext: Vertrieb"));
    }

    #[test]
    fn test_requirements_message_priorities() {
        let msg = build_requirements_message("Ergebnis", "Kontext");
        assert!(msg.contains("Must-Have"));
        assert!(msg.contains("Should-Have"));
        assert!(msg.contains("Nice-to-Have"));
    }
}
