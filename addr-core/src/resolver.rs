//! # Resolução de Conflitos
//!
//! Junta os candidatos do gazetteer com os spans dos produtores externos num
//! único conjunto sem sobreposições:
//!
//! - ADDRESS do gazetteer vence qualquer span não-ADDRESS que ele toque;
//! - entre dois ADDRESS vence o mais longo (em texto); empate fica com o gazetteer;
//! - um ADDRESS existente mais longo barra o candidato do gazetteer;
//! - no fim, preposições minúsculas iniciais são cortadas ("in der Lilienweg 12"
//!   → "Lilienweg 12") e sobreposições residuais caem pela regra do mais longo.

use tracing::debug;

use crate::config::CompiledRules;
use crate::document::Document;
use crate::span::{filter_spans, EntitySpan};

/// Remove "in|an|auf|bei|unter [der|den|dem]" minúsculos do início de um ADDRESS.
///
/// "Im Grünen Winkel" e "Am Bahnhof" começam em title-case e ficam intactos.
/// O corte só acontece se sobrar ao menos um token title-case, e é repetido
/// até não haver mais o que cortar (aplicar duas vezes não muda nada).
pub fn trim_leading_preposition(doc: &Document, rules: &CompiledRules, span: &EntitySpan) -> EntitySpan {
    let mut current = span.clone();
    while let Some(trimmed) = trim_once(doc, rules, &current) {
        current = trimmed;
    }
    current
}

fn trim_once(doc: &Document, rules: &CompiledRules, span: &EntitySpan) -> Option<EntitySpan> {
    let tokens = doc.tokens();
    let (start, end) = (span.start_token, span.end_token.min(tokens.len()));
    let first = tokens.get(start)?;
    if first.flags.is_title || !rules.trim_prepositions.contains(&first.lower) {
        return None;
    }

    let mut s = start + 1;
    if s < end && rules.trim_articles.contains(&tokens[s].lower) {
        s += 1;
    }

    if s >= end || !tokens[s..end].iter().any(|t| t.flags.is_title) {
        return None;
    }
    doc.reshape(span, s, end)
}

/// Resolve candidatos do gazetteer contra os demais spans.
pub fn resolve(
    doc: &Document,
    rules: &CompiledRules,
    gazetteer_spans: &[EntitySpan],
    other_spans: Vec<EntitySpan>,
) -> Vec<EntitySpan> {
    let mut merged = other_spans;

    for gaz in gazetteer_spans {
        let mut blocked = false;

        merged.retain(|existing| {
            if !gaz.overlaps(existing) {
                return true;
            }
            if !existing.is_address() {
                debug!(removed = %existing.text, label = %existing.label, by = %gaz.text, "gazetteer vence span não-ADDRESS");
                return false;
            }
            if gaz.text_len() >= existing.text_len() {
                return false;
            }
            blocked = true;
            true
        });

        if blocked {
            debug!(candidate = %gaz.text, "ADDRESS existente mais longo mantido");
            continue;
        }
        if merged.iter().all(|m| !gaz.overlaps(m)) {
            merged.push(gaz.clone());
        }
    }

    let trimmed = merged
        .into_iter()
        .map(|span| {
            if span.is_address() {
                trim_leading_preposition(doc, rules, &span)
            } else {
                span
            }
        })
        .collect();

    filter_spans(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{EntityLabel, SpanSource};

    fn span(doc: &Document, start: usize, end: usize, label: EntityLabel, source: SpanSource) -> EntitySpan {
        doc.span(start, end, label, source, 0.9).unwrap()
    }

    #[test]
    fn test_gazetteer_beats_non_address() {
        let doc = Document::from_text("Herr Schiller wohnt Schillerstraße 5");
        let rules = CompiledRules::default();
        let person = span(&doc, 3, 4, EntityLabel::Person, SpanSource::Tagger);
        let gaz = span(&doc, 3, 5, EntityLabel::Address, SpanSource::Gazetteer);

        let out = resolve(&doc, &rules, &[gaz], vec![person]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "Schillerstraße 5");
        assert_eq!(out[0].source, SpanSource::Gazetteer);
    }

    #[test]
    fn test_tie_prefers_gazetteer() {
        let doc = Document::from_text("Hauptstraße 44-46");
        let rules = CompiledRules::default();
        let pattern = span(&doc, 0, 2, EntityLabel::Address, SpanSource::Pattern);
        let gaz = span(&doc, 0, 2, EntityLabel::Address, SpanSource::Gazetteer);

        let out = resolve(&doc, &rules, &[gaz], vec![pattern]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, SpanSource::Gazetteer);
    }

    #[test]
    fn test_longer_existing_address_blocks_gazetteer() {
        let doc = Document::from_text("Herr Meier, Hauptstraße 42, 10115 Berlin");
        let rules = CompiledRules::default();
        let person = span(&doc, 1, 2, EntityLabel::Person, SpanSource::Tagger);
        let full = span(&doc, 3, 8, EntityLabel::Address, SpanSource::Pattern);
        let gaz = span(&doc, 3, 5, EntityLabel::Address, SpanSource::Gazetteer);

        let out = resolve(&doc, &rules, &[gaz], vec![person, full]);
        let texts: Vec<&str> = out.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Meier", "Hauptstraße 42, 10115 Berlin"]);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let doc = Document::from_text("Größenstraße 12 abcdefghijklm");
        let rules = CompiledRules::default();
        let gaz = span(&doc, 0, 2, EntityLabel::Address, SpanSource::Gazetteer);
        let pattern = span(&doc, 1, 3, EntityLabel::Address, SpanSource::Pattern);
        assert_eq!(gaz.text_len(), 15);
        assert_eq!(pattern.text_len(), 16);

        let out = resolve(&doc, &rules, &[gaz], vec![pattern]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "12 abcdefghijklm");
        assert_eq!(out[0].source, SpanSource::Pattern);
    }

    #[test]
    fn test_trim_leading_preposition() {
        let doc = Document::from_text("in der Lilienweg 12");
        let rules = CompiledRules::default();
        let s = span(&doc, 0, 4, EntityLabel::Address, SpanSource::Pattern);
        assert_eq!(trim_leading_preposition(&doc, &rules, &s).text, "Lilienweg 12");
    }

    #[test]
    fn test_title_case_preposition_kept() {
        let doc = Document::from_text("Im Kessler 26");
        let rules = CompiledRules::default();
        let s = span(&doc, 0, 3, EntityLabel::Address, SpanSource::Pattern);
        assert_eq!(trim_leading_preposition(&doc, &rules, &s).text, "Im Kessler 26");
    }

    #[test]
    fn test_trim_requires_title_token() {
        let doc = Document::from_text("in der 12");
        let rules = CompiledRules::default();
        let s = span(&doc, 0, 3, EntityLabel::Address, SpanSource::Pattern);
        assert_eq!(trim_leading_preposition(&doc, &rules, &s).text, "in der 12");
    }

    #[test]
    fn test_trim_is_idempotent() {
        let doc = Document::from_text("auf dem Marktplatz 3");
        let rules = CompiledRules::default();
        let s = span(&doc, 0, 4, EntityLabel::Address, SpanSource::Pattern);
        let once = trim_leading_preposition(&doc, &rules, &s);
        assert_eq!(trim_leading_preposition(&doc, &rules, &once), once);
    }
}
