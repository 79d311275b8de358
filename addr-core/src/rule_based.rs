//! # Reconhecedor de Padrões de Endereço
//!
//! Complementa o gazetteer com padrões de superfície: uma rua composta com
//! sufixo conhecido seguida de número, uma locução preposicional ("An der
//! Kirche 12b") e o endereço completo com CEP e cidade. Não valida nada contra
//! o dicionário; o resolvedor dá precedência aos spans do gazetteer em empates.
//!
//! ## Padrões
//!
//! 1. `Título-com-sufixo NÚMERO` → "Hauptstraße 42", "Bismarckstr. 12-14"
//! 2. `am|an|auf|in [der|den|dem]? Título+ NÚMERO` → "Am Bahnhof 3"
//! 3. padrão 1 + pontuação opcional + CEP + `Título+` → "Hauptstraße 42, 10115 Berlin"

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::span::{filter_spans, EntityLabel, EntitySpan, SpanSource};
use crate::tagger::SpanProducer;
use crate::tokenizer::Token;

static RE_STREET_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(straße|str\.|weg|allee|platz|gasse|ring|ufer|damm|hof|chaussee|landstraße|pfad|strasse)$",
    )
    .unwrap()
});
static RE_HOUSE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+[a-zA-Z]?(?:[-/][0-9]+[a-zA-Z]?)?[.,;:!?]?$").unwrap());
static RE_POSTAL_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{5}$").unwrap());

const LEAD_PREPOSITIONS: &[&str] = &["am", "an", "auf", "in"];
const LEAD_ARTICLES: &[&str] = &["der", "den", "dem"];

/// Confiança dos spans produzidos por padrões.
pub const PATTERN_CONFIDENCE: f64 = 0.85;

/// Uma correspondência de padrão: intervalo de tokens e qual regra casou
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub start: usize,
    /// Exclusivo
    pub end: usize,
    pub rule_name: String,
    pub confidence: f64,
}

/// Motor de padrões de endereço
#[derive(Debug, Clone, Default)]
pub struct PatternRecognizer;

impl PatternRecognizer {
    pub fn new() -> Self {
        Self
    }

    /// Aplica os três padrões em cada posição do documento.
    ///
    /// Devolve todas as correspondências, inclusive sobrepostas.
    pub fn apply(&self, tokens: &[Token]) -> Vec<RuleMatch> {
        let mut matches = Vec::new();

        for i in 0..tokens.len() {
            // 1. Rua composta + número
            if let Some(end) = street_with_number(tokens, i) {
                matches.push(rule_match(i, end, "street_number"));

                // 3. ... + CEP + cidade
                if let Some(city_end) = postal_code_and_city(tokens, end) {
                    matches.push(rule_match(i, city_end, "full_address"));
                }
            }

            // 2. Locução preposicional
            if let Some(end) = prepositional_street(tokens, i) {
                matches.push(rule_match(i, end, "prepositional_street"));
            }
        }

        matches
    }
}

fn rule_match(start: usize, end: usize, rule_name: &str) -> RuleMatch {
    RuleMatch {
        start,
        end,
        rule_name: rule_name.to_string(),
        confidence: PATTERN_CONFIDENCE,
    }
}

fn is_suffixed_street(token: &Token) -> bool {
    token.flags.is_title && RE_STREET_SUFFIX.is_match(&token.lower)
}

fn is_house_number(token: &Token) -> bool {
    RE_HOUSE_NUMBER.is_match(&token.text)
}

fn street_with_number(tokens: &[Token], i: usize) -> Option<usize> {
    let street = tokens.get(i)?;
    let number = tokens.get(i + 1)?;
    (is_suffixed_street(street) && is_house_number(number)).then_some(i + 2)
}

/// Fim de uma sequência de pelo menos um token title-case a partir de `from`.
fn title_run(tokens: &[Token], from: usize) -> Option<usize> {
    let end = (from..tokens.len())
        .find(|&k| !tokens[k].flags.is_title)
        .unwrap_or(tokens.len());
    (end > from).then_some(end)
}

fn postal_code_and_city(tokens: &[Token], after_number: usize) -> Option<usize> {
    let mut k = after_number;
    if tokens.get(k).map_or(false, |t| t.flags.is_punct) {
        k += 1;
    }
    if !tokens.get(k).map_or(false, |t| RE_POSTAL_CODE.is_match(&t.text)) {
        return None;
    }
    title_run(tokens, k + 1)
}

fn prepositional_street(tokens: &[Token], i: usize) -> Option<usize> {
    if !LEAD_PREPOSITIONS.contains(&tokens.get(i)?.lower.as_str()) {
        return None;
    }
    let mut k = i + 1;
    if tokens.get(k).map_or(false, |t| LEAD_ARTICLES.contains(&t.lower.as_str())) {
        k += 1;
    }
    let name_end = title_run(tokens, k)?;
    let number = tokens.get(name_end)?;
    is_house_number(number).then_some(name_end + 1)
}

impl SpanProducer for PatternRecognizer {
    fn name(&self) -> &str {
        "patterns"
    }

    /// Spans ADDRESS sem sobreposição (o mais longo vence).
    fn produce(&self, doc: &Document) -> Vec<EntitySpan> {
        let spans = self
            .apply(doc.tokens())
            .into_iter()
            .filter_map(|m| {
                doc.span(m.start, m.end, EntityLabel::Address, SpanSource::Pattern, m.confidence)
            })
            .collect();
        filter_spans(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn produce(text: &str) -> Vec<String> {
        let doc = Document::from_text(text);
        PatternRecognizer::new()
            .produce(&doc)
            .into_iter()
            .map(|s| s.text)
            .collect()
    }

    #[test]
    fn test_street_number_pattern() {
        assert_eq!(produce("Bismarckstraße 12-14"), vec!["Bismarckstraße 12-14"]);
        // a locução preposicional é mais longa; o corte da preposição fica com o resolvedor
        assert_eq!(produce("Er lebt in Bismarckstraße 12-14"), vec!["in Bismarckstraße 12-14"]);
        assert_eq!(produce("Musterweg 7b"), vec!["Musterweg 7b"]);
    }

    #[test]
    fn test_full_address_wins_over_street_number() {
        assert_eq!(
            produce("Hauptstraße 42, 10115 Berlin"),
            vec!["Hauptstraße 42, 10115 Berlin"]
        );
    }

    #[test]
    fn test_prepositional_pattern() {
        assert_eq!(produce("An der Kirche 12b"), vec!["An der Kirche 12b"]);
        assert_eq!(produce("wohnt in der Lilienweg 12"), vec!["in der Lilienweg 12"]);
    }

    #[test]
    fn test_rule_names() {
        let doc = Document::from_text("Hauptstraße 42, 10115 Berlin");
        let names: Vec<String> = PatternRecognizer::new()
            .apply(doc.tokens())
            .into_iter()
            .map(|m| m.rule_name)
            .collect();
        assert_eq!(names, vec!["street_number", "full_address"]);
    }

    #[test]
    fn test_no_match_without_number() {
        assert!(produce("Der Patient hat seit etwa 2 Wochen Schmerzen.").is_empty());
        assert!(produce("Hauptstraße ohne Nummer").is_empty());
    }
}
