//! # Filtro de Falsos Positivos
//!
//! Texto clínico está cheio de números que não são número de casa: durações
//! ("etwa 2 Wochen"), porcentagens ("90 %"), datas ("März 2020"), estágios
//! ("Typ 2"), citações legais ("§ 203") e idades ("Alter von 45"). Um candidato
//! que cai em qualquer uma dessas regras é descartado por inteiro.
//!
//! Todas as listas vêm de [`CompiledRules`]; aqui ficam só as formas das regras.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::CompiledRules;
use crate::document::Document;

static RE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(19|20)[0-9]{2}$").unwrap());

/// Por que um contexto numérico não é endereço.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FalsePositiveReason {
    /// "2 Wochen", "90 %"
    UnitAfterNumber,
    /// "etwa 2", "zwischen 3"
    QuantityMarker,
    /// "März 2020", "12. März"
    Date,
    /// "Saison 2012/2013"
    Season,
    /// "Typ 2", "Teil 3"
    ContextWord,
    /// "Abs. 2", "§ 203"
    LegalCitation,
    /// "ED 2019"
    DiagnosisDate,
    /// "Alter von 45"
    AgePhrase,
}

impl FalsePositiveReason {
    pub fn name(&self) -> &'static str {
        match self {
            FalsePositiveReason::UnitAfterNumber => "unit_after_number",
            FalsePositiveReason::QuantityMarker => "quantity_marker",
            FalsePositiveReason::Date => "date",
            FalsePositiveReason::Season => "season",
            FalsePositiveReason::ContextWord => "context_word",
            FalsePositiveReason::LegalCitation => "legal_citation",
            FalsePositiveReason::DiagnosisDate => "diagnosis_date",
            FalsePositiveReason::AgePhrase => "age_phrase",
        }
    }
}

impl std::fmt::Display for FalsePositiveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Até `n` tokens não-pontuação antes de `number`, do mais próximo ao mais distante.
fn preceding(doc: &Document, number: usize, n: usize) -> Vec<usize> {
    (0..number.min(doc.len()))
        .rev()
        .filter(|&k| !doc.tokens()[k].flags.is_punct)
        .take(n)
        .collect()
}

/// Primeiro token não-pontuação depois de `number`.
fn following(doc: &Document, number: usize) -> Option<usize> {
    (number + 1..doc.len()).find(|&k| !doc.tokens()[k].flags.is_punct)
}

fn is_year(text: &str) -> bool {
    RE_YEAR.is_match(text)
}

/// Regra violada pelo candidato `[span_start, span_end)` com número em `number`.
pub fn false_positive_reason(
    doc: &Document,
    rules: &CompiledRules,
    span_start: usize,
    span_end: usize,
    number: usize,
) -> Option<FalsePositiveReason> {
    let tokens = doc.tokens();
    let number_token = tokens.get(number)?;
    let lower_at = |k: usize| tokens[k].lower.as_str();

    if let Some(next) = following(doc, number) {
        if rules.unit_words.contains(lower_at(next)) {
            return Some(FalsePositiveReason::UnitAfterNumber);
        }
        if rules.month_names.contains(lower_at(next)) {
            return Some(FalsePositiveReason::Date);
        }
    }

    let before = preceding(doc, number, 3);
    let nearest = before.first().copied();

    // Um marcador dentro do nome de rua validado ("Platz von ...") não conta
    let quantity = before
        .iter()
        .take(2)
        .any(|&k| rules.quantity_markers.contains(lower_at(k)) && (k < span_start || span_start == number));
    if quantity {
        return Some(FalsePositiveReason::QuantityMarker);
    }

    if let Some(prev) = nearest {
        let prev_lower = lower_at(prev);
        if rules.month_names.contains(prev_lower) && is_year(&number_token.text) {
            return Some(FalsePositiveReason::Date);
        }
        if rules.season_markers.contains(prev_lower) {
            return Some(FalsePositiveReason::Season);
        }
        if rules.context_words.contains(prev_lower) {
            return Some(FalsePositiveReason::ContextWord);
        }
        if rules.diagnosis_markers.contains(prev_lower) {
            return Some(FalsePositiveReason::DiagnosisDate);
        }
    }

    if before.iter().take(2).any(|&k| rules.legal_markers.contains(lower_at(k))) {
        return Some(FalsePositiveReason::LegalCitation);
    }

    if before.iter().any(|&k| rules.age_markers.contains(lower_at(k))) {
        // Um evento datado ("Alter 2019 ...") não é frase de idade
        let lo = number.saturating_sub(3);
        let hi = (span_end.max(number + 1) + 3).min(doc.len());
        let dated = (lo..hi).any(|k| is_year(&tokens[k].text));
        if !dated {
            return Some(FalsePositiveReason::AgePhrase);
        }
    }

    None
}

/// O candidato é um contexto numérico que não é endereço?
pub fn is_false_positive(
    doc: &Document,
    rules: &CompiledRules,
    span_start: usize,
    span_end: usize,
    number: usize,
) -> bool {
    false_positive_reason(doc, rules, span_start, span_end, number).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Avalia o candidato formado só pelo primeiro token numérico.
    fn reason(text: &str) -> Option<FalsePositiveReason> {
        let doc = Document::from_text(text);
        let rules = CompiledRules::default();
        let number = doc
            .tokens()
            .iter()
            .position(|t| t.text.chars().next().map_or(false, |c| c.is_ascii_digit()))
            .unwrap();
        false_positive_reason(&doc, &rules, number, number + 1, number)
    }

    #[test]
    fn test_units_and_percent() {
        assert_eq!(reason("seit 2 Wochen"), Some(FalsePositiveReason::UnitAfterNumber));
        assert_eq!(reason("Sättigung 90 %"), Some(FalsePositiveReason::UnitAfterNumber));
        assert_eq!(reason("Dauer 3, Tage"), Some(FalsePositiveReason::UnitAfterNumber));
        assert_eq!(reason("Restharn 15 Prozent"), Some(FalsePositiveReason::UnitAfterNumber));
    }

    #[test]
    fn test_quantity_markers() {
        assert_eq!(reason("Schmerzen etwa 2"), Some(FalsePositiveReason::QuantityMarker));
        assert_eq!(reason("ca. 5 mal"), Some(FalsePositiveReason::QuantityMarker));
        assert_eq!(reason("zwischen Visite 3"), Some(FalsePositiveReason::QuantityMarker));
        assert_eq!(reason("mindestens 3 Schritte"), Some(FalsePositiveReason::QuantityMarker));
        assert_eq!(reason("höchstens 2 Stockwerke"), Some(FalsePositiveReason::QuantityMarker));
    }

    #[test]
    fn test_quantity_marker_inside_street_ignored() {
        // "von" faz parte do nome validado: o span começa antes dele
        let doc = Document::from_text("Platz von Kobell 5");
        let rules = CompiledRules::default();
        assert_eq!(false_positive_reason(&doc, &rules, 0, 4, 3), None);
    }

    #[test]
    fn test_dates_and_seasons() {
        assert_eq!(reason("seit März 2020"), Some(FalsePositiveReason::Date));
        assert_eq!(reason("am 12. März"), Some(FalsePositiveReason::Date));
        assert_eq!(reason("Saison 2012/2013"), Some(FalsePositiveReason::Season));
    }

    #[test]
    fn test_context_legal_diagnosis() {
        assert_eq!(reason("Diabetes Typ 2"), Some(FalsePositiveReason::ContextWord));
        assert_eq!(reason("Befund Teil 3"), Some(FalsePositiveReason::ContextWord));
        assert_eq!(reason("gemäß Abs. 2"), Some(FalsePositiveReason::LegalCitation));
        assert_eq!(reason("nach § 203 StGB"), Some(FalsePositiveReason::LegalCitation));
        assert_eq!(reason("Mammakarzinom ED 2019"), Some(FalsePositiveReason::DiagnosisDate));
    }

    #[test]
    fn test_age_phrases() {
        assert_eq!(reason("Jugendliche unter 17"), Some(FalsePositiveReason::AgePhrase));
        // com ano explícito não é frase de idade
        assert_eq!(reason("Kinder 3 seit 2019"), None);
    }

    #[test]
    fn test_real_address_passes() {
        assert_eq!(reason("Hauptstraße 42, 10115 Berlin"), None);
        assert_eq!(reason("Musterweg 7b"), None);
    }
}
