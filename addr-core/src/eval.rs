//! # Análise de Falhas
//!
//! Avalia o pipeline sobre frases com endereço esperado e classifica cada
//! falha por tipo (faixa incompleta, letra perdida, preposição a mais...), para
//! saber onde as heurísticas precisam de ajuste.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pipeline::AddressPipeline;

static RE_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+[–\-/]\d+").unwrap());
static RE_LETTER_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+[a-zA-Z]").unwrap());
static RE_NUMBER_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\d+.*$").unwrap());

const PREPOSITION_PREFIXES: &[&str] = &["in der", "in ", "an der", "an ", "am "];

/// Tipos de falha de reconhecimento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Nada detectado.
    CompleteMiss,
    MissHyphenStreet,
    MissMultiHyphenStreet,
    MissLetterSuffix,
    /// "44-46" detectado como "44".
    IncompleteRange,
    /// "44a" detectado como "44".
    MissingLetterSuffix,
    ExtraPreposition,
    TruncatedStreetName,
    MultiHyphenStreet,
    AbbreviationFailure,
    OtherMismatch,
}

impl FailureCategory {
    pub fn name(&self) -> &'static str {
        match self {
            FailureCategory::CompleteMiss => "complete_miss",
            FailureCategory::MissHyphenStreet => "miss_hyphen_street",
            FailureCategory::MissMultiHyphenStreet => "miss_multi_hyphen_street",
            FailureCategory::MissLetterSuffix => "miss_letter_suffix",
            FailureCategory::IncompleteRange => "incomplete_range",
            FailureCategory::MissingLetterSuffix => "missing_letter_suffix",
            FailureCategory::ExtraPreposition => "extra_preposition",
            FailureCategory::TruncatedStreetName => "truncated_street_name",
            FailureCategory::MultiHyphenStreet => "multi_hyphen_street",
            FailureCategory::AbbreviationFailure => "abbreviation_failure",
            FailureCategory::OtherMismatch => "other_mismatch",
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn starts_with_preposition(text: &str) -> bool {
    let lower = text.to_lowercase();
    PREPOSITION_PREFIXES.iter().any(|p| lower.starts_with(p))
}

fn street_part(text: &str) -> String {
    RE_NUMBER_TAIL.replace(text, "").trim().to_string()
}

fn mentions_street_word(lower: &str) -> bool {
    lower.contains("str.") || lower.contains("straße")
}

/// Classifica uma falha; uma falha pode cair em mais de uma categoria.
///
/// `detected` é o primeiro ADDRESS encontrado, se houver.
pub fn classify_failure(expected: &str, detected: Option<&str>) -> Vec<FailureCategory> {
    let mut categories = Vec::new();
    let detected = detected.map(str::trim).unwrap_or("");

    if detected.is_empty() {
        categories.push(FailureCategory::CompleteMiss);
        if expected.contains('-') && expected.chars().any(|c| c.is_ascii_digit()) {
            if expected.matches('-').count() >= 2 {
                categories.push(FailureCategory::MissMultiHyphenStreet);
            } else {
                categories.push(FailureCategory::MissHyphenStreet);
            }
        }
        if RE_LETTER_SUFFIX.is_match(expected) {
            categories.push(FailureCategory::MissLetterSuffix);
        }
        return categories;
    }

    if RE_RANGE.is_match(expected) && !RE_RANGE.is_match(detected) {
        categories.push(FailureCategory::IncompleteRange);
    }
    if RE_LETTER_SUFFIX.is_match(expected) && !RE_LETTER_SUFFIX.is_match(detected) {
        categories.push(FailureCategory::MissingLetterSuffix);
    }
    if starts_with_preposition(detected) && !starts_with_preposition(expected) {
        categories.push(FailureCategory::ExtraPreposition);
    }

    let expected_street = street_part(expected);
    let detected_street = street_part(detected);
    if !expected_street.is_empty()
        && !detected_street.is_empty()
        && (detected_street.chars().count() as f64) < expected_street.chars().count() as f64 * 0.8
    {
        categories.push(FailureCategory::TruncatedStreetName);
    }
    if expected_street.matches('-').count() >= 2 {
        categories.push(FailureCategory::MultiHyphenStreet);
    }
    if mentions_street_word(&expected.to_lowercase()) && !mentions_street_word(&detected.to_lowercase()) {
        categories.push(FailureCategory::AbbreviationFailure);
    }

    if categories.is_empty() {
        categories.push(FailureCategory::OtherMismatch);
    }
    categories
}

/// Frase de avaliação com o endereço esperado ("Rua Número").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalCase {
    pub sentence: String,
    pub expected: String,
}

/// Caso reprovado e suas categorias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedCase {
    pub sentence: String,
    pub expected: String,
    pub detected: Option<String>,
    pub categories: Vec<FailureCategory>,
}

fn fold_street(text: &str) -> String {
    text.to_lowercase().replace("strasse", "straße").replace("str.", "straße")
}

/// O ADDRESS detectado cobre o esperado?
///
/// Exige o número esperado no texto detectado e a rua (com `Str.`/`Straße`
/// unificados) ou ao menos sua primeira palavra.
pub fn address_matches(expected: &str, detected: &str) -> bool {
    let (street, number) = match expected.trim().rsplit_once(char::is_whitespace) {
        Some((street, number)) => (street.trim(), number),
        None => return detected.contains(expected.trim()),
    };
    if !detected.contains(number) {
        return false;
    }
    let detected_lower = detected.to_lowercase();
    fold_street(detected).contains(&fold_street(street))
        || street
            .split_whitespace()
            .next()
            .map_or(false, |first| detected_lower.contains(&first.to_lowercase()))
}

/// Resumo de uma rodada de avaliação.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureReport {
    pub total: usize,
    pub successful: usize,
    pub failed_cases: Vec<FailedCase>,
    pub category_counts: BTreeMap<FailureCategory, usize>,
}

impl FailureReport {
    pub fn failed(&self) -> usize {
        self.failed_cases.len()
    }

    /// Fração de acertos em `[0, 1]`; 1.0 sem casos.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.successful as f64 / self.total as f64
        }
    }

    /// Registra um caso e, se reprovado, suas categorias.
    pub fn record(&mut self, case: &EvalCase, detected: &[String]) {
        self.total += 1;
        if detected.iter().any(|d| address_matches(&case.expected, d)) {
            self.successful += 1;
            return;
        }

        let first = detected.first().map(String::as_str);
        let categories = classify_failure(&case.expected, first);
        for category in &categories {
            *self.category_counts.entry(*category).or_insert(0) += 1;
        }
        self.failed_cases.push(FailedCase {
            sentence: case.sentence.clone(),
            expected: case.expected.clone(),
            detected: first.map(str::to_string),
            categories,
        });
    }

    /// Categorias da mais frequente para a menos frequente.
    pub fn ranked_categories(&self) -> Vec<(FailureCategory, usize)> {
        let mut ranked: Vec<_> = self.category_counts.iter().map(|(c, n)| (*c, *n)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}

/// Roda os casos pelo pipeline (em paralelo) e monta o relatório.
pub fn evaluate(pipeline: &AddressPipeline, cases: &[EvalCase]) -> FailureReport {
    let sentences: Vec<&str> = cases.iter().map(|c| c.sentence.as_str()).collect();
    let analyses = pipeline.analyze_batch(&sentences);

    let mut report = FailureReport::default();
    for (case, analysis) in cases.iter().zip(analyses) {
        let detected: Vec<String> = analysis.addresses().map(|e| e.text.clone()).collect();
        report.record(case, &detected);
    }
    report
}
