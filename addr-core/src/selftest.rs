//! # Self-test de Detecção
//!
//! Bateria fixa de frases passada pelo pipeline completo logo após a carga do
//! gazetteer. Endereços reais precisam ser encontrados; frases clínicas com
//! números não podem virar ADDRESS. Qualquer divergência falha a inicialização
//! do serviço: um reconhecedor quebrado deixaria endereços passarem sem
//! pseudonimização.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AddressError, Result};
use crate::pipeline::AddressPipeline;

/// Um caso da bateria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfTestCase {
    pub text: String,
    /// Trecho que algum ADDRESS precisa conter; `None` exige nenhum ADDRESS.
    pub expected: Option<String>,
}

impl SelfTestCase {
    pub fn positive(text: &str, expected: &str) -> Self {
        Self {
            text: text.to_string(),
            expected: Some(expected.to_string()),
        }
    }

    pub fn negative(text: &str) -> Self {
        Self {
            text: text.to_string(),
            expected: None,
        }
    }
}

/// Resultado de um caso.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfTestOutcome {
    pub case: SelfTestCase,
    pub detected: Vec<String>,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfTestReport {
    pub outcomes: Vec<SelfTestOutcome>,
}

impl SelfTestReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SelfTestOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }
}

/// Endereços reais e frases clínicas que não são endereço.
pub fn default_cases() -> Vec<SelfTestCase> {
    vec![
        SelfTestCase::positive("Der Patient wohnt in der Hauptstraße 42, 10115 Berlin.", "Hauptstraße 42"),
        SelfTestCase::positive("Kontaktadresse: Berliner Str. 31, Hamburg", "Berliner Str. 31"),
        SelfTestCase::positive("Am Grünen Winkel 164", "Grünen Winkel 164"),
        SelfTestCase::positive("Bertha-von-Suttner-Str. 198c", "Bertha-von-Suttner-Str. 198c"),
        SelfTestCase::positive("Anschrift: Musterweg 7b, 80331 München", "Musterweg 7b"),
        SelfTestCase::positive("Er lebt in Bismarckstraße 12-14", "Bismarckstraße 12-14"),
        SelfTestCase::positive("Wohnt in der Carl-Hesselmann Weg 107", "Carl-Hesselmann Weg 107"),
        SelfTestCase::positive("Im Kessler 26, 70794 Filderstadt", "Kessler 26"),
        SelfTestCase::positive("Zum Bildstöckle 126", "Bildstöckle 126"),
        SelfTestCase::positive("Franz-von-Kobell-Str. 19", "Franz-von-Kobell-Str. 19"),
        SelfTestCase::negative("Der Patient hat seit etwa 2 Wochen Schmerzen."),
        SelfTestCase::negative("Diabetes mellitus Typ 2, Erstdiagnose ED 2019."),
        SelfTestCase::negative("Kontrolle im März 2023 geplant."),
        SelfTestCase::negative("Offenbarung nur gemäß § 203 Abs. 2 StGB."),
        SelfTestCase::negative("Jugendliche im Alter von 14 Jahren."),
        SelfTestCase::negative("Sauerstoffsättigung 94 % unter Raumluft."),
    ]
}

fn check(pipeline: &AddressPipeline, case: &SelfTestCase) -> SelfTestOutcome {
    let analysis = pipeline.analyze(&case.text);
    let detected: Vec<String> = analysis.addresses().map(|e| e.text.clone()).collect();
    let passed = match &case.expected {
        Some(expected) => detected.iter().any(|d| d.contains(expected.as_str())),
        None => detected.is_empty(),
    };
    SelfTestOutcome {
        case: case.clone(),
        detected,
        passed,
    }
}

/// Roda a bateria; qualquer caso reprovado vira [`AddressError::SelfTest`].
pub fn run(pipeline: &AddressPipeline, cases: &[SelfTestCase]) -> Result<SelfTestReport> {
    let report = SelfTestReport {
        outcomes: cases.iter().map(|case| check(pipeline, case)).collect(),
    };

    let failed: Vec<&SelfTestOutcome> = report.failures().collect();
    if failed.is_empty() {
        info!(cases = report.total(), "self-test de endereços aprovado");
        return Ok(report);
    }

    for outcome in &failed {
        warn!(
            text = %outcome.case.text,
            expected = ?outcome.case.expected,
            detected = ?outcome.detected,
            "self-test reprovado"
        );
    }
    let details = failed
        .iter()
        .map(|o| match &o.case.expected {
            Some(expected) => format!("'{}' não encontrado em '{}'", expected, o.case.text),
            None => format!("falso positivo {:?} em '{}'", o.detected, o.case.text),
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(AddressError::SelfTest {
        failed: failed.len(),
        total: report.total(),
        details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazetteer::Gazetteer;
    use std::sync::Arc;

    const STREETS: &[&str] = &[
        "Hauptstraße",
        "Berliner Straße",
        "Am Grünen Winkel",
        "Bertha-von-Suttner-Straße",
        "Musterweg",
        "Bismarckstraße",
        "Carl-Hesselmann Weg",
        "Im Kessler",
        "Zum Bildstöckle",
        "Franz-von-Kobell-Straße",
    ];

    #[test]
    fn test_default_cases_pass_with_matching_gazetteer() {
        let pipeline = AddressPipeline::with_defaults(Arc::new(Gazetteer::from_names(STREETS)));
        let report = run(&pipeline, &default_cases()).unwrap();
        assert_eq!(report.total(), 16);
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn test_empty_gazetteer_fails() {
        let pipeline = AddressPipeline::with_defaults(Arc::new(Gazetteer::from_names(Vec::<String>::new())));
        let err = run(&pipeline, &default_cases()).unwrap_err();
        match err {
            AddressError::SelfTest { failed, total, .. } => {
                assert!(failed > 0);
                assert_eq!(total, 16);
            }
            other => panic!("erro inesperado: {other}"),
        }
    }

    #[test]
    fn test_negative_case_detects_false_positive() {
        let pipeline = AddressPipeline::with_defaults(Arc::new(Gazetteer::from_names(["Musterweg"])));
        let cases = vec![SelfTestCase::negative("Musterweg 7b")];
        assert!(run(&pipeline, &cases).is_err());
    }
}
