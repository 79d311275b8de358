//! # Reconhecedor Validado por Gazetteer
//!
//! Para cada token que pode ser número de casa:
//!
//! 1. pula a pontuação imediatamente anterior;
//! 2. varre para trás coletando tokens "de rua" ([`crate::street`]);
//! 3. encurta a janela pela esquerda até o primeiro trecho cujo nome
//!    normalizado está no gazetteer (o mais longo vence);
//! 4. estende o número ([`crate::extender`]);
//! 5. descarta contextos não-endereço ([`crate::false_positive`]).
//!
//! Os spans vão para um canal separado (candidatos), nunca direto para a lista
//! final de entidades; quem decide a precedência é o [`crate::resolver`].
//!
//! ```rust
//! use std::sync::Arc;
//! use addr_core::document::Document;
//! use addr_core::gazetteer::Gazetteer;
//! use addr_core::recognizer::GazetteerRecognizer;
//!
//! let gaz = Arc::new(Gazetteer::from_names(["Hauptstraße"]));
//! let recognizer = GazetteerRecognizer::with_defaults(gaz);
//! let doc = Document::from_text("Er wohnt in der Hauptstraße 44-46.");
//! let spans = recognizer.recognize(&doc);
//! assert_eq!(spans[0].text, "Hauptstraße 44-46.");
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CompiledRules, RecognizerConfig};
use crate::document::Document;
use crate::error::Result;
use crate::extender::{extend, RE_EMBEDDED_RANGE, RE_SINGLE_NUMBER};
use crate::false_positive::{false_positive_reason, FalsePositiveReason};
use crate::gazetteer::Gazetteer;
use crate::normalizer::normalize;
use crate::span::{EntityLabel, EntitySpan, SpanSource};
use crate::street::{scan_street_window, ScanLimits};
use crate::tokenizer::Token;

/// Confiança atribuída a spans validados pelo gazetteer.
pub const GAZETTEER_CONFIDENCE: f64 = 0.95;

/// Destino de um token candidato a número de casa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CandidateOutcome {
    Accepted { span: EntitySpan },
    /// Nenhum token de rua antes do número.
    NoStreetWindow,
    /// Nenhum trecho da janela está no gazetteer.
    NotInGazetteer { window: String },
    /// Rua validada, mas o contexto numérico não é endereço.
    FalsePositive { span: EntitySpan, reason: FalsePositiveReason },
}

/// Registro de um candidato examinado (usado pelo modo streaming).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTrace {
    pub number_token: usize,
    pub number_text: String,
    pub outcome: CandidateOutcome,
}

/// O token pode ser número de casa?
pub fn is_number_candidate(token: &Token) -> bool {
    token.flags.like_num
        || (!token.text.is_empty() && token.text.chars().all(|c| c.is_ascii_digit()))
        || RE_SINGLE_NUMBER.is_match(&token.text)
        || RE_EMBEDDED_RANGE.is_match(&token.text)
}

/// Reconhecedor de endereços validado por gazetteer.
#[derive(Debug, Clone)]
pub struct GazetteerRecognizer {
    gazetteer: Arc<Gazetteer>,
    rules: Arc<CompiledRules>,
    limits: ScanLimits,
}

impl GazetteerRecognizer {
    pub fn new(gazetteer: Arc<Gazetteer>, config: &RecognizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            gazetteer,
            rules: Arc::new(CompiledRules::compile(&config.rules)),
            limits: ScanLimits::from(config),
        })
    }

    pub fn with_defaults(gazetteer: Arc<Gazetteer>) -> Self {
        Self {
            gazetteer,
            rules: Arc::new(CompiledRules::default()),
            limits: ScanLimits::default(),
        }
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    pub fn rules(&self) -> &CompiledRules {
        &self.rules
    }

    /// Spans ADDRESS candidatos, em ordem de texto (podem se sobrepor).
    pub fn recognize(&self, doc: &Document) -> Vec<EntitySpan> {
        self.trace(doc)
            .into_iter()
            .filter_map(|c| match c.outcome {
                CandidateOutcome::Accepted { span } => Some(span),
                _ => None,
            })
            .collect()
    }

    /// Como [`recognize`](Self::recognize), mas registra o destino de cada candidato.
    pub fn trace(&self, doc: &Document) -> Vec<CandidateTrace> {
        doc.tokens()
            .iter()
            .filter(|t| is_number_candidate(t))
            .map(|t| CandidateTrace {
                number_token: t.index,
                number_text: t.text.clone(),
                outcome: self.examine(doc, t.index),
            })
            .collect()
    }

    fn examine(&self, doc: &Document, number: usize) -> CandidateOutcome {
        let tokens = doc.tokens();

        let Some(last) = (0..number).rev().find(|&k| !tokens[k].flags.is_punct) else {
            return CandidateOutcome::NoStreetWindow;
        };
        let Some(window_start) = scan_street_window(doc, &self.rules, &self.limits, last, number) else {
            return CandidateOutcome::NoStreetWindow;
        };

        let Some(street_start) = self.left_trim_search(doc, window_start, last) else {
            let window = doc.slice_text(window_start, last + 1).unwrap_or_default().to_string();
            debug!(%window, "janela sem correspondência no gazetteer");
            return CandidateOutcome::NotInGazetteer { window };
        };

        let end = extend(doc, number);
        let Some(span) = doc.span(
            street_start,
            end,
            EntityLabel::Address,
            SpanSource::Gazetteer,
            GAZETTEER_CONFIDENCE,
        ) else {
            return CandidateOutcome::NoStreetWindow;
        };

        if let Some(reason) = false_positive_reason(doc, &self.rules, street_start, end, number) {
            // Rua real rejeitada pelo filtro: registrado para revisão das regras
            debug!(text = %span.text, %reason, "candidato validado pelo gazetteer rejeitado");
            return CandidateOutcome::FalsePositive { span, reason };
        }

        debug!(text = %span.text, "endereço validado pelo gazetteer");
        CandidateOutcome::Accepted { span }
    }

    /// Primeiro (mais longo) sufixo da janela `[start, last]` presente no gazetteer.
    ///
    /// Um "." colado ao último token ("Marktpl" + ".") é tentado junto antes;
    /// sem ele a abreviação não expande.
    fn left_trim_search(&self, doc: &Document, start: usize, last: usize) -> Option<usize> {
        let tokens = doc.tokens();
        let period = tokens
            .get(last + 1)
            .filter(|t| t.text == "." && t.start == tokens[last].end)
            .is_some();

        (start..=last).find(|&s| {
            let with_period = period && self.in_gazetteer(doc.slice_text(s, last + 2));
            with_period || self.in_gazetteer(doc.slice_text(s, last + 1))
        })
    }

    fn in_gazetteer(&self, text: Option<&str>) -> bool {
        text.map_or(false, |t| self.gazetteer.contains(&normalize(t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recognizer(names: &[&str]) -> GazetteerRecognizer {
        GazetteerRecognizer::with_defaults(Arc::new(Gazetteer::from_names(names)))
    }

    fn texts(rec: &GazetteerRecognizer, text: &str) -> Vec<String> {
        rec.recognize(&Document::from_text(text))
            .into_iter()
            .map(|s| s.text)
            .collect()
    }

    #[test]
    fn test_left_trim_finds_street() {
        let rec = recognizer(&["Hauptstraße"]);
        assert_eq!(
            texts(&rec, "Der Patient wohnt in der Hauptstraße 42, 10115 Berlin."),
            vec!["Hauptstraße 42"]
        );
    }

    #[test]
    fn test_longest_gazetteer_match_wins() {
        let rec = recognizer(&["Grünen Winkel", "Am Grünen Winkel"]);
        assert_eq!(texts(&rec, "Am Grünen Winkel 164"), vec!["Am Grünen Winkel 164"]);
    }

    #[test]
    fn test_abbreviated_street() {
        let rec = recognizer(&["Berliner Straße", "Bertha-von-Suttner-Straße"]);
        // a vírgula seguinte entra no span (não há CEP depois dela)
        assert_eq!(texts(&rec, "Kontaktadresse: Berliner Str. 31, Hamburg"), vec!["Berliner Str. 31,"]);
        assert_eq!(texts(&rec, "Bertha-von-Suttner-Str. 198c"), vec!["Bertha-von-Suttner-Str. 198c"]);
    }

    #[test]
    fn test_split_period_abbreviations() {
        let rec = recognizer(&[
            "Marktplatz",
            "Musterweg",
            "Am Graben",
            "Lindenallee",
            "Hauffstraße",
            "Kaiserdamm",
        ]);
        assert_eq!(texts(&rec, "Marktpl. 5"), vec!["Marktpl. 5"]);
        assert_eq!(texts(&rec, "Musterwg. 7"), vec!["Musterwg. 7"]);
        assert_eq!(texts(&rec, "Wohnhaft Am Gr. 3"), vec!["Am Gr. 3"]);
        assert_eq!(texts(&rec, "Lindenallee. 2"), vec!["Lindenallee. 2"]);
        assert_eq!(texts(&rec, "Kaiserdm. 4"), vec!["Kaiserdm. 4"]);
        assert_eq!(texts(&rec, "Hauffstr. 9"), vec!["Hauffstr. 9"]);
    }

    #[test]
    fn test_period_falls_back_to_bare_name() {
        // "Wall." expandiria para "Wallee"; sem o ponto o nome existe
        let rec = recognizer(&["Am Wall"]);
        assert_eq!(texts(&rec, "Am Wall. 3"), vec!["Am Wall. 3"]);
    }

    #[test]
    fn test_unknown_street_rejected() {
        let rec = recognizer(&["Hauptstraße"]);
        assert!(texts(&rec, "Nichtexistenzweg 5").is_empty());
    }

    #[test]
    fn test_false_positive_is_traced() {
        let rec = recognizer(&["Typ"]);
        let traces = rec.trace(&Document::from_text("Diabetes Typ 2"));
        assert_eq!(traces.len(), 1);
        assert!(matches!(
            traces[0].outcome,
            CandidateOutcome::FalsePositive { reason: FalsePositiveReason::ContextWord, .. }
        ));
    }

    #[test]
    fn test_number_candidates() {
        let t = |s: &str| is_number_candidate(&Token::new(s, 0, s.len(), 0));
        assert!(t("42"));
        assert!(t("7b"));
        assert!(t("44-46"));
        assert!(t("zwei"));
        assert!(!t("Weg"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = RecognizerConfig { max_window: 0, ..RecognizerConfig::default() };
        assert!(GazetteerRecognizer::new(Arc::new(Gazetteer::default()), &cfg).is_err());
    }
}
