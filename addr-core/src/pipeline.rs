//! # Pipeline de Endereços: Orquestrador com Eventos Observáveis
//!
//! Coordena os estágios sobre um documento já tokenizado e emite um evento a
//! cada passo via canal `mpsc`, para que o serviço (ou um teste) acompanhe o
//! que foi aceito, rejeitado e resolvido.
//!
//! ## Ordem dos Estágios
//!
//! 1. Tokenização (ou tokens externos validados).
//! 2. Reconhecedor de gazetteer → canal de candidatos.
//! 3. Produtor de padrões + tagger base → spans independentes.
//! 4. Resolução de conflitos → conjunto único sem sobreposição.
//! 5. Filtro de falsos positivos sobre os ADDRESS finais.
//! 6. Acabamento das fronteiras dos ADDRESS.
//!
//! O gazetteer é compartilhado (`Arc`) e só lido: vários documentos podem ser
//! processados em paralelo, cada um com seu próprio `Document`.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RecognizerConfig;
use crate::document::Document;
use crate::error::Result;
use crate::false_positive::false_positive_reason;
use crate::gazetteer::Gazetteer;
use crate::recognizer::{CandidateOutcome, GazetteerRecognizer};
use crate::resolver::resolve;
use crate::rule_based::PatternRecognizer;
use crate::span::EntitySpan;
use crate::span_normalizer::{first_number_token, normalize_spans};
use crate::tagger::{NoopTagger, SpanProducer};
use crate::tokenizer::Token;

/// Eventos emitidos pelo pipeline durante o processamento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// **Passo 1**: Tokenização concluída.
    TokenizationDone { tokens: Vec<Token>, total: usize },
    /// **Passo 2**: Um número virou candidato validado pelo gazetteer.
    CandidateAccepted { number_token: usize, span: EntitySpan },
    /// **Passo 2**: Um número foi descartado (sem rua, fora do gazetteer ou falso positivo).
    CandidateRejected {
        number_token: usize,
        number_text: String,
        reason: String,
    },
    /// **Passo 3**: Um produtor externo entregou seus spans.
    ProducerDone { producer: String, spans: usize },
    /// **Passo 4**: Conjunto resolvido (antes do filtro e do acabamento).
    Resolved { entities: Vec<EntitySpan> },
    /// **Passo 5**: Um ADDRESS final caiu no filtro de falsos positivos.
    SpanRejected { span: EntitySpan, reason: String },
    /// **Conclusão**: entidades finais e estatísticas de tempo.
    Done {
        entities: Vec<EntitySpan>,
        total_tokens: usize,
        processing_ms: u64,
    },
    /// **Falha**: o documento não pôde ser processado.
    Error { message: String },
}

/// Resultado completo da análise de um documento.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub tokens: Vec<Token>,
    /// Entidades finais, sem sobreposição, em ordem de texto.
    pub entities: Vec<EntitySpan>,
    /// Candidatos aceitos pelo reconhecedor de gazetteer (antes da resolução).
    pub candidates: Vec<EntitySpan>,
    pub processing_ms: u64,
}

impl Analysis {
    /// Só as entidades ADDRESS.
    pub fn addresses(&self) -> impl Iterator<Item = &EntitySpan> {
        self.entities.iter().filter(|e| e.is_address())
    }
}

/// O pipeline de endereços.
///
/// # Modos de Uso
/// - **Sync**: `analyze` / `analyze_document` para chamadas diretas.
/// - **Lote**: `analyze_batch` processa documentos em paralelo.
/// - **Streaming**: `analyze_streaming` empurra `PipelineEvent`s por um canal.
pub struct AddressPipeline {
    recognizer: GazetteerRecognizer,
    patterns: Box<dyn SpanProducer>,
    tagger: Box<dyn SpanProducer>,
}

impl AddressPipeline {
    /// Cria o pipeline com o reconhecedor de padrões padrão e sem tagger base.
    pub fn new(gazetteer: Arc<Gazetteer>, config: &RecognizerConfig) -> Result<Self> {
        Ok(Self {
            recognizer: GazetteerRecognizer::new(gazetteer, config)?,
            patterns: Box::new(PatternRecognizer::new()),
            tagger: Box::new(NoopTagger),
        })
    }

    pub fn with_defaults(gazetteer: Arc<Gazetteer>) -> Self {
        Self {
            recognizer: GazetteerRecognizer::with_defaults(gazetteer),
            patterns: Box::new(PatternRecognizer::new()),
            tagger: Box::new(NoopTagger),
        }
    }

    /// Substitui o tagger base (PERSON/LOCATION/ORGANIZATION).
    pub fn with_tagger(mut self, tagger: Box<dyn SpanProducer>) -> Self {
        self.tagger = tagger;
        self
    }

    /// Substitui o reconhecedor de padrões.
    pub fn with_patterns(mut self, patterns: Box<dyn SpanProducer>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        self.recognizer.gazetteer()
    }

    /// Tokeniza com o tokenizador embutido e analisa.
    pub fn analyze(&self, text: &str) -> Analysis {
        self.analyze_document(&Document::from_text(text))
    }

    /// Analisa um texto com tokens vindos de fora; tokens inválidos falham o documento.
    pub fn analyze_tokens(&self, text: &str, tokens: Vec<Token>) -> Result<Analysis> {
        let doc = Document::new(text, tokens)?;
        Ok(self.analyze_document(&doc))
    }

    pub fn analyze_document(&self, doc: &Document) -> Analysis {
        self.run(doc, &mut |_| {})
    }

    /// Analisa vários textos em paralelo, preservando a ordem de entrada.
    pub fn analyze_batch<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<Analysis> {
        texts.par_iter().map(|t| self.analyze(t.as_ref())).collect()
    }

    /// Executa o pipeline enviando eventos de progresso pelo canal `tx`.
    ///
    /// # Fluxo de Eventos
    /// 1. `TokenizationDone`
    /// 2. `CandidateAccepted` / `CandidateRejected` (um por número)
    /// 3. `ProducerDone` (padrões e tagger)
    /// 4. `Resolved`
    /// 5. `SpanRejected` (se houver)
    /// 6. `Done`
    pub fn analyze_streaming(&self, text: &str, tx: mpsc::Sender<PipelineEvent>) {
        let doc = Document::from_text(text);
        self.run(&doc, &mut |event| {
            let _ = tx.send(event);
        });
    }

    /// Como [`analyze_streaming`](Self::analyze_streaming), para tokens externos.
    pub fn analyze_tokens_streaming(&self, text: &str, tokens: Vec<Token>, tx: mpsc::Sender<PipelineEvent>) {
        match Document::new(text, tokens) {
            Ok(doc) => {
                self.run(&doc, &mut |event| {
                    let _ = tx.send(event);
                });
            }
            Err(err) => {
                let _ = tx.send(PipelineEvent::Error {
                    message: err.to_string(),
                });
            }
        }
    }

    fn run(&self, doc: &Document, emit: &mut dyn FnMut(PipelineEvent)) -> Analysis {
        let start = Instant::now();
        let rules = self.recognizer.rules();

        // === Passo 1: Tokenização ===
        emit(PipelineEvent::TokenizationDone {
            tokens: doc.tokens().to_vec(),
            total: doc.len(),
        });

        // === Passo 2: Candidatos do gazetteer (canal separado) ===
        let mut candidates = Vec::new();
        for trace in self.recognizer.trace(doc) {
            let rejected = match trace.outcome {
                CandidateOutcome::Accepted { span } => {
                    emit(PipelineEvent::CandidateAccepted {
                        number_token: trace.number_token,
                        span: span.clone(),
                    });
                    candidates.push(span);
                    None
                }
                CandidateOutcome::NoStreetWindow => Some("no_street_window".to_string()),
                CandidateOutcome::NotInGazetteer { .. } => Some("not_in_gazetteer".to_string()),
                CandidateOutcome::FalsePositive { reason, .. } => Some(reason.to_string()),
            };
            if let Some(reason) = rejected {
                emit(PipelineEvent::CandidateRejected {
                    number_token: trace.number_token,
                    number_text: trace.number_text,
                    reason,
                });
            }
        }

        // === Passo 3: Produtores independentes ===
        let mut others = Vec::new();
        for producer in [&self.patterns, &self.tagger] {
            let spans = producer.produce(doc);
            emit(PipelineEvent::ProducerDone {
                producer: producer.name().to_string(),
                spans: spans.len(),
            });
            others.extend(spans);
        }

        // === Passo 4: Resolução ===
        let resolved = resolve(doc, rules, &candidates, others);
        emit(PipelineEvent::Resolved {
            entities: resolved.clone(),
        });

        // === Passo 5: Filtro de falsos positivos ===
        let mut kept = Vec::with_capacity(resolved.len());
        for span in resolved {
            let reason = if span.is_address() {
                first_number_token(doc, &span).and_then(|number| {
                    false_positive_reason(doc, rules, span.start_token, span.end_token, number)
                })
            } else {
                None
            };
            match reason {
                Some(reason) => {
                    debug!(text = %span.text, %reason, "ADDRESS final descartado");
                    emit(PipelineEvent::SpanRejected {
                        span,
                        reason: reason.to_string(),
                    });
                }
                None => kept.push(span),
            }
        }

        // === Passo 6: Acabamento ===
        let entities = normalize_spans(doc, rules, kept);
        let processing_ms = start.elapsed().as_millis() as u64;

        emit(PipelineEvent::Done {
            entities: entities.clone(),
            total_tokens: doc.len(),
            processing_ms,
        });

        Analysis {
            tokens: doc.tokens().to_vec(),
            entities,
            candidates,
            processing_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{EntityLabel, SpanSource};
    use crate::tagger::FixedSpans;

    fn pipeline(names: &[&str]) -> AddressPipeline {
        AddressPipeline::with_defaults(Arc::new(Gazetteer::from_names(names)))
    }

    #[test]
    fn test_analyze_basic() {
        let p = pipeline(&["Hauptstraße"]);
        let analysis = p.analyze("Hauptstraße 44-46");
        let texts: Vec<&str> = analysis.addresses().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["Hauptstraße 44-46"]);
        assert_eq!(analysis.candidates.len(), 1);
        assert_eq!(analysis.entities[0].source, SpanSource::Gazetteer);
    }

    #[test]
    fn test_pattern_only_address_is_finished() {
        // rua fora do gazetteer: só o padrão encontra, e o acabamento pega a letra
        let p = pipeline(&[]);
        let analysis = p.analyze("Nichtexistenzweg 5 b");
        assert!(analysis.candidates.is_empty());
        assert_eq!(analysis.entities[0].text, "Nichtexistenzweg 5 b");
        assert_eq!(analysis.entities[0].source, SpanSource::Pattern);
    }

    #[test]
    fn test_tagger_spans_subordinate_to_address() {
        let text = "Herr Kessler wohnt Kesslerweg 3";
        let tagger = FixedSpans::new()
            .with(5, 12, EntityLabel::Person, 0.9)
            .with(19, 29, EntityLabel::Location, 0.7);
        let p = pipeline(&["Kesslerweg"]).with_tagger(Box::new(tagger));
        let analysis = p.analyze(text);

        let labels: Vec<(EntityLabel, &str)> =
            analysis.entities.iter().map(|e| (e.label, e.text.as_str())).collect();
        assert_eq!(
            labels,
            vec![(EntityLabel::Person, "Kessler"), (EntityLabel::Address, "Kesslerweg 3")]
        );
    }

    #[test]
    fn test_streaming_events_order() {
        let p = pipeline(&["Musterweg"]);
        let (tx, rx) = mpsc::channel();
        p.analyze_streaming("Anschrift: Musterweg 7b, 80331 München", tx);
        let events: Vec<PipelineEvent> = rx.iter().collect();

        assert!(matches!(events.first(), Some(PipelineEvent::TokenizationDone { .. })));
        assert!(events.iter().any(|e| matches!(e, PipelineEvent::CandidateAccepted { .. })));
        assert!(events.iter().any(|e| matches!(e, PipelineEvent::Resolved { .. })));
        match events.last() {
            Some(PipelineEvent::Done { entities, .. }) => {
                assert_eq!(entities.len(), 1);
                assert!(entities[0].text.starts_with("Musterweg 7b"));
            }
            other => panic!("esperado Done, veio {other:?}"),
        }
    }

    #[test]
    fn test_invalid_tokens_emit_error() {
        let p = pipeline(&[]);
        let (tx, rx) = mpsc::channel();
        p.analyze_tokens_streaming("Weg 5", vec![Token::new("Weg", 0, 30, 0)], tx);
        let events: Vec<PipelineEvent> = rx.iter().collect();
        assert!(matches!(events.as_slice(), [PipelineEvent::Error { .. }]));
        assert!(p.analyze_tokens("Weg 5", vec![Token::new("Weg", 0, 30, 0)]).is_err());
    }

    #[test]
    fn test_batch_preserves_order() {
        let p = pipeline(&["Hauptstraße", "Musterweg"]);
        let results = p.analyze_batch(&["Musterweg 7b", "etwa 2 Wochen", "Hauptstraße 1"]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].entities[0].text, "Musterweg 7b");
        assert!(results[1].entities.is_empty());
        assert_eq!(results[2].entities[0].text, "Hauptstraße 1");
    }
}
