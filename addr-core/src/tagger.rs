//! # Produtores Externos de Spans
//!
//! O pipeline combina o reconhecedor de gazetteer com produtores independentes:
//! o reconhecedor de padrões ([`crate::rule_based`]) e um tagger base que
//! entrega PERSON/LOCATION/ORGANIZATION. Para o resolvedor de conflitos todos
//! são caixas-pretas que devolvem spans rotulados sobre o mesmo documento.

use crate::document::Document;
use crate::span::{EntityLabel, EntitySpan, SpanSource};

/// Qualquer componente que proponha spans rotulados sobre um documento.
pub trait SpanProducer: Send + Sync {
    /// Nome curto para logs e eventos.
    fn name(&self) -> &str;

    fn produce(&self, doc: &Document) -> Vec<EntitySpan>;
}

/// Tagger que não produz nada (pipeline só de endereços).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTagger;

impl SpanProducer for NoopTagger {
    fn name(&self) -> &str {
        "noop"
    }

    fn produce(&self, _doc: &Document) -> Vec<EntitySpan> {
        Vec::new()
    }
}

/// Spans pré-computados por um serviço externo, dados em offsets de byte.
///
/// Intervalos que não caem sobre nenhum token são ignorados.
#[derive(Debug, Clone, Default)]
pub struct FixedSpans {
    spans: Vec<(usize, usize, EntityLabel, f64)>,
}

impl FixedSpans {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, start: usize, end: usize, label: EntityLabel, confidence: f64) -> Self {
        self.spans.push((start, end, label, confidence));
        self
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

impl SpanProducer for FixedSpans {
    fn name(&self) -> &str {
        "fixed"
    }

    fn produce(&self, doc: &Document) -> Vec<EntitySpan> {
        self.spans
            .iter()
            .filter_map(|&(start, end, label, confidence)| {
                doc.span_from_offsets(start, end, label, SpanSource::Tagger, confidence)
            })
            .collect()
    }
}
