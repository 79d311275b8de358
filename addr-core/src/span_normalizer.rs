//! # Acabamento dos Spans de Endereço
//!
//! Último passo sobre as entidades finais: todo ADDRESS, venha do gazetteer ou
//! dos padrões, recebe o mesmo tratamento de fronteira. A preposição inicial é
//! cortada de novo (idempotente) e o número é re-estendido para capturar faixas
//! e sufixos que o produtor original deixou de fora. A extensão só cresce o
//! span para a direita.

use crate::config::CompiledRules;
use crate::document::Document;
use crate::extender::extend;
use crate::recognizer::is_number_candidate;
use crate::resolver::trim_leading_preposition;
use crate::span::{filter_spans, EntitySpan};

/// Índice do primeiro token com cara de número de casa dentro do span.
pub fn first_number_token(doc: &Document, span: &EntitySpan) -> Option<usize> {
    (span.start_token..span.end_token.min(doc.len())).find(|&k| is_number_candidate(&doc.tokens()[k]))
}

fn finish_address(doc: &Document, rules: &CompiledRules, span: &EntitySpan) -> EntitySpan {
    let trimmed = trim_leading_preposition(doc, rules, span);
    let Some(number) = first_number_token(doc, &trimmed) else {
        return trimmed;
    };

    let end = extend(doc, number).max(trimmed.end_token).min(doc.len());
    doc.reshape(&trimmed, trimmed.start_token, end).unwrap_or(trimmed)
}

/// Normaliza as fronteiras de todos os ADDRESS e remove sobreposições.
pub fn normalize_spans(doc: &Document, rules: &CompiledRules, spans: Vec<EntitySpan>) -> Vec<EntitySpan> {
    let finished = spans
        .into_iter()
        .map(|span| {
            if span.is_address() {
                finish_address(doc, rules, &span)
            } else {
                span
            }
        })
        .collect();
    filter_spans(finished)
}
