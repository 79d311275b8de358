//! # Spans Rotulados
//!
//! Um span é um intervalo semiaberto `[start_token, end_token)` de tokens com um
//! rótulo (ADDRESS, PERSON, ...). A sobreposição é decidida pelos offsets de
//! texto, não pelos índices de token, porque spans de produtores diferentes são
//! comparados entre si.

use serde::{Deserialize, Serialize};

/// Rótulos de entidade que circulam pelo pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityLabel {
    /// Rua + número de casa (o alvo deste crate).
    Address,
    Person,
    Location,
    Organization,
    /// Qualquer outro rótulo vindo de um produtor externo.
    Misc,
}

impl EntityLabel {
    /// Nome do rótulo como string (para serialização e respostas HTTP)
    pub fn name(&self) -> &'static str {
        match self {
            EntityLabel::Address => "ADDRESS",
            EntityLabel::Person => "PERSON",
            EntityLabel::Location => "LOCATION",
            EntityLabel::Organization => "ORGANIZATION",
            EntityLabel::Misc => "MISC",
        }
    }

    /// Tenta parsear a partir de string (aceita também "PER"/"LOC"/"ORG")
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ADDRESS" => Some(EntityLabel::Address),
            "PERSON" | "PER" => Some(EntityLabel::Person),
            "LOCATION" | "LOC" => Some(EntityLabel::Location),
            "ORGANIZATION" | "ORG" => Some(EntityLabel::Organization),
            "MISC" => Some(EntityLabel::Misc),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Quem produziu o span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanSource {
    /// Reconhecedor validado pelo gazetteer.
    Gazetteer,
    /// Reconhecedor de padrões de superfície.
    Pattern,
    /// Tagger base (PERSON/LOCATION/ORGANIZATION).
    Tagger,
}

/// Uma entidade identificada no texto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Texto coberto pelo span
    pub text: String,
    pub label: EntityLabel,
    /// Índice do primeiro token
    pub start_token: usize,
    /// Índice do token logo após o último (exclusivo)
    pub end_token: usize,
    /// Posição de byte inicial no texto original
    pub start: usize,
    /// Posição de byte final no texto original
    pub end: usize,
    pub confidence: f64,
    pub source: SpanSource,
}

impl EntitySpan {
    /// Comprimento em caracteres do texto coberto ("ß" conta um).
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn overlaps(&self, other: &EntitySpan) -> bool {
        overlaps(self, other)
    }

    pub fn is_address(&self) -> bool {
        self.label == EntityLabel::Address
    }
}

/// Dois spans se sobrepõem sse seus intervalos de texto se intersectam.
pub fn overlaps(a: &EntitySpan, b: &EntitySpan) -> bool {
    !(a.end <= b.start || b.end <= a.start)
}

/// Remove sobreposições mantendo o span mais longo.
///
/// Ordena por comprimento decrescente (empate: quem começa antes), aceita
/// gulosamente cada span que não colide com os já aceitos e devolve o resultado
/// em ordem de texto. Spans vazios são descartados.
pub fn filter_spans(spans: Vec<EntitySpan>) -> Vec<EntitySpan> {
    let mut ordered: Vec<EntitySpan> = spans.into_iter().filter(|s| s.end > s.start).collect();
    ordered.sort_by(|a, b| {
        b.text_len()
            .cmp(&a.text_len())
            .then(a.start.cmp(&b.start))
    });

    let mut kept: Vec<EntitySpan> = Vec::with_capacity(ordered.len());
    for span in ordered {
        if kept.iter().all(|k| !overlaps(k, &span)) {
            kept.push(span);
        }
    }

    kept.sort_by_key(|s| (s.start, s.end));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize, label: EntityLabel) -> EntitySpan {
        EntitySpan {
            text: "x".repeat(end.saturating_sub(start)),
            label,
            start_token: 0,
            end_token: 0,
            start,
            end,
            confidence: 1.0,
            source: SpanSource::Pattern,
        }
    }

    #[test]
    fn test_overlap_is_half_open() {
        let a = span(0, 5, EntityLabel::Address);
        let b = span(5, 8, EntityLabel::Person);
        let c = span(4, 6, EntityLabel::Person);
        assert!(!overlaps(&a, &b));
        assert!(overlaps(&a, &c));
        assert!(overlaps(&c, &b));
    }

    #[test]
    fn test_filter_spans_longest_wins() {
        let spans = vec![
            span(0, 5, EntityLabel::Person),
            span(2, 12, EntityLabel::Address),
            span(12, 14, EntityLabel::Location),
        ];
        let kept = filter_spans(spans);
        assert_eq!(kept.len(), 2);
        assert_eq!((kept[0].start, kept[0].end), (2, 12));
        assert_eq!((kept[1].start, kept[1].end), (12, 14));
    }

    #[test]
    fn test_filter_spans_compares_characters() {
        let text = "Größenstraße 12 abcdefghijklm";
        let street_end = text.find(" abc").unwrap();
        let number = text.find("12").unwrap();
        let gaz = EntitySpan {
            text: text[..street_end].to_string(),
            ..span(0, street_end, EntityLabel::Address)
        };
        let pattern = EntitySpan {
            text: text[number..].to_string(),
            ..span(number, text.len(), EntityLabel::Address)
        };
        // 18 bytes mas 15 caracteres contra 16
        assert!(gaz.end - gaz.start > pattern.end - pattern.start);
        let kept = filter_spans(vec![gaz, pattern]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "12 abcdefghijklm");
    }

    #[test]
    fn test_filter_spans_drops_empty() {
        let kept = filter_spans(vec![span(3, 3, EntityLabel::Address)]);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_label_names() {
        assert_eq!(EntityLabel::Address.name(), "ADDRESS");
        assert_eq!(EntityLabel::from_name("per"), Some(EntityLabel::Person));
        assert_eq!(EntityLabel::from_name("xyz"), None);
    }
}
