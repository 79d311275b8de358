//! # Documento Tokenizado
//!
//! O `Document` é o texto original mais a sequência imutável de tokens. Todos os
//! estágios do reconhecimento leem o mesmo documento; só as coleções de spans
//! mudam de um estágio para o outro.

use serde::{Deserialize, Serialize};

use crate::error::{AddressError, Result};
use crate::span::{EntityLabel, EntitySpan, SpanSource};
use crate::tokenizer::{tokenize, Token};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    text: String,
    tokens: Vec<Token>,
}

impl Document {
    /// Tokeniza o texto com o tokenizador embutido.
    pub fn from_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            tokens: tokenize(text),
        }
    }

    /// Monta um documento a partir de tokens produzidos por outro tokenizador.
    ///
    /// Os offsets precisam estar dentro do texto, em ordem, sem sobreposição e
    /// alinhados a fronteiras de caractere. Caso contrário o documento inteiro
    /// falha: devolver "nenhum endereço" para um texto mal tokenizado esconderia
    /// o problema do chamador.
    pub fn new(text: impl Into<String>, mut tokens: Vec<Token>) -> Result<Self> {
        let text = text.into();
        let mut prev_end = 0;

        for (i, token) in tokens.iter_mut().enumerate() {
            if token.start >= token.end || token.end > text.len() {
                return Err(AddressError::tokenization(format!(
                    "token {i} com offsets inválidos {}..{}",
                    token.start, token.end
                )));
            }
            if token.start < prev_end {
                return Err(AddressError::tokenization(format!(
                    "token {i} sobrepõe o anterior ({} < {prev_end})",
                    token.start
                )));
            }
            if !text.is_char_boundary(token.start) || !text.is_char_boundary(token.end) {
                return Err(AddressError::tokenization(format!(
                    "token {i} fora de fronteira de caractere"
                )));
            }
            token.index = i;
            prev_end = token.end;
        }

        Ok(Self { text, tokens })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, i: usize) -> Option<&Token> {
        self.tokens.get(i)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Texto original entre o início do token `start` e o fim do token `end - 1`.
    pub fn slice_text(&self, start: usize, end: usize) -> Option<&str> {
        if start >= end || end > self.tokens.len() {
            return None;
        }
        Some(&self.text[self.tokens[start].start..self.tokens[end - 1].end])
    }

    /// Cria um span sobre os tokens `[start, end)`; intervalos vazios ou fora do
    /// documento devolvem `None`.
    pub fn span(
        &self,
        start: usize,
        end: usize,
        label: EntityLabel,
        source: SpanSource,
        confidence: f64,
    ) -> Option<EntitySpan> {
        let text = self.slice_text(start, end)?;
        Some(EntitySpan {
            text: text.to_string(),
            label,
            start_token: start,
            end_token: end,
            start: self.tokens[start].start,
            end: self.tokens[end - 1].end,
            confidence,
            source,
        })
    }

    /// Recorta um span existente para novos limites de token, preservando rótulo e origem.
    pub fn reshape(&self, span: &EntitySpan, start: usize, end: usize) -> Option<EntitySpan> {
        self.span(start, end, span.label, span.source, span.confidence)
    }

    /// Converte um intervalo de bytes vindo de um produtor externo em span de tokens.
    ///
    /// O span cobre todo token que intersecta `[start, end)`.
    pub fn span_from_offsets(
        &self,
        start: usize,
        end: usize,
        label: EntityLabel,
        source: SpanSource,
        confidence: f64,
    ) -> Option<EntitySpan> {
        if start >= end {
            return None;
        }
        let first = self.tokens.iter().position(|t| t.end > start)?;
        let last = self.tokens.iter().rposition(|t| t.start < end)?;
        if last < first {
            return None;
        }
        self.span(first, last + 1, label, source, confidence)
    }

    /// Offset em caracteres (escalares Unicode) de um offset em bytes.
    pub fn char_offset(&self, byte: usize) -> usize {
        let byte = byte.min(self.text.len());
        self.text
            .char_indices()
            .take_while(|(i, _)| *i < byte)
            .count()
    }
}
