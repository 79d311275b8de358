//! # Varredura Reversa do Nome da Rua
//!
//! A partir do token logo antes do número, anda para trás enquanto os tokens
//! parecem parte de um nome de rua. A varredura é propositalmente permissiva
//! (costuma trazer contexto como "wohnt in der"); quem decide a fronteira real
//! é a busca no gazetteer feita pelo reconhecedor.
//!
//! A varredura é uma máquina de estados pequena:
//!
//! ```text
//! Scanning ──token de rua──▶ Scanning
//!    │                          │
//!    │ minúscula comum          │ token estranho / janela cheia
//!    ▼                          ▼
//! LowercaseRun(n) ──n = limite──▶ Boundary
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{CompiledRules, RecognizerConfig};
use crate::document::Document;
use crate::tokenizer::Token;

static RE_INITIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-ZÄÖÜ]\.$").unwrap());
static RE_ROMAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[IVX]+\.?$").unwrap());

/// Limites da varredura.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Distância máxima entre o número e o primeiro token da rua.
    pub max_window: usize,
    /// Palavras minúsculas comuns seguidas que encerram a varredura.
    pub max_consecutive_lowercase: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self::from(&RecognizerConfig::default())
    }
}

impl From<&RecognizerConfig> for ScanLimits {
    fn from(cfg: &RecognizerConfig) -> Self {
        Self {
            max_window: cfg.max_window,
            max_consecutive_lowercase: cfg.max_consecutive_lowercase,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Scanning,
    LowercaseRun(usize),
    Boundary,
}

fn is_plain_word(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, 'Ä' | 'Ö' | 'Ü' | 'ä' | 'ö' | 'ü' | 'ß'))
}

/// O token pode fazer parte de um nome de rua?
pub fn is_street_like(token: &Token, rules: &CompiledRules) -> bool {
    let lower = token.lower.as_str();
    let title = token.flags.is_title;

    if rules.is_suffix_word(lower) {
        return true;
    }
    // "Meisenweg", "Hauffstr.", "Papiermühle"
    if title && rules.ends_with_suffix(lower) {
        return true;
    }
    // "St." em "St.-Brevin-Ring"
    if RE_INITIAL.is_match(&token.text) {
        return true;
    }
    // "Bertha-von-Suttner-Str."
    if token.text.contains('-') && rules.ends_with_suffix(lower) {
        return true;
    }
    if rules.stopwords.contains(lower) {
        return false;
    }
    // Segmentos alfanuméricos ("X-2s", "wohnt"); minúsculas são limitadas pelo contador
    if is_plain_word(&token.text) || title {
        return true;
    }
    if rules.connectors.contains(lower) || token.text == "-" {
        return true;
    }
    // "Auf'm Hackenfeld"
    if token.text.contains(['\'', '\u{2019}']) {
        let cleaned: String = token.text.chars().filter(|c| !matches!(c, '\'' | '\u{2019}')).collect();
        return cleaned.chars().next().map_or(false, char::is_uppercase);
    }
    false
}

fn step(state: ScanState, token: &Token, rules: &CompiledRules, limits: &ScanLimits) -> ScanState {
    if !is_street_like(token, rules) {
        return ScanState::Boundary;
    }

    let counts_as_lowercase =
        token.flags.is_lower && token.flags.is_alpha && !rules.connectors.contains(&token.lower);
    if !counts_as_lowercase {
        return ScanState::Scanning;
    }

    let run = match state {
        ScanState::LowercaseRun(n) => n + 1,
        _ => 1,
    };
    if run >= limits.max_consecutive_lowercase {
        ScanState::Boundary
    } else {
        ScanState::LowercaseRun(run)
    }
}

/// Varre para trás a partir de `last` (último token antes do número `number`).
///
/// Devolve o primeiro índice da janela `[start, last]`, ou `None` quando a
/// janela fica vazia ou mais longa que `max_window`.
pub fn scan_street_window(
    doc: &Document,
    rules: &CompiledRules,
    limits: &ScanLimits,
    last: usize,
    number: usize,
) -> Option<usize> {
    let tokens = doc.tokens();
    if last >= number || number >= tokens.len() {
        return None;
    }

    // `start` aponta para o primeiro token aceito
    let mut start = last + 1;
    let mut state = ScanState::Scanning;
    while start > 0 && number - (start - 1) <= limits.max_window {
        state = step(state, &tokens[start - 1], rules, limits);
        if state == ScanState::Boundary {
            break;
        }
        start -= 1;
    }

    if start > last {
        return None;
    }

    if RE_ROMAN.is_match(&tokens[start].text) {
        start = skip_roman_numeral(tokens, rules, start, last);
        if start > last {
            return None;
        }
    }

    if last - start + 1 > limits.max_window {
        return None;
    }
    Some(start)
}

/// Numeral romano no início da janela só é descartado quando o próximo token
/// útil não é de rua ("II. Vereinsstr." perde o "II.", "Weg III 28" não).
fn skip_roman_numeral(tokens: &[Token], rules: &CompiledRules, start: usize, last: usize) -> usize {
    let next = (start + 1..=last).find(|&k| !tokens[k].flags.is_punct);
    if let Some(k) = next {
        if is_street_like(&tokens[k], rules) {
            return start;
        }
    }

    let mut start = start + 1;
    while start <= last && tokens[start].flags.is_punct {
        start += 1;
    }
    start
}
