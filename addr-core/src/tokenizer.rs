//! # Tokenizador para Alemão Clínico
//!
//! Divide o texto bruto em tokens preservando offsets (bytes) do texto original.
//! O reconhecedor depende de algumas flags lexicais por token (title-case,
//! pontuação, alfabético, minúsculo, "parece número"), calculadas aqui uma única
//! vez e imutáveis depois.
//!
//! ## Esquema de Tokenização
//!
//! - Letras, dígitos e hífens internos ficam juntos: "Hauptstraße", "44-46", "7b",
//!   "Bertha-von-Suttner-Str".
//! - Pontuação vira token próprio, exceto o ponto de abreviações conhecidas
//!   ("ca.", "Nr.", "St.") e de números/datas ("1.234", "12.03.2020").
//! - Um token terminado em "str"/"allee" seguido de "." é fundido: "Ladehofstr.".
//!
//! ```rust
//! use addr_core::tokenizer::tokenize;
//!
//! let tokens = tokenize("Bertha-von-Suttner-Str. 198c");
//! let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(texts, vec!["Bertha-von-Suttner-Str.", "198c"]);
//! ```

use serde::{Deserialize, Serialize};

/// Flags lexicais grosseiras de um token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFlags {
    /// Cada trecho com letras começa maiúsculo e continua minúsculo ("Hauptstraße", "Str.").
    pub is_title: bool,
    /// Só caracteres de pontuação ("." "," "-" "–").
    pub is_punct: bool,
    /// Só letras.
    pub is_alpha: bool,
    /// Tem letras e nenhuma maiúscula.
    pub is_lower: bool,
    /// Parece um número ("42", "1.234", "3/4", "zwei").
    pub like_num: bool,
}

/// Um token extraído do texto original.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// O texto do token (ex: "Hauptstraße", ",", "44-46").
    pub text: String,
    /// Forma minúscula usada nas comparações com as tabelas de regras.
    pub lower: String,
    /// Índice de byte inicial no texto original (inclusive).
    pub start: usize,
    /// Índice de byte final no texto original (exclusivo).
    pub end: usize,
    /// Índice sequencial do token na lista (0, 1, 2...).
    pub index: usize,
    pub flags: TokenFlags,
}

impl Token {
    pub fn new(text: impl Into<String>, start: usize, end: usize, index: usize) -> Self {
        let text = text.into();
        Self {
            lower: text.to_lowercase(),
            flags: compute_flags(&text),
            text,
            start,
            end,
            index,
        }
    }
}

/// Abreviações alemãs cujo ponto pertence ao token
const ABBREVIATIONS: &[&str] = &[
    "Str", "str", "St", "Nr", "Dr", "Prof", "Hr", "Fr", "ca", "Ca", "bzw", "usw", "ggf", "evtl",
    "vgl", "inkl", "etc", "Abs", "Art", "Tel", "Pl", "Wg", "z", "B", "Jan", "Feb", "Mär", "Apr",
    "Jun", "Jul", "Aug", "Sep", "Sept", "Okt", "Nov", "Dez", "Mo", "Di", "Mi", "Do", "Sa", "So",
];

/// Numerais por extenso aceitos como "parece número"
const NUMBER_WORDS: &[&str] = &[
    "null", "eins", "zwei", "drei", "vier", "fünf", "sechs", "sieben", "acht", "neun", "zehn",
    "elf", "zwölf", "zwanzig", "dreißig", "hundert", "tausend",
];

/// Finais de token que absorvem um "." seguinte
const MERGE_ENDINGS: &[&str] = &["str", "allee"];

/// Tokeniza um texto com o esquema padrão e funde abreviações de rua.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = merge_street_abbreviations(tokenize_standard(text), text);

    // Re-indexa os tokens
    for (i, token) in tokens.iter_mut().enumerate() {
        token.index = i;
    }
    tokens
}

fn tokenize_standard(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current_start = 0;
    let mut current_text = String::new();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (byte_pos, ch) = chars[i];

        if ch.is_alphanumeric() || ch == '-' && !current_text.is_empty() {
            if current_text.is_empty() {
                current_start = byte_pos;
            }
            current_text.push(ch);
        } else if ch == '.' && !current_text.is_empty() {
            let is_abbrev = ABBREVIATIONS.contains(&current_text.as_str());
            // "1.234" e "12.03.2020" continuam um token só
            let current_is_num = current_text
                .chars()
                .all(|c| c.is_ascii_digit() || c == '.');
            let next_is_num = chars
                .get(i + 1)
                .map(|(_, c)| c.is_ascii_digit())
                .unwrap_or(false);

            if is_abbrev || (current_is_num && next_is_num) {
                current_text.push('.');
            } else {
                flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
                push_token(&mut tokens, ".".to_string(), byte_pos, byte_pos + 1);
            }
        } else if ch == '\'' || ch == '\u{2019}' {
            if current_text.is_empty() {
                current_start = byte_pos;
            }
            current_text.push(ch);
        } else if ch.is_whitespace() {
            flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
        } else {
            flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
            let ch_len = ch.len_utf8();
            push_token(&mut tokens, ch.to_string(), byte_pos, byte_pos + ch_len);
        }
        i += 1;
    }

    flush_token(&mut tokens, &mut current_text, current_start, text.len());

    tokens
}

/// Funde "Bahnhofstr" + "." em "Bahnhofstr." quando adjacentes.
fn merge_street_abbreviations(tokens: Vec<Token>, text: &str) -> Vec<Token> {
    let mut merged: Vec<Token> = Vec::with_capacity(tokens.len());

    for token in tokens {
        if token.text == "." {
            if let Some(prev) = merged.last_mut() {
                let mergeable = prev.end == token.start
                    && MERGE_ENDINGS.iter().any(|e| prev.lower.ends_with(e));
                if mergeable {
                    *prev = Token::new(&text[prev.start..token.end], prev.start, token.end, 0);
                    continue;
                }
            }
        }
        merged.push(token);
    }

    merged
}

/// Fecha o token acumulado e adiciona à lista (se não vazio)
fn flush_token(tokens: &mut Vec<Token>, text: &mut String, start: usize, end: usize) {
    if !text.is_empty() {
        tokens.push(Token::new(text.clone(), start, end, 0));
        text.clear();
    }
}

/// Adiciona um token de pontuação diretamente
fn push_token(tokens: &mut Vec<Token>, text: String, start: usize, end: usize) {
    tokens.push(Token::new(text, start, end, 0));
}

pub fn compute_flags(text: &str) -> TokenFlags {
    TokenFlags {
        is_title: is_title(text),
        is_punct: !text.is_empty() && text.chars().all(is_punct_char),
        is_alpha: !text.is_empty() && text.chars().all(char::is_alphabetic),
        is_lower: text.chars().any(char::is_lowercase) && !text.chars().any(char::is_uppercase),
        like_num: like_num(text),
    }
}

/// Title-case: cada trecho de letras começa com maiúscula e segue minúsculo.
/// "Hauptstraße" e "Str." sim; "Bertha-von-Suttner" e "III" não.
pub fn is_title(text: &str) -> bool {
    let mut cased = false;
    let mut prev_cased = false;

    for c in text.chars() {
        if c.is_uppercase() {
            if prev_cased {
                return false;
            }
            prev_cased = true;
            cased = true;
        } else if c.is_lowercase() {
            if !prev_cased {
                return false;
            }
            prev_cased = true;
            cased = true;
        } else {
            prev_cased = false;
        }
    }
    cased
}

fn is_punct_char(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | ';' | ':' | '!' | '?' | '-' | '–' | '—' | '(' | ')' | '[' | ']' | '{' | '}'
            | '"' | '\'' | '„' | '“' | '”' | '‚' | '‘' | '’' | '«' | '»' | '/' | '…' | '·'
    )
}

/// Heurística de "parece número": dígitos com separadores, frações e numerais.
pub fn like_num(text: &str) -> bool {
    let trimmed = text.trim_start_matches(|c| matches!(c, '+' | '-' | '~' | '±'));
    let digits: String = trimmed.chars().filter(|c| *c != ',' && *c != '.').collect();

    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    if let Some((num, denom)) = digits.split_once('/') {
        let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        if all_digits(num) && all_digits(denom) {
            return true;
        }
    }
    NUMBER_WORDS.contains(&text.to_lowercase().as_str())
}
