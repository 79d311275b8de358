//! # Extensão do Número da Casa
//!
//! Dado o token de um possível número de casa, calcula até onde o span precisa
//! ir para cobrir faixas ("44-46", "51 – 57"), sufixos de letra ("7 b") e a
//! pontuação colada ao número, sem engolir um CEP (PLZ) seguinte.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::Document;

/// "119", "119a", "57."
pub static RE_SINGLE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+[A-Za-z]?[.,;:!?]*$").unwrap());
/// "51-57", "119-121a", "12/14."
pub static RE_EMBEDDED_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]+[A-Za-z]?[-/–—][0-9]+[A-Za-z]?[.,;:!?]*$").unwrap()
});
/// "g", "g."
static RE_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][.,;:!?]*$").unwrap());
/// CEP alemão/austríaco de cinco dígitos.
static RE_POSTAL_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{5}$").unwrap());

const RANGE_SEPARATORS: &[&str] = &["-", "/", "–", "—"];
/// Abreviações de duas letras ("z. B.", "u. a.") cuja primeira letra não é sufixo de número.
const LETTER_ABBREVIATIONS: &[(&str, &str)] = &[
    ("z", "b"),
    ("u", "a"),
    ("d", "h"),
    ("o", "ä"),
    ("u", "u"),
    ("s", "o"),
    ("v", "a"),
    ("i", "d"),
];
const TRAILING_PUNCT: &[&str] = &[".", ",", ";", ":"];

fn text_at(doc: &Document, i: usize) -> Option<&str> {
    doc.token(i).map(|t| t.text.as_str())
}

fn is_separator(doc: &Document, i: usize) -> bool {
    text_at(doc, i).map_or(false, |t| RANGE_SEPARATORS.contains(&t))
}

fn is_letter(doc: &Document, i: usize) -> bool {
    text_at(doc, i).map_or(false, |t| RE_LETTER.is_match(t)) && !starts_abbreviation(doc, i)
}

/// "z." seguido de "B." (com o ponto colado ou em token próprio).
fn starts_abbreviation(doc: &Document, i: usize) -> bool {
    let Some(first) = text_at(doc, i) else {
        return false;
    };
    let mut next = i + 1;
    if !first.ends_with('.') {
        if text_at(doc, next) != Some(".") {
            return false;
        }
        next += 1;
    }
    let Some(second) = text_at(doc, next) else {
        return false;
    };

    let first = first.trim_end_matches('.').to_lowercase();
    let second = second.trim_end_matches('.').to_lowercase();
    LETTER_ABBREVIATIONS.iter().any(|&(a, b)| a == first && b == second)
}

fn is_postal_code(doc: &Document, i: usize) -> bool {
    text_at(doc, i).map_or(false, |t| RE_POSTAL_CODE.is_match(t))
}

/// O token é um número de casa simples ou uma faixa embutida.
pub fn is_house_number(text: &str) -> bool {
    RE_SINGLE_NUMBER.is_match(text) || RE_EMBEDDED_RANGE.is_match(text)
}

/// Absorve pontuação de fim de número, parando antes de um CEP.
fn absorb_punctuation(doc: &Document, mut end: usize) -> usize {
    while let Some(token) = doc.token(end) {
        if !(token.flags.is_punct && TRAILING_PUNCT.contains(&token.text.as_str())) {
            break;
        }
        if is_postal_code(doc, end + 1) {
            break;
        }
        end += 1;
    }
    end
}

/// Fim exclusivo do span de número que começa no token `number`.
///
/// Índices fora do documento devolvem `number + 1` sem consultar nada.
///
/// ```rust
/// use addr_core::document::Document;
/// use addr_core::extender::extend;
///
/// let doc = Document::from_text("Weg 12 a - 14 b, 10115 Berlin");
/// assert_eq!(doc.slice_text(1, extend(&doc, 1)), Some("12 a - 14 b"));
/// ```
pub fn extend(doc: &Document, number: usize) -> usize {
    let mut end = number + 1;
    let Some(token) = doc.token(number) else {
        return end;
    };

    if RE_EMBEDDED_RANGE.is_match(&token.text) {
        return absorb_punctuation(doc, end);
    }

    // Letra colada sempre entra; se vier um separador depois dela ("12 a - 14"),
    // a faixa é tratada a partir do separador
    if is_letter(doc, end) {
        end += 1;
    }

    if is_separator(doc, end) {
        let second = text_at(doc, end + 1).map_or(false, is_house_number);
        if second {
            end += 2;
            if is_letter(doc, end) {
                end += 1;
            }
        }
    }

    absorb_punctuation(doc, end)
}
