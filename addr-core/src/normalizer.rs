//! # Normalização de Nomes de Rua
//!
//! Transforma um nome de rua bruto na chave de busca do gazetteer. A mesma
//! função é aplicada aos registros da fonte e aos trechos do texto clínico,
//! então as duas pontas sempre se encontram na mesma forma canônica.
//!
//! ## Etapas
//!
//! 1. Remove todas as aspas.
//! 2. Espaços exóticos (NBSP, thin space) viram espaço comum; sequências colapsam.
//! 3. Travessões viram hífen; apóstrofos tipográficos viram `'`; "ſ" e as
//!    ligaduras latinas ("ﬁ", "ﬆ", ...) viram as letras simples.
//! 4. Parênteses nas pontas saem até não sobrar nenhum ("((Weg))", "(Weg).").
//! 5. Abreviações de sufixo são expandidas ("Str." → "Straße", "Kaiserdm." → "Kaiserdamm").
//! 6. "-Str." residual vira "-Straße".
//! 7. Pontos finais que sobraram saem ("Lindenallee." → "Lindenallee").
//! 8. NFC e case-fold ("ß" → "ss").
//!
//! ```rust
//! use addr_core::normalizer::normalize;
//!
//! assert_eq!(normalize("Berliner Str."), "berliner strasse");
//! assert_eq!(normalize("Hauptstraße"), normalize("Hauptstrasse"));
//! assert_eq!(normalize("„Am Grünen Winkel“"), "am grünen winkel");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Onde uma abreviação pode aparecer dentro de uma parte da palavra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Final de palavra composta: "Hauffstr.", "Marktpl.".
    WordSuffix,
    /// A parte inteira (entre espaços/hífens): "W.", "St.", "Rg.".
    WholeWord,
}

/// Tabela ordenada: formas mais específicas (mais longas) antes das curtas.
const ABBREVIATIONS: &[(&str, &str, Scope)] = &[
    ("str.", "straße", Scope::WordSuffix),
    ("gass.", "gasse", Scope::WordSuffix),
    ("chaus.", "chaussee", Scope::WordSuffix),
    ("prom.", "promenade", Scope::WordSuffix),
    ("gart.", "garten", Scope::WordSuffix),
    ("pfad.", "pfad", Scope::WordSuffix),
    ("mkt.", "markt", Scope::WordSuffix),
    ("stg.", "steig", Scope::WordSuffix),
    ("wg.", "weg", Scope::WordSuffix),
    ("pl.", "platz", Scope::WordSuffix),
    ("grab.", "graben", Scope::WordSuffix),
    ("all.", "allee", Scope::WordSuffix),
    ("dam.", "damm", Scope::WordSuffix),
    ("dm.", "damm", Scope::WordSuffix),
    ("gr.", "graben", Scope::WordSuffix),
    ("pk.", "park", Scope::WordSuffix),
    ("bg.", "berg", Scope::WordSuffix),
    ("hf.", "hof", Scope::WordSuffix),
    ("uf.", "ufer", Scope::WordSuffix),
    // Daqui para baixo só a parte inteira: como sufixo pegariam "Hamburg.", "Kanal.",
    // "Saga.", "Bach.", "Kopf.", "Hauptst." e o "Dr." de "Dr.-Müller-Weg"
    ("rg.", "ring", Scope::WholeWord),
    ("al.", "allee", Scope::WholeWord),
    ("ga.", "gasse", Scope::WholeWord),
    ("ch.", "chaussee", Scope::WholeWord),
    ("pf.", "pfad", Scope::WholeWord),
    ("st.", "sankt", Scope::WholeWord),
    ("w.", "weg", Scope::WholeWord),
    ("r.", "ring", Scope::WholeWord),
    ("g.", "gasse", Scope::WholeWord),
    ("t.", "tor", Scope::WholeWord),
];

const QUOTES: &[char] = &['"', '„', '“', '”'];

static RE_STRASSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([Ss])trasse").unwrap());
static RE_HYPHEN_STR: Lazy<Regex> = Lazy::new(|| Regex::new(r"-([Ss])tr\.").unwrap());

/// Normaliza um nome de rua para a forma de busca do gazetteer.
///
/// Função pura e idempotente: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let s: String = raw.chars().filter(|c| !QUOTES.contains(c)).collect();
    let s = unify_characters(&s);
    let s = strip_wrapping(&s);
    let s = expand_abbreviations(s);
    let s = RE_HYPHEN_STR.replace_all(&s, "-${1}traße");
    let s = s.trim_end_matches(|c: char| c == '.' || c.is_whitespace());
    casefold(&s.nfc().collect::<String>())
}

/// Etapa 4. Pontos depois do ")" não são de abreviação e saem junto.
fn strip_wrapping(s: &str) -> &str {
    let mut s = s.trim();
    loop {
        let body = s.trim_end_matches('.');
        match body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
            Some(inner) => s = inner.trim(),
            None => return s,
        }
    }
}

/// Etapas 2 e 3.
fn unify_characters(s: &str) -> String {
    let mut unified = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\u{00a0}' | '\u{2009}' | '\u{202f}' => unified.push(' '),
            '–' | '—' => unified.push('-'),
            '\u{2019}' | '`' => unified.push('\''),
            other => match fold_letter(other) {
                Some(plain) => unified.push_str(plain),
                None => unified.push(other),
            },
        }
    }
    unified.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Letras que `to_lowercase` não desdobra mas o case folding completo sim.
fn fold_letter(c: char) -> Option<&'static str> {
    match c {
        'ſ' => Some("s"),
        'ﬀ' => Some("ff"),
        'ﬁ' => Some("fi"),
        'ﬂ' => Some("fl"),
        'ﬃ' => Some("ffi"),
        'ﬄ' => Some("ffl"),
        'ﬅ' | 'ﬆ' => Some("st"),
        _ => None,
    }
}

/// Etapa 5: expande abreviações parte a parte (partes separadas por espaço ou hífen).
fn expand_abbreviations(s: &str) -> String {
    let s = RE_STRASSE.replace_all(s, "${1}traße");

    s.split(' ')
        .map(|word| {
            word.split('-')
                .map(expand_part)
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn expand_part(part: &str) -> String {
    let lower = part.to_lowercase();

    for &(abbrev, expansion, scope) in ABBREVIATIONS {
        let hit = match scope {
            Scope::WholeWord => lower == abbrev,
            Scope::WordSuffix => lower.ends_with(abbrev),
        };
        if !hit {
            continue;
        }

        // `lower` e `part` podem divergir em bytes; corta pelo número de caracteres
        let keep = part.chars().count().saturating_sub(abbrev.chars().count());
        let stem: String = part.chars().take(keep).collect();
        let cased = part
            .chars()
            .nth(keep)
            .map(char::is_uppercase)
            .unwrap_or(false);

        return if cased {
            format!("{stem}{}", capitalize(expansion))
        } else {
            format!("{stem}{expansion}")
        };
    }

    part.to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Case-fold alemão: minúsculas e "ß" → "ss" ("ẞ" passa por "ß").
///
/// Não é o case folding completo do Unicode; o que falta para nomes de rua
/// ("ſ" e ligaduras) já foi desdobrado em [`fold_letter`].
fn casefold(s: &str) -> String {
    s.to_lowercase().replace('ß', "ss")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_abbreviation_expansion() {
        assert_eq!(normalize("Berliner Str."), "berliner strasse");
        assert_eq!(normalize("Hauffstr."), "hauffstrasse");
        assert_eq!(normalize("Musterwg."), "musterweg");
        assert_eq!(normalize("Marktpl."), "marktplatz");
        assert_eq!(normalize("St. Georg-Str."), "sankt georg-strasse");
        assert_eq!(normalize("Am Stadtgr."), "am stadtgraben");
        assert_eq!(normalize("Am Gr."), "am graben");
    }

    #[test]
    fn test_compound_suffixes_expand() {
        assert_eq!(normalize("Kaiserdm."), "kaiserdamm");
        assert_eq!(normalize("Hirschbg."), "hirschberg");
        assert_eq!(normalize("Lindenall."), "lindenallee");
        assert_eq!(normalize("Gutshf."), "gutshof");
        assert_eq!(normalize("Mainuf."), "mainufer");
        assert_eq!(normalize("Stadtpk."), "stadtpark");
        // sufixos que colidiriam só valem como parte inteira
        assert_eq!(normalize("Am Rg."), "am ring");
        assert_eq!(normalize("Hamburg."), "hamburg");
        assert_eq!(normalize("Am Kanal."), "am kanal");
        assert_eq!(normalize("Dr.-Müller-Weg"), "dr.-müller-weg");
    }

    #[test]
    fn test_trailing_period_dropped() {
        assert_eq!(normalize("Lindenallee."), "lindenallee");
        assert_eq!(normalize("Hauptstraße. "), "hauptstrasse");
        assert_eq!(normalize("(Musterweg)."), "musterweg");
    }

    #[test]
    fn test_nested_wrapping() {
        assert_eq!(normalize("((Weg))"), "weg");
        assert_eq!(normalize("„(Lilienweg)“"), "lilienweg");
        assert_eq!(normalize("(Weg)\""), "weg");
        assert_eq!(normalize(&normalize("((Weg))")), normalize("((Weg))"));
    }

    #[test]
    fn test_long_s_and_ligatures() {
        assert_eq!(normalize("Hauptſtraße"), "hauptstrasse");
        assert_eq!(normalize("Schaﬀhauser Weg"), "schaffhauser weg");
        assert_eq!(normalize("Oﬁziersweg"), "ofiziersweg");
        assert_eq!(normalize("Poﬆweg"), "postweg");
        assert_eq!(normalize("HAUPTSTRAẞE"), "hauptstrasse");
    }

    #[test]
    fn test_no_double_expansion() {
        assert_eq!(normalize("Bertha-von-Suttner-Straße"), "bertha-von-suttner-strasse");
        assert_eq!(normalize("Bertha-von-Suttner-Str."), "bertha-von-suttner-strasse");
        assert_eq!(normalize("Bertha-von-Suttner-Strasse"), "bertha-von-suttner-strasse");
    }

    #[test]
    fn test_wrapping_and_quotes() {
        assert_eq!(normalize("  \"Hauptstraße\"  "), "hauptstrasse");
        assert_eq!(normalize("(Lilienweg)"), "lilienweg");
        assert_eq!(normalize("Am \"\"Ring\"\""), "am ring");
    }

    #[test]
    fn test_whitespace_dashes_apostrophes() {
        assert_eq!(normalize("Am\u{00a0}Grünen \u{2009} Winkel"), "am grünen winkel");
        assert_eq!(normalize("Karl–Marx–Allee"), "karl-marx-allee");
        assert_eq!(normalize("An’n Diek"), "an'n diek");
    }

    #[test]
    fn test_nfc_composition() {
        // "u" + trema combinante
        assert_eq!(normalize("Mu\u{0308}hlenweg"), "mühlenweg");
    }

    #[test]
    fn test_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("\"\""), "");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in "[A-Za-zÄÖÜäöüßſﬁﬆ .'()\u{2019}\u{2013}\u{00a0}\"„“-]{0,40}") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_is_idempotent_on_street_shapes(
            stem in "[A-ZÄÖÜ][a-zäöüß]{2,10}",
            suffix in prop::sample::select(vec![
                "straße", "str.", "Str.", "strasse", "weg", "wg.", "pl.", "platz", "allee",
                " St.", "-Str.", " W.", "gasse", "gass.", "dm.", "gr.", "all.", ").", ".",
            ]),
        ) {
            let raw = format!("{stem}{suffix}");
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
