//! # Configuração e Tabelas de Regras
//!
//! Todas as listas heurísticas do reconhecedor (sufixos de rua, conectores,
//! gatilhos de falso positivo, vocabulário de exclusão do gazetteer) vivem aqui
//! como dados, não espalhadas pela lógica. Podem ser carregadas de JSON; campos
//! ausentes caem nos valores padrão.
//!
//! ```rust
//! use addr_core::config::RecognizerConfig;
//!
//! let cfg = RecognizerConfig::from_json_str(r#"{ "max_window": 12 }"#).unwrap();
//! assert_eq!(cfg.max_window, 12);
//! assert_eq!(cfg.max_consecutive_lowercase, 2);
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AddressError, Result};

/// Versão das tabelas padrão embutidas no crate.
pub const RULES_VERSION: u32 = 4;

/// Parâmetros do reconhecedor baseado em gazetteer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Distância máxima (em tokens) entre o número e o início do nome da rua.
    pub max_window: usize,
    /// Quantas palavras minúsculas seguidas (fora conectores) encerram a varredura.
    pub max_consecutive_lowercase: usize,
    /// Tabelas de regras heurísticas.
    pub rules: RuleTables,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            max_window: 9,
            max_consecutive_lowercase: 2,
            rules: RuleTables::default(),
        }
    }
}

impl RecognizerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(AddressError::config(format!(
                "arquivo de configuração não encontrado: {}",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_window == 0 {
            return Err(AddressError::config("max_window deve ser >= 1"));
        }
        if self.max_consecutive_lowercase == 0 {
            return Err(AddressError::config("max_consecutive_lowercase deve ser >= 1"));
        }
        if self.rules.street_suffixes.is_empty() {
            return Err(AddressError::config("street_suffixes não pode ser vazio"));
        }
        Ok(())
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Listas versionadas usadas pela varredura, pelo filtro de falsos positivos
/// e pelo corte de preposições.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleTables {
    pub version: u32,
    /// Palavras-sufixo de rua ("straße", "weg", ...), em minúsculas.
    pub street_suffixes: Vec<String>,
    /// Preposições/artigos permitidos dentro de nomes de rua.
    pub connectors: Vec<String>,
    /// Palavras que nunca fazem parte de um nome de rua.
    pub stopwords: Vec<String>,
    /// Marcadores de quantidade/aproximação antes do número ("ca.", "etwa").
    pub quantity_markers: Vec<String>,
    /// Unidades de tempo e porcentagem depois do número.
    pub unit_words: Vec<String>,
    /// Nomes de meses (completos e abreviados).
    pub month_names: Vec<String>,
    /// "Typ 2", "Teil 3", "Stadium 4".
    pub context_words: Vec<String>,
    /// Citações legais ("Abs. 2", "§ 203").
    pub legal_markers: Vec<String>,
    /// Data de diagnóstico ("ED 2019").
    pub diagnosis_markers: Vec<String>,
    /// Frases de idade/coorte ("Alter von 45", "Jugendliche bis 17").
    pub age_markers: Vec<String>,
    /// Temporadas esportivas ("Saison 2012/2013").
    pub season_markers: Vec<String>,
    /// Preposições minúsculas removidas do início de um ADDRESS.
    pub trim_prepositions: Vec<String>,
    /// Artigos opcionais removidos logo após a preposição.
    pub trim_articles: Vec<String>,
}

impl Default for RuleTables {
    fn default() -> Self {
        Self {
            version: RULES_VERSION,
            street_suffixes: owned(&[
                "straße", "strasse", "str.", "str", "weg", "allee", "platz", "gasse", "ring",
                "ufer", "damm", "hof", "chaussee", "pfad", "markt", "steig", "stieg", "garten",
                "plan", "redder", "wiesen", "flur", "feld", "berg", "see", "tal", "blick",
                "park", "kamp", "kamps", "gang", "twiete", "twieten", "terrasse", "terrassen",
                "siedlung", "winkel", "äcker", "acker", "wald", "brink", "rain", "grund",
                "höhe", "hang", "anger", "bruch", "heide", "holz", "brücke", "bruecke", "tor",
                "gässchen", "gaesschen", "gässle", "gaessle", "steige", "lohe", "höfe", "hoefe",
                "reihe", "umgehung", "ortsumfahrung", "bahnbogen", "hügel", "huegel", "wegle",
                "mühle", "muehle",
            ]),
            connectors: owned(&[
                "am", "an", "auf", "in", "im", "bei", "zum", "zur", "unter", "der", "den", "dem",
                "des", "von", "vom", "zu", "und",
            ]),
            stopwords: owned(&["wohnhaft", "patient", "adresse", "dokumentation", "treffen"]),
            quantity_markers: owned(&[
                "ca.", "ca", "circa", "etwa", "zirka", "rund", "ungefähr", "zwischen", "bis",
                "über", "ab", "für", "von", "mindestens", "höchstens", "maximal", "minimal",
                "mehr", "weniger", "meisten", "wenigsten",
            ]),
            unit_words: owned(&[
                "tag", "tage", "tagen", "tages", "woche", "wochen", "monat", "monate", "monaten",
                "monats", "jahr", "jahre", "jahren", "jahres", "stunde", "stunden", "minute",
                "minuten", "%", "prozent",
            ]),
            month_names: owned(&[
                "januar", "jänner", "februar", "märz", "april", "mai", "juni", "juli", "august",
                "september", "oktober", "november", "dezember", "jan.", "feb.", "mär.", "apr.",
                "jun.", "jul.", "aug.", "sep.", "sept.", "okt.", "nov.", "dez.",
            ]),
            context_words: owned(&["typ", "teil", "stufe", "stadium", "grad", "klasse"]),
            legal_markers: owned(&["abs.", "abs", "§", "§§", "art.", "satz"]),
            diagnosis_markers: owned(&["ed"]),
            age_markers: owned(&[
                "alter", "jugendliche", "jugendlichen", "kinder", "kindern", "erwachsene",
                "lebensjahr", "lebensjahres", "jährige", "jährigen",
            ]),
            season_markers: owned(&["saison", "spielzeit"]),
            trim_prepositions: owned(&["in", "an", "auf", "bei", "unter"]),
            trim_articles: owned(&["der", "den", "dem"]),
        }
    }
}

/// Versão compilada de [`RuleTables`] com buscas O(1).
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub version: u32,
    street_suffixes: Vec<String>,
    suffix_words: HashSet<String>,
    pub connectors: HashSet<String>,
    pub stopwords: HashSet<String>,
    pub quantity_markers: HashSet<String>,
    pub unit_words: HashSet<String>,
    pub month_names: HashSet<String>,
    pub context_words: HashSet<String>,
    pub legal_markers: HashSet<String>,
    pub diagnosis_markers: HashSet<String>,
    pub age_markers: HashSet<String>,
    pub season_markers: HashSet<String>,
    pub trim_prepositions: HashSet<String>,
    pub trim_articles: HashSet<String>,
}

fn lower_set(items: &[String]) -> HashSet<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

impl CompiledRules {
    pub fn compile(tables: &RuleTables) -> Self {
        let mut street_suffixes: Vec<String> =
            tables.street_suffixes.iter().map(|s| s.to_lowercase()).collect();
        // Sufixos mais longos primeiro: "straße" antes de "str"
        street_suffixes.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        street_suffixes.dedup();

        Self {
            version: tables.version,
            suffix_words: street_suffixes.iter().cloned().collect(),
            street_suffixes,
            connectors: lower_set(&tables.connectors),
            stopwords: lower_set(&tables.stopwords),
            quantity_markers: lower_set(&tables.quantity_markers),
            unit_words: lower_set(&tables.unit_words),
            month_names: lower_set(&tables.month_names),
            context_words: lower_set(&tables.context_words),
            legal_markers: lower_set(&tables.legal_markers),
            diagnosis_markers: lower_set(&tables.diagnosis_markers),
            age_markers: lower_set(&tables.age_markers),
            season_markers: lower_set(&tables.season_markers),
            trim_prepositions: lower_set(&tables.trim_prepositions),
            trim_articles: lower_set(&tables.trim_articles),
        }
    }

    /// A palavra inteira é um sufixo de rua ("Weg", "Str.", "Straße").
    pub fn is_suffix_word(&self, lower: &str) -> bool {
        self.suffix_words.contains(lower)
            || lower
                .strip_suffix('.')
                .map(|stem| self.suffix_words.contains(stem))
                .unwrap_or(false)
    }

    /// A palavra termina em um sufixo de rua, com ponto opcional ("Meisenweg", "Hauffstr.").
    pub fn ends_with_suffix(&self, lower: &str) -> bool {
        let stem = lower.strip_suffix('.').unwrap_or(lower);
        self.street_suffixes
            .iter()
            .any(|suffix| stem.ends_with(suffix.trim_end_matches('.')))
    }
}

impl Default for CompiledRules {
    fn default() -> Self {
        Self::compile(&RuleTables::default())
    }
}

/// Política de exclusão aplicada às linhas da fonte do gazetteer.
///
/// Muitos registros de "rua" são na verdade pontos de interesse (cemitérios,
/// estacionamentos, trilhas). Mantê-los faria "Parkplatz 3" virar endereço.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionPolicy {
    /// Comprimento mínimo (em caracteres) do nome normalizado.
    pub min_length: usize,
    /// Substrings que excluem o nome em qualquer posição.
    pub substrings: Vec<String>,
    /// Palavras que excluem o nome apenas como palavra inteira.
    pub keywords: Vec<String>,
    /// Regexes estruturais (aplicadas ao nome normalizado).
    pub patterns: Vec<String>,
    /// Países aceitos quando a fonte tem coluna de país.
    pub countries: Vec<String>,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            min_length: 3,
            substrings: owned(&[
                "friedhof", "öffentliche grünfläche", "öffentlicher parkplatz", "parkplatz",
                "parkhaus", "tiefgarage", "spielplatz", "sportplatz", "bolzplatz", "rastplatz",
                "campingplatz", "klinikum", "krankenhaus", "gewerbegebiet", "industriegebiet",
                "industriepark", "gewerbepark", "stadion", "sporthalle", "turnhalle",
                "schwimmbad", "freibad", "hallenbad", "wanderweg", "wanderpfad", "radweg",
                "radfahrweg", "fahrradweg", "lehrpfad", "themenpfad", "kunstpfad",
                "skulpturenpfad", "erlebnisweg", "bergstation", "talstation", "seilbahn",
                "bahnsteig", "bikepark", "skatepark", "güterweg", "gueterweg",
                "grundstückszufahrt", "nicht betreten", "bauabschnitt",
            ]),
            keywords: owned(&[
                "gehweg", "fußweg", "fussweg", "waldweg", "feldweg", "bergweg", "höhenweg",
                "rundweg", "trail", "zugang", "zufahrt", "aufgang", "abgang", "gleis", "tunnel",
                "seeweg", "uferweg", "bachweg", "flussweg", "schule", "kindergarten", "kita",
                "kirche", "kapelle", "kloster", "museum", "denkmal", "privatweg",
            ]),
            patterns: owned(&[
                r"^[0-9]+[a-z]?$",
                r"^weg [ivx]+$",
                r"^weg [a-z]$",
                r"^zeile [a-z]$",
                r"^[a-z]$",
                r"^[abo][0-9]+$",
                r"^[lsrgmk][0-9]+$",
                r"^av[0-9]+",
                r"zufahrt (haus )?nr\.? ?[0-9]+",
            ]),
            countries: owned(&["DE", "AT"]),
        }
    }
}

impl ExclusionPolicy {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = RecognizerConfig::from_json_str(r#"{"max_window": 12}"#).unwrap();
        assert_eq!(cfg.max_window, 12);
        assert_eq!(cfg.rules, RuleTables::default());
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = RecognizerConfig::from_json_str(r#"{"max_window": 0}"#).unwrap_err();
        assert!(matches!(err, AddressError::Config(_)));
    }

    #[test]
    fn test_suffix_checks() {
        let rules = CompiledRules::default();
        assert!(rules.is_suffix_word("str."));
        assert!(rules.is_suffix_word("weg"));
        assert!(!rules.is_suffix_word("haupt"));
        assert!(rules.ends_with_suffix("hauffstr."));
        assert!(rules.ends_with_suffix("papiermühle"));
        assert!(rules.ends_with_suffix("bertha-von-suttner-str."));
        assert!(!rules.ends_with_suffix("schmerzen"));
    }

    #[test]
    fn test_exclusion_policy_roundtrip_json() {
        let policy = ExclusionPolicy::from_json_str(r#"{"countries": ["DE"]}"#).unwrap();
        assert_eq!(policy.countries, vec!["DE".to_string()]);
        assert_eq!(policy.min_length, 3);
    }
}
