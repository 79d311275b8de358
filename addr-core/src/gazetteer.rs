//! # Gazetteer de Ruas
//!
//! Conjunto imutável de nomes de rua normalizados (ver [`crate::normalizer`]).
//! É carregado uma vez por processo e compartilhado entre todas as chamadas de
//! reconhecimento (via `Arc`), sem locks.
//!
//! ## Fontes
//!
//! - **Cache binário** (caminho rápido): o conjunto já normalizado, serializado
//!   com `bincode` e marcado com uma versão de formato.
//! - **CSV** (caminho lento): uma ou mais tabelas com coluna de nome e,
//!   opcionalmente, coluna de país. Cada nome passa pela normalização e pela
//!   [`ExclusionPolicy`] antes de entrar no conjunto.
//!
//! Os dois caminhos produzem exatamente o mesmo conjunto para a mesma fonte e
//! a mesma política.
//!
//! ```rust
//! use addr_core::gazetteer::Gazetteer;
//!
//! let gaz = Gazetteer::from_names(["Hauptstraße", "Berliner Str."]);
//! assert!(gaz.contains("hauptstrasse"));
//! assert!(gaz.contains("berliner strasse"));
//! assert!(!gaz.contains("nichtexistenzweg"));
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ExclusionPolicy;
use crate::error::{AddressError, Result};
use crate::normalizer::normalize;

/// Versão do formato do cache binário.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Uma tabela de origem do gazetteer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteerSource {
    pub path: PathBuf,
    /// Coluna com o nome da rua (comparada sem diferenciar maiúsculas).
    pub name_column: String,
    /// Coluna com o código do país; `None` aceita todas as linhas.
    pub country_column: Option<String>,
}

impl GazetteerSource {
    /// Tabela simples com uma coluna `name` (sem país).
    pub fn names_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name_column: "name".to_string(),
            country_column: None,
        }
    }

    /// Tabela multi-país com colunas `Name` e `Country`.
    pub fn with_country(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name_column: "Name".to_string(),
            country_column: Some("Country".to_string()),
        }
    }
}

/// Contadores de uma construção a partir das fontes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub rows: usize,
    pub skipped_country: usize,
    pub skipped_empty: usize,
    pub skipped_short: usize,
    pub skipped_no_letter: usize,
    pub excluded: usize,
    pub malformed: usize,
    /// Nomes distintos no conjunto final.
    pub kept: usize,
}

/// Motivo pelo qual um nome normalizado fica fora do gazetteer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Empty,
    TooShort,
    NoLetter,
    Excluded,
}

/// [`ExclusionPolicy`] pronta para uso: vocabulário normalizado e regexes compiladas.
#[derive(Debug, Clone)]
pub struct CompiledExclusion {
    min_length: usize,
    substrings: Vec<String>,
    keywords: Vec<Regex>,
    patterns: Vec<Regex>,
    countries: HashSet<String>,
}

impl CompiledExclusion {
    pub fn compile(policy: &ExclusionPolicy) -> Result<Self> {
        // O vocabulário passa pela mesma normalização dos nomes ("fußweg" → "fussweg")
        let substrings = policy
            .substrings
            .iter()
            .map(|s| normalize(s))
            .filter(|s| !s.is_empty())
            .collect();

        let keywords = policy
            .keywords
            .iter()
            .map(|k| normalize(k))
            .filter(|k| !k.is_empty())
            .map(|k| Regex::new(&format!(r"\b{}\b", regex::escape(&k))))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let patterns = policy
            .patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            min_length: policy.min_length,
            substrings,
            keywords,
            patterns,
            countries: policy.countries.iter().map(|c| c.trim().to_uppercase()).collect(),
        })
    }

    /// País aceito? Lista vazia aceita qualquer país.
    pub fn accepts_country(&self, country: &str) -> bool {
        self.countries.is_empty() || self.countries.contains(&country.trim().to_uppercase())
    }

    pub fn verdict(&self, normalized: &str) -> Verdict {
        if normalized.is_empty() {
            return Verdict::Empty;
        }
        if normalized.chars().count() < self.min_length {
            return Verdict::TooShort;
        }
        if !normalized.chars().any(char::is_alphabetic) {
            return Verdict::NoLetter;
        }
        let excluded = self.substrings.iter().any(|s| normalized.contains(s.as_str()))
            || self.keywords.iter().any(|re| re.is_match(normalized))
            || self.patterns.iter().any(|re| re.is_match(normalized));
        if excluded {
            Verdict::Excluded
        } else {
            Verdict::Keep
        }
    }
}

#[derive(Serialize, Deserialize)]
struct GazetteerCache {
    version: u32,
    names: Vec<String>,
}

/// Conjunto de nomes de rua normalizados.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gazetteer {
    names: HashSet<String>,
}

impl Gazetteer {
    /// Cria um gazetteer a partir de nomes brutos (normalizados aqui, sem exclusões).
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| normalize(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }

    /// Busca por um nome já normalizado.
    pub fn contains(&self, normalized: &str) -> bool {
        self.names.contains(normalized)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Nomes em ordem lexicográfica.
    pub fn sorted_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.iter().cloned().collect();
        names.sort();
        names
    }

    /// Reconstrói o conjunto a partir das fontes CSV (união de todas).
    pub fn build(sources: &[GazetteerSource], policy: &ExclusionPolicy) -> Result<(Self, LoadStats)> {
        let filter = CompiledExclusion::compile(policy)?;
        let mut gazetteer = Self::default();
        let mut stats = LoadStats::default();

        for source in sources {
            if !source.path.is_file() {
                return Err(AddressError::GazetteerMissing(source.path.clone()));
            }
            let file = File::open(&source.path)?;
            let label = source.path.display().to_string();
            gazetteer.extend_from_reader(
                BufReader::new(file),
                &label,
                &source.name_column,
                source.country_column.as_deref(),
                &filter,
                &mut stats,
            )?;
        }

        stats.kept = gazetteer.len();
        info!(
            rows = stats.rows,
            kept = stats.kept,
            excluded = stats.excluded,
            skipped_country = stats.skipped_country,
            "gazetteer reconstruído a partir de {} fonte(s)",
            sources.len()
        );
        Ok((gazetteer, stats))
    }

    /// Acrescenta as linhas de uma tabela CSV ao conjunto.
    pub fn extend_from_reader<R: Read>(
        &mut self,
        reader: R,
        source_name: &str,
        name_column: &str,
        country_column: Option<&str>,
        filter: &CompiledExclusion,
        stats: &mut LoadStats,
    ) -> Result<()> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let find = |column: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(column))
                .ok_or_else(|| AddressError::MissingColumn {
                    column: column.to_string(),
                    source_name: source_name.to_string(),
                    available: headers.iter().collect::<Vec<_>>().join(", "),
                })
        };
        let name_idx = find(name_column)?;
        let country_idx = country_column.map(find).transpose()?;

        let malformed_before = stats.malformed;
        for (line, record) in csv_reader.records().enumerate() {
            stats.rows += 1;
            let record = match record {
                Ok(r) => r,
                Err(err) => {
                    stats.malformed += 1;
                    debug!(source = source_name, line = line + 2, error = %err, "linha ignorada");
                    continue;
                }
            };

            if let Some(idx) = country_idx {
                let country = record.get(idx).unwrap_or("");
                if !filter.accepts_country(country) {
                    stats.skipped_country += 1;
                    continue;
                }
            }

            let Some(raw) = record.get(name_idx) else {
                stats.malformed += 1;
                continue;
            };
            let normalized = normalize(raw);
            match filter.verdict(&normalized) {
                Verdict::Keep => {
                    self.names.insert(normalized);
                }
                Verdict::Empty => stats.skipped_empty += 1,
                Verdict::TooShort => stats.skipped_short += 1,
                Verdict::NoLetter => stats.skipped_no_letter += 1,
                Verdict::Excluded => stats.excluded += 1,
            }
        }

        if stats.malformed > malformed_before {
            warn!(
                source = source_name,
                malformed = stats.malformed - malformed_before,
                "linhas malformadas ignoradas"
            );
        }
        Ok(())
    }

    /// Grava o cache binário (nomes ordenados, para saída determinística).
    pub fn save_cache(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let cache = GazetteerCache {
            version: CACHE_FORMAT_VERSION,
            names: self.sorted_names(),
        };
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, &cache)?;
        info!(path = %path.display(), names = self.len(), "cache do gazetteer gravado");
        Ok(())
    }

    /// Lê o cache binário; versão diferente é erro.
    pub fn load_cache(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(AddressError::GazetteerMissing(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        let cache: GazetteerCache = bincode::deserialize_from(reader)?;
        if cache.version != CACHE_FORMAT_VERSION {
            return Err(AddressError::cache(format!(
                "versão {} do cache, esperada {CACHE_FORMAT_VERSION}",
                cache.version
            )));
        }
        Ok(Self {
            names: cache.names.into_iter().collect(),
        })
    }

    /// Carrega pelo cache quando existe; senão reconstrói das fontes.
    ///
    /// Com `persist`, uma reconstrução também grava o cache (falha na escrita
    /// só gera aviso). Sem cache e sem fontes o carregamento falha: um
    /// reconhecedor sem gazetteer não detecta endereço nenhum.
    pub fn load(
        cache: Option<&Path>,
        sources: &[GazetteerSource],
        policy: &ExclusionPolicy,
        persist: bool,
    ) -> Result<Self> {
        if let Some(path) = cache.filter(|p| p.is_file()) {
            let gazetteer = Self::load_cache(path)?;
            info!(path = %path.display(), names = gazetteer.len(), "gazetteer carregado do cache");
            return Ok(gazetteer);
        }

        if sources.is_empty() {
            let missing = cache.map(Path::to_path_buf).unwrap_or_default();
            return Err(AddressError::GazetteerMissing(missing));
        }

        let (gazetteer, _stats) = Self::build(sources, policy)?;
        if gazetteer.is_empty() {
            warn!("gazetteer vazio após a reconstrução");
        }

        if let (true, Some(path)) = (persist, cache) {
            if let Err(err) = gazetteer.save_cache(path) {
                warn!(path = %path.display(), error = %err, "não foi possível gravar o cache");
            }
        }
        Ok(gazetteer)
    }
}
