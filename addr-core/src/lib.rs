//! # addr-core: Reconhecimento de Endereços Alemães em Texto Clínico
//!
//! Este crate encontra endereços de rua ("Hauptstraße 44-46", "Am Grünen
//! Winkel 164", "Bertha-von-Suttner-Str. 198c") em textos médicos em alemão,
//! para que sejam pseudonimizados antes de qualquer uso secundário. Um
//! endereço perdido é um vazamento de dado pessoal; um número clínico marcado
//! como endereço é ruído. As heurísticas equilibram as duas coisas.
//!
//! ## Arquitetura do Sistema
//!
//! O texto passa por um pipeline linear:
//!
//! 1.  **Tokenização** ([`tokenizer`], [`document`]): tokens com offsets de byte.
//! 2.  **Gazetteer** ([`gazetteer`], [`normalizer`]): conjunto de nomes de rua
//!     normalizados, carregado uma vez e compartilhado só para leitura.
//! 3.  **Reconhecedor** ([`recognizer`]): para cada número, varre a rua à
//!     esquerda ([`street`]), valida no gazetteer, estende o número
//!     ([`extender`]) e descarta contextos clínicos ([`false_positive`]).
//! 4.  **Produtores independentes** ([`rule_based`], [`tagger`]): padrões de
//!     superfície e o tagger base de PERSON/LOCATION/ORGANIZATION.
//! 5.  **Resolução** ([`resolver`]) e **acabamento** ([`span_normalizer`]).
//! 6.  **Saída**: lista de [`EntitySpan`] sem sobreposição.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use std::sync::Arc;
//! use addr_core::{AddressPipeline, Gazetteer};
//!
//! // 1. Gazetteer (em produção vem do cache ou dos CSVs)
//! let gazetteer = Arc::new(Gazetteer::from_names(["Hauptstraße", "Lilienweg"]));
//!
//! // 2. Pipeline com padrões embutidos e sem tagger base
//! let pipeline = AddressPipeline::with_defaults(gazetteer);
//!
//! // 3. Análise
//! let analysis = pipeline.analyze("Patient wohnt in der Lilienweg 12 seit etwa 2 Wochen.");
//! let found: Vec<&str> = analysis.addresses().map(|e| e.text.as_str()).collect();
//! assert_eq!(found, vec!["Lilienweg 12"]);
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: Orquestrador com eventos de progresso.
//! - [`config`]: Limites da varredura e tabelas de heurísticas.
//! - [`selftest`]: Bateria de verificação executada na inicialização.
//! - [`eval`]: Classificação de falhas em rodadas de avaliação.

pub mod config;
pub mod document;
pub mod error;
pub mod eval;
pub mod extender;
pub mod false_positive;
pub mod gazetteer;
pub mod normalizer;
pub mod pipeline;
pub mod recognizer;
pub mod resolver;
pub mod rule_based;
pub mod selftest;
pub mod span;
pub mod span_normalizer;
pub mod street;
pub mod tagger;
pub mod tokenizer;

pub use config::{CompiledRules, ExclusionPolicy, RecognizerConfig};
pub use document::Document;
pub use error::{AddressError, Result};
pub use gazetteer::{Gazetteer, GazetteerSource, LoadStats};
pub use pipeline::{AddressPipeline, Analysis, PipelineEvent};
pub use recognizer::GazetteerRecognizer;
pub use span::{EntityLabel, EntitySpan, SpanSource};
pub use tagger::SpanProducer;
pub use tokenizer::Token;
