//! lueur-debug — Infos de debug du bytecode Lueur
//!
//! Format :
//! ```text
//! data = [sourceLocations | lexicalData | textifiedCallees | stringTable]
//!                          |             |                  ^ string_table_offset
//!                          |             ^ textified_callee_offset
//!                          ^ lexical_data_offset
//! ```
//! Les quatre sections vivent dans un seul buffer contigu ; les trois offsets
//! de partition font partie du contrat du format sérialisé.
//!
//! - `sourceLocations` : par fonction, liste (adresse → ligne/colonne/
//!   statement) compressée en deltas signés LEB128
//! - `lexicalData` : parent lexical optionnel + noms de variables
//! - `textifiedCallees` : nom lisible du callee pour les appels indirects
//! - `stringTable` : chaînes dédupliquées `[len: uLEB][bytes UTF-8]`
//!
//! API :
//! - `DebugInfoGenerator` (accumulateur) → `serialize_with_move()` →
//!   `DebugInfo` (immuable, requêtes read-only)
//! - `DebugInfo::to_bytes()` / `from_bytes()` (blob versionné + CRC32)
//! - `disasm::disassemble()` pour l'outillage
//! - `populate_source_map` (feature `source-map`)
//!
//! Ce crate est consommé par le compilateur (écriture) et par le débogueur /
//! l'outillage source map (lecture).

#![deny(missing_docs)]

/// Types du modèle de données (localisation, offsets, régions de fichiers).
pub mod types;

/// Accumulateur d'écriture (`DebugInfoGenerator`).
pub mod generator;

/// Conteneur immuable (`DebugInfo`) et ses requêtes.
pub mod info;

/// Désassemblage textuel des sections de debug.
pub mod disasm;

/// Pont vers un générateur de source map externe.
#[cfg(feature = "source-map")]
pub mod sourcemap;

pub use generator::DebugInfoGenerator;
pub use info::DebugInfo;
pub use types::{
    DebugFileRegion, DebugInfoFlags, DebugOffsets, DebugSearchResult, DebugSourceLocation,
    DebugTextifiedCallee,
};

#[cfg(feature = "source-map")]
pub use sourcemap::SourceMapSink;
