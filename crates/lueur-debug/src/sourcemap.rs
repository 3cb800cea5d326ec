//! sourcemap.rs — Pont vers un générateur de source map externe
//!
//! Rejoue chaque liste de localisations décodée et émet un triplet
//! (position générée, position d'origine, fichier) par entrée. Le format de
//! la source map appartient au consommateur : on ne suppose rien au-delà de
//! « accepte des triplets ».
//!
//! Coupé des builds « lean » via la feature `source-map`.

use crate::info::DebugInfo;

/// Réceptacle des triplets de mapping, implémenté par le générateur de
/// source map externe.
pub trait SourceMapSink {
    /// Reçoit un mapping : offset absolu dans le fichier bytecode du segment
    /// `segment_id`, vers `(filename, line, column)` d'origine.
    fn add_mapping(&mut self, segment_id: u32, generated_offset: u32, filename: &str, line: u32, column: u32);
}

impl DebugInfo {
    /// Rejoue toutes les localisations dans `sink`.
    ///
    /// `function_offsets[function_index]` donne la position de départ de
    /// chaque fonction dans le fichier bytecode ; l'offset généré émis est
    /// absolu. Un index de fonction hors de `function_offsets` est un bug de
    /// l'appelant.
    pub fn populate_source_map(
        &self,
        sink: &mut dyn SourceMapSink,
        function_offsets: &[u32],
        segment_id: u32,
    ) {
        let blocks = self.function_blocks().expect("corrupt debug info data");
        for block in &blocks {
            let base = function_offsets[block.function_index as usize];
            for entry in &block.entries {
                sink.add_mapping(
                    segment_id,
                    base + entry.address,
                    self.get_filename_by_id(entry.filename_id),
                    entry.line,
                    entry.column,
                );
            }
        }
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
