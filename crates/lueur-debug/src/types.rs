//! types.rs — Modèle de données des infos de debug
//!
//! Tous les index (fichiers, chaînes) sont générés en interne par le
//! compilateur ; un index hors bornes est un bug, pas une donnée utilisateur.

use bitflags::bitflags;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Localisation source ─────────────────────────── */

/// Nom de fichier, ligne et colonne associés à une adresse bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DebugSourceLocation {
    /// Offset bytecode de cette entrée, relatif au début de la fonction.
    pub address: u32,
    /// Index du fichier dans la table des noms de fichiers.
    pub filename_id: u32,
    /// Index de la sourceMappingUrl dans la table de chaînes.
    /// [`DebugSourceLocation::NO_SOURCE_MAPPING_URL`] si absente.
    pub source_mapping_url_id: u32,
    /// Ligne, base 1.
    pub line: u32,
    /// Colonne, base 1.
    pub column: u32,
    /// Statement à cette position. Base 1, par fonction.
    /// 0 = l'instruction n'appartient à aucun statement utilisateur.
    pub statement: u32,
}

impl DebugSourceLocation {
    /// Sentinelle « pas de sourceMappingUrl ».
    pub const NO_SOURCE_MAPPING_URL: u32 = u32::MAX;

    /// Construit une entrée sans sourceMappingUrl.
    pub fn new(address: u32, filename_id: u32, line: u32, column: u32, statement: u32) -> Self {
        Self {
            address,
            filename_id,
            source_mapping_url_id: Self::NO_SOURCE_MAPPING_URL,
            line,
            column,
            statement,
        }
    }
}

/* ─────────────────────────── Callee textifié ─────────────────────────── */

/// Nom textuel du callee d'une instruction d'appel dont la cible n'est pas
/// résoluble statiquement (appel calculé, accès membre, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DebugTextifiedCallee {
    /// Offset bytecode de l'instruction d'appel, relatif à la fonction.
    pub address: u32,
    /// Nom du callee, interné dans la table de chaînes du générateur.
    pub textified_callee: lueur_core::StringId,
}

/* ─────────────────────────── Offsets par fonction ─────────────────────────── */

/// Offsets d'une fonction dans les sections de debug.
///
/// Possédé par l'enregistrement bytecode de la fonction ; même durée de vie
/// que le module compilé.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DebugOffsets {
    /// Offset dans la section des localisations source.
    pub source_locations: u32,
    /// Offset dans la section des données lexicales.
    pub lexical_data: u32,
    /// Offset dans la section des callees textifiés.
    pub textified_callees: u32,
}

impl DebugOffsets {
    /// Sentinelle « pas de données ».
    pub const NO_OFFSET: u32 = u32::MAX;

    /// Construit un triplet d'offsets.
    pub fn new(source_locations: u32, lexical_data: u32, textified_callees: u32) -> Self {
        Self { source_locations, lexical_data, textified_callees }
    }
}

impl Default for DebugOffsets {
    fn default() -> Self {
        Self {
            source_locations: Self::NO_OFFSET,
            lexical_data: Self::NO_OFFSET,
            textified_callees: Self::NO_OFFSET,
        }
    }
}

/* ─────────────────────────── Résultat de recherche ─────────────────────────── */

/// Résultat d'une recherche « où tombe (ligne, colonne) dans le bytecode ».
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DebugSearchResult {
    /// Index de la fonction trouvée dans la table des fonctions.
    pub function_index: u32,
    /// Offset de l'instruction trouvée, relatif au début de sa fonction.
    pub bytecode_offset: u32,
    /// Ligne effectivement trouvée.
    pub line: u32,
    /// Colonne effectivement trouvée.
    pub column: u32,
}

/* ─────────────────────────── Régions de fichiers ─────────────────────────── */

/// Associe une plage contiguë de la section des localisations à un fichier
/// source. Les régions sont append-only, dans l'ordre de compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DebugFileRegion {
    /// Offset (en octets) du début de la région dans la section des
    /// localisations source.
    pub from_address: u32,
    /// Index du fichier dans la table des noms de fichiers.
    pub filename_id: u32,
    /// Index de la sourceMappingUrl, ou
    /// [`DebugSourceLocation::NO_SOURCE_MAPPING_URL`].
    pub source_mapping_url_id: u32,
}

/* ─────────────────────────── Flags du conteneur ─────────────────────────── */

bitflags! {
    /// Flags de l'en-tête du conteneur sérialisé.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugInfoFlags: u8 {
        /// La section lexicale contient des entrées au-delà de l'entrée
        /// commune « 0 variable, pas de parent ».
        const HAS_LEXICAL_DATA = 0b0000_0001;
        /// La section des callees textifiés contient des entrées au-delà de
        /// la table vide commune.
        const HAS_TEXTIFIED_CALLEES = 0b0000_0010;
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
