//! intern.rs — Tables d'interning (dédup) pour chaînes de debug et fichiers
//!
//! Tout le sous-système référence les chaînes par index : une chaîne donnée
//! n'est stockée qu'une seule fois, dans l'ordre d'insertion. Les identifiants
//! sont stables pour toute la durée de vie de la table.
//!
//! `UniquingFilenameTable` est la spécialisation « noms de fichiers » : elle
//! sait se démanteler (`into_storage`) en la paire (table d'offsets, stockage
//! préfixé par la taille) consommée par le conteneur de debug sérialisé.
//! Transfert à sens unique : la table n'est plus utilisable ensuite.

use indexmap::IndexSet;

use crate::{leb128, ByteWriter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── StringId ─────────────────────────── */

/// Identifiant d'une chaîne internée (index dans la table, ordre d'insertion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StringId(pub u32);

/* ─────────────────────────── UniquingStringTable ─────────────────────────── */

/// Table de chaînes dédupliquées, indexées par [`StringId`].
#[derive(Debug, Clone, Default)]
pub struct UniquingStringTable {
    set: IndexSet<String>,
}

impl UniquingStringTable {
    /// Crée une table vide.
    pub fn new() -> Self { Self { set: IndexSet::new() } }

    /// Interne `s` et retourne son identifiant (existant si déjà vue).
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(ix) = self.set.get_index_of(s) {
            return StringId(ix as u32);
        }
        let (ix, _) = self.set.insert_full(s.to_owned());
        StringId(ix as u32)
    }

    /// Résout un identifiant. Les identifiants sont générés en interne :
    /// un id hors bornes signale un bug, pas une entrée utilisateur.
    pub fn resolve(&self, id: StringId) -> &str {
        self.set
            .get_index(id.0 as usize)
            .unwrap_or_else(|| panic!("string id {} out of bounds (table has {})", id.0, self.set.len()))
    }

    /// Nombre de chaînes distinctes.
    pub fn len(&self) -> usize { self.set.len() }

    /// Vrai si la table est vide.
    pub fn is_empty(&self) -> bool { self.set.is_empty() }

    /// Itère dans l'ordre d'insertion.
    pub fn iter(&self) -> impl Iterator<Item = (StringId, &str)> {
        self.set.iter().enumerate().map(|(ix, s)| (StringId(ix as u32), s.as_str()))
    }
}

/* ─────────────────────────── UniquingFilenameTable ─────────────────────────── */

/// Table de noms de fichiers dédupliqués (même contrat que
/// [`UniquingStringTable`], plus le démantèlement vers le conteneur).
#[derive(Debug, Clone, Default)]
pub struct UniquingFilenameTable {
    inner: UniquingStringTable,
}

impl UniquingFilenameTable {
    /// Crée une table vide.
    pub fn new() -> Self { Self { inner: UniquingStringTable::new() } }

    /// Interne un nom de fichier.
    pub fn intern(&mut self, filename: &str) -> u32 {
        self.inner.intern(filename).0
    }

    /// Résout un identifiant de fichier.
    pub fn resolve(&self, id: u32) -> &str { self.inner.resolve(StringId(id)) }

    /// Nombre de fichiers distincts.
    pub fn len(&self) -> usize { self.inner.len() }

    /// Vrai si la table est vide.
    pub fn is_empty(&self) -> bool { self.inner.is_empty() }

    /// Démantèle la table en `(offsets, stockage)` : chaque entrée du stockage
    /// est `[len: uLEB][bytes UTF-8]`, `offsets[id]` pointe sur son début.
    /// Transfert destructif — la table est consommée.
    pub fn into_storage(self) -> (Vec<u32>, Vec<u8>) {
        let mut offsets = Vec::with_capacity(self.inner.len());
        let mut storage = ByteWriter::new();
        for (_, name) in self.inner.iter() {
            offsets.push(storage.len() as u32);
            leb128::write_unsigned(&mut storage, name.len() as u64);
            storage.write_bytes(name.as_bytes());
        }
        (offsets, storage.into_vec())
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
