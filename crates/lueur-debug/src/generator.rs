//! generator.rs — Accumulateur d'écriture des infos de debug
//!
//! `DebugInfoGenerator` accumule les quatre sections au fil de la compilation
//! puis les transfère d'un bloc, de façon destructive, dans un [`DebugInfo`]
//! immuable via [`DebugInfoGenerator::serialize_with_move`].
//!
//! Les erreurs d'encodage (delta hors plage i32) sont des assertions : les
//! infos de debug sont vérifiées à la construction du module, jamais adaptées
//! à une entrée non fiable.

use indexmap::IndexMap;
use smallvec::SmallVec;

use lueur_core::{leb128, ByteWriter, StringId, UniquingFilenameTable, UniquingStringTable};

use crate::info::DebugInfo;
use crate::types::{DebugFileRegion, DebugInfoFlags, DebugOffsets, DebugSourceLocation, DebugTextifiedCallee};

/// Offset spécial représentant l'entrée la plus commune de sa table.
///
/// Pour la table lexicale : « 0 variable, pas de parent ». Compilé sans infos
/// de debug complètes, ce cas couvre la plupart des fonctions réelles ; le
/// réutiliser sans réémettre d'octets réduit la taille du module.
///
/// Pour la table des callees textifiés : la table vide.
pub(crate) const MOST_COMMON_ENTRY_OFFSET: u32 = 0;

/// Accumulateur mutable des sections de debug.
///
/// Non clonable : le stockage des noms de fichiers se transfère, il ne se
/// copie pas.
#[derive(Debug)]
pub struct DebugInfoGenerator {
    /// Section des localisations source sérialisées.
    sources_data: ByteWriter,

    /// Noms de fichiers dédupliqués (consommés par le transfert final).
    filenames: UniquingFilenameTable,

    /// Régions fichier → plage de la section des localisations.
    files: SmallVec<[DebugFileRegion; 1]>,

    /// Section des données lexicales (variables + parent par fonction).
    lexical_data: ByteWriter,

    /// Section des callees textifiés.
    textified_callees: ByteWriter,

    /// Table de chaînes du debug : entrées `[len: uLEB][bytes UTF-8]`.
    string_table: ByteWriter,

    /// Chaînes de debug internées (identité → [`StringId`]).
    strings: UniquingStringTable,

    /// Index des chaînes déjà émises : identité internée → offset dans
    /// `string_table` (dédup à l'écriture).
    string_index: IndexMap<StringId, u32>,
}

impl DebugInfoGenerator {
    /// Construit un générateur à partir de la table de fichiers du module.
    ///
    /// Réserve l'offset 0 de chaque table à son entrée la plus commune :
    /// lexical = « pas de parent, 0 variable », callees = table vide.
    pub fn new(filenames: UniquingFilenameTable) -> Self {
        let mut lexical_data = ByteWriter::new();
        leb128::write_unsigned(&mut lexical_data, 0); // pas de parent
        leb128::write_unsigned(&mut lexical_data, 0); // 0 variable

        let mut textified_callees = ByteWriter::new();
        leb128::write_unsigned(&mut textified_callees, 0); // 0 entrée

        Self {
            sources_data: ByteWriter::new(),
            filenames,
            files: SmallVec::new(),
            lexical_data,
            textified_callees,
            string_table: ByteWriter::new(),
            strings: UniquingStringTable::new(),
            string_index: IndexMap::new(),
        }
    }

    /// Interne une chaîne de debug (nom de variable, callee textifié).
    pub fn intern_string(&mut self, s: &str) -> StringId { self.strings.intern(s) }

    /// Interne un nom de fichier.
    pub fn intern_filename(&mut self, filename: &str) -> u32 { self.filenames.intern(filename) }

    /// Delta signé entre deux compteurs u32. Une magnitude hors plage i32
    /// signifierait un saut de 2 milliards de lignes/colonnes : c'est un bug
    /// d'encodage, jamais une donnée réelle.
    fn delta(to: u32, from: u32) -> i32 {
        let diff = i64::from(to) - i64::from(from);
        assert!(
            (i64::from(i32::MIN)..=i64::from(i32::MAX)).contains(&diff),
            "u32 delta too large when encoding debug info"
        );
        diff as i32
    }

    /// Offset de `id` dans la table de chaînes ; émet l'entrée à la première
    /// rencontre, la réutilise ensuite.
    fn string_offset(&mut self, id: StringId) -> u32 {
        if let Some(&off) = self.string_index.get(&id) {
            return off;
        }
        let off = self.string_table.len() as u32;
        let s = self.strings.resolve(id);
        leb128::write_unsigned(&mut self.string_table, s.len() as u64);
        self.string_table.write_bytes(s.as_bytes());
        self.string_index.insert(id, off);
        off
    }

    /// Ajoute la liste de localisations d'une fonction.
    ///
    /// Layout du bloc :
    /// ```text
    /// [count: uLEB][function_index: uLEB]
    /// [première entrée en clair : address, filename, url+1, line, column, statement]
    /// puis par entrée : [Δaddress, Δfilename, Δline, Δcolumn, Δstatement] en sLEB
    /// ```
    /// Retourne l'offset du bloc dans la section (le futur
    /// `DebugOffsets::source_locations` de la fonction), ou
    /// [`DebugOffsets::NO_OFFSET`] si `rest` est vide.
    pub fn append_source_locations(
        &mut self,
        start: &DebugSourceLocation,
        function_index: u32,
        rest: &[DebugSourceLocation],
    ) -> u32 {
        if rest.is_empty() {
            return DebugOffsets::NO_OFFSET;
        }
        let start_offset = self.sources_data.len() as u32;

        // nouvelle région dès que le fichier change d'une fonction à l'autre
        if self.files.last().map(|f| f.filename_id) != Some(start.filename_id) {
            self.files.push(DebugFileRegion {
                from_address: start_offset,
                filename_id: start.filename_id,
                source_mapping_url_id: start.source_mapping_url_id,
            });
        }

        let w = &mut self.sources_data;
        leb128::write_unsigned(w, 1 + rest.len() as u64);
        leb128::write_unsigned(w, u64::from(function_index));

        leb128::write_unsigned(w, u64::from(start.address));
        leb128::write_unsigned(w, u64::from(start.filename_id));
        leb128::write_unsigned(w, u64::from(start.source_mapping_url_id.wrapping_add(1)));
        leb128::write_unsigned(w, u64::from(start.line));
        leb128::write_unsigned(w, u64::from(start.column));
        leb128::write_unsigned(w, u64::from(start.statement));

        let mut previous = start;
        for next in rest {
            assert!(
                next.address >= previous.address,
                "bytecode addresses must be non-decreasing within a function"
            );
            let w = &mut self.sources_data;
            leb128::write_signed(w, i64::from(Self::delta(next.address, previous.address)));
            leb128::write_signed(w, i64::from(Self::delta(next.filename_id, previous.filename_id)));
            leb128::write_signed(w, i64::from(Self::delta(next.line, previous.line)));
            leb128::write_signed(w, i64::from(Self::delta(next.column, previous.column)));
            leb128::write_signed(w, i64::from(Self::delta(next.statement, previous.statement)));
            previous = next;
        }

        start_offset
    }

    /// Ajoute les données lexicales d'une fonction : parent optionnel
    /// (encodé index+1, 0 = aucun) puis liste préfixée par le compte des
    /// offsets de noms de variables.
    ///
    /// La forme « pas de parent, 0 variable » réutilise l'entrée commune à
    /// l'offset 0 sans émettre d'octets.
    pub fn append_lexical_data(&mut self, parent_function_index: Option<u32>, names: &[StringId]) -> u32 {
        if parent_function_index.is_none() && names.is_empty() {
            return MOST_COMMON_ENTRY_OFFSET;
        }
        let offset = self.lexical_data.len() as u32;
        let parent_encoded = parent_function_index.map_or(0, |p| u64::from(p) + 1);
        leb128::write_unsigned(&mut self.lexical_data, parent_encoded);
        leb128::write_unsigned(&mut self.lexical_data, names.len() as u64);
        for &id in names {
            let off = self.string_offset(id);
            leb128::write_unsigned(&mut self.lexical_data, u64::from(off));
        }
        offset
    }

    /// Ajoute la table des callees textifiés d'une fonction :
    /// `[count][par entrée : Δaddress uLEB, offset de chaîne uLEB]`.
    ///
    /// La table vide réutilise l'entrée commune à l'offset 0.
    pub fn append_textified_callee_data(&mut self, callees: &[DebugTextifiedCallee]) -> u32 {
        if callees.is_empty() {
            return MOST_COMMON_ENTRY_OFFSET;
        }
        let offset = self.textified_callees.len() as u32;
        leb128::write_unsigned(&mut self.textified_callees, callees.len() as u64);
        let mut previous_address = 0u32;
        for callee in callees {
            assert!(
                callee.address >= previous_address,
                "call addresses must be non-decreasing within a function"
            );
            let string_off = self.string_offset(callee.textified_callee);
            let w = &mut self.textified_callees;
            leb128::write_unsigned(w, u64::from(callee.address - previous_address));
            leb128::write_unsigned(w, u64::from(string_off));
            previous_address = callee.address;
        }
        offset
    }

    /// Transfert destructif vers un [`DebugInfo`] immuable. Le générateur est
    /// consommé ; le système de types interdit toute réutilisation.
    pub fn serialize_with_move(self) -> DebugInfo {
        let lexical_data_offset = self.sources_data.len() as u32;
        let textified_callee_offset = lexical_data_offset + self.lexical_data.len() as u32;
        let string_table_offset = textified_callee_offset + self.textified_callees.len() as u32;

        let mut flags = DebugInfoFlags::empty();
        // 2 octets = la seule entrée commune « 0 variable, pas de parent »
        if self.lexical_data.len() > 2 {
            flags |= DebugInfoFlags::HAS_LEXICAL_DATA;
        }
        // 1 octet = la seule table vide commune
        if self.textified_callees.len() > 1 {
            flags |= DebugInfoFlags::HAS_TEXTIFIED_CALLEES;
        }

        let mut data = self.sources_data.into_vec();
        data.extend_from_slice(self.lexical_data.as_slice());
        data.extend_from_slice(self.textified_callees.as_slice());
        data.extend_from_slice(self.string_table.as_slice());

        let (filename_table, filename_storage) = self.filenames.into_storage();

        #[cfg(feature = "trace")]
        log::debug!(
            "debug info serialized: sources={lexical_data_offset}o, lexical={}o, callees={}o, strings={}o",
            textified_callee_offset - lexical_data_offset,
            string_table_offset - textified_callee_offset,
            data.len() as u32 - string_table_offset,
        );

        DebugInfo::from_parts(
            filename_table,
            filename_storage,
            self.files,
            flags,
            lexical_data_offset,
            textified_callee_offset,
            string_table_offset,
            data,
        )
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
