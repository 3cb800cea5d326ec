//! info.rs — Conteneur immuable des infos de debug + requêtes read-only
//!
//! Construit par transfert destructif depuis [`crate::DebugInfoGenerator`].
//! Les requêtes décodent toujours en avant depuis le début du bloc d'une
//! fonction : les listes sont courtes (une entrée par frontière de statement),
//! aucun index auxiliaire n'est construit.
//!
//! Les absences (adresse avant la première entrée, pas de parent, pas de
//! callee) sont des `None` ordinaires. Un blob interne indécodable est un bug
//! de construction : assertion, pas d'erreur récupérable. Seul le couple
//! `to_bytes`/`from_bytes` — la frontière avec des octets non fiables —
//! retourne des `CoreResult`.

use smallvec::SmallVec;

use lueur_core::{crc32_ieee, leb128, ByteReader, ByteWriter, CoreError, CoreResult};

use crate::types::{DebugFileRegion, DebugInfoFlags, DebugOffsets, DebugSearchResult, DebugSourceLocation};

const MAGIC: &[u8; 6] = b"LUDBG\0";
const VERSION: u16 = 1;

/// Message unique des requêtes sur un blob interne indécodable.
const CORRUPT: &str = "corrupt debug info data";

/// Conteneur des infos de debug d'un module compilé. Immuable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugInfo {
    /// `filename_table[id]` = offset de l'entrée dans `filename_storage`.
    filename_table: Vec<u32>,
    /// Stockage des noms de fichiers : entrées `[len: uLEB][bytes UTF-8]`.
    filename_storage: Vec<u8>,
    /// Régions fichier, dans l'ordre de compilation.
    files: SmallVec<[DebugFileRegion; 1]>,
    /// Flags de l'en-tête sérialisé.
    flags: DebugInfoFlags,
    lexical_data_offset: u32,
    textified_callee_offset: u32,
    string_table_offset: u32,
    /// `[sourceLocations | lexicalData | textifiedCallees | stringTable]`
    data: Vec<u8>,
}

/// Bloc de localisations décodé d'une fonction (outillage interne).
#[derive(Debug, Clone)]
pub(crate) struct FunctionLocations {
    /// Offset du bloc dans la section des localisations.
    pub block_offset: u32,
    /// Index de la fonction dans la table des fonctions.
    pub function_index: u32,
    /// Entrées décodées, dans l'ordre d'encodage.
    pub entries: Vec<DebugSourceLocation>,
}

impl DebugInfo {
    /// Assemble un conteneur depuis ses parties (générateur ou décodage).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        filename_table: Vec<u32>,
        filename_storage: Vec<u8>,
        files: SmallVec<[DebugFileRegion; 1]>,
        flags: DebugInfoFlags,
        lexical_data_offset: u32,
        textified_callee_offset: u32,
        string_table_offset: u32,
        data: Vec<u8>,
    ) -> Self {
        assert!(
            lexical_data_offset <= textified_callee_offset
                && textified_callee_offset <= string_table_offset
                && string_table_offset as usize <= data.len(),
            "debug info section offsets must be ordered"
        );
        Self {
            filename_table,
            filename_storage,
            files,
            flags,
            lexical_data_offset,
            textified_callee_offset,
            string_table_offset,
            data,
        }
    }

    /* ───────────────────── Accès aux sections ───────────────────── */

    /// Régions fichier, dans l'ordre de compilation.
    pub fn files(&self) -> &[DebugFileRegion] { &self.files }

    /// Buffer complet des quatre sections.
    pub fn data(&self) -> &[u8] { &self.data }

    /// Flags de l'en-tête.
    pub fn flags(&self) -> DebugInfoFlags { self.flags }

    /// Frontière localisations / données lexicales.
    pub fn lexical_data_offset(&self) -> u32 { self.lexical_data_offset }

    /// Frontière données lexicales / callees textifiés.
    pub fn textified_callee_offset(&self) -> u32 { self.textified_callee_offset }

    /// Frontière callees textifiés / table de chaînes.
    pub fn string_table_offset(&self) -> u32 { self.string_table_offset }

    /// Taille en octets de la table de chaînes sérialisée.
    pub fn string_table_size_bytes(&self) -> u32 {
        self.data.len() as u32 - self.string_table_offset
    }

    fn source_locations_data(&self) -> &[u8] { &self.data[..self.lexical_data_offset as usize] }

    fn lexical_data(&self) -> &[u8] {
        &self.data[self.lexical_data_offset as usize..self.textified_callee_offset as usize]
    }

    fn textified_callee_data(&self) -> &[u8] {
        &self.data[self.textified_callee_offset as usize..self.string_table_offset as usize]
    }

    fn string_table_data(&self) -> &[u8] { &self.data[self.string_table_offset as usize..] }

    /* ───────────────────── Chaînes & fichiers ───────────────────── */

    /// Décode une entrée `[len][bytes]` de la table de chaînes.
    fn decode_string(&self, offset: u32) -> CoreResult<&str> {
        let mut r = ByteReader::at_offset(self.string_table_data(), offset as usize);
        let len = leb128::read_unsigned(&mut r)? as usize;
        let bytes = r.read_bytes(len)?;
        core::str::from_utf8(bytes).map_err(|_| CoreError::InvalidUtf8)
    }

    /// Nom du fichier `id`. Un id hors bornes est un bug interne.
    pub fn get_filename_by_id(&self, id: u32) -> &str {
        assert!((id as usize) < self.filename_table.len(), "filename id out of bounds");
        let offset = self.filename_table[id as usize] as usize;
        let mut r = ByteReader::at_offset(&self.filename_storage, offset);
        let len = leb128::read_unsigned(&mut r).expect(CORRUPT) as usize;
        let bytes = r.read_bytes(len).expect(CORRUPT);
        core::str::from_utf8(bytes).expect(CORRUPT)
    }

    /// Nombre d'entrées de la table des noms de fichiers.
    pub fn filename_count(&self) -> usize { self.filename_table.len() }

    /* ───────────────────── Localisations source ───────────────────── */

    /// Localisation de `offset_in_function`, connaissant l'offset de debug de
    /// la fonction. Dernière entrée d'adresse ≤ la requête ; `None` si la
    /// fonction n'a pas de données ou si la première adresse dépasse déjà.
    pub fn get_location_for_address(
        &self,
        debug_offset: u32,
        offset_in_function: u32,
    ) -> Option<DebugSourceLocation> {
        if debug_offset == DebugOffsets::NO_OFFSET {
            return None;
        }
        self.location_for_address(debug_offset, offset_in_function).expect(CORRUPT)
    }

    fn location_for_address(
        &self,
        debug_offset: u32,
        offset_in_function: u32,
    ) -> CoreResult<Option<DebugSourceLocation>> {
        let mut r = ByteReader::at_offset(self.source_locations_data(), debug_offset as usize);
        let count = leb128::read_unsigned(&mut r)?;
        let _function_index = leb128::read_unsigned(&mut r)?;
        if count == 0 {
            return Ok(None);
        }

        let mut current = read_first_entry(&mut r)?;
        if current.address > offset_in_function {
            return Ok(None);
        }
        for _ in 1..count {
            let next = read_delta_entry(&mut r, &current)?;
            if next.address > offset_in_function {
                break;
            }
            current = next;
        }
        Ok(Some(current))
    }

    /// Cherche une adresse bytecode où `(target_line, target_column)` est
    /// référencée pour le fichier `filename_id`. Sans colonne, première
    /// entrée sur la ligne. Première correspondance — ordre des régions puis
    /// ordre d'encodage — gagne.
    pub fn get_address_for_location(
        &self,
        filename_id: u32,
        target_line: u32,
        target_column: Option<u32>,
    ) -> Option<DebugSearchResult> {
        self.address_for_location(filename_id, target_line, target_column).expect(CORRUPT)
    }

    fn address_for_location(
        &self,
        filename_id: u32,
        target_line: u32,
        target_column: Option<u32>,
    ) -> CoreResult<Option<DebugSearchResult>> {
        for (ix, region) in self.files.iter().enumerate() {
            if region.filename_id != filename_id {
                continue;
            }
            let region_end = self
                .files
                .get(ix + 1)
                .map_or(self.lexical_data_offset, |next| next.from_address);

            let section = self.source_locations_data();
            let mut r = ByteReader::at_offset(section, region.from_address as usize);
            while (r.offset() as u32) < region_end {
                let block = read_function_block(&mut r)?;
                for entry in &block.entries {
                    if entry.filename_id != filename_id || entry.line != target_line {
                        continue;
                    }
                    if target_column.is_some_and(|col| col != entry.column) {
                        continue;
                    }
                    return Ok(Some(DebugSearchResult {
                        function_index: block.function_index,
                        bytecode_offset: entry.address,
                        line: entry.line,
                        column: entry.column,
                    }));
                }
            }
        }
        Ok(None)
    }

    /// Décode séquentiellement tous les blocs de la section des
    /// localisations (outillage : désassemblage, source map).
    pub(crate) fn function_blocks(&self) -> CoreResult<Vec<FunctionLocations>> {
        let section = self.source_locations_data();
        let mut r = ByteReader::new(section);
        let mut blocks = Vec::new();
        while r.remaining() > 0 {
            blocks.push(read_function_block(&mut r)?);
        }
        Ok(blocks)
    }

    /* ───────────────────── Données lexicales ───────────────────── */

    /// Noms de variables du bloc lexical commençant à `offset`.
    pub fn get_variable_names(&self, offset: u32) -> SmallVec<[&str; 4]> {
        self.variable_names(offset).expect(CORRUPT)
    }

    fn variable_names(&self, offset: u32) -> CoreResult<SmallVec<[&str; 4]>> {
        let mut r = ByteReader::at_offset(self.lexical_data(), offset as usize);
        let _parent = leb128::read_unsigned(&mut r)?;
        let count = leb128::read_unsigned(&mut r)?;
        let mut names = SmallVec::new();
        for _ in 0..count {
            let string_off = leb128::read_unsigned(&mut r)? as u32;
            names.push(self.decode_string(string_off)?);
        }
        Ok(names)
    }

    /// Index de la fonction parente du bloc lexical commençant à `offset`,
    /// ou `None` si la fonction n'a pas de parent lexical.
    pub fn get_parent_function_id(&self, offset: u32) -> Option<u32> {
        let mut r = ByteReader::at_offset(self.lexical_data(), offset as usize);
        let parent = leb128::read_unsigned(&mut r).expect(CORRUPT);
        if parent == 0 { None } else { Some((parent - 1) as u32) }
    }

    /* ───────────────────── Callees textifiés ───────────────────── */

    /// Nom du callee textifié de l'appel à `offset_in_function` — même
    /// balayage « dernière adresse ≤ requête » que les localisations.
    pub fn get_textified_callee_utf8(
        &self,
        debug_offset: u32,
        offset_in_function: u32,
    ) -> Option<&str> {
        if debug_offset == DebugOffsets::NO_OFFSET {
            return None;
        }
        self.textified_callee(debug_offset, offset_in_function).expect(CORRUPT)
    }

    fn textified_callee(&self, debug_offset: u32, offset_in_function: u32) -> CoreResult<Option<&str>> {
        let mut r = ByteReader::at_offset(self.textified_callee_data(), debug_offset as usize);
        let count = leb128::read_unsigned(&mut r)?;
        let mut address = 0u32;
        let mut best: Option<u32> = None;
        for _ in 0..count {
            let delta = leb128::read_unsigned(&mut r)? as u32;
            let string_off = leb128::read_unsigned(&mut r)? as u32;
            address += delta;
            if address > offset_in_function {
                break;
            }
            best = Some(string_off);
        }
        match best {
            Some(off) => Ok(Some(self.decode_string(off)?)),
            None => Ok(None),
        }
    }

    /// Balayage séquentiel de la section lexicale (outillage).
    pub(crate) fn lexical_blocks(&self) -> CoreResult<Vec<(u32, Option<u32>, SmallVec<[&str; 4]>)>> {
        let section = self.lexical_data();
        let mut r = ByteReader::new(section);
        let mut blocks = Vec::new();
        while r.remaining() > 0 {
            let offset = r.offset() as u32;
            let parent = leb128::read_unsigned(&mut r)?;
            let parent = if parent == 0 { None } else { Some((parent - 1) as u32) };
            let count = leb128::read_unsigned(&mut r)?;
            let mut names = SmallVec::new();
            for _ in 0..count {
                let string_off = leb128::read_unsigned(&mut r)? as u32;
                names.push(self.decode_string(string_off)?);
            }
            blocks.push((offset, parent, names));
        }
        Ok(blocks)
    }

    /// Balayage séquentiel de la section des callees textifiés (outillage).
    pub(crate) fn textified_callee_blocks(&self) -> CoreResult<Vec<(u32, Vec<(u32, &str)>)>> {
        let section = self.textified_callee_data();
        let mut r = ByteReader::new(section);
        let mut blocks = Vec::new();
        while r.remaining() > 0 {
            let offset = r.offset() as u32;
            let count = leb128::read_unsigned(&mut r)?;
            let mut entries = Vec::new();
            let mut address = 0u32;
            for _ in 0..count {
                let delta = leb128::read_unsigned(&mut r)? as u32;
                let string_off = leb128::read_unsigned(&mut r)? as u32;
                address += delta;
                entries.push((address, self.decode_string(string_off)?));
            }
            blocks.push((offset, entries));
        }
        Ok(blocks)
    }

    /// Balayage séquentiel de la table de chaînes (outillage).
    pub(crate) fn string_table_entries(&self) -> CoreResult<Vec<(u32, &str)>> {
        let section = self.string_table_data();
        let mut r = ByteReader::new(section);
        let mut entries = Vec::new();
        while r.remaining() > 0 {
            let offset = r.offset() as u32;
            let len = leb128::read_unsigned(&mut r)? as usize;
            let bytes = r.read_bytes(len)?;
            entries.push((offset, core::str::from_utf8(bytes).map_err(|_| CoreError::InvalidUtf8)?));
        }
        Ok(entries)
    }

    /* ───────────────────── (Dé)sérialisation ───────────────────── */

    /// Encode le conteneur en un blob versionné avec trailer CRC32.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_bytes(MAGIC);
        w.write_u16_le(VERSION);
        w.write_u8(self.flags.bits());
        w.write_u8(0); // réservé

        w.write_u32_le(self.lexical_data_offset);
        w.write_u32_le(self.textified_callee_offset);
        w.write_u32_le(self.string_table_offset);

        w.write_u32_le(self.filename_table.len() as u32);
        for &offset in &self.filename_table {
            w.write_u32_le(offset);
        }
        w.write_u32_le(self.filename_storage.len() as u32);
        w.write_bytes(&self.filename_storage);

        w.write_u32_le(self.files.len() as u32);
        for region in &self.files {
            w.write_u32_le(region.from_address);
            w.write_u32_le(region.filename_id);
            w.write_u32_le(region.source_mapping_url_id);
        }

        w.write_u32_le(self.data.len() as u32);
        w.write_bytes(&self.data);

        let crc = crc32_ieee(w.as_slice());
        let mut out = w.into_vec();
        out.extend_from_slice(&crc.to_le_bytes());
        out
    }

    /// Décode un blob produit par [`DebugInfo::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let payload_len = bytes
            .len()
            .checked_sub(4)
            .ok_or(CoreError::corrupted("blob too short"))?;
        let (payload, crc_bytes) = bytes.split_at(payload_len);
        let found = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        let expected = crc32_ieee(payload);
        if expected != found {
            return Err(CoreError::CrcMismatch { expected, found });
        }

        let mut r = ByteReader::new(payload);
        if r.read_bytes(MAGIC.len())? != MAGIC {
            return Err(CoreError::InvalidMagic);
        }
        let version = r.read_u16_le()?;
        if version != VERSION {
            return Err(CoreError::UnsupportedVersion { found: version });
        }
        let flags = DebugInfoFlags::from_bits(r.read_u8()?)
            .ok_or(CoreError::corrupted("unknown debug info flags"))?;
        let _reserved = r.read_u8()?;

        let lexical_data_offset = r.read_u32_le()?;
        let textified_callee_offset = r.read_u32_le()?;
        let string_table_offset = r.read_u32_le()?;

        let filename_count = r.read_u32_le()? as usize;
        let mut filename_table = Vec::with_capacity(filename_count);
        for _ in 0..filename_count {
            filename_table.push(r.read_u32_le()?);
        }
        let storage_len = r.read_u32_le()? as usize;
        let filename_storage = r.read_bytes(storage_len)?.to_vec();

        let region_count = r.read_u32_le()? as usize;
        let mut files = SmallVec::with_capacity(region_count);
        for _ in 0..region_count {
            files.push(DebugFileRegion {
                from_address: r.read_u32_le()?,
                filename_id: r.read_u32_le()?,
                source_mapping_url_id: r.read_u32_le()?,
            });
        }

        let data_len = r.read_u32_le()? as usize;
        let data = r.read_bytes(data_len)?.to_vec();

        if r.remaining() != 0 {
            return Err(CoreError::corrupted("trailing bytes"));
        }
        if !(lexical_data_offset <= textified_callee_offset
            && textified_callee_offset <= string_table_offset
            && string_table_offset as usize <= data.len())
        {
            return Err(CoreError::corrupted("inconsistent section offsets"));
        }
        for &offset in &filename_table {
            if offset as usize >= filename_storage.len() && !filename_storage.is_empty() {
                return Err(CoreError::corrupted("filename offset out of storage"));
            }
        }

        #[cfg(feature = "trace")]
        log::trace!("debug info decoded: {} files, {} regions, {} data bytes", filename_count, region_count, data_len);

        Ok(Self {
            filename_table,
            filename_storage,
            files,
            flags,
            lexical_data_offset,
            textified_callee_offset,
            string_table_offset,
            data,
        })
    }
}

/* ───────────────────── Décodage des blocs ───────────────────── */

fn read_first_entry(r: &mut ByteReader<'_>) -> CoreResult<DebugSourceLocation> {
    let address = leb128::read_unsigned(r)? as u32;
    let filename_id = leb128::read_unsigned(r)? as u32;
    let url_plus_one = leb128::read_unsigned(r)? as u32;
    let line = leb128::read_unsigned(r)? as u32;
    let column = leb128::read_unsigned(r)? as u32;
    let statement = leb128::read_unsigned(r)? as u32;
    Ok(DebugSourceLocation {
        address,
        filename_id,
        source_mapping_url_id: url_plus_one.wrapping_sub(1),
        line,
        column,
        statement,
    })
}

fn read_delta_entry(
    r: &mut ByteReader<'_>,
    previous: &DebugSourceLocation,
) -> CoreResult<DebugSourceLocation> {
    fn apply(base: u32, delta: i64) -> u32 { (i64::from(base) + delta) as u32 }

    let d_address = leb128::read_signed(r)?;
    let d_filename = leb128::read_signed(r)?;
    let d_line = leb128::read_signed(r)?;
    let d_column = leb128::read_signed(r)?;
    let d_statement = leb128::read_signed(r)?;
    Ok(DebugSourceLocation {
        address: apply(previous.address, d_address),
        filename_id: apply(previous.filename_id, d_filename),
        source_mapping_url_id: previous.source_mapping_url_id,
        line: apply(previous.line, d_line),
        column: apply(previous.column, d_column),
        statement: apply(previous.statement, d_statement),
    })
}

fn read_function_block(r: &mut ByteReader<'_>) -> CoreResult<FunctionLocations> {
    let block_offset = r.offset() as u32;
    let count = leb128::read_unsigned(r)?;
    let function_index = leb128::read_unsigned(r)? as u32;
    let mut entries = Vec::with_capacity(count as usize);
    if count > 0 {
        let mut current = read_first_entry(r)?;
        entries.push(current);
        for _ in 1..count {
            current = read_delta_entry(r, &current)?;
            entries.push(current);
        }
    }
    Ok(FunctionLocations { block_offset, function_index, entries })
}

/* ─────────────────────────── Tests ─────────────────────────── */
