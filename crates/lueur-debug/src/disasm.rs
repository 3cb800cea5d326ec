//! Désassemblage textuel des sections de debug, pour l'outillage CLI.

use core::fmt::Write;

use crate::info::DebugInfo;
use crate::types::DebugSourceLocation;

/// Produit le dump lisible des cinq parties du conteneur : fichiers,
/// régions, localisations, données lexicales, callees textifiés et table de
/// chaînes.
pub fn disassemble(info: &DebugInfo) -> String {
    let mut out = String::new();
    disassemble_filenames(info, &mut out);
    disassemble_files_and_offsets(info, &mut out);
    disassemble_source_locations(info, &mut out);
    disassemble_lexical_data(info, &mut out);
    disassemble_textified_callees(info, &mut out);
    disassemble_string_table(info, &mut out);
    out
}

fn disassemble_filenames(info: &DebugInfo, out: &mut String) {
    let _ = writeln!(out, ";; debug filenames");
    for id in 0..info.filename_count() as u32 {
        let _ = writeln!(out, "filename[{id}] = {}", info.get_filename_by_id(id));
    }
}

fn disassemble_files_and_offsets(info: &DebugInfo, out: &mut String) {
    let _ = writeln!(out);
    let _ = writeln!(out, ";; debug file regions");
    for region in info.files() {
        let url = if region.source_mapping_url_id == DebugSourceLocation::NO_SOURCE_MAPPING_URL {
            "none".to_owned()
        } else {
            format!("{}", region.source_mapping_url_id)
        };
        let _ = writeln!(
            out,
            "region @{:#06x} file={} sourceMappingUrl={url}",
            region.from_address, region.filename_id
        );
    }
}

fn disassemble_source_locations(info: &DebugInfo, out: &mut String) {
    let _ = writeln!(out);
    let _ = writeln!(out, ";; debug source locations");
    let blocks = info.function_blocks().expect("corrupt debug info data");
    for block in &blocks {
        let _ = writeln!(out, "function[{}] @{:#06x}:", block.function_index, block.block_offset);
        for entry in &block.entries {
            let _ = writeln!(
                out,
                "  {:#06x} | file {} | line {:4} col {:3} stmt {}",
                entry.address, entry.filename_id, entry.line, entry.column, entry.statement
            );
        }
    }
}

fn disassemble_lexical_data(info: &DebugInfo, out: &mut String) {
    let _ = writeln!(out);
    let _ = writeln!(out, ";; debug lexical data");
    let blocks = info.lexical_blocks().expect("corrupt debug info data");
    for (offset, parent, names) in &blocks {
        let parent = parent.map_or("none".to_owned(), |p| format!("{p}"));
        let _ = writeln!(out, "lexical @{offset:#06x} parent={parent} vars={:?}", names.as_slice());
    }
}

fn disassemble_textified_callees(info: &DebugInfo, out: &mut String) {
    let _ = writeln!(out);
    let _ = writeln!(out, ";; debug textified callees");
    let blocks = info.textified_callee_blocks().expect("corrupt debug info data");
    for (offset, entries) in &blocks {
        let _ = writeln!(out, "callees @{offset:#06x}:");
        for (address, name) in entries {
            let _ = writeln!(out, "  {address:#06x} -> {name}");
        }
    }
}

fn disassemble_string_table(info: &DebugInfo, out: &mut String) {
    let _ = writeln!(out);
    let _ = writeln!(out, ";; debug string table");
    let entries = info.string_table_entries().expect("corrupt debug info data");
    for (offset, s) in &entries {
        let _ = writeln!(out, "string @{offset:#06x} = \"{s}\"");
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
