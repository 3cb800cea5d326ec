//! Flux complet côté compilation : génération des infos de debug d'un
//! module multi-fichiers, sérialisation, rechargement, puis les requêtes
//! qu'un débogueur et un générateur de source map poseraient.

use lueur_core::UniquingFilenameTable;
use lueur_debug::{
    DebugInfo, DebugInfoGenerator, DebugOffsets, DebugSourceLocation, DebugTextifiedCallee,
    SourceMapSink,
};
use pretty_assertions::assert_eq;

/// Module jouet : deux fichiers, trois fonctions, variables locales et un
/// appel indirect. Retourne le conteneur et les offsets par fonction.
fn compile_module() -> (DebugInfo, Vec<DebugOffsets>) {
    let mut filenames = UniquingFilenameTable::new();
    let main_file = filenames.intern("main.lueur");
    let lib_file = filenames.intern("lib.lueur");
    let mut gen = DebugInfoGenerator::new(filenames);

    let mut offsets = Vec::new();

    // fonction 0 : enveloppe module (main.lueur)
    let start = DebugSourceLocation::new(0, main_file, 1, 1, 0);
    let rest = [
        DebugSourceLocation::new(6, main_file, 2, 1, 1),
        DebugSourceLocation::new(14, main_file, 3, 1, 2),
    ];
    offsets.push(DebugOffsets::new(
        gen.append_source_locations(&start, 0, &rest),
        gen.append_lexical_data(None, &[]),
        gen.append_textified_callee_data(&[]),
    ));

    // fonction 1 : compute (main.lueur), deux locales, parent = 0
    let start = DebugSourceLocation::new(0, main_file, 5, 1, 0);
    let rest = [
        DebugSourceLocation::new(8, main_file, 6, 5, 1),
        DebugSourceLocation::new(20, main_file, 7, 9, 2),
        DebugSourceLocation::new(30, main_file, 6, 5, 3),
    ];
    let src = gen.append_source_locations(&start, 1, &rest);
    let acc = gen.intern_string("acc");
    let step = gen.intern_string("step");
    let lex = gen.append_lexical_data(Some(0), &[acc, step]);
    let handler = gen.intern_string("handlers.on_tick");
    let callees = gen.append_textified_callee_data(&[
        DebugTextifiedCallee { address: 20, textified_callee: handler },
    ]);
    offsets.push(DebugOffsets::new(src, lex, callees));

    // fonction 2 : helper (lib.lueur), une locale, parent = 1
    let start = DebugSourceLocation::new(0, lib_file, 1, 1, 0);
    let rest = [DebugSourceLocation::new(4, lib_file, 2, 3, 1)];
    let src = gen.append_source_locations(&start, 2, &rest);
    let acc2 = gen.intern_string("acc");
    let lex = gen.append_lexical_data(Some(1), &[acc2]);
    offsets.push(DebugOffsets::new(src, lex, gen.append_textified_callee_data(&[])));

    (gen.serialize_with_move(), offsets)
}

#[test]
fn reload_then_debugger_queries() {
    let (info, offsets) = compile_module();

    // aller-retour par le format persisté du module
    let info = DebugInfo::from_bytes(&info.to_bytes()).unwrap();

    // pose d'un breakpoint : ligne 6 de main.lueur → fonction 1, adresse 8
    let hit = info.get_address_for_location(0, 6, None).unwrap();
    assert_eq!((hit.function_index, hit.bytecode_offset), (1, 8));

    // pas-à-pas : l'adresse 25 de la fonction 1 est encore sur la ligne 7
    let loc = info
        .get_location_for_address(offsets[1].source_locations, 25)
        .unwrap();
    assert_eq!((loc.line, loc.column, loc.statement), (7, 9, 2));

    // inspection des variables et de la chaîne lexicale
    assert_eq!(info.get_variable_names(offsets[1].lexical_data).as_slice(), ["acc", "step"]);
    assert_eq!(info.get_parent_function_id(offsets[1].lexical_data), Some(0));
    assert_eq!(info.get_parent_function_id(offsets[2].lexical_data), Some(1));
    assert_eq!(info.get_parent_function_id(offsets[0].lexical_data), None);

    // callee textifié de l'appel indirect
    assert_eq!(
        info.get_textified_callee_utf8(offsets[1].textified_callees, 20),
        Some("handlers.on_tick")
    );
    assert_eq!(info.get_textified_callee_utf8(offsets[0].textified_callees, 20), None);

    // « acc » est partagé entre les fonctions 1 et 2 : même table, une entrée
    let names_f1 = info.get_variable_names(offsets[1].lexical_data);
    let names_f2 = info.get_variable_names(offsets[2].lexical_data);
    assert_eq!(names_f1[0], names_f2[0]);
}

#[test]
fn lookups_by_file_are_region_scoped() {
    let (info, _) = compile_module();

    // la ligne 2 existe dans les deux fichiers ; chaque fichier résout chez lui
    let hit_main = info.get_address_for_location(0, 2, None).unwrap();
    assert_eq!(hit_main.function_index, 0);
    let hit_lib = info.get_address_for_location(1, 2, None).unwrap();
    assert_eq!(hit_lib.function_index, 2);
}

#[derive(Default)]
struct CollectingSourceMap {
    rows: Vec<(u32, u32, String, u32, u32)>,
}

impl SourceMapSink for CollectingSourceMap {
    fn add_mapping(&mut self, segment_id: u32, generated_offset: u32, filename: &str, line: u32, column: u32) {
        self.rows.push((segment_id, generated_offset, filename.to_owned(), line, column));
    }
}

#[test]
fn source_map_replay_covers_every_location() {
    let (info, _) = compile_module();

    let mut sink = CollectingSourceMap::default();
    info.populate_source_map(&mut sink, &[0, 40, 120], 0);

    // 3 + 4 + 2 entrées rejouées
    assert_eq!(sink.rows.len(), 9);
    // offsets absolus : fonction 1 démarre à 40
    assert!(sink.rows.contains(&(0, 48, "main.lueur".to_owned(), 6, 5)));
    // fonction 2 démarre à 120, dans lib.lueur
    assert!(sink.rows.contains(&(0, 124, "lib.lueur".to_owned(), 2, 3)));
    // les offsets générés sortent triés par fonction puis par adresse
    let offsets: Vec<u32> = sink.rows.iter().map(|r| r.1).collect();
    let mut sorted = offsets.clone();
    sorted.sort_unstable();
    assert_eq!(offsets, sorted);
}

#[test]
fn disassembly_names_every_section() {
    let (info, _) = compile_module();
    let dump = lueur_debug::disasm::disassemble(&info);

    assert!(dump.contains("filename[0] = main.lueur"));
    assert!(dump.contains("filename[1] = lib.lueur"));
    assert!(dump.contains("function[1]"));
    assert!(dump.contains("handlers.on_tick"));
    assert!(dump.contains("vars=[\"acc\", \"step\"]"));
}
