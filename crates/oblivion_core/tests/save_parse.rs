mod support;

use std::io::{Cursor, ErrorKind};

use oblivion_core::layout::SectionId;
use oblivion_core::records::change::{BOOK_TEACHES, CREA_FULL_NAME, ITEM_VALUE};
use oblivion_core::records::types::{BOOK, CELL, CREA, KEYM};
use oblivion_core::records::{ChangeRecordData, DecodeStatus, FieldData, Text};
use oblivion_core::save::{Document, QuickKey, SaveGame};
use support::{SaveBuilder, chunk, u32s};

fn parse(bytes: Vec<u8>) -> SaveGame {
    SaveGame::parse(Cursor::new(bytes)).unwrap_or_else(|e| panic!("failed to parse save: {e}"))
}

fn sample() -> SaveBuilder {
    let mut spell = chunk(b"FULL", b"Fire Touch\0");
    spell.extend(chunk(b"SPIT", &u32s(&[0, 45, 2, 0])));
    spell.extend(chunk(b"EFID", b"FIDG"));

    SaveBuilder::new()
        .plugin("Knights.esp")
        .created(b"SPEL", 0xFF00_0801, &spell)
        .change(0x0000_1001, BOOK, BOOK_TEACHES, &[255])
        .change(0x0000_1002, KEYM, ITEM_VALUE, &25u32.to_le_bytes())
        .change(0x0000_1003, CREA, CREA_FULL_NAME, b"Rat\0")
        .change(0x0000_1004, CELL, 0x1, &[1, 2, 3])
        .change(0x0000_1005, BOOK, BOOK_TEACHES, &[4])
}

#[test]
fn reads_header_fields() {
    let save = parse(sample().build());
    assert_eq!(save.file_header.version(), "0.125");
    assert_eq!(save.header.player_name, "Hero");
    assert_eq!(save.header.player_level, 12);
    assert_eq!(save.header.player_cell, "Imperial City Market District");
    assert_eq!(save.header.save_number, 7);
    assert_eq!(save.header.game_time.year, 2024);
    assert_eq!(save.header.screenshot.width, 2);
    assert_eq!(save.header.screenshot.pixels.len(), 6);
    assert_eq!(save.plugins, vec!["Oblivion.esm", "Knights.esp"]);
}

#[test]
fn reads_globals_block() {
    let save = parse(sample().build());
    let globals = &save.globals;
    assert_eq!(globals.change_record_count, 5);
    assert_eq!(globals.player_location.cell, 0x0001_A2B3);
    assert_eq!(globals.player_location.y, -512.5);
    assert_eq!(globals.global_vars.len(), 1);
    assert_eq!(globals.death_counts[0].count, 4);
    assert_eq!(globals.weather, vec![3, 4, 5]);
    assert_eq!(
        globals.quick_keys,
        vec![QuickKey::Empty, QuickKey::Bound(0xFF00_0001)]
    );
    assert_eq!(globals.regions.len(), 1);
}

#[test]
fn created_records_are_decoded() {
    let save = parse(sample().build());
    let spell = &save.globals.created_records[0];
    assert_eq!(spell.type_name(), "SPEL");
    assert_eq!(spell.status, DecodeStatus::Complete);
    assert_eq!(spell.full_name().and_then(Text::as_str), Some("Fire Touch"));
    let Some(FieldData::SpellInfo(info)) = spell.field(b"SPIT").map(|f| &f.value) else {
        panic!("expected SPIT");
    };
    assert_eq!(info.spell_cost, 45);
    assert_eq!(
        spell.field(b"EFID").map(|f| &f.value),
        Some(&FieldData::EffectId(u32::from_le_bytes(*b"FIDG")))
    );
}

#[test]
fn change_records_keep_file_order() {
    let save = parse(sample().build());
    let ids: Vec<u32> = save.change_records.iter().map(|r| r.form_id).collect();
    assert_eq!(ids, vec![0x1001, 0x1002, 0x1003, 0x1004, 0x1005]);

    let ChangeRecordData::Creature(rat) = &save.change_records[2].data else {
        panic!("expected creature");
    };
    assert_eq!(rat.full_name, Some(Text::Utf8("Rat".to_string())));
    assert_eq!(save.change_records[3].status, DecodeStatus::Unrecognized);
    assert_eq!(save.form_ids, vec![0x14, 0x0001_2345]);
    assert_eq!(save.world_spaces, vec![0x3C]);
}

#[test]
fn counts_records_by_type() {
    let save = parse(sample().build());
    assert_eq!(
        save.change_record_counts(),
        vec![(BOOK, 2), (CREA, 1), (KEYM, 1), (CELL, 1)]
    );
    assert_eq!(save.partial_record_count(), 0);
    assert_eq!(save.find_change_record(0x1002).map(|r| r.type_code), Some(KEYM));
    assert!(save.find_change_record(0x9999).is_none());
}

#[test]
fn partial_records_do_not_stop_the_scan() {
    let bytes = SaveBuilder::new()
        .change(1, KEYM, ITEM_VALUE, &[1, 2])
        .change(2, KEYM, ITEM_VALUE, &9u32.to_le_bytes())
        .build();
    let save = parse(bytes);
    assert_eq!(save.change_records[0].status, DecodeStatus::Partial);
    assert_eq!(save.change_records[1].status, DecodeStatus::Complete);
    assert_eq!(save.partial_record_count(), 1);
}

#[test]
fn layout_covers_every_section() {
    let mut builder = sample();
    builder.tail = vec![0xAA; 5];
    let bytes = builder.build();
    let doc = Document::parse_with_layout(Cursor::new(bytes.clone())).unwrap();
    let layout = doc.layout();

    let ids: Vec<SectionId> = layout.sections.iter().map(|s| s.id).collect();
    assert_eq!(
        ids,
        vec![
            SectionId::FileHeader,
            SectionId::SaveHeader,
            SectionId::Plugins,
            SectionId::Globals,
            SectionId::ChangeRecords,
            SectionId::TemporaryEffects,
            SectionId::FormIds,
            SectionId::WorldSpaces,
            SectionId::Tail,
        ]
    );
    assert_eq!(layout.file_len, bytes.len());
    assert_eq!(layout.section(SectionId::FileHeader).unwrap().range.len(), 30);
    assert_eq!(layout.section(SectionId::Tail).unwrap().range.len(), 5);
    assert_eq!(
        layout.section(SectionId::FormIds).unwrap().range.start,
        doc.save.globals.form_ids_offset as usize
    );
}

#[test]
fn wrong_form_id_offset_is_tolerated() {
    let mut builder = sample();
    builder.skew_form_ids_offset = true;
    let save = parse(builder.build());
    assert_eq!(save.form_ids.len(), 2);
}

#[test]
fn rejects_bad_magic() {
    let mut bytes = sample().build();
    bytes[0] = b'X';
    let err = SaveGame::parse(Cursor::new(bytes)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[test]
fn truncated_file_is_an_error() {
    let bytes = sample().build();
    for cut in [10, 40, bytes.len() / 2, bytes.len() - 1] {
        let err = SaveGame::parse(Cursor::new(bytes[..cut].to_vec())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof, "cut at {cut}");
    }
}
