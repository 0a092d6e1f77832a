use log::{debug, warn};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::payload::{PayloadReader, Truncated};
use super::types::{
    ACRE, ATTRIBUTE_COUNT, ATTRIBUTE_NAMES, BOOK, CREA, FACT, INFO, KEYM, PACK, QUST,
    SKILL_COUNT, SKILL_NAMES, WEAP, actor_value_name, change_record_type_name,
};
use super::{DecodeIssue, DecodeStatus, Text, serialize_hex, serialize_opt_hex};

// Flag bits. They are local to a record type: the same bit means different
// things for different types.
pub const FACT_FLAGS: u32 = 0x0000_0004;
pub const FACT_REACTIONS: u32 = 0x0000_0008;

pub const ITEM_FORM_FLAGS: u32 = 0x0000_0001;
pub const BOOK_TEACHES: u32 = 0x0000_0004;
pub const ITEM_VALUE: u32 = 0x0000_0008;

pub const CREA_FORM_FLAGS: u32 = 0x0000_0001;
pub const CREA_BASE_HEALTH: u32 = 0x0000_0004;
pub const CREA_BASE_ATTRIBUTES: u32 = 0x0000_0008;
pub const CREA_BASE_DATA: u32 = 0x0000_0010;
pub const CREA_SPELL_LIST: u32 = 0x0000_0020;
pub const CREA_FACTIONS: u32 = 0x0000_0040;
pub const CREA_FULL_NAME: u32 = 0x0000_0080;
pub const CREA_AI_DATA: u32 = 0x0000_0100;
pub const CREA_SKILLS: u32 = 0x0000_0200;
pub const CREA_COMBAT_STYLE: u32 = 0x0000_0400;
pub const CREA_BASE_MODIFIERS: u32 = 0x1000_0000;

pub const ACRE_FORM_FLAGS: u32 = 0x0000_0001;
pub const ACRE_CREATED: u32 = 0x0000_0002;
pub const ACRE_MOVED: u32 = 0x0000_0004;
pub const ACRE_HAVOK_MOVED: u32 = 0x0000_0008;
pub const ACRE_OBLIVION_FLAG: u32 = 0x0080_0000;
pub const ACRE_CELL_CHANGED: u32 = 0x8000_0000;

pub const INFO_TOPIC_ONCE_SAID: u32 = 0x1000_0000;
pub const PACK_NEVER_RUN: u32 = 0x1000_0000;

pub const QUST_FLAGS: u32 = 0x0000_0004;
pub const QUST_SCRIPT: u32 = 0x0800_0000;
pub const QUST_STAGES: u32 = 0x1000_0000;

pub const BOOK_TEACHES_NOTHING: u8 = 255;

const ALWAYS: u32 = 0;
const SKILLS_WIDTH: usize = SKILL_COUNT;
const COMBAT_STYLE_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChangeRecord {
    pub form_id: u32,
    pub type_code: u8,
    pub flags: u32,
    pub version: u8,
    pub payload: Vec<u8>,
}

impl RawChangeRecord {
    pub fn decode(&self) -> ChangeRecord {
        decode_change_record(
            self.form_id,
            self.type_code,
            self.flags,
            self.version,
            &self.payload,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    pub form_id: u32,
    pub type_code: u8,
    pub flags: u32,
    pub version: u8,
    pub status: DecodeStatus,
    /// Payload bytes the decoder consumed; never more than the payload length.
    pub consumed: usize,
    pub issues: Vec<DecodeIssue>,
    pub data: ChangeRecordData,
}

impl ChangeRecord {
    pub fn type_name(&self) -> Option<&'static str> {
        change_record_type_name(self.type_code)
    }

    pub fn is_partial(&self) -> bool {
        self.status == DecodeStatus::Partial
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChangeRecordData {
    Faction(FactionChange),
    Book(BookChange),
    Key(ItemChange),
    Weapon(ItemChange),
    Creature(Box<CreatureChange>),
    PlacedCreature(PlacedCreatureChange),
    DialogInfo(DialogInfoChange),
    Package(PackageChange),
    Quest(QuestChange),
    Unrecognized(#[serde(serialize_with = "serialize_hex")] Vec<u8>),
}

/// A count-prefixed list. `entries` is shorter than `declared` only when the
/// payload ended early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountedList<T> {
    pub declared: usize,
    pub entries: Vec<T>,
}

impl<T> CountedList<T> {
    fn new(declared: usize) -> Self {
        Self {
            declared,
            entries: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.entries.len() == self.declared
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

// --- FACT ---

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FactionChange {
    pub reactions: Option<CountedList<FactionReaction>>,
    pub flags: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FactionReaction {
    pub faction: u32,
    pub reaction: i32,
}

// --- BOOK / KEYM / WEAP ---

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BookChange {
    pub form_flags: Option<u32>,
    pub value: Option<u32>,
    pub teaches: Option<u8>,
}

impl BookChange {
    /// The book can be read but no longer raises a skill.
    pub fn teaches_nothing(&self) -> bool {
        self.teaches == Some(BOOK_TEACHES_NOTHING)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ItemChange {
    pub form_flags: Option<u32>,
    pub value: Option<u32>,
}

// --- CREA ---

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CreatureChange {
    pub form_flags: Option<u32>,
    pub base_attributes: Option<Attributes>,
    pub base_data: Option<BaseData>,
    pub factions: Option<CountedList<FactionRank>>,
    pub ai_data: Option<u32>,
    pub spell_list: Option<CountedList<u32>>,
    pub base_health: Option<u32>,
    pub base_modifiers: Option<CountedList<BaseModifier>>,
    pub full_name: Option<Text>,
    pub skills: Option<Skills>,
    pub combat_style: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Attributes {
    pub strength: u8,
    pub intelligence: u8,
    pub willpower: u8,
    pub agility: u8,
    pub speed: u8,
    pub endurance: u8,
    pub personality: u8,
    pub luck: u8,
}

impl Attributes {
    fn from_bytes(b: [u8; ATTRIBUTE_COUNT]) -> Self {
        Self {
            strength: b[0],
            intelligence: b[1],
            willpower: b[2],
            agility: b[3],
            speed: b[4],
            endurance: b[5],
            personality: b[6],
            luck: b[7],
        }
    }

    /// Values paired with their names, in [`ATTRIBUTE_NAMES`] order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u8)> {
        let values = [
            self.strength,
            self.intelligence,
            self.willpower,
            self.agility,
            self.speed,
            self.endurance,
            self.personality,
            self.luck,
        ];
        ATTRIBUTE_NAMES.iter().copied().zip(values)
    }

    pub fn get(&self, name: &str) -> Option<u8> {
        self.iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BaseData {
    pub flags: u32,
    pub base_magicka: u16,
    pub base_fatigue: u16,
    pub barter_gold: u16,
    pub level: u16,
    pub calc_min: u16,
    pub calc_max: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FactionRank {
    pub faction: u32,
    pub rank: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaseModifier {
    pub actor_value: u8,
    pub modifier: f32,
}

impl BaseModifier {
    pub fn actor_value_name(&self) -> Option<&'static str> {
        actor_value_name(self.actor_value as u32)
    }
}

/// The 21 skill values, in [`SKILL_NAMES`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skills(pub [u8; SKILL_COUNT]);

impl Skills {
    pub fn get(&self, name: &str) -> Option<u8> {
        SKILL_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|i| self.0[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u8)> + '_ {
        SKILL_NAMES.iter().copied().zip(self.0.iter().copied())
    }
}

impl Serialize for Skills {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SKILL_COUNT))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

// --- ACRE ---

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlacedCreatureChange {
    pub cell_changed: Option<CellChange>,
    pub created: Option<CreatedPlacement>,
    pub moved: Option<Placement>,
    pub havok_moved: Option<Placement>,
    pub oblivion_flag: Option<u32>,
    /// Always stored; `None` only when the payload ended before it.
    pub actor_flag: Option<u8>,
    pub form_flags: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellChange {
    pub cell: u32,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CreatedPlacement {
    pub flags: u32,
    pub base_item: u32,
    pub cell: u32,
    pub position: Vec3,
    pub rotation: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub cell: u32,
    pub position: Vec3,
    pub rotation: Vec3,
}

// --- INFO / PACK ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DialogInfoChange {
    pub topic_once_said: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PackageChange {
    pub never_run: bool,
}

// --- QUST ---

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct QuestChange {
    pub flags: Option<u8>,
    pub stages: Option<CountedList<QuestStage>>,
    /// Undocumented layout, kept as stored.
    #[serde(serialize_with = "serialize_opt_hex")]
    pub script: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuestStage {
    pub index: u8,
    pub flag: u8,
    pub entry_num: u8,
    pub entry_count: u8,
    pub completion_day: u16,
    pub completion_year: u16,
}

// ---------------------------------------------------------------------------
// Layout tables
// ---------------------------------------------------------------------------

type FieldDecoder<T> = fn(&mut PayloadReader<'_>, u32, &mut T) -> Result<(), Truncated>;

/// One optional field of a change record: decoded when `mask` is set in the
/// record flags (or always, for `ALWAYS`) and no bit of `excluded_by` is set.
struct FieldStep<T> {
    mask: u32,
    excluded_by: u32,
    name: &'static str,
    decode: FieldDecoder<T>,
}

impl<T> FieldStep<T> {
    const fn gated(mask: u32, name: &'static str, decode: FieldDecoder<T>) -> Self {
        Self {
            mask,
            excluded_by: 0,
            name,
            decode,
        }
    }

    const fn excluding(mut self, bits: u32) -> Self {
        self.excluded_by = bits;
        self
    }
}

const FACTION_LAYOUT: &[FieldStep<FactionChange>] = &[
    FieldStep::gated(FACT_REACTIONS, "reactions", faction_reactions),
    FieldStep::gated(FACT_FLAGS, "flags", faction_flags),
];

const BOOK_LAYOUT: &[FieldStep<BookChange>] = &[
    FieldStep::gated(ITEM_FORM_FLAGS, "form_flags", book_form_flags),
    FieldStep::gated(ITEM_VALUE, "value", book_value),
    FieldStep::gated(BOOK_TEACHES, "teaches", book_teaches),
];

const ITEM_LAYOUT: &[FieldStep<ItemChange>] = &[
    FieldStep::gated(ITEM_FORM_FLAGS, "form_flags", item_form_flags),
    FieldStep::gated(ITEM_VALUE, "value", item_value),
];

const CREATURE_LAYOUT: &[FieldStep<CreatureChange>] = &[
    FieldStep::gated(CREA_FORM_FLAGS, "form_flags", creature_form_flags),
    FieldStep::gated(
        CREA_BASE_ATTRIBUTES,
        "base_attributes",
        creature_base_attributes,
    ),
    FieldStep::gated(CREA_BASE_DATA, "base_data", creature_base_data),
    FieldStep::gated(CREA_FACTIONS, "factions", creature_factions),
    FieldStep::gated(CREA_AI_DATA, "ai_data", creature_ai_data),
    FieldStep::gated(CREA_SPELL_LIST, "spell_list", creature_spell_list),
    FieldStep::gated(CREA_BASE_HEALTH, "base_health", creature_base_health),
    FieldStep::gated(
        CREA_BASE_MODIFIERS,
        "base_modifiers",
        creature_base_modifiers,
    ),
    FieldStep::gated(CREA_FULL_NAME, "full_name", creature_full_name),
    FieldStep::gated(CREA_SKILLS, "skills", creature_skills),
    FieldStep::gated(CREA_COMBAT_STYLE, "combat_style", creature_combat_style),
];

const PLACED_CREATURE_LAYOUT: &[FieldStep<PlacedCreatureChange>] = &[
    FieldStep::gated(
        ACRE_CELL_CHANGED,
        "cell_changed",
        placed_creature_cell_changed,
    ),
    FieldStep::gated(ACRE_CREATED, "created", placed_creature_created),
    FieldStep::gated(ACRE_MOVED, "moved", placed_creature_moved),
    FieldStep::gated(ACRE_HAVOK_MOVED, "havok_moved", placed_creature_havok_moved)
        .excluding(ACRE_CREATED | ACRE_MOVED),
    FieldStep::gated(
        ACRE_OBLIVION_FLAG,
        "oblivion_flag",
        placed_creature_oblivion_flag,
    ),
    FieldStep::gated(ALWAYS, "actor_flag", placed_creature_actor_flag),
    FieldStep::gated(ACRE_FORM_FLAGS, "form_flags", placed_creature_form_flags),
];

const QUEST_LAYOUT: &[FieldStep<QuestChange>] = &[
    FieldStep::gated(QUST_FLAGS, "flags", quest_flags),
    FieldStep::gated(QUST_STAGES, "stages", quest_stages),
    FieldStep::gated(QUST_SCRIPT, "script", quest_script),
];

// --- FACT fields ---

fn faction_reactions(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    f: &mut FactionChange,
) -> Result<(), Truncated> {
    let count = r.read_u16()? as usize;
    let list = f.reactions.insert(CountedList::new(count));
    for _ in 0..count {
        let mut entry = PayloadReader::new(r.take(8)?);
        list.entries.push(FactionReaction {
            faction: entry.read_u32()?,
            reaction: entry.read_i32()?,
        });
    }
    Ok(())
}

fn faction_flags(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    f: &mut FactionChange,
) -> Result<(), Truncated> {
    f.flags = Some(r.read_u8()?);
    Ok(())
}

// --- BOOK / KEYM / WEAP fields ---

fn book_form_flags(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    b: &mut BookChange,
) -> Result<(), Truncated> {
    b.form_flags = Some(r.read_u32()?);
    Ok(())
}

fn book_value(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    b: &mut BookChange,
) -> Result<(), Truncated> {
    b.value = Some(r.read_u32()?);
    Ok(())
}

fn book_teaches(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    b: &mut BookChange,
) -> Result<(), Truncated> {
    b.teaches = Some(r.read_u8()?);
    Ok(())
}

fn item_form_flags(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    i: &mut ItemChange,
) -> Result<(), Truncated> {
    i.form_flags = Some(r.read_u32()?);
    Ok(())
}

fn item_value(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    i: &mut ItemChange,
) -> Result<(), Truncated> {
    i.value = Some(r.read_u32()?);
    Ok(())
}

// --- CREA fields ---

fn creature_form_flags(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    c: &mut CreatureChange,
) -> Result<(), Truncated> {
    c.form_flags = Some(r.read_u32()?);
    Ok(())
}

fn creature_base_attributes(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    c: &mut CreatureChange,
) -> Result<(), Truncated> {
    c.base_attributes = Some(Attributes::from_bytes(r.array()?));
    Ok(())
}

fn creature_base_data(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    c: &mut CreatureChange,
) -> Result<(), Truncated> {
    // Read as one block so a short payload leaves base_data unset.
    let mut block = PayloadReader::new(r.take(16)?);
    c.base_data = Some(BaseData {
        flags: block.read_u32()?,
        base_magicka: block.read_u16()?,
        base_fatigue: block.read_u16()?,
        barter_gold: block.read_u16()?,
        level: block.read_u16()?,
        calc_min: block.read_u16()?,
        calc_max: block.read_u16()?,
    });
    Ok(())
}

fn creature_factions(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    c: &mut CreatureChange,
) -> Result<(), Truncated> {
    let count = r.read_u16()? as usize;
    let list = c.factions.insert(CountedList::new(count));
    for _ in 0..count {
        let mut entry = PayloadReader::new(r.take(8)?);
        list.entries.push(FactionRank {
            faction: entry.read_u32()?,
            rank: entry.read_u32()?,
        });
    }
    Ok(())
}

fn creature_ai_data(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    c: &mut CreatureChange,
) -> Result<(), Truncated> {
    c.ai_data = Some(r.read_u32()?);
    Ok(())
}

fn creature_spell_list(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    c: &mut CreatureChange,
) -> Result<(), Truncated> {
    let count = r.read_u16()? as usize;
    let list = c.spell_list.insert(CountedList::new(count));
    for _ in 0..count {
        list.entries.push(r.read_u32()?);
    }
    Ok(())
}

fn creature_base_health(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    c: &mut CreatureChange,
) -> Result<(), Truncated> {
    c.base_health = Some(r.read_u32()?);
    Ok(())
}

fn creature_base_modifiers(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    c: &mut CreatureChange,
) -> Result<(), Truncated> {
    let count = r.read_u16()? as usize;
    let list = c.base_modifiers.insert(CountedList::new(count));
    for _ in 0..count {
        let mut entry = PayloadReader::new(r.take(5)?);
        list.entries.push(BaseModifier {
            actor_value: entry.read_u8()?,
            modifier: entry.read_f32()?,
        });
    }
    Ok(())
}

/// The name has no length prefix: it runs to the end of the payload, less
/// the fixed-width fields that follow it when their bits are set.
fn creature_full_name(
    r: &mut PayloadReader<'_>,
    flags: u32,
    c: &mut CreatureChange,
) -> Result<(), Truncated> {
    let mut reserved = 0;
    if flags & CREA_SKILLS != 0 {
        reserved += SKILLS_WIDTH;
    }
    if flags & CREA_COMBAT_STYLE != 0 {
        reserved += COMBAT_STYLE_WIDTH;
    }
    let len = r.remaining().saturating_sub(reserved);
    c.full_name = Some(Text::decode(r.take(len)?));
    Ok(())
}

fn creature_skills(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    c: &mut CreatureChange,
) -> Result<(), Truncated> {
    c.skills = Some(Skills(r.array()?));
    Ok(())
}

fn creature_combat_style(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    c: &mut CreatureChange,
) -> Result<(), Truncated> {
    c.combat_style = Some(r.read_u32()?);
    Ok(())
}

// --- ACRE fields ---

fn placed_creature_cell_changed(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    a: &mut PlacedCreatureChange,
) -> Result<(), Truncated> {
    let mut block = PayloadReader::new(r.take(16)?);
    a.cell_changed = Some(CellChange {
        cell: block.read_u32()?,
        position: read_vec3(&mut block)?,
    });
    Ok(())
}

fn placed_creature_created(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    a: &mut PlacedCreatureChange,
) -> Result<(), Truncated> {
    let mut block = PayloadReader::new(r.take(36)?);
    a.created = Some(CreatedPlacement {
        flags: block.read_u32()?,
        base_item: block.read_u32()?,
        cell: block.read_u32()?,
        position: read_vec3(&mut block)?,
        rotation: read_vec3(&mut block)?,
    });
    Ok(())
}

fn placed_creature_moved(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    a: &mut PlacedCreatureChange,
) -> Result<(), Truncated> {
    let mut block = PayloadReader::new(r.take(28)?);
    a.moved = Some(Placement {
        cell: block.read_u32()?,
        position: read_vec3(&mut block)?,
        rotation: read_vec3(&mut block)?,
    });
    Ok(())
}

// FIXME: this is 24 bytes because cell and x are read from the same four
// bytes (u32 then f32). Confirm against a known-good save before changing
// the width.
fn placed_creature_havok_moved(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    a: &mut PlacedCreatureChange,
) -> Result<(), Truncated> {
    let mut block = PayloadReader::new(r.take(24)?);
    let head: [u8; 4] = block.array()?;
    a.havok_moved = Some(Placement {
        cell: u32::from_le_bytes(head),
        position: Vec3 {
            x: f32::from_le_bytes(head),
            y: block.read_f32()?,
            z: block.read_f32()?,
        },
        rotation: read_vec3(&mut block)?,
    });
    Ok(())
}

fn placed_creature_oblivion_flag(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    a: &mut PlacedCreatureChange,
) -> Result<(), Truncated> {
    a.oblivion_flag = Some(r.read_u32()?);
    Ok(())
}

fn placed_creature_actor_flag(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    a: &mut PlacedCreatureChange,
) -> Result<(), Truncated> {
    a.actor_flag = Some(r.read_u8()?);
    Ok(())
}

fn placed_creature_form_flags(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    a: &mut PlacedCreatureChange,
) -> Result<(), Truncated> {
    a.form_flags = Some(r.read_u32()?);
    Ok(())
}

// --- QUST fields ---

fn quest_flags(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    q: &mut QuestChange,
) -> Result<(), Truncated> {
    q.flags = Some(r.read_u8()?);
    Ok(())
}

fn quest_stages(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    q: &mut QuestChange,
) -> Result<(), Truncated> {
    let count = r.read_u8()? as usize;
    let list = q.stages.insert(CountedList::new(count));
    for _ in 0..count {
        let mut entry = PayloadReader::new(r.take(8)?);
        list.entries.push(QuestStage {
            index: entry.read_u8()?,
            flag: entry.read_u8()?,
            entry_num: entry.read_u8()?,
            entry_count: entry.read_u8()?,
            completion_day: entry.read_u16()?,
            completion_year: entry.read_u16()?,
        });
    }
    Ok(())
}

fn quest_script(
    r: &mut PayloadReader<'_>,
    _flags: u32,
    q: &mut QuestChange,
) -> Result<(), Truncated> {
    q.script = Some(r.take_rest().to_vec());
    Ok(())
}

fn read_vec3(r: &mut PayloadReader<'_>) -> Result<Vec3, Truncated> {
    Ok(Vec3 {
        x: r.read_f32()?,
        y: r.read_f32()?,
        z: r.read_f32()?,
    })
}

/// Fold over `steps` in order, decoding each field whose bit is set. Stops at
/// the first field the payload is too short for.
fn decode_layout<T: Default>(
    steps: &[FieldStep<T>],
    flags: u32,
    r: &mut PayloadReader<'_>,
    issues: &mut Vec<DecodeIssue>,
) -> T {
    let mut out = T::default();
    for step in steps {
        if step.mask != ALWAYS && flags & step.mask == 0 {
            continue;
        }
        if flags & step.excluded_by != 0 {
            issues.push(DecodeIssue::ConflictingFlags {
                flags,
                ignored: step.mask,
            });
            continue;
        }
        if let Err(t) = (step.decode)(r, flags, &mut out) {
            issues.push(DecodeIssue::TruncatedPayload {
                field: step.name,
                offset: t.offset,
                needed: t.needed,
                available: t.available,
            });
            break;
        }
    }
    out
}

/// Decode one change record payload according to its type code and flags.
///
/// Never fails: unknown types keep their payload verbatim, and a payload that
/// is too short yields a `Partial` record holding the fields read so far.
pub fn decode_change_record(
    form_id: u32,
    type_code: u8,
    flags: u32,
    version: u8,
    payload: &[u8],
) -> ChangeRecord {
    let mut r = PayloadReader::new(payload);
    let mut issues = Vec::new();

    let data = match type_code {
        FACT => {
            ChangeRecordData::Faction(decode_layout(FACTION_LAYOUT, flags, &mut r, &mut issues))
        }
        BOOK => ChangeRecordData::Book(decode_layout(BOOK_LAYOUT, flags, &mut r, &mut issues)),
        KEYM => ChangeRecordData::Key(decode_layout(ITEM_LAYOUT, flags, &mut r, &mut issues)),
        WEAP => {
            ChangeRecordData::Weapon(decode_layout(ITEM_LAYOUT, flags, &mut r, &mut issues))
        }
        CREA => {
            let creature: CreatureChange =
                decode_layout(CREATURE_LAYOUT, flags, &mut r, &mut issues);
            if creature.full_name.as_ref().is_some_and(|n| !n.is_valid()) {
                issues.push(DecodeIssue::InvalidString { field: "full_name" });
            }
            ChangeRecordData::Creature(Box::new(creature))
        }
        ACRE => ChangeRecordData::PlacedCreature(decode_layout(
            PLACED_CREATURE_LAYOUT,
            flags,
            &mut r,
            &mut issues,
        )),
        INFO => ChangeRecordData::DialogInfo(DialogInfoChange {
            topic_once_said: flags & INFO_TOPIC_ONCE_SAID != 0,
        }),
        PACK => ChangeRecordData::Package(PackageChange {
            never_run: flags & PACK_NEVER_RUN != 0,
        }),
        QUST => {
            ChangeRecordData::Quest(decode_layout(QUEST_LAYOUT, flags, &mut r, &mut issues))
        }
        _ => {
            debug!(
                "change record {form_id:08x}: type {type_code} ({}) kept as {} raw bytes",
                change_record_type_name(type_code).unwrap_or("unknown"),
                payload.len()
            );
            return ChangeRecord {
                form_id,
                type_code,
                flags,
                version,
                status: DecodeStatus::Unrecognized,
                consumed: 0,
                issues: vec![DecodeIssue::UnknownRecordType { code: type_code }],
                data: ChangeRecordData::Unrecognized(payload.to_vec()),
            };
        }
    };

    let status = DecodeStatus::from_issues(&issues);
    if status == DecodeStatus::Partial {
        for issue in &issues {
            warn!("change record {form_id:08x}: {issue}");
        }
    }

    ChangeRecord {
        form_id,
        type_code,
        flags,
        version,
        status,
        consumed: r.offset(),
        issues,
        data,
    }
}
