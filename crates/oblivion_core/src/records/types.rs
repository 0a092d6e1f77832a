// Change record type codes
pub const FACT: u8 = 6;
pub const APPA: u8 = 19;
pub const ARMO: u8 = 20;
pub const BOOK: u8 = 21;
pub const CLOT: u8 = 22;
pub const INGR: u8 = 25;
pub const LIGH: u8 = 26;
pub const MISC: u8 = 27;
pub const WEAP: u8 = 33;
pub const AMMO: u8 = 34;
pub const NPC_: u8 = 35;
pub const CREA: u8 = 36;
pub const SLGM: u8 = 38;
pub const KEYM: u8 = 39;
pub const ALCH: u8 = 40;
pub const CELL: u8 = 48;
pub const REFR: u8 = 49;
pub const ACHR: u8 = 50;
pub const ACRE: u8 = 51;
pub const INFO: u8 = 58;
pub const QUST: u8 = 59;
pub const PACK: u8 = 61;

pub const CHANGE_RECORD_TYPE_COUNT: usize = 22;

/// Every change record type a save can contain, by code.
pub const CHANGE_RECORD_TYPES: [(u8, &str); CHANGE_RECORD_TYPE_COUNT] = [
    (FACT, "FACT"),
    (APPA, "APPA"),
    (ARMO, "ARMO"),
    (BOOK, "BOOK"),
    (CLOT, "CLOT"),
    (INGR, "INGR"),
    (LIGH, "LIGH"),
    (MISC, "MISC"),
    (WEAP, "WEAP"),
    (AMMO, "AMMO"),
    (NPC_, "NPC_"),
    (CREA, "CREA"),
    (SLGM, "SLGM"),
    (KEYM, "KEYM"),
    (ALCH, "ALCH"),
    (CELL, "CELL"),
    (REFR, "REFR"),
    (ACHR, "ACHR"),
    (ACRE, "ACRE"),
    (INFO, "INFO"),
    (QUST, "QUST"),
    (PACK, "PACK"),
];

pub fn change_record_type_name(code: u8) -> Option<&'static str> {
    CHANGE_RECORD_TYPES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Case-insensitive mnemonic lookup (`"crea"` -> 36).
pub fn change_record_type_code(name: &str) -> Option<u8> {
    CHANGE_RECORD_TYPES
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|(code, _)| *code)
}

// --- Display name tables ---

pub const ATTRIBUTE_COUNT: usize = 8;
pub const SKILL_COUNT: usize = 21;

pub const ATTRIBUTE_NAMES: [&str; ATTRIBUTE_COUNT] = [
    "Strength",
    "Intelligence",
    "Willpower",
    "Agility",
    "Speed",
    "Endurance",
    "Personality",
    "Luck",
];

// Same order as the skill block of a creature change record.
pub const SKILL_NAMES: [&str; SKILL_COUNT] = [
    "Armorer",
    "Athletics",
    "Blade",
    "Block",
    "Blunt",
    "Hand to Hand",
    "Heavy Armor",
    "Alchemy",
    "Alteration",
    "Conjuration",
    "Destruction",
    "Illusion",
    "Mysticism",
    "Restoration",
    "Acrobatics",
    "Light Armor",
    "Marksman",
    "Mercantile",
    "Security",
    "Sneak",
    "Speechcraft",
];

pub const ACTOR_VALUE_NAMES: [&str; 40] = [
    "Strength",
    "Intelligence",
    "Willpower",
    "Agility",
    "Speed",
    "Endurance",
    "Personality",
    "Luck",
    "Health",
    "Magicka",
    "Fatigue",
    "Encumbrance",
    "Armorer",
    "Athletics",
    "Blade",
    "Block",
    "Blunt",
    "Hand to Hand",
    "Heavy Armor",
    "Alchemy",
    "Alteration",
    "Conjuration",
    "Destruction",
    "Illusion",
    "Mysticism",
    "Restoration",
    "Acrobatics",
    "Light Armor",
    "Marksman",
    "Mercantile",
    "Security",
    "Sneak",
    "Speechcraft",
    "Aggression",
    "Confidence",
    "Energy",
    "Responsibility",
    "Bounty",
    "Fame",
    "Infamy",
];

pub fn actor_value_name(index: u32) -> Option<&'static str> {
    ACTOR_VALUE_NAMES.get(index as usize).copied()
}
