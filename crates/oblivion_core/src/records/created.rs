use log::{debug, warn};
use serde::Serialize;

use super::payload::{PayloadReader, Truncated};
use super::{DecodeIssue, DecodeStatus, Text, serialize_hex, serialize_tag, tag_str};

const FIELD_HEADER_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCreatedRecord {
    pub type_tag: [u8; 4],
    pub size: u32,
    pub flags: u32,
    pub form_id: u32,
    pub version_info: u32,
    pub payload: Vec<u8>,
}

impl RawCreatedRecord {
    pub fn decode(&self) -> CreatedRecord {
        decode_created_record(
            self.type_tag,
            self.size,
            self.flags,
            self.form_id,
            self.version_info,
            &self.payload,
        )
    }
}

/// An object made at runtime (custom spell, enchantment, potion), stored in
/// the plugin record format: a sequence of tagged fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedRecord {
    #[serde(serialize_with = "serialize_tag")]
    pub type_tag: [u8; 4],
    pub size: u32,
    pub flags: u32,
    pub form_id: u32,
    pub version_info: u32,
    pub status: DecodeStatus,
    pub issues: Vec<DecodeIssue>,
    /// In payload order.
    pub fields: Vec<FieldRecord>,
}

impl CreatedRecord {
    pub fn type_name(&self) -> String {
        tag_str(&self.type_tag)
    }

    pub fn field(&self, tag: &[u8; 4]) -> Option<&FieldRecord> {
        self.fields.iter().find(|f| &f.tag == tag)
    }

    /// The display name from the `FULL` field, when there is one.
    pub fn full_name(&self) -> Option<&Text> {
        self.fields.iter().find_map(|f| match &f.value {
            FieldData::FullName(name) => Some(name),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRecord {
    #[serde(serialize_with = "serialize_tag")]
    pub tag: [u8; 4],
    /// Declared length; `data` is shorter when the chunk was cut off.
    pub size: u16,
    #[serde(serialize_with = "serialize_hex")]
    pub data: Vec<u8>,
    pub status: DecodeStatus,
    pub value: FieldData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldData {
    /// ANAM
    EnchantmentPoints(u32),
    /// DATA
    Item(ItemData),
    /// EFID
    EffectId(u32),
    /// EFIT
    EffectItem(EffectItem),
    /// ENAM
    Enchantment(u32),
    /// ENIT
    EnchantmentInfo(EnchantmentInfo),
    /// FULL
    FullName(Text),
    /// ICON
    Icon(Text),
    /// MODB
    BoundRadius(u32),
    /// MODL
    Model(Text),
    /// SPIT
    SpellInfo(SpellInfo),
    /// Unknown tag, or a known tag whose data was too short. The bytes are in
    /// [`FieldRecord::data`].
    Unrecognized,
}

impl FieldData {
    /// The string value of a FULL, ICON or MODL field.
    pub fn text(&self) -> Option<&Text> {
        match self {
            Self::FullName(t) | Self::Icon(t) | Self::Model(t) => Some(t),
            _ => None,
        }
    }
}

/// Item stats from a DATA field: 30 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ItemData {
    pub item_type: u32,
    pub speed: f32,
    pub reach: f32,
    pub flags: u32,
    pub value: u32,
    pub health: u32,
    pub weight: f32,
    pub damage: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectItem {
    pub effect: u32,
    pub magnitude: u32,
    pub area: u32,
    pub duration: u32,
    /// Self, touch or target.
    pub range: u32,
    pub actor_value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnchantmentInfo {
    pub enchantment_type: u32,
    pub charge_amount: u32,
    pub enchantment_cost: u32,
    pub flags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpellInfo {
    pub spell_type: u32,
    pub spell_cost: u32,
    pub spell_level: u32,
    pub flags: u32,
}

type FieldDecoder = fn(&mut PayloadReader<'_>) -> Result<FieldData, Truncated>;

struct FieldKind {
    tag: [u8; 4],
    name: &'static str,
    decode: FieldDecoder,
}

static FIELD_KINDS: [FieldKind; 11] = [
    FieldKind {
        tag: *b"ANAM",
        name: "ANAM",
        decode: decode_anam,
    },
    FieldKind {
        tag: *b"DATA",
        name: "DATA",
        decode: decode_data,
    },
    FieldKind {
        tag: *b"EFID",
        name: "EFID",
        decode: decode_efid,
    },
    FieldKind {
        tag: *b"EFIT",
        name: "EFIT",
        decode: decode_efit,
    },
    FieldKind {
        tag: *b"ENAM",
        name: "ENAM",
        decode: decode_enam,
    },
    FieldKind {
        tag: *b"ENIT",
        name: "ENIT",
        decode: decode_enit,
    },
    FieldKind {
        tag: *b"FULL",
        name: "FULL",
        decode: decode_full,
    },
    FieldKind {
        tag: *b"ICON",
        name: "ICON",
        decode: decode_icon,
    },
    FieldKind {
        tag: *b"MODB",
        name: "MODB",
        decode: decode_modb,
    },
    FieldKind {
        tag: *b"MODL",
        name: "MODL",
        decode: decode_modl,
    },
    FieldKind {
        tag: *b"SPIT",
        name: "SPIT",
        decode: decode_spit,
    },
];

fn field_kind(tag: &[u8; 4]) -> Option<&'static FieldKind> {
    FIELD_KINDS.iter().find(|k| &k.tag == tag)
}

fn decode_anam(r: &mut PayloadReader<'_>) -> Result<FieldData, Truncated> {
    r.read_u32().map(FieldData::EnchantmentPoints)
}

fn decode_data(r: &mut PayloadReader<'_>) -> Result<FieldData, Truncated> {
    Ok(FieldData::Item(ItemData {
        item_type: r.read_u32()?,
        speed: r.read_f32()?,
        reach: r.read_f32()?,
        flags: r.read_u32()?,
        value: r.read_u32()?,
        health: r.read_u32()?,
        weight: r.read_f32()?,
        damage: r.read_u16()?,
    }))
}

fn decode_efid(r: &mut PayloadReader<'_>) -> Result<FieldData, Truncated> {
    r.read_u32().map(FieldData::EffectId)
}

fn decode_efit(r: &mut PayloadReader<'_>) -> Result<FieldData, Truncated> {
    Ok(FieldData::EffectItem(EffectItem {
        effect: r.read_u32()?,
        magnitude: r.read_u32()?,
        area: r.read_u32()?,
        duration: r.read_u32()?,
        range: r.read_u32()?,
        actor_value: r.read_u32()?,
    }))
}

fn decode_enam(r: &mut PayloadReader<'_>) -> Result<FieldData, Truncated> {
    r.read_u32().map(FieldData::Enchantment)
}

fn decode_enit(r: &mut PayloadReader<'_>) -> Result<FieldData, Truncated> {
    Ok(FieldData::EnchantmentInfo(EnchantmentInfo {
        enchantment_type: r.read_u32()?,
        charge_amount: r.read_u32()?,
        enchantment_cost: r.read_u32()?,
        flags: r.read_u32()?,
    }))
}

fn decode_full(r: &mut PayloadReader<'_>) -> Result<FieldData, Truncated> {
    Ok(FieldData::FullName(Text::decode(r.take_rest())))
}

fn decode_icon(r: &mut PayloadReader<'_>) -> Result<FieldData, Truncated> {
    Ok(FieldData::Icon(Text::decode(r.take_rest())))
}

fn decode_modb(r: &mut PayloadReader<'_>) -> Result<FieldData, Truncated> {
    r.read_u32().map(FieldData::BoundRadius)
}

fn decode_modl(r: &mut PayloadReader<'_>) -> Result<FieldData, Truncated> {
    Ok(FieldData::Model(Text::decode(r.take_rest())))
}

fn decode_spit(r: &mut PayloadReader<'_>) -> Result<FieldData, Truncated> {
    Ok(FieldData::SpellInfo(SpellInfo {
        spell_type: r.read_u32()?,
        spell_cost: r.read_u32()?,
        spell_level: r.read_u32()?,
        flags: r.read_u32()?,
    }))
}

fn decode_field(
    tag: [u8; 4],
    size: u16,
    data: &[u8],
    issues: &mut Vec<DecodeIssue>,
) -> FieldRecord {
    let Some(kind) = field_kind(&tag) else {
        issues.push(DecodeIssue::UnknownFieldTag { tag });
        return FieldRecord {
            tag,
            size,
            data: data.to_vec(),
            status: DecodeStatus::Unrecognized,
            value: FieldData::Unrecognized,
        };
    };

    let mut r = PayloadReader::new(data);
    let (status, value) = match (kind.decode)(&mut r) {
        Ok(value) => {
            let invalid = value.text().is_some_and(|t| !t.is_valid());
            if invalid {
                issues.push(DecodeIssue::InvalidString { field: kind.name });
            }
            let complete = !invalid && data.len() == size as usize;
            let status = if complete {
                DecodeStatus::Complete
            } else {
                DecodeStatus::Partial
            };
            (status, value)
        }
        Err(t) => {
            issues.push(DecodeIssue::TruncatedPayload {
                field: kind.name,
                offset: t.offset,
                needed: t.needed,
                available: t.available,
            });
            (DecodeStatus::Partial, FieldData::Unrecognized)
        }
    };

    FieldRecord {
        tag,
        size,
        data: data.to_vec(),
        status,
        value,
    }
}

/// Split a created record payload into tagged fields and decode each one.
///
/// Never fails: unknown tags are kept as raw bytes and a field that runs past
/// the end of the payload is cut to what is there, ending the scan.
pub fn decode_created_record(
    type_tag: [u8; 4],
    size: u32,
    flags: u32,
    form_id: u32,
    version_info: u32,
    payload: &[u8],
) -> CreatedRecord {
    let mut issues = Vec::new();
    let declared = size as usize;
    if declared > payload.len() {
        issues.push(DecodeIssue::TruncatedPayload {
            field: "payload",
            offset: payload.len(),
            needed: declared,
            available: payload.len(),
        });
    }

    let mut r = PayloadReader::new(&payload[..declared.min(payload.len())]);
    let mut fields = Vec::new();
    while !r.is_empty() {
        if r.remaining() < FIELD_HEADER_LEN {
            issues.push(DecodeIssue::TruncatedPayload {
                field: "field header",
                offset: r.offset(),
                needed: FIELD_HEADER_LEN,
                available: r.remaining(),
            });
            break;
        }
        let (Ok(tag), Ok(len)) = (r.array::<4>(), r.read_u16()) else {
            break;
        };

        let data_start = r.offset();
        let available = r.remaining();
        let cut = len as usize > available;
        let data = r.take_up_to(len as usize);
        if cut {
            issues.push(DecodeIssue::TruncatedPayload {
                field: field_kind(&tag).map_or("field", |k| k.name),
                offset: data_start,
                needed: len as usize,
                available,
            });
        }

        fields.push(decode_field(tag, len, data, &mut issues));
        if cut {
            break;
        }
    }

    let status = DecodeStatus::from_issues(&issues);
    if status == DecodeStatus::Partial {
        warn!(
            "created record {} {form_id:08x}: decoded {} fields, {} issues",
            tag_str(&type_tag),
            fields.len(),
            issues.len()
        );
    } else {
        debug!(
            "created record {} {form_id:08x}: {} fields",
            tag_str(&type_tag),
            fields.len()
        );
    }

    CreatedRecord {
        type_tag,
        size,
        flags,
        form_id,
        version_info,
        status,
        issues,
        fields,
    }
}
