use std::fmt::Write as _;

use oblivion_core::core_api::Session;
use oblivion_core::layout::FileLayout;
use oblivion_core::reader::SystemTime;
use oblivion_core::records::{ChangeRecord, CreatedRecord, FieldRecord, tag_str};
use serde_json::{Map as JsonMap, Value as JsonValue};

const LABEL_WIDTH: usize = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    #[default]
    CanonicalV1,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FieldSelection {
    pub name: bool,
    pub level: bool,
    pub cell: bool,
    pub save_number: bool,
    pub game_days: bool,
    pub plugins: bool,
    pub record_counts: bool,
}

impl FieldSelection {
    pub fn is_any_selected(&self) -> bool {
        self.name
            || self.level
            || self.cell
            || self.save_number
            || self.game_days
            || self.plugins
            || self.record_counts
    }
}

pub fn render_json_full(session: &Session, style: JsonStyle) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => JsonValue::Object(default_json(session)),
    }
}

pub fn render_json_selected(
    session: &Session,
    fields: &FieldSelection,
    style: JsonStyle,
) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => JsonValue::Object(selected_json(fields, session)),
    }
}

pub fn render_change_records_json(
    records: &[&ChangeRecord],
) -> Result<JsonValue, serde_json::Error> {
    records
        .iter()
        .map(|record| change_record_json(record).map(JsonValue::Object))
        .collect::<Result<Vec<_>, _>>()
        .map(JsonValue::Array)
}

pub fn render_created_records_json(
    records: &[CreatedRecord],
) -> Result<JsonValue, serde_json::Error> {
    records
        .iter()
        .map(|record| created_record_json(record).map(JsonValue::Object))
        .collect::<Result<Vec<_>, _>>()
        .map(JsonValue::Array)
}

fn selected_json(fields: &FieldSelection, session: &Session) -> JsonMap<String, JsonValue> {
    let snapshot = session.snapshot();
    let mut out = JsonMap::new();

    if fields.name {
        out.insert(
            "name".to_string(),
            JsonValue::String(snapshot.player_name.clone()),
        );
    }
    if fields.level {
        out.insert("level".to_string(), JsonValue::from(snapshot.level));
    }
    if fields.cell {
        out.insert("cell".to_string(), JsonValue::String(snapshot.cell.clone()));
    }
    if fields.save_number {
        out.insert(
            "save_number".to_string(),
            JsonValue::from(snapshot.save_number),
        );
    }
    if fields.game_days {
        out.insert("game_days".to_string(), JsonValue::from(snapshot.game_days));
    }
    if fields.plugins {
        out.insert("plugins".to_string(), plugins_json(session));
    }
    if fields.record_counts {
        out.insert("record_counts".to_string(), record_counts_json(session));
    }

    out
}

fn default_json(session: &Session) -> JsonMap<String, JsonValue> {
    let snapshot = session.snapshot();
    let mut out = JsonMap::new();

    out.insert(
        "version".to_string(),
        JsonValue::String(snapshot.version.clone()),
    );
    out.insert(
        "saved_at".to_string(),
        JsonValue::String(format_system_time(&snapshot.saved_at)),
    );
    out.insert(
        "name".to_string(),
        JsonValue::String(snapshot.player_name.clone()),
    );
    out.insert("level".to_string(), JsonValue::from(snapshot.level));
    out.insert("cell".to_string(), JsonValue::String(snapshot.cell.clone()));
    out.insert(
        "save_number".to_string(),
        JsonValue::from(snapshot.save_number),
    );
    out.insert("game_days".to_string(), JsonValue::from(snapshot.game_days));
    out.insert("game_ticks".to_string(), JsonValue::from(snapshot.game_ticks));
    out.insert("plugins".to_string(), plugins_json(session));
    out.insert(
        "change_record_count".to_string(),
        JsonValue::from(snapshot.change_record_count),
    );
    out.insert(
        "created_record_count".to_string(),
        JsonValue::from(snapshot.created_record_count),
    );
    out.insert(
        "partial_record_count".to_string(),
        JsonValue::from(snapshot.partial_record_count),
    );
    out.insert("record_counts".to_string(), record_counts_json(session));

    out
}

fn plugins_json(session: &Session) -> JsonValue {
    JsonValue::Array(
        session
            .plugins()
            .iter()
            .map(|p| JsonValue::String(p.clone()))
            .collect(),
    )
}

fn record_counts_json(session: &Session) -> JsonValue {
    let mut out = JsonMap::new();
    for entry in session.record_type_counts() {
        let key = if entry.name == "unknown" {
            format!("unknown({})", entry.type_code)
        } else {
            entry.name
        };
        out.insert(key, JsonValue::from(entry.count));
    }
    JsonValue::Object(out)
}

fn change_record_json(
    record: &ChangeRecord,
) -> Result<JsonMap<String, JsonValue>, serde_json::Error> {
    let mut out = JsonMap::new();
    out.insert(
        "form_id".to_string(),
        JsonValue::String(format_form_id(record.form_id)),
    );
    out.insert(
        "type".to_string(),
        JsonValue::String(type_label(record.type_code, record.type_name())),
    );
    out.insert(
        "flags".to_string(),
        JsonValue::String(format!("0x{:08x}", record.flags)),
    );
    out.insert("version".to_string(), JsonValue::from(record.version));
    out.insert(
        "status".to_string(),
        JsonValue::String(record.status.as_str().to_string()),
    );
    out.insert("consumed".to_string(), JsonValue::from(record.consumed));
    out.insert("issues".to_string(), issues_json(&record.issues));
    out.insert("data".to_string(), serde_json::to_value(&record.data)?);
    Ok(out)
}

fn created_record_json(
    record: &CreatedRecord,
) -> Result<JsonMap<String, JsonValue>, serde_json::Error> {
    let mut out = JsonMap::new();
    out.insert(
        "form_id".to_string(),
        JsonValue::String(format_form_id(record.form_id)),
    );
    out.insert("type".to_string(), JsonValue::String(record.type_name()));
    out.insert("size".to_string(), JsonValue::from(record.size));
    out.insert(
        "flags".to_string(),
        JsonValue::String(format!("0x{:08x}", record.flags)),
    );
    out.insert(
        "status".to_string(),
        JsonValue::String(record.status.as_str().to_string()),
    );
    out.insert("issues".to_string(), issues_json(&record.issues));

    let mut fields = Vec::with_capacity(record.fields.len());
    for field in &record.fields {
        fields.push(JsonValue::Object(field_json(field)?));
    }
    out.insert("fields".to_string(), JsonValue::Array(fields));
    Ok(out)
}

fn field_json(field: &FieldRecord) -> Result<JsonMap<String, JsonValue>, serde_json::Error> {
    let mut out = JsonMap::new();
    out.insert("tag".to_string(), JsonValue::String(tag_str(&field.tag)));
    out.insert("size".to_string(), JsonValue::from(field.size));
    out.insert(
        "status".to_string(),
        JsonValue::String(field.status.as_str().to_string()),
    );
    out.insert("value".to_string(), serde_json::to_value(&field.value)?);
    Ok(out)
}

fn issues_json<T: ToString>(issues: &[T]) -> JsonValue {
    JsonValue::Array(
        issues
            .iter()
            .map(|issue| JsonValue::String(issue.to_string()))
            .collect(),
    )
}

/// Plain-text overview of a save, one `label: value` per line.
pub fn render_summary(session: &Session) -> String {
    let snapshot = session.snapshot();
    let save = session.save();
    let globals = &save.globals;

    let mut out = String::new();
    write_row(&mut out, "Name", &snapshot.player_name);
    write_row(&mut out, "Level", &snapshot.level.to_string());
    write_row(&mut out, "Cell", &snapshot.cell);
    write_row(&mut out, "Save number", &snapshot.save_number.to_string());
    write_row(&mut out, "Game days", &format!("{:.2}", snapshot.game_days));
    write_row(&mut out, "Saved at", &format_system_time(&snapshot.saved_at));
    write_row(&mut out, "Version", &snapshot.version);
    write_row(
        &mut out,
        "Location",
        &format!(
            "{} ({:.1}, {:.1}, {:.1})",
            format_form_id(globals.player_location.cell),
            globals.player_location.x,
            globals.player_location.y,
            globals.player_location.z
        ),
    );
    write_row(
        &mut out,
        "Screenshot",
        &format!(
            "{}x{}",
            save.header.screenshot.width, save.header.screenshot.height
        ),
    );
    write_row(&mut out, "Globals", &globals.global_vars.len().to_string());
    write_row(&mut out, "Death counts", &globals.death_counts.len().to_string());
    write_row(&mut out, "Quick keys", &globals.quick_keys.len().to_string());
    write_row(
        &mut out,
        "Temporary effects",
        &format!("{} bytes", save.temporary_effects.len()),
    );
    write_row(&mut out, "Form ids", &save.form_ids.len().to_string());
    write_row(&mut out, "World spaces", &save.world_spaces.len().to_string());

    writeln!(&mut out).expect("writing to String cannot fail");
    writeln!(&mut out, "Plugins ({}):", snapshot.plugin_count)
        .expect("writing to String cannot fail");
    for (index, plugin) in session.plugins().iter().enumerate() {
        writeln!(&mut out, "  {index:02X} {plugin}").expect("writing to String cannot fail");
    }

    writeln!(&mut out).expect("writing to String cannot fail");
    writeln!(
        &mut out,
        "Change records ({}, {} partial):",
        snapshot.change_record_count, snapshot.partial_record_count
    )
    .expect("writing to String cannot fail");
    for entry in session.record_type_counts() {
        writeln!(
            &mut out,
            "  {:<8}{:>3} {:>6}",
            entry.name, entry.type_code, entry.count
        )
        .expect("writing to String cannot fail");
    }

    writeln!(&mut out).expect("writing to String cannot fail");
    writeln!(
        &mut out,
        "Created records ({}):",
        snapshot.created_record_count
    )
    .expect("writing to String cannot fail");
    for record in session.created_records() {
        let name = record
            .full_name()
            .map(|n| n.to_string())
            .unwrap_or_default();
        writeln!(
            &mut out,
            "  {} {} {}",
            record.type_name(),
            format_form_id(record.form_id),
            name
        )
        .expect("writing to String cannot fail");
    }

    out
}

pub fn render_layout(layout: &FileLayout) -> String {
    let mut out = String::new();
    writeln!(
        &mut out,
        "{:<20}{:>10}{:>10}{:>10}",
        "section", "start", "end", "bytes"
    )
    .expect("writing to String cannot fail");
    for section in &layout.sections {
        writeln!(
            &mut out,
            "{:<20}{:>10}{:>10}{:>10}",
            section.id.name(),
            section.range.start,
            section.range.end,
            section.range.len()
        )
        .expect("writing to String cannot fail");
    }
    writeln!(&mut out, "{:<20}{:>30}", "file", layout.file_len)
        .expect("writing to String cannot fail");
    out
}

fn write_row(out: &mut String, label: &str, value: &str) {
    let label = format!("{label}:");
    writeln!(out, "{label:<LABEL_WIDTH$}{value}").expect("writing to String cannot fail");
}

fn type_label(code: u8, name: Option<&str>) -> String {
    match name {
        Some(name) => name.to_string(),
        None => format!("unknown({code})"),
    }
}

fn format_form_id(form_id: u32) -> String {
    format!("{form_id:08X}")
}

fn format_system_time(t: &SystemTime) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        t.year, t.month, t.day, t.hour, t.minute, t.second
    )
}
