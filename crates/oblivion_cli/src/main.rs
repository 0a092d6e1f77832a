use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use log::debug;
use oblivion_core::core_api::{CoreError, CoreErrorCode, Engine, Session};
use oblivion_core::records::{ChangeRecord, CreatedRecord, tag_str};
use oblivion_render::{
    FieldSelection, JsonStyle, render_change_records_json, render_created_records_json,
    render_json_full, render_json_selected, render_layout, render_summary,
};
use serde_json::Value as JsonValue;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "SAVE.ess")]
    path: PathBuf,
    #[arg(long)]
    name: bool,
    #[arg(long)]
    level: bool,
    #[arg(long)]
    cell: bool,
    #[arg(long = "save-number")]
    save_number: bool,
    #[arg(long = "game-days")]
    game_days: bool,
    #[arg(long)]
    plugins: bool,
    #[arg(long = "record-counts")]
    record_counts: bool,
    #[arg(long = "change-records")]
    change_records: bool,
    #[arg(long = "created-records")]
    created_records: bool,
    /// Only dump change records of this type (e.g. CREA).
    #[arg(long = "type", value_name = "MNEMONIC")]
    type_filter: Option<String>,
    /// Only dump the change record with this form id (hex with 0x, or decimal).
    #[arg(long = "form-id", value_name = "ID", value_parser = parse_form_id)]
    form_id: Option<u32>,
    #[arg(long)]
    layout: bool,
    #[arg(long)]
    json: bool,
    /// Raise the log level; repeat for more detail. RUST_LOG overrides it.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn field_selection(&self) -> FieldSelection {
        FieldSelection {
            name: self.name,
            level: self.level,
            cell: self.cell,
            save_number: self.save_number,
            game_days: self.game_days,
            plugins: self.plugins,
            record_counts: self.record_counts,
        }
    }

    fn record_mode(&self) -> bool {
        self.change_records || self.created_records
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let fields = cli.field_selection();
    if let Err(message) = check_flags(&cli, &fields) {
        eprintln!("{message}");
        process::exit(2);
    }

    let session = Engine::new().open_path(&cli.path).unwrap_or_else(|e| {
        eprintln!("Error opening save file: {}", cli.path.display());
        eprintln!("  {e}");
        process::exit(1);
    });
    debug!(
        "opened {} with {} change records",
        cli.path.display(),
        session.change_records().len()
    );

    if cli.record_mode() {
        print_records(&cli, &session);
        return;
    }

    if cli.layout {
        if cli.json {
            print_json(&serde_json::to_value(session.layout()));
        } else {
            print!("{}", render_layout(session.layout()));
        }
        return;
    }

    if cli.json {
        let json = if fields.is_any_selected() {
            render_json_selected(&session, &fields, JsonStyle::CanonicalV1)
        } else {
            render_json_full(&session, JsonStyle::CanonicalV1)
        };
        print_json(&Ok(json));
        return;
    }

    if fields.is_any_selected() {
        for (key, value) in selected_pairs(&fields, &session) {
            println!("{key}={value}");
        }
        return;
    }

    print!("{}", render_summary(&session));
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn check_flags(cli: &Cli, fields: &FieldSelection) -> Result<(), String> {
    let filtered = cli.type_filter.is_some() || cli.form_id.is_some();
    if filtered && !cli.change_records {
        return Err("--type and --form-id require --change-records".to_string());
    }
    if cli.record_mode() && fields.is_any_selected() {
        return Err("field flags cannot be combined with record dumps".to_string());
    }
    if cli.layout && (cli.record_mode() || fields.is_any_selected()) {
        return Err("--layout cannot be combined with other output flags".to_string());
    }
    Ok(())
}

fn print_records(cli: &Cli, session: &Session) {
    let changes = if cli.change_records {
        select_change_records(cli, session).unwrap_or_else(|e| {
            eprintln!("{}", e.message);
            process::exit(if e.code == CoreErrorCode::UnsupportedOperation {
                2
            } else {
                1
            });
        })
    } else {
        Vec::new()
    };
    let created: &[CreatedRecord] = if cli.created_records {
        session.created_records()
    } else {
        &[]
    };

    if cli.json {
        let mut out = serde_json::Map::new();
        if cli.change_records {
            out.insert(
                "change_records".to_string(),
                render_change_records_json(&changes).unwrap_or_else(json_failure),
            );
        }
        if cli.created_records {
            out.insert(
                "created_records".to_string(),
                render_created_records_json(created).unwrap_or_else(json_failure),
            );
        }
        print_json(&Ok(JsonValue::Object(out)));
        return;
    }

    for record in &changes {
        println!("{}", change_record_line(record));
        for issue in &record.issues {
            println!("    {issue}");
        }
    }
    for record in created {
        println!("{}", created_record_line(record));
        for issue in &record.issues {
            println!("    {issue}");
        }
    }
}

fn select_change_records<'a>(
    cli: &Cli,
    session: &'a Session,
) -> Result<Vec<&'a ChangeRecord>, CoreError> {
    let mut records = match &cli.type_filter {
        Some(name) => session.change_records_of(name)?,
        None => session.change_records().iter().collect(),
    };
    if let Some(form_id) = cli.form_id {
        records.retain(|r| r.form_id == form_id);
    }
    Ok(records)
}

fn change_record_line(record: &ChangeRecord) -> String {
    let type_name = record
        .type_name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("unknown({})", record.type_code));
    format!(
        "{:08X} {:<12} flags=0x{:08x} v{} {} consumed={}",
        record.form_id, type_name, record.flags, record.version, record.status, record.consumed
    )
}

fn created_record_line(record: &CreatedRecord) -> String {
    let tags: Vec<String> = record.fields.iter().map(|f| tag_str(&f.tag)).collect();
    format!(
        "{:08X} {} {} [{}]",
        record.form_id,
        record.type_name(),
        record.status,
        tags.join(" ")
    )
}

fn selected_pairs(fields: &FieldSelection, session: &Session) -> Vec<(&'static str, String)> {
    let snapshot = session.snapshot();
    let mut out = Vec::new();

    if fields.name {
        out.push(("name", snapshot.player_name.clone()));
    }
    if fields.level {
        out.push(("level", snapshot.level.to_string()));
    }
    if fields.cell {
        out.push(("cell", snapshot.cell.clone()));
    }
    if fields.save_number {
        out.push(("save_number", snapshot.save_number.to_string()));
    }
    if fields.game_days {
        out.push(("game_days", format!("{:.2}", snapshot.game_days)));
    }
    if fields.plugins {
        out.push(("plugins", session.plugins().join(",")));
    }
    if fields.record_counts {
        let counts: Vec<String> = session
            .record_type_counts()
            .into_iter()
            .map(|c| format!("{}:{}", c.name, c.count))
            .collect();
        out.push(("record_counts", counts.join(",")));
    }

    out
}

fn print_json(value: &Result<JsonValue, serde_json::Error>) {
    let rendered = value
        .as_ref()
        .map_err(ToString::to_string)
        .and_then(|v| serde_json::to_string_pretty(v).map_err(|e| e.to_string()));
    match rendered {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => {
            eprintln!("Error rendering JSON output: {e}");
            process::exit(1);
        }
    }
}

fn json_failure(e: serde_json::Error) -> JsonValue {
    eprintln!("Error rendering JSON output: {e}");
    process::exit(1);
}

fn parse_form_id(value: &str) -> Result<u32, String> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| format!("invalid form id '{value}', expected 0x-prefixed hex or decimal"))
}
