//! Subcommands of the `chassis-tracker` binary

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chassis_types::iso_date::{format_iso, parse_iso};
use chassis_types::{ChassisRecord, InspectionKind, LedgerBucket, NewCitation, NewRepair};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use compliance_engine::calendar::format_human;
use compliance_engine::StatusFilter;
use fleet_core::{
    export_file_name, parse_delimited, to_delimited, FleetError, FleetStore, InspectionEntry,
    SortDirection, SortKey, Tracker, ViewQuery,
};
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Prepare the data directory, optionally seeding two sample chassis
    Init {
        #[arg(long)]
        demo: bool,
    },

    /// List chassis with their due dates and status
    List(ViewArgs),

    /// Add a chassis
    Add(RecordArgs),

    /// Change fields of an existing chassis
    Edit {
        id: String,
        #[command(flatten)]
        fields: RecordArgs,
    },

    /// Delete a chassis (its history is kept)
    Remove { id: String },

    /// Import chassis from a CSV file with unit, plate and VIN columns
    Import { path: PathBuf },

    /// Write the filtered list as CSV
    Export {
        #[command(flatten)]
        view: ViewArgs,

        /// Output file, or `-` for stdout (default: chassis_export_<today>.csv)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show inspections, citations and repairs for a chassis
    History { id: String },

    /// Record a completed inspection and move the matching due date
    Inspect {
        id: String,
        #[arg(long, value_parser = parse_kind)]
        kind: InspectionKind,
        #[arg(long, value_parser = parse_date)]
        done: NaiveDate,
    },

    /// Add a citation
    Cite {
        id: String,
        /// Citation date (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        number: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        notes: String,
        /// Submission token; repeating a token is ignored
        #[arg(long)]
        token: Option<String>,
    },

    /// Add a repair, optionally linked to a citation
    Repair {
        id: String,
        /// Repair date (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        vendor: String,
        #[arg(long, default_value = "")]
        work: String,
        #[arg(long, default_value = "")]
        notes: String,
        /// Id of the citation this repair resolves
        #[arg(long)]
        citation: Option<String>,
        /// Submission token; repeating a token is ignored
        #[arg(long)]
        token: Option<String>,
    },

    /// Delete a citation and unlink the repairs that point to it
    DeleteCitation { id: String, citation_id: String },

    DeleteRepair { id: String, repair_id: String },

    DeleteInspection {
        id: String,
        #[arg(long, value_parser = parse_kind)]
        kind: InspectionKind,
        entry_id: String,
    },
}

/// Search, filter and sort options shared by `list` and `export`
#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// Case-insensitive text matched against unit, plate, VIN and notes
    #[arg(short, long, default_value = "")]
    pub query: String,

    /// all, overdue, soon or ok
    #[arg(long, default_value = "all")]
    pub filter: StatusFilter,

    /// next-due, unit or plate
    #[arg(long, default_value = "next-due")]
    pub sort: SortKey,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,
}

impl ViewArgs {
    pub fn to_query(&self) -> ViewQuery {
        ViewQuery {
            text: self.query.clone(),
            filter: self.filter,
            sort: self.sort,
            direction: if self.desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            },
        }
    }
}

/// Editable chassis fields; anything left out keeps its current value
#[derive(Args, Debug, Clone, Default)]
pub struct RecordArgs {
    #[arg(long)]
    pub unit: Option<String>,
    #[arg(long)]
    pub plate: Option<String>,
    #[arg(long)]
    pub vin: Option<String>,
    #[arg(long, value_parser = parse_date)]
    pub registration_due: Option<NaiveDate>,
    /// Date of the last annual inspection; sets the annual due date
    #[arg(long, value_parser = parse_date)]
    pub last_annual: Option<NaiveDate>,
    /// Date of the last BIT inspection; sets the BIT due date
    #[arg(long, value_parser = parse_date)]
    pub last_bit: Option<NaiveDate>,
    #[arg(long)]
    pub notes: Option<String>,
}

impl RecordArgs {
    fn apply(&self, record: &mut ChassisRecord) {
        let text = |value: &Option<String>, field: &mut String| {
            if let Some(value) = value {
                *field = value.trim().to_string();
            }
        };
        text(&self.unit, &mut record.unit);
        text(&self.plate, &mut record.plate);
        text(&self.vin, &mut record.vin);
        text(&self.notes, &mut record.notes);
        if self.registration_due.is_some() {
            record.registration_due = self.registration_due;
        }
    }

    fn entry(&self) -> InspectionEntry {
        InspectionEntry {
            last_annual: self.last_annual,
            last_bit: self.last_bit,
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    parse_iso(value).ok_or_else(|| format!("expected a YYYY-MM-DD date, got '{}'", value))
}

fn parse_kind(value: &str) -> Result<InspectionKind, String> {
    InspectionKind::parse(value).ok_or_else(|| format!("expected annual or bit, got '{}'", value))
}

fn due_cell(date: Option<NaiveDate>) -> String {
    date.map(format_iso).unwrap_or_else(|| "—".to_string())
}

fn existing<S: FleetStore>(tracker: &Tracker<S>, id: &str) -> Result<ChassisRecord, FleetError> {
    tracker
        .registry()
        .get(id)
        .cloned()
        .ok_or_else(|| FleetError::UnknownChassis(id.to_string()))
}

fn bucket_of<S: FleetStore>(tracker: &Tracker<S>, id: &str) -> LedgerBucket {
    tracker
        .registry()
        .ledger()
        .bucket(id)
        .map(|bucket| (*bucket).clone())
        .unwrap_or_default()
}

/// Run one subcommand against a loaded tracker, writing its report to `out`
pub fn run<S: FleetStore>(
    tracker: &mut Tracker<S>,
    command: Command,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let today = tracker.registry().env().today();

    match command {
        Command::Init { demo } => {
            if demo {
                let seeded = tracker.seed_demo()?;
                if seeded == 0 {
                    writeln!(out, "Fleet already has chassis; sample data not added.")?;
                } else {
                    writeln!(out, "Added {} sample chassis.", seeded)?;
                }
            }
            writeln!(out, "Tracking {} chassis.", tracker.registry().len())?;
        }

        Command::List(view) => list(tracker, &view.to_query(), out)?,

        Command::Add(fields) => {
            let mut record = tracker.registry().new_record();
            fields.apply(&mut record);
            let saved = tracker.save_edit(record, fields.entry())?;
            writeln!(out, "Added chassis {} ({})", saved.unit, saved.id)?;
        }

        Command::Edit { id, fields } => {
            let mut record = existing(tracker, &id)?;
            fields.apply(&mut record);
            let saved = tracker.save_edit(record, fields.entry())?;
            writeln!(out, "Saved chassis {} ({})", saved.unit, saved.id)?;
        }

        Command::Remove { id } => {
            let removed = tracker.remove(&id)?;
            writeln!(out, "Removed chassis {} ({})", removed.unit, removed.id)?;
        }

        Command::Import { path } => import(tracker, &path, out)?,

        Command::Export { view, out: target } => {
            let records = tracker.view(&view.to_query());
            let csv = to_delimited(&records);
            let target = target.unwrap_or_else(|| PathBuf::from(export_file_name(today)));
            if target.as_os_str() == "-" {
                writeln!(out, "{}", csv)?;
            } else {
                fs::write(&target, csv)
                    .with_context(|| format!("Failed to write {}", target.display()))?;
                info!(path = %target.display(), rows = records.len(), "Exported fleet view");
                writeln!(
                    out,
                    "Exported {} chassis to {}",
                    records.len(),
                    target.display()
                )?;
            }
        }

        Command::History { id } => history(tracker, &id, out)?,

        Command::Inspect { id, kind, done } => {
            let record = existing(tracker, &id)?;
            let entry = match kind {
                InspectionKind::Annual => InspectionEntry {
                    last_annual: Some(done),
                    ..InspectionEntry::default()
                },
                InspectionKind::Bit => InspectionEntry {
                    last_bit: Some(done),
                    ..InspectionEntry::default()
                },
            };
            let saved = tracker.save_edit(record, entry)?;
            writeln!(
                out,
                "Recorded {} inspection done {}; next due {}",
                kind,
                format_iso(done),
                due_cell(saved.due_for(kind))
            )?;
        }

        Command::Cite {
            id,
            date,
            number,
            location,
            notes,
            token,
        } => {
            existing(tracker, &id)?;
            let before = bucket_of(tracker, &id).citations.len();
            let entry = NewCitation {
                date: Some(date.unwrap_or(today)),
                number,
                location,
                notes,
            };
            let bucket = tracker.add_citation(&id, entry, token.as_deref())?;
            if bucket.citations.len() == before {
                writeln!(out, "Citation already recorded for this submission.")?;
            } else {
                writeln!(out, "Added citation {}", bucket.citations[0].id)?;
            }
        }

        Command::Repair {
            id,
            date,
            vendor,
            work,
            notes,
            citation,
            token,
        } => {
            existing(tracker, &id)?;
            let before = bucket_of(tracker, &id).repairs.len();
            let wants_link = citation.is_some();
            let entry = NewRepair {
                date: Some(date.unwrap_or(today)),
                vendor,
                work,
                notes,
                citation_id: citation,
            };
            let bucket = tracker.add_repair(&id, entry, token.as_deref())?;
            if bucket.repairs.len() == before {
                writeln!(out, "Repair already recorded for this submission.")?;
            } else {
                let repair = &bucket.repairs[0];
                writeln!(out, "Added repair {}", repair.id)?;
                if wants_link && repair.citation_id.is_none() {
                    writeln!(out, "Citation not found on this chassis; repair left unlinked.")?;
                }
            }
        }

        Command::DeleteCitation { id, citation_id } => {
            existing(tracker, &id)?;
            let bucket = bucket_of(tracker, &id);
            if !bucket.has_citation(&citation_id) {
                writeln!(out, "No citation {} on this chassis.", citation_id)?;
                return Ok(());
            }
            let unlinked = bucket.repairs_for(&citation_id).count();
            tracker.delete_citation(&id, &citation_id)?;
            writeln!(
                out,
                "Deleted citation {} and unlinked {} repair(s).",
                citation_id, unlinked
            )?;
        }

        Command::DeleteRepair { id, repair_id } => {
            existing(tracker, &id)?;
            if !bucket_of(tracker, &id).repairs.iter().any(|r| r.id == repair_id) {
                writeln!(out, "No repair {} on this chassis.", repair_id)?;
                return Ok(());
            }
            tracker.delete_repair(&id, &repair_id)?;
            writeln!(out, "Deleted repair {}.", repair_id)?;
        }

        Command::DeleteInspection { id, kind, entry_id } => {
            existing(tracker, &id)?;
            let bucket = bucket_of(tracker, &id);
            if !bucket.inspections.of(kind).iter().any(|e| e.id == entry_id) {
                writeln!(out, "No {} inspection {} on this chassis.", kind, entry_id)?;
                return Ok(());
            }
            tracker.delete_inspection(&id, kind, &entry_id)?;
            writeln!(out, "Deleted {} inspection {}.", kind, entry_id)?;
        }
    }

    Ok(())
}

fn list<S: FleetStore>(
    tracker: &Tracker<S>,
    query: &ViewQuery,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let records = tracker.view(query);
    if records.is_empty() {
        writeln!(out, "No chassis found.")?;
        return Ok(());
    }

    let today = tracker.registry().env().today();
    let engine = tracker.engine();
    writeln!(
        out,
        "{:<36}  {:<10} {:<10} {:<18} {:<12} {:<12} {:<12} STATUS",
        "ID", "UNIT", "PLATE", "VIN", "REGISTRATION", "ANNUAL", "BIT"
    )?;
    for record in &records {
        let status = engine.status_of(record, today);
        writeln!(
            out,
            "{:<36}  {:<10} {:<10} {:<18} {:<12} {:<12} {:<12} {}",
            record.id,
            record.unit,
            record.plate,
            record.vin,
            due_cell(record.registration_due),
            due_cell(record.annual_due),
            due_cell(record.bit_due),
            status.label
        )?;
    }
    writeln!(
        out,
        "{} of {} chassis",
        records.len(),
        tracker.registry().len()
    )?;
    Ok(())
}

fn import<S: FleetStore>(
    tracker: &mut Tracker<S>,
    path: &Path,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    if matches!(extension.as_deref(), Some("xlsx") | Some("xls")) {
        bail!("Spreadsheet files are not supported here. Save the sheet as CSV and import that.");
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    let outcome = tracker.import(&parse_delimited(&text))?;
    writeln!(out, "{}", outcome.summary())?;
    Ok(())
}

fn history<S: FleetStore>(
    tracker: &Tracker<S>,
    id: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let record = existing(tracker, id)?;
    let bucket = bucket_of(tracker, id);

    writeln!(out, "{} · {} ({})", record.unit, record.plate, record.id)?;
    let prefill = InspectionEntry::prefill(&record);
    for kind in InspectionKind::ALL {
        if let Some(done) = prefill.get(kind) {
            writeln!(out, "Last {} (from due date): {}", kind, format_human(done))?;
        }
    }

    for kind in InspectionKind::ALL {
        writeln!(out, "\n{} inspections", kind)?;
        let events = bucket.inspections.of(kind);
        if events.is_empty() {
            writeln!(out, "  none")?;
        }
        for event in events {
            writeln!(
                out,
                "  done {}  due {}  [{}]",
                format_iso(event.done_date),
                format_iso(event.due_date),
                event.id
            )?;
        }
    }

    writeln!(out, "\nCitations")?;
    if bucket.citations.is_empty() {
        writeln!(out, "  none")?;
    }
    for citation in &bucket.citations {
        let linked = bucket.repairs_for(&citation.id).count();
        writeln!(
            out,
            "  {}  #{}  {}  {}  ({} linked repair(s))  [{}]",
            due_cell(citation.date),
            citation.number,
            citation.location,
            citation.notes,
            linked,
            citation.id
        )?;
    }

    writeln!(out, "\nRepairs")?;
    if bucket.repairs.is_empty() {
        writeln!(out, "  none")?;
    }
    for repair in &bucket.repairs {
        let link = repair
            .citation_id
            .as_deref()
            .and_then(|cid| bucket.citations.iter().find(|c| c.id == cid))
            .map(|c| format!("  -> citation #{}", c.number))
            .unwrap_or_default();
        writeln!(
            out,
            "  {}  {}  {}  {}{}  [{}]",
            due_cell(repair.date),
            repair.vendor,
            repair.work,
            repair.notes,
            link,
            repair.id
        )?;
    }
    Ok(())
}
