//! Delimited-text export of the fleet view

use chassis_types::iso_date::format_iso;
use chassis_types::ChassisRecord;
use chrono::NaiveDate;

/// Column order of the export, header row included
pub const EXPORT_COLUMNS: [&str; 7] = [
    "unit",
    "plate",
    "vin",
    "registrationDue",
    "annualDue",
    "bitDue",
    "notes",
];

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn date_field(date: Option<NaiveDate>) -> String {
    date.map(format_iso).unwrap_or_default()
}

fn export_row(record: &ChassisRecord) -> [String; 7] {
    [
        quote(&record.unit),
        quote(&record.plate),
        quote(&record.vin),
        date_field(record.registration_due),
        date_field(record.annual_due),
        date_field(record.bit_due),
        quote(&record.notes),
    ]
}

/// Render records as comma-separated text, one line per record after the
/// header. The output reads back through `import::parse_delimited`.
pub fn to_delimited(records: &[ChassisRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(EXPORT_COLUMNS.join(","));
    lines.extend(records.iter().map(|record| export_row(record).join(",")));
    lines.join("\n")
}

/// Suggested download name, e.g. `chassis_export_2024-05-10.csv`
pub fn export_file_name(today: NaiveDate) -> String {
    format!("chassis_export_{}.csv", format_iso(today))
}
