use chassis_types::ChassisRecord;
use chrono::{Datelike, NaiveDate};

use crate::ports::IdSource;

/// The two sample chassis seeded into an empty tracker, dated in the current
/// year.
pub fn demo_fleet(today: NaiveDate, ids: &dyn IdSource) -> Vec<ChassisRecord> {
    let year = today.year();
    let on = |month, day| NaiveDate::from_ymd_opt(year, month, day);
    vec![
        ChassisRecord {
            unit: "CH-101".to_string(),
            plate: "4ABC123".to_string(),
            vin: "1G1YY26U775123456".to_string(),
            registration_due: on(11, 15),
            annual_due: on(9, 1),
            bit_due: on(8, 25),
            notes: "Needs reflector replacement".to_string(),
            ..ChassisRecord::new(ids.next_id())
        },
        ChassisRecord {
            unit: "CH-202".to_string(),
            plate: "9XYZ789".to_string(),
            vin: "3N1AB7AP6FY256789".to_string(),
            registration_due: on(1, 31),
            annual_due: on(12, 20),
            bit_due: on(11, 5),
            ..ChassisRecord::new(ids.next_id())
        },
    ]
}
