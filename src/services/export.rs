use anyhow::Context;

use crate::models::reservation::Reservation;

/// Spreadsheet-friendly CSV, one row per reservation, same columns as the
/// webhook payload.
pub fn reservations_csv(reservations: &[Reservation]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if reservations.is_empty() {
        writer.write_record(["id", "name", "roomNumber", "date", "isPaid", "createdAt"])?;
    }
    for reservation in reservations {
        writer.serialize(reservation)?;
    }
    let bytes = writer.into_inner().context("Failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn header_and_rows() {
        let reservation = Reservation {
            id: Uuid::nil(),
            name: "Taro, Yamada".into(),
            room_number: "0101".into(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            is_paid: true,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 2, 30, 0).unwrap(),
        };
        let csv = reservations_csv(&[reservation]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "id,name,roomNumber,date,isPaid,createdAt");
        assert_eq!(
            lines[1],
            "00000000-0000-0000-0000-000000000000,\"Taro, Yamada\",0101,2024-06-01,true,2024-06-01T02:30:00Z"
        );
    }

    #[test]
    fn empty_export_still_has_a_header() {
        let csv = reservations_csv(&[]).unwrap();
        assert_eq!(csv, "id,name,roomNumber,date,isPaid,createdAt\n");
    }
}
