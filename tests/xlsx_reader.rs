#![cfg(feature = "xlsx")]

mod common;

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use common::{patch_xlsx, people_xlsx, tmp_file, with_1904_dates};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use sheet_stream::convert::{FieldSpec, Record, SchemaBuilder};
use sheet_stream::{ContainerFormat, DecodeError, Reader, ReaderOptions, RowMap, SheetError};

#[test]
fn header_row_becomes_keys() {
    let path = tmp_file("people", "xlsx");
    std::fs::write(&path, people_xlsx()).unwrap();

    let mut reader = sheet_stream::open(&path).unwrap().with_header_from_first_row();
    assert_eq!(reader.format(), ContainerFormat::Xlsx);

    let first = reader.next_row().unwrap().unwrap();
    assert_eq!(first.get("Name"), Some("Ann"));
    assert_eq!(first.get("Age"), Some("30"));
    let second = reader.next_row().unwrap().unwrap();
    assert_eq!(second.get("Name"), Some("Bob"));
    assert!(reader.next_row().unwrap().is_none());
    assert!(reader.next_row().unwrap().is_none());

    let _ = std::fs::remove_file(path);
}

#[test]
fn every_sheet_is_read_in_order() {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, "id").unwrap();
    ws.write_number(1, 0, 1).unwrap();
    let ws = wb.add_worksheet();
    ws.write_number(0, 0, 2).unwrap();
    ws.write_number(1, 0, 3).unwrap();
    let bytes = wb.save_to_buffer().unwrap();

    let rows = Reader::<RowMap>::open(bytes)
        .unwrap()
        .with_header_from_first_row()
        .read_all()
        .unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.get("id").unwrap()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[test]
fn gaps_booleans_and_dates() {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    for (c, title) in ["a", "b", "c", "d"].iter().enumerate() {
        ws.write_string(0, c as u16, *title).unwrap();
    }
    ws.write_string(1, 0, "x").unwrap();
    ws.write_boolean(1, 3, false).unwrap();
    let date = ExcelDateTime::from_ymd(1900, 2, 14).unwrap();
    let format = Format::new().set_num_format("yyyy-mm-dd");
    ws.write_datetime_with_format(2, 1, &date, &format).unwrap();
    let bytes = wb.save_to_buffer().unwrap();

    let rows = Reader::<RowMap>::open(bytes)
        .unwrap()
        .with_header_from_first_row()
        .read_all()
        .unwrap();
    assert_eq!(rows.len(), 2);
    let first: Vec<_> = rows[0].iter().collect();
    assert_eq!(first, vec![("a", "x"), ("b", ""), ("c", ""), ("d", "FALSE")]);
    assert_eq!(rows[1].get("a"), Some(""));
    assert_eq!(rows[1].get("b"), Some("45"));
}

fn dated_workbook() -> Vec<u8> {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, "When").unwrap();
    ws.write_string(0, 1, "Count").unwrap();
    let date = ExcelDateTime::from_ymd(2024, 1, 1).unwrap();
    let format = Format::new().set_num_format("yyyy-mm-dd");
    ws.write_datetime_with_format(1, 0, &date, &format).unwrap();
    ws.write_number(1, 1, 7).unwrap();
    wb.save_to_buffer().unwrap()
}

#[derive(Debug, Default)]
struct Event {
    when: Option<NaiveDate>,
}

impl Record for Event {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema.field(FieldSpec::named("when").title("When"), |e: &mut Event, v: Option<NaiveDate>| {
            e.when = v
        })
    }
}

#[test]
fn dates_in_1904_workbooks_are_normalized() {
    // Stored serial 45292 is 2024-01-01 in the 1900 system and 2028-01-02 in the 1904 one.
    let plain = Reader::<RowMap>::open(dated_workbook())
        .unwrap()
        .with_header_from_first_row()
        .next_row()
        .unwrap()
        .unwrap();
    assert_eq!(plain.get("When"), Some("45292"));

    let bytes = with_1904_dates(&dated_workbook());
    let shifted = Reader::<RowMap>::open(bytes.clone())
        .unwrap()
        .with_header_from_first_row()
        .next_row()
        .unwrap()
        .unwrap();
    assert_eq!(shifted.get("When"), Some("46754"));
    assert_eq!(shifted.get("Count"), Some("7"));

    let event = sheet_stream::Reader::<Event>::open(bytes)
        .unwrap()
        .with_header_from_first_row()
        .next_row()
        .unwrap()
        .unwrap();
    assert_eq!(event.when, NaiveDate::from_ymd_opt(2028, 1, 2));
}

#[test]
fn a_corrupt_worksheet_ends_the_reader_after_earlier_sheets() {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, "id").unwrap();
    ws.write_number(1, 0, 1).unwrap();
    let ws = wb.add_worksheet();
    ws.write_number(0, 0, 2).unwrap();
    let bytes = patch_xlsx(&wb.save_to_buffer().unwrap(), |name, data| {
        if name != "xl/worksheets/sheet2.xml" {
            return data;
        }
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
            r#"<sheetData><row r="1"><c r="A1" t="n"><v>not a number</v></c></row></sheetData>"#,
            r#"</worksheet>"#,
        )
        .as_bytes()
        .to_vec()
    });

    let mut reader = Reader::<RowMap>::open(bytes).unwrap().with_header_from_first_row();
    assert_eq!(reader.next_row().unwrap().unwrap().get("id"), Some("1"));

    let err = reader.next_row().unwrap_err();
    assert!(matches!(err, SheetError::Decode(DecodeError::Xlsx(_))), "{err:?}");
    assert!(err.is_fatal());
    assert!(reader.is_closed());
    assert!(reader.next_row().unwrap().is_none());
    assert_eq!(reader.metrics().snapshot().rows_emitted, 1);
}

fn big_workbook(rows: u32) -> Vec<u8> {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    for r in 0..rows {
        ws.write_number(r, 0, r).unwrap();
        ws.write_string(r, 1, "payload").unwrap();
    }
    wb.save_to_buffer().unwrap()
}

#[test]
fn dropping_a_partially_read_reader_stops_the_worker() {
    let options = ReaderOptions {
        handoff_capacity: 2,
        ..Default::default()
    };
    let mut reader = Reader::<RowMap>::open_with(big_workbook(5_000), options).unwrap();
    let first = reader.next_row().unwrap().unwrap();
    assert_eq!(first.get("A"), Some("0"));

    let started = Instant::now();
    drop(reader);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn slow_consumers_cause_backpressure_not_growth() {
    let options = ReaderOptions {
        handoff_capacity: 1,
        ..Default::default()
    };
    let mut reader = Reader::<RowMap>::open_with(big_workbook(50), options).unwrap();
    let mut count = 0;
    while let Some(row) = reader.next_row().unwrap() {
        if count < 3 {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(row.get("A"), Some(count.to_string().as_str()));
        count += 1;
    }
    assert_eq!(count, 50);
    assert!(reader.is_closed());
    assert!(reader.metrics().snapshot().backpressure_wait > Duration::ZERO);
}

#[test]
fn rows_iterator_consumes_the_reader() {
    let reader = Reader::<RowMap>::open(people_xlsx()).unwrap().with_header_from_first_row();
    let names: Vec<String> = reader
        .into_iter()
        .map(|r| r.unwrap().get("Name").unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Ann", "Bob"]);
}
