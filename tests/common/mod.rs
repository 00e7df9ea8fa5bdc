//! Fixture builders shared by the integration tests.
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn tmp_file(name: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("sheet-stream-{name}-{nanos}.{ext}"))
}

const BOF: u16 = 0x0809;
const EOF: u16 = 0x000A;
const SST: u16 = 0x00FC;
const LABELSST: u16 = 0x00FD;
const NUMBER: u16 = 0x0203;
const BOOLERR: u16 = 0x0205;
const FORMULA: u16 = 0x0006;
const STRING: u16 = 0x0207;
const XF: u16 = 0x00E0;
const DATEMODE: u16 = 0x0022;

const XF_GENERAL: u16 = 0;
const XF_DATE: u16 = 1;

/// A cell in a hand-built `.xls` fixture.
#[derive(Debug, Clone, Copy)]
pub enum XlsCell {
    Text(&'static str),
    Number(f64),
    /// A serial number formatted with the built-in date format 14.
    Date(f64),
    Bool(bool),
    /// Formula with a cached string result (`FORMULA` followed by `STRING`).
    FormulaText(&'static str),
    /// No record at all.
    Empty,
}

fn record(id: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 4);
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn bof(kind: u16) -> Vec<u8> {
    let mut payload = 0x0600u16.to_le_bytes().to_vec();
    payload.extend_from_slice(&kind.to_le_bytes());
    payload.extend_from_slice(&[0; 12]);
    record(BOF, &payload)
}

fn compressed_string(s: &str) -> Vec<u8> {
    let mut out = (s.len() as u16).to_le_bytes().to_vec();
    out.push(0);
    out.extend_from_slice(s.as_bytes());
    out
}

fn cell_header(row: u16, col: u16, xf: u16) -> Vec<u8> {
    let mut out = row.to_le_bytes().to_vec();
    out.extend_from_slice(&col.to_le_bytes());
    out.extend_from_slice(&xf.to_le_bytes());
    out
}

fn xf(ifmt: u16) -> Vec<u8> {
    let mut payload = vec![0, 0];
    payload.extend_from_slice(&ifmt.to_le_bytes());
    payload.extend_from_slice(&[0; 16]);
    record(XF, &payload)
}

/// Builds a minimal BIFF8 workbook wrapped in an OLE2 compound file.
#[derive(Debug, Default)]
pub struct XlsBook {
    strings: Vec<String>,
    substreams: Vec<Vec<u8>>,
    date_1904: bool,
}

impl XlsBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date_1904(mut self) -> Self {
        self.date_1904 = true;
        self
    }

    fn intern(&mut self, s: &str) -> u32 {
        match self.strings.iter().position(|x| x == s) {
            Some(i) => i as u32,
            None => {
                self.strings.push(s.to_string());
                (self.strings.len() - 1) as u32
            }
        }
    }

    /// Append a worksheet; `rows[i]` is row `i`. An empty slice leaves the row out entirely.
    pub fn sheet(mut self, rows: &[&[XlsCell]]) -> Self {
        let mut out = bof(0x0010);
        for (r, cells) in rows.iter().enumerate() {
            let r = r as u16;
            for (c, cell) in cells.iter().enumerate() {
                let c = c as u16;
                match *cell {
                    XlsCell::Text(s) => {
                        let index = self.intern(s);
                        let mut payload = cell_header(r, c, XF_GENERAL);
                        payload.extend_from_slice(&index.to_le_bytes());
                        out.extend(record(LABELSST, &payload));
                    }
                    XlsCell::Number(v) | XlsCell::Date(v) => {
                        let xf = if matches!(cell, XlsCell::Date(_)) { XF_DATE } else { XF_GENERAL };
                        let mut payload = cell_header(r, c, xf);
                        payload.extend_from_slice(&v.to_le_bytes());
                        out.extend(record(NUMBER, &payload));
                    }
                    XlsCell::Bool(b) => {
                        let mut payload = cell_header(r, c, XF_GENERAL);
                        payload.extend_from_slice(&[u8::from(b), 0]);
                        out.extend(record(BOOLERR, &payload));
                    }
                    XlsCell::FormulaText(s) => {
                        let mut payload = cell_header(r, c, XF_GENERAL);
                        payload.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0xFF, 0xFF]);
                        payload.extend_from_slice(&[0; 6]);
                        out.extend(record(FORMULA, &payload));
                        out.extend(record(STRING, &compressed_string(s)));
                    }
                    XlsCell::Empty => {}
                }
            }
        }
        out.extend(record(EOF, &[]));
        self.substreams.push(out);
        self
    }

    /// Append a chart substream, which readers must skip without counting it as a worksheet.
    pub fn chart(mut self) -> Self {
        let mut out = bof(0x0020);
        let mut payload = cell_header(0, 0, XF_GENERAL);
        payload.extend_from_slice(&1.5f64.to_le_bytes());
        out.extend(record(NUMBER, &payload));
        out.extend(record(EOF, &[]));
        self.substreams.push(out);
        self
    }

    /// Raw `Workbook` stream bytes.
    pub fn workbook_stream(&self) -> Vec<u8> {
        let mut out = bof(0x0005);
        out.extend(record(DATEMODE, &u16::from(self.date_1904).to_le_bytes()));
        out.extend(xf(0));
        out.extend(xf(14));

        let mut sst = (self.strings.len() as u32).to_le_bytes().to_vec();
        sst.extend_from_slice(&(self.strings.len() as u32).to_le_bytes());
        for s in &self.strings {
            sst.extend(compressed_string(s));
        }
        out.extend(record(SST, &sst));
        out.extend(record(EOF, &[]));

        for substream in &self.substreams {
            out.extend_from_slice(substream);
        }
        out
    }

    /// Compound file bytes, ready to be written to disk or read from memory.
    pub fn build(&self) -> Vec<u8> {
        ole_with_stream("Workbook", &self.workbook_stream())
    }
}

pub fn ole_with_stream(name: &str, bytes: &[u8]) -> Vec<u8> {
    let cursor = Cursor::new(Vec::new());
    let mut ole = cfb::CompoundFile::create(cursor).expect("create cfb");
    {
        let mut stream = ole.create_stream(name).expect("create stream");
        stream.write_all(bytes).expect("write stream");
    }
    ole.into_inner().into_inner()
}

/// The two-row `Name`/`Age` workbook used throughout the tests.
pub fn people_xls() -> Vec<u8> {
    use XlsCell::*;
    XlsBook::new()
        .sheet(&[
            &[Text("Name"), Text("Age")],
            &[Text("Ann"), Number(30.0)],
            &[Text("Bob"), Number(41.0)],
        ])
        .build()
}

pub fn people_xlsx() -> Vec<u8> {
    use rust_xlsxwriter::Workbook;

    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, "Name").unwrap();
    ws.write_string(0, 1, "Age").unwrap();
    ws.write_string(1, 0, "Ann").unwrap();
    ws.write_number(1, 1, 30).unwrap();
    ws.write_string(2, 0, "Bob").unwrap();
    ws.write_number(2, 1, 41).unwrap();
    wb.save_to_buffer().unwrap()
}

/// Copy an `.xlsx` package, passing every part through `patch` (part name, contents).
pub fn patch_xlsx(bytes: &[u8], patch: impl Fn(&str, Vec<u8>) -> Vec<u8>) -> Vec<u8> {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut out = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for i in 0..archive.len() {
        let mut part = archive.by_index(i).unwrap();
        let name = part.name().to_string();
        let mut data = Vec::new();
        part.read_to_end(&mut data).unwrap();
        drop(part);
        out.start_file(name.as_str(), options).unwrap();
        out.write_all(&patch(&name, data)).unwrap();
    }
    out.finish().unwrap().into_inner()
}

/// Switch a workbook written by `rust_xlsxwriter` to the 1904 date system. Stored serials are
/// left as they are, so every date moves 1462 days later.
pub fn with_1904_dates(bytes: &[u8]) -> Vec<u8> {
    patch_xlsx(bytes, |name, data| {
        if name != "xl/workbook.xml" {
            return data;
        }
        let xml = String::from_utf8(data).unwrap();
        assert!(xml.contains("<workbookPr"), "{xml}");
        xml.replacen("<workbookPr", "<workbookPr date1904=\"1\"", 1).into_bytes()
    })
}
