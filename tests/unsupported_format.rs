mod common;

use std::io::Cursor;

use sheet_stream::{ContainerFormat, Reader, ReaderOptions, RowMap, SheetError, Source};

fn open(bytes: Vec<u8>) -> SheetError {
    Reader::<RowMap>::open(bytes).err().unwrap()
}

#[test]
fn unknown_bytes_are_not_supported() {
    let err = open(b"Name,Age\nAnn,30\n".to_vec());
    assert!(matches!(err, SheetError::FileNotSupported { .. }), "{err:?}");
    assert!(err.to_string().contains("file not supported"));
}

#[test]
fn empty_input_is_not_supported() {
    assert!(matches!(open(Vec::new()), SheetError::FileNotSupported { .. }));

    let empty = Source::from_reader(Cursor::new(Vec::<u8>::new()));
    let err = Reader::<RowMap>::open(empty).err().unwrap();
    assert!(matches!(err, SheetError::FileNotSupported { .. }));
}

#[test]
fn truncated_containers_are_not_supported() {
    let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    bytes.extend([0u8; 24]);
    assert!(matches!(open(bytes), SheetError::FileNotSupported { .. }));

    let zip = b"PK\x03\x04garbage".to_vec();
    assert!(matches!(open(zip), SheetError::FileNotSupported { .. }));
}

#[cfg(feature = "xls")]
#[test]
fn compound_file_without_a_workbook_stream_is_not_supported() {
    let bytes = common::ole_with_stream("WordDocument", b"not a workbook");
    let err = open(bytes);
    assert!(err.to_string().contains("Workbook"), "{err}");
}

#[cfg(all(feature = "xls", feature = "xlsx"))]
#[test]
fn forcing_the_wrong_format_fails_at_open() {
    let options = ReaderOptions {
        format: Some(ContainerFormat::Xlsx),
        ..Default::default()
    };
    let err = Reader::<RowMap>::open_with(common::people_xls(), options).err().unwrap();
    assert!(matches!(err, SheetError::FileNotSupported { .. }));
}
