use rust_xlsxwriter::{Workbook, XlsxError};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::import::EntityKind;
use crate::import::formats::FileFormat;

/// A rendered export, ready to be sent as a download.
#[derive(Debug)]
pub struct ExportFile {
    pub file_name: String,
    pub format: FileFormat,
    pub bytes: Vec<u8>,
}

/// Renders records as a download. Zero records produce no file.
pub fn export_records<E: Serialize>(
    kind: EntityKind,
    format: FileFormat,
    records: &[E],
) -> Result<ExportFile, AppError> {
    if records.is_empty() {
        return Err(AppError::NoData(format!("There are no {} to export", kind.as_str())));
    }

    let bytes = match format {
        FileFormat::Json => to_json(records)?,
        FileFormat::Xlsx => to_xlsx(kind, records)?,
        FileFormat::Csv => {
            return Err(AppError::BadRequest("CSV export is not supported".to_string()));
        }
    };

    Ok(ExportFile {
        file_name: format!("{}_export.{}", kind.as_str(), format.extension()),
        format,
        bytes,
    })
}

/// Pretty JSON with a two-space indent. Timestamps serialize as ISO strings.
pub fn to_json<E: Serialize>(records: &[E]) -> Result<Vec<u8>, AppError> {
    serde_json::to_vec_pretty(records).map_err(|e| AppError::Export(e.to_string()))
}

/// One flat sheet. Columns follow the first record's fields, nested values
/// are written as JSON text.
pub fn to_xlsx<E: Serialize>(kind: EntityKind, records: &[E]) -> Result<Vec<u8>, AppError> {
    let objects = records
        .iter()
        .map(|record| match serde_json::to_value(record) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(AppError::Export("record is not an object".to_string())),
            Err(e) => Err(AppError::Export(e.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut headers: Vec<String> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    write_sheet(kind, &headers, &objects).map_err(|e| AppError::Export(e.to_string()))
}

fn write_sheet(
    kind: EntityKind,
    headers: &[String],
    objects: &[serde_json::Map<String, Value>],
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(kind.as_str())?;

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }

    for (index, object) in objects.iter().enumerate() {
        let row = index as u32 + 1;
        for (col, header) in headers.iter().enumerate() {
            let col = col as u16;
            match object.get(header) {
                None | Some(Value::Null) => {}
                Some(Value::String(s)) => {
                    worksheet.write_string(row, col, s)?;
                }
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(f) => {
                        worksheet.write_number(row, col, f)?;
                    }
                    None => {
                        worksheet.write_string(row, col, n.to_string())?;
                    }
                },
                Some(nested) => {
                    worksheet.write_string(row, col, nested.to_string())?;
                }
            }
        }
    }

    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::formats::parse_rows;
    use crate::models::Tag;
    use serde_json::json;

    fn tags() -> Vec<Tag> {
        vec![
            Tag { id: "t1".to_string(), name: "algebra".to_string() },
            Tag { id: "t2".to_string(), name: "geometry".to_string() },
        ]
    }

    #[test]
    fn empty_export_produces_no_file() {
        let err = export_records::<Tag>(EntityKind::Tag, FileFormat::Json, &[]).unwrap_err();
        assert!(matches!(err, AppError::NoData(_)));
    }

    #[test]
    fn json_export_is_pretty_printed() {
        let file = export_records(EntityKind::Tag, FileFormat::Json, &tags()).expect("export");
        let text = String::from_utf8(file.bytes).expect("utf8");
        assert!(text.starts_with("[\n  {\n    \"id\": \"t1\""));
        assert_eq!(file.file_name, "tags_export.json");
    }

    #[test]
    fn xlsx_export_reads_back_as_rows() {
        let file = export_records(EntityKind::Tag, FileFormat::Xlsx, &tags()).expect("export");
        let rows = parse_rows(FileFormat::Xlsx, &file.bytes).expect("read back");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("name"), Some(&json!("geometry")));
    }

    #[test]
    fn xlsx_export_stringifies_nested_values() {
        #[derive(Serialize)]
        struct WithList {
            id: &'static str,
            tag_ids: Vec<&'static str>,
        }

        let bytes = to_xlsx(EntityKind::Question, &[WithList { id: "q1", tag_ids: vec!["a", "b"] }])
            .expect("export");
        let rows = parse_rows(FileFormat::Xlsx, &bytes).expect("read back");
        assert_eq!(rows[0].get("tag_ids"), Some(&json!("[\"a\",\"b\"]")));
    }
}
