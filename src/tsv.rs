use std::io::{Read, Write};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::error::ImportError;

/// GISAID export column headers mapped to the canonical vocabulary the
/// loader consumes. Columns already using canonical names pass through.
const HEADER_TRANSLATIONS: &[(&str, &str)] = &[
    ("Virus name", "strain"),
    ("Accession ID", "gisaid_epi_isl"),
    ("Collection date", "date"),
    ("Submission date", "date_submitted"),
    ("Host", "host"),
    ("Passage details/history", "passage"),
    ("Gender", "sex"),
    ("Patient age", "age"),
    ("Sequence length", "length"),
    ("Originating lab", "originating_lab"),
    ("Submitting lab", "submitting_lab"),
    ("Authors", "authors"),
    ("Clade", "GISAID_clade"),
    ("Pango lineage", "pangolin_lineage"),
    ("Lineage", "pangolin_lineage"),
];

/// The composite "Location" column ("Asia / China / Hubei / Wuhan") expands
/// into these four canonical columns.
const LOCATION_COLUMNS: [&str; 4] = ["region", "country", "division", "location"];

pub fn translate_header(header: &str) -> &str {
    let trimmed = header.trim();
    HEADER_TRANSLATIONS
        .iter()
        .find(|(from, _)| *from == trimmed)
        .map(|(_, to)| *to)
        .unwrap_or(trimmed)
}

/// Stream a metadata TSV, rewriting its header row into the canonical
/// vocabulary and trimming cell whitespace. A composite `Location` column is
/// split into region/country/division/location.
pub fn translate<R: Read, W: Write>(reader: R, writer: W) -> Result<u64, ImportError> {
    let mut input = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader);
    let mut output = WriterBuilder::new().delimiter(b'\t').from_writer(writer);

    let headers = input
        .headers()
        .map_err(|err| ImportError::Tabular(err.to_string()))?
        .clone();
    let location_index = headers.iter().position(|header| header.trim() == "Location");

    let mut translated_headers = Vec::new();
    for (index, header) in headers.iter().enumerate() {
        if Some(index) == location_index {
            translated_headers.extend(LOCATION_COLUMNS.iter().map(|name| name.to_string()));
        } else {
            translated_headers.push(translate_header(header).to_string());
        }
    }
    output
        .write_record(&translated_headers)
        .map_err(|err| ImportError::Tabular(err.to_string()))?;

    let mut rows = 0u64;
    for record in input.records() {
        // the reader rejects rows whose field count differs from the header
        let record = record.map_err(|err| ImportError::Tabular(err.to_string()))?;

        let mut fields = Vec::with_capacity(translated_headers.len());
        for (index, field) in record.iter().enumerate() {
            if Some(index) == location_index {
                fields.extend(split_location(field));
            } else {
                fields.push(field.trim().to_string());
            }
        }
        output
            .write_record(&fields)
            .map_err(|err| ImportError::Tabular(err.to_string()))?;
        rows += 1;
    }

    output
        .flush()
        .map_err(|err| ImportError::Filesystem(err.to_string()))?;
    Ok(rows)
}

fn split_location(value: &str) -> [String; 4] {
    let mut parts = value.split('/').map(|part| part.trim().to_string());
    [
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default(),
    ]
}

/// Read a translated TSV into header + rows for the filtering and loading
/// steps. Small files only; the weekly export is a few thousand rows.
pub fn read_rows<R: Read>(reader: R) -> Result<(StringRecord, Vec<StringRecord>), ImportError> {
    let mut input = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader);
    let headers = input
        .headers()
        .map_err(|err| ImportError::Tabular(err.to_string()))?
        .clone();
    let mut rows = Vec::new();
    for record in input.records() {
        rows.push(record.map_err(|err| ImportError::Tabular(err.to_string()))?);
    }
    Ok((headers, rows))
}

pub fn column_index(headers: &StringRecord, name: &str) -> Result<usize, ImportError> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| ImportError::MissingColumn(name.to_string()))
}

pub fn write_rows<W: Write>(
    writer: W,
    headers: &StringRecord,
    rows: &[StringRecord],
) -> Result<(), ImportError> {
    let mut output = WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    output
        .write_record(headers)
        .map_err(|err| ImportError::Tabular(err.to_string()))?;
    for row in rows {
        output
            .write_record(row)
            .map_err(|err| ImportError::Tabular(err.to_string()))?;
    }
    output
        .flush()
        .map_err(|err| ImportError::Filesystem(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn translate_str(input: &str) -> String {
        let mut out = Vec::new();
        translate(input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn translates_known_headers() {
        let input = "Virus name\tAccession ID\tCollection date\nhCoV-19/x\tEPI_ISL_1\t2020-03-01\n";
        let output = translate_str(input);
        let mut lines = output.lines();
        assert_eq!(lines.next().unwrap(), "strain\tgisaid_epi_isl\tdate");
        assert_eq!(lines.next().unwrap(), "hCoV-19/x\tEPI_ISL_1\t2020-03-01");
    }

    #[test]
    fn preserves_unknown_headers() {
        let input = "strain\tcustom_field\na\tb\n";
        let output = translate_str(input);
        assert!(output.starts_with("strain\tcustom_field\n"));
    }

    #[test]
    fn splits_composite_location() {
        let input = "Virus name\tLocation\nx\tAsia / China / Hubei / Wuhan\n";
        let output = translate_str(input);
        let mut lines = output.lines();
        assert_eq!(
            lines.next().unwrap(),
            "strain\tregion\tcountry\tdivision\tlocation"
        );
        assert_eq!(lines.next().unwrap(), "x\tAsia\tChina\tHubei\tWuhan");
    }

    #[test]
    fn pads_short_location() {
        let input = "Virus name\tLocation\nx\tEurope / Germany\n";
        let output = translate_str(input);
        assert!(output.ends_with("x\tEurope\tGermany\t\t\n"));
    }

    #[test]
    fn trims_cell_whitespace() {
        let input = "strain\thost\n  a  \t Human \n";
        let output = translate_str(input);
        assert!(output.ends_with("a\tHuman\n"));
    }

    #[test]
    fn rejects_ragged_rows() {
        let input = "strain\thost\nonly-one-field\n";
        let mut out = Vec::new();
        let err = translate(input.as_bytes(), &mut out).unwrap_err();
        assert_matches!(err, ImportError::Tabular(_));
    }

    #[test]
    fn column_index_reports_missing() {
        let (headers, _) = read_rows("strain\thost\na\tHuman\n".as_bytes()).unwrap();
        assert_eq!(column_index(&headers, "strain").unwrap(), 0);
        let err = column_index(&headers, "gisaid_epi_isl").unwrap_err();
        assert_matches!(err, ImportError::MissingColumn(_));
    }
}
