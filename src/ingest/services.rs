use std::collections::HashMap;
use std::io::{BufRead, BufReader, Seek, Write};

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use sqlx::PgPool;
use tempfile::NamedTempFile;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::books::repo;
use crate::books::repo_types::{Book, EntryNumbers};

/// The fixed-format sales export carries this many banner lines before the
/// header row.
const BANNER_LINES: usize = 3;

/// Aggregate import acknowledgment. No per-row report is returned.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// One usable row of the report after parsing and coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub isbn: String,
    pub book_name: String,
    pub numbers: EntryNumbers,
}

/// Outcome of parsing a report body: the usable rows plus how many were
/// dropped as malformed.
#[derive(Debug, Default)]
pub struct ReportParse {
    pub rows: Vec<ParsedRow>,
    pub skipped: usize,
}

/// Header names are matched case- and punctuation-insensitively, so
/// "Opening Stock", "openingStock" and "opening_stock" all address the same
/// column.
fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

struct ColumnMap(HashMap<String, usize>);

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Self {
        Self(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (normalize_header(h), i))
                .collect(),
        )
    }

    fn get<'r>(&self, record: &'r StringRecord, key: &str) -> Option<&'r str> {
        self.0
            .get(key)
            .and_then(|&i| record.get(i))
            .map(str::trim)
    }
}

/// Best-effort integer coercion: blank or unparsable cells become 0.
/// Thousands separators are tolerated.
pub fn coerce_int(cell: Option<&str>) -> i64 {
    cell.map(|v| v.replace(',', ""))
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

/// Best-effort float coercion: blank or unparsable cells become 0.0.
pub fn coerce_float(cell: Option<&str>) -> f64 {
    cell.map(|v| v.replace(',', ""))
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Parses the report body. Rows without an ISBN or book name are skipped
/// silently; a malformed row never aborts the rest of the file.
pub fn parse_report<R: BufRead>(mut input: R) -> anyhow::Result<ReportParse> {
    for _ in 0..BANNER_LINES {
        let mut discard = String::new();
        if input.read_line(&mut discard)? == 0 {
            // File ends inside the banner: nothing to import.
            return Ok(ReportParse::default());
        }
    }

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            warn!(error = %e, "unreadable header row, nothing imported");
            return Ok(ReportParse::default());
        }
    };
    let columns = ColumnMap::from_headers(&headers);

    let mut parse = ReportParse::default();
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "unreadable row skipped");
                parse.skipped += 1;
                continue;
            }
        };

        let isbn = columns.get(&record, "isbn").unwrap_or_default();
        let book_name = columns.get(&record, "bookname").unwrap_or_default();
        if isbn.is_empty() || book_name.is_empty() {
            parse.skipped += 1;
            continue;
        }

        let numbers = EntryNumbers {
            opening_stock: coerce_int(columns.get(&record, "openingstock")),
            printed_copies: coerce_int(columns.get(&record, "printedcopies")),
            sold_copies: coerce_int(columns.get(&record, "soldcopies")),
            return_copies: coerce_int(columns.get(&record, "returncopies")),
            mrp: coerce_float(columns.get(&record, "mrp")),
            amount: coerce_float(columns.get(&record, "amount")),
            complimentary_damage: coerce_int(columns.get(&record, "complimentarydamage")),
            closing_stock: coerce_int(columns.get(&record, "closingstock")),
        };

        parse.rows.push(ParsedRow {
            isbn: isbn.to_string(),
            book_name: book_name.to_string(),
            numbers,
        });
    }

    Ok(parse)
}

/// Runs the full pipeline: spool the upload to a scoped temp file, parse it,
/// then find-or-create each book and append one entry per usable row with the
/// caller-supplied period bounds.
///
/// There is no transactional wrapper: a failure partway leaves the rows
/// already inserted in place. The temp file is removed on every path.
pub async fn run_import(
    db: &PgPool,
    owner_id: Uuid,
    from_date: OffsetDateTime,
    to_date: OffsetDateTime,
    payload: &[u8],
) -> anyhow::Result<ImportSummary> {
    let mut spool = NamedTempFile::new()?;
    spool.write_all(payload)?;
    spool.rewind()?;
    let parse = parse_report(BufReader::new(spool.as_file()))?;
    drop(spool);

    let mut summary = ImportSummary {
        imported: 0,
        skipped: parse.skipped,
    };

    for row in parse.rows {
        let book = Book::find_or_create(db, &row.isbn, &row.book_name, owner_id).await?;
        repo::insert_entry(db, book.id, from_date, to_date, &row.numbers).await?;
        summary.imported += 1;
    }

    debug!(
        imported = summary.imported,
        skipped = summary.skipped,
        owner = %owner_id,
        "import finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const BANNER: &str = "ACME PUBLISHING HOUSE\nQuarterly stock and sales report\n\n";

    fn parse(body: &str) -> ReportParse {
        let full = format!("{BANNER}{body}");
        parse_report(Cursor::new(full.into_bytes())).expect("parse should not fail")
    }

    #[test]
    fn parses_rows_after_banner() {
        let parse = parse(
            "ISBN,Book Name,Opening Stock,Printed Copies,Sold Copies,Return Copies,MRP,Amount,Complimentary/Damage,Closing Stock\n\
             A1,First Book,10,5,3,0,250,750,1,11\n\
             A2,Second Book,7,0,2,1,99.50,199,0,4\n",
        );
        assert_eq!(parse.skipped, 0);
        assert_eq!(parse.rows.len(), 2);

        let first = &parse.rows[0];
        assert_eq!(first.isbn, "A1");
        assert_eq!(first.book_name, "First Book");
        assert_eq!(first.numbers.opening_stock, 10);
        assert_eq!(first.numbers.sold_copies, 3);
        assert_eq!(first.numbers.mrp, 250.0);
        assert_eq!(first.numbers.complimentary_damage, 1);

        let second = &parse.rows[1];
        assert_eq!(second.numbers.mrp, 99.5);
        assert_eq!(second.numbers.closing_stock, 4);
    }

    #[test]
    fn header_lookup_ignores_case_and_punctuation() {
        let parse = parse(
            "isbn,bookName,opening_stock,soldCopies\n\
             A1,First Book,12,3\n",
        );
        assert_eq!(parse.rows.len(), 1);
        assert_eq!(parse.rows[0].numbers.opening_stock, 12);
        assert_eq!(parse.rows[0].numbers.sold_copies, 3);
    }

    #[test]
    fn blank_isbn_or_name_skips_row_without_aborting() {
        let parse = parse(
            "ISBN,Book Name,Sold Copies\n\
             ,Missing Isbn,1\n\
             A1,,2\n\
             A2,Kept,3\n",
        );
        assert_eq!(parse.skipped, 2);
        assert_eq!(parse.rows.len(), 1);
        assert_eq!(parse.rows[0].isbn, "A2");
        assert_eq!(parse.rows[0].numbers.sold_copies, 3);
    }

    #[test]
    fn whitespace_only_isbn_counts_as_blank() {
        let parse = parse(
            "ISBN,Book Name,Sold Copies\n\
             \"   \",Padded,1\n",
        );
        assert_eq!(parse.skipped, 1);
        assert!(parse.rows.is_empty());
    }

    #[test]
    fn unparsable_numerics_default_to_zero() {
        let parse = parse(
            "ISBN,Book Name,Opening Stock,Sold Copies,MRP,Amount\n\
             A1,First Book,n/a,,abc,\n",
        );
        let n = &parse.rows[0].numbers;
        assert_eq!(n.opening_stock, 0);
        assert_eq!(n.sold_copies, 0);
        assert_eq!(n.mrp, 0.0);
        assert_eq!(n.amount, 0.0);
    }

    #[test]
    fn missing_columns_default_to_zero() {
        let parse = parse(
            "ISBN,Book Name\n\
             A1,First Book\n",
        );
        assert_eq!(parse.rows[0].numbers, EntryNumbers::default());
    }

    #[test]
    fn thousands_separators_are_tolerated() {
        let parse = parse(
            "ISBN,Book Name,Printed Copies,Amount\n\
             A1,First Book,\"1,250\",\"12,500.75\"\n",
        );
        assert_eq!(parse.rows[0].numbers.printed_copies, 1250);
        assert_eq!(parse.rows[0].numbers.amount, 12500.75);
    }

    #[test]
    fn file_ending_inside_banner_yields_nothing() {
        let parse = parse_report(Cursor::new(b"only one line\n".to_vec()))
            .expect("short file should not fail");
        assert!(parse.rows.is_empty());
        assert_eq!(parse.skipped, 0);
    }

    #[test]
    fn empty_file_yields_nothing() {
        let parse = parse_report(Cursor::new(Vec::new())).expect("empty file should not fail");
        assert!(parse.rows.is_empty());
    }

    #[test]
    fn coercion_defaults() {
        assert_eq!(coerce_int(None), 0);
        assert_eq!(coerce_int(Some("")), 0);
        assert_eq!(coerce_int(Some("x")), 0);
        assert_eq!(coerce_int(Some(" 42 ")), 42);
        assert_eq!(coerce_int(Some("-3")), -3);
        assert_eq!(coerce_float(None), 0.0);
        assert_eq!(coerce_float(Some("")), 0.0);
        assert_eq!(coerce_float(Some("19.99")), 19.99);
    }
}
