//! Reading already-exported transactions for bulk categorization

use std::io::{BufRead, BufReader, Read};

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::PreviewTransaction;

/// Column positions resolved from the header row
struct Columns {
    description: usize,
    merchant: Option<usize>,
    amount: Option<usize>,
    category_id: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        let description = find(&["description"])
            .ok_or_else(|| Error::Import("Missing 'description' column".into()))?;

        Ok(Self {
            description,
            merchant: find(&["merchant", "merchant_name"]),
            amount: find(&["amount"]),
            category_id: find(&["category_id"]),
        })
    }
}

/// Parse CSV rows into preview transactions
///
/// Headers are matched case-insensitively. Only `description` is required;
/// unparsable optional fields are left empty.
pub fn parse_transactions_csv<R: Read>(reader: R) -> Result<Vec<PreviewTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = Columns::from_headers(&headers)?;
    let mut transactions = Vec::new();

    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let field = |col: Option<usize>| {
            col.and_then(|i| record.get(i))
                .filter(|v| !v.is_empty())
        };

        let description = record.get(columns.description).unwrap_or_default().to_string();

        let amount = field(columns.amount).and_then(|v| match parse_amount(v) {
            Ok(amount) => Some(amount),
            Err(e) => {
                warn!("Row {}: {}", row + 2, e);
                None
            }
        });

        let category_id = field(columns.category_id).and_then(|v| match v.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("Row {}: ignoring category_id '{}'", row + 2, v);
                None
            }
        });

        transactions.push(PreviewTransaction {
            description,
            merchant_name: field(columns.merchant).map(str::to_string),
            amount,
            category_id,
        });
    }

    debug!("Parsed {} transactions from CSV", transactions.len());
    Ok(transactions)
}

/// One description per non-empty line
pub fn parse_descriptions<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut descriptions = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            descriptions.push(line.to_string());
        }
    }
    Ok(descriptions)
}

/// Parse "$1,234.56", "(12.00)" or "-5" into a number
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))
}
