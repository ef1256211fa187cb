//! Plain comma-separated export/import of the working set.
//!
//! The format is positional and unescaped: a comma inside any field other than labels shifts
//! every later column on the way back in. Labels travel as one double-quoted column joined
//! with `"; "`.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::api::models::Contact;

pub const HEADER: &str =
    "ID,First Name,Last Name,Phone,Email,Category,Country,Birthday,Address,City,Labels,Notes,ImageURL";
pub const DEFAULT_FILE_NAME: &str = "contacts.csv";

const LABELS_COLUMN: usize = 10;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn line_for(c: &Contact) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{},\"{}\",{},{}",
        c.id,
        c.first_name,
        c.last_name,
        c.phone,
        c.email,
        c.category,
        c.country,
        c.birthday,
        c.address,
        c.city,
        c.labels.join("; "),
        c.notes,
        c.image_url,
    )
}

pub fn to_csv(contacts: &[Contact]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + contacts.len() * 64);
    out.push_str(HEADER);
    out.push('\n');
    for c in contacts {
        out.push_str(&line_for(c));
        out.push('\n');
    }
    out
}

fn parse_labels(raw: &str) -> Vec<String> {
    let raw = raw.strip_prefix('"').unwrap_or(raw);
    let raw = raw.strip_suffix('"').unwrap_or(raw);
    // blank entries are kept on import
    raw.split(';').map(|l| l.trim().to_string()).collect()
}

fn parse_line(line: &str) -> Option<Contact> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let fields: Vec<&str> = line.split(',').collect();
    let col = |i: usize| fields.get(i).copied().unwrap_or_default().to_string();

    let id = col(0);
    let first_name = col(1);
    if id.is_empty() || first_name.is_empty() {
        return None;
    }
    let labels = fields
        .get(LABELS_COLUMN)
        .map(|raw| parse_labels(raw))
        .unwrap_or_default();

    Some(Contact {
        id,
        first_name,
        last_name: col(2),
        phone: col(3),
        email: col(4),
        category: col(5),
        country: col(6),
        birthday: col(7),
        address: col(8),
        city: col(9),
        labels,
        notes: col(11),
        image_url: col(12),
        favorite: false,
    })
}

/// Parses an exported blob. The first line is taken as the header and dropped; lines missing
/// an id or a first name are skipped without report.
pub fn from_csv(text: &str) -> Vec<Contact> {
    text.split('\n').skip(1).filter_map(parse_line).collect()
}

pub fn write_file(path: &Path, contacts: &[Contact]) -> Result<()> {
    fs::write(path, to_csv(contacts)).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn read_file(path: &Path) -> Result<Vec<Contact>> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(from_csv(&text))
}
