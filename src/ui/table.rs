use std::io::{self, Write};

use crate::api::models::Contact;

const COLUMNS: [&str; 13] = [
    "", "ID", "First", "Last", "Phone", "Email", "Category", "Country", "Address", "City",
    "Birthday", "Labels", "Notes",
];

fn cells(c: &Contact) -> [String; 13] {
    [
        if c.favorite { "★" } else { "☆" }.to_string(),
        c.id.clone(),
        c.first_name.clone(),
        c.last_name.clone(),
        c.phone.clone(),
        c.email.clone(),
        c.category.clone(),
        c.country.clone(),
        c.address.clone(),
        c.city.clone(),
        c.birthday.clone(),
        c.labels.join(", "),
        c.notes.clone(),
    ]
}

fn join_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, w)| format!("{cell:<w$}", w = *w))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

/// Writes the contacts as an aligned text table, one row per contact.
pub fn render<W: Write>(out: &mut W, contacts: &[&Contact]) -> io::Result<()> {
    if contacts.is_empty() {
        return writeln!(out, "(no contacts)");
    }
    let rows: Vec<[String; 13]> = contacts.iter().map(|c| cells(c)).collect();
    let mut widths: Vec<usize> = COLUMNS.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    writeln!(out, "{}", join_row(COLUMNS.iter().copied(), &widths))?;
    for row in &rows {
        writeln!(out, "{}", join_row(row.iter().map(String::as_str), &widths))?;
    }
    writeln!(out, "{} contact(s)", rows.len())
}
