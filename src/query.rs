//! Read-only views over the working set. Nothing here mutates the contacts it is given.

use std::cmp::Ordering;

use chrono::NaiveDate;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::api::models::Contact;

fn searchable_fields(c: &Contact) -> [std::borrow::Cow<'_, str>; 11] {
    use std::borrow::Cow::{Borrowed, Owned};
    [
        Borrowed(c.first_name.as_str()),
        Borrowed(c.last_name.as_str()),
        Borrowed(c.phone.as_str()),
        Borrowed(c.email.as_str()),
        Borrowed(c.category.as_str()),
        Borrowed(c.country.as_str()),
        Borrowed(c.address.as_str()),
        Borrowed(c.city.as_str()),
        Borrowed(c.birthday.as_str()),
        Owned(c.labels.join(" ")),
        Borrowed(c.notes.as_str()),
    ]
}

/// Case-insensitive substring search across the visible fields. An empty query matches all.
pub fn search<'a>(contacts: &'a [Contact], query: &str) -> Vec<&'a Contact> {
    let needle = query.trim().to_lowercase();
    contacts
        .iter()
        .filter(|c| {
            searchable_fields(c)
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

pub fn filter_by_category<'a>(contacts: &'a [Contact], category: &str) -> Vec<&'a Contact> {
    let wanted = category.to_lowercase();
    contacts
        .iter()
        .filter(|c| c.category.to_lowercase() == wanted)
        .collect()
}

pub fn filter_by_country<'a>(contacts: &'a [Contact], country: &str) -> Vec<&'a Contact> {
    let wanted = country.to_lowercase();
    contacts
        .iter()
        .filter(|c| c.country.to_lowercase() == wanted)
        .collect()
}

/// Favorite contacts, or `None` when there are none at all.
pub fn favorites(contacts: &[Contact]) -> Option<Vec<&Contact>> {
    let favs: Vec<&Contact> = contacts.iter().filter(|c| c.favorite).collect();
    if favs.is_empty() { None } else { Some(favs) }
}

// Primary key folds case and accents so "Émile" sits between "Adam" and "Zoe".
// The lowercased name breaks ties between spellings that fold to the same key.
fn sort_key(c: &Contact) -> (String, String) {
    let name = format!("{}{}", c.first_name, c.last_name).to_lowercase();
    let folded = name.as_str().nfd().filter(|ch| !is_combining_mark(*ch)).collect();
    (folded, name)
}

/// Name sort whose direction flips every time it is applied, starting ascending.
#[derive(Debug, Clone)]
pub struct NameSort {
    ascending: bool,
}

impl Default for NameSort {
    fn default() -> Self {
        Self { ascending: true }
    }
}

impl NameSort {
    pub fn apply<'a>(&mut self, contacts: &'a [Contact]) -> Vec<&'a Contact> {
        let mut view: Vec<&Contact> = contacts.iter().collect();
        let ascending = self.ascending;
        view.sort_by(|a, b| {
            let ord: Ordering = sort_key(a).cmp(&sort_key(b));
            if ascending { ord } else { ord.reverse() }
        });
        self.ascending = !self.ascending;
        view
    }
}

/// Contacts whose birthday (`YYYY-MM-DD`) falls on the month and day of `today`.
/// Short or malformed birthdays never match.
pub fn birthdays_on(contacts: &[Contact], today: NaiveDate) -> Vec<&Contact> {
    let month_day = today.format("%m-%d").to_string();
    contacts
        .iter()
        .filter(|c| c.birthday.get(5..10) == Some(month_day.as_str()))
        .collect()
}

pub fn birthday_notice(contacts: &[Contact], today: NaiveDate) -> Option<String> {
    let upcoming = birthdays_on(contacts, today);
    if upcoming.is_empty() {
        return None;
    }
    let names: Vec<String> = upcoming.iter().map(|c| c.full_name()).collect();
    Some(format!("Today's birthdays:\n{}", names.join("\n")))
}

/// Contact count per category, case-insensitive, in first-seen spelling, sorted by name.
pub fn count_by_category(contacts: &[Contact]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for c in contacts {
        match counts
            .iter_mut()
            .find(|(name, _)| name.to_lowercase() == c.category.to_lowercase())
        {
            Some((_, n)) => *n += 1,
            None => counts.push((c.category.clone(), 1)),
        }
    }
    counts.sort_by_key(|(name, _)| name.to_lowercase());
    counts
}
