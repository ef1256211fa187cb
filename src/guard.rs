use crate::api::models::Contact;

/// True when some existing contact has exactly the same email and the same phone.
///
/// Comparison is byte-for-byte: no trimming, no case folding. Only consulted on insert.
pub fn is_duplicate(candidate: &Contact, contacts: &[Contact]) -> bool {
    contacts
        .iter()
        .any(|c| c.email == candidate.email && c.phone == candidate.phone)
}
