//! Contact feed - load recipients from a CSV file.
//!
//! CHANGELOG:
//! - 10/19/2026 - CSV feed with case-insensitive headers replaces contacts.json
//! - 01/10/2026 - Initial implementation

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::Path;

/// One row of the contact feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Raw phone value, normalized later by the dispatcher.
    pub phone: String,
    pub first_name: String,
    /// Carried through, never used for sending.
    pub email: Option<String>,
}

/// Contacts in feed order.
#[derive(Debug, Clone)]
pub struct ContactFeed {
    contacts: Vec<Contact>,
}

impl ContactFeed {
    /// Load contacts from a CSV file with a header row.
    ///
    /// `phone` is required; `first_name` and `email` are optional. Header
    /// names match case-insensitively.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())
            .with_context(|| format!("Failed to read contact CSV: {:?}", path.as_ref()))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = rdr.headers().context("Failed to read CSV header row")?.clone();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            bail!("CSV appears empty or missing headers.");
        }

        let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let Some(phone_idx) = column("phone") else {
            let found: Vec<&str> = headers.iter().collect();
            bail!("CSV must include 'phone'. Found: {:?}", found);
        };
        let first_idx = column("first_name");
        let email_idx = column("email");

        let mut contacts = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("Malformed CSV row {}", line + 2))?;
            let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

            let email = field(email_idx).trim();
            contacts.push(Contact {
                phone: field(Some(phone_idx)).to_string(),
                first_name: field(first_idx).trim().to_string(),
                email: if email.is_empty() { None } else { Some(email.to_string()) },
            });
        }

        Ok(Self { contacts })
    }

    /// Get all contacts.
    pub fn all(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

impl From<Vec<Contact>> for ContactFeed {
    fn from(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_basic_feed() {
        let csv = "phone,first_name,email\n+14085551234,Ana,ana@example.com\n4155550000,Bo,\n";
        let feed = ContactFeed::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.all()[0].first_name, "Ana");
        assert_eq!(feed.all()[0].email.as_deref(), Some("ana@example.com"));
        assert_eq!(feed.all()[1].phone, "4155550000");
        assert_eq!(feed.all()[1].email, None);
    }

    #[test]
    fn test_headers_case_insensitive_and_reordered() {
        let csv = "Email, First_Name ,PHONE\nx@y.z,  Cy  ,(408) 555-1234\n";
        let feed = ContactFeed::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(feed.all()[0].phone, "(408) 555-1234");
        assert_eq!(feed.all()[0].first_name, "Cy");
    }

    #[test]
    fn test_missing_first_name_column() {
        let feed = ContactFeed::from_reader("phone\n+14085551234\n".as_bytes()).unwrap();
        assert_eq!(feed.all()[0].first_name, "");
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let feed = ContactFeed::from_reader("phone,first_name\n+14085551234\n".as_bytes()).unwrap();
        assert_eq!(feed.all()[0].first_name, "");
    }

    #[test]
    fn test_missing_phone_column() {
        let err = ContactFeed::from_reader("name,email\nA,a@b.c\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("must include 'phone'"));
    }

    #[test]
    fn test_empty_file() {
        let err = ContactFeed::from_reader("".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("empty or missing headers"));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "phone,first_name").unwrap();
        writeln!(file, "+14085551234,Dee").unwrap();
        let feed = ContactFeed::load(file.path()).unwrap();
        assert_eq!(feed.all()[0].first_name, "Dee");
    }
}
