//! Contact spreadsheet export

use prospector_core::{Contact, ProspectorError, Result};
use std::path::Path;
use tracing::info;

/// Column headers of an exported contact file
pub const CONTACT_HEADERS: [&str; 5] = ["Name", "Title", "Company", "Location", "ProfileURL"];

fn export_error(path: &Path, e: impl std::fmt::Display) -> ProspectorError {
    ProspectorError::Export(format!("{}: {}", path.display(), e))
}

/// Write `contacts` to `path`, replacing any existing file
///
/// The header row is always written, so an empty run still produces a valid
/// file.
pub fn export_contacts(path: &Path, contacts: &[Contact]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| export_error(path, e))?;
    writer
        .write_record(CONTACT_HEADERS)
        .map_err(|e| export_error(path, e))?;
    for contact in contacts {
        writer
            .write_record(contact.fields())
            .map_err(|e| export_error(path, e))?;
    }
    writer.flush().map_err(|e| export_error(path, e))?;

    info!("Exported {} contacts to {}", contacts.len(), path.display());
    Ok(())
}

/// Read back a file written by [`export_contacts`]
pub fn read_contacts(path: &Path) -> Result<Vec<Contact>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| export_error(path, e))?;
    let mut contacts = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| export_error(path, e))?;
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        contacts.push(Contact {
            name: field(0),
            title: field(1),
            company: field(2),
            location: field(3),
            profile_url: field(4),
        });
    }
    Ok(contacts)
}
