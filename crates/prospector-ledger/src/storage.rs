//! Append-only CSV invite ledger

use prospector_core::{InviteRecord, ProspectorError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Header row of the ledger file
pub const LEDGER_HEADERS: [&str; 8] = [
    "timestamp",
    "user_email",
    "profile_name",
    "profile_title",
    "company",
    "location",
    "profile_url",
    "source_query",
];

fn ledger_error(e: impl std::fmt::Display) -> ProspectorError {
    ProspectorError::Ledger(e.to_string())
}

/// One page of ledger records, oldest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitePage {
    pub records: Vec<InviteRecord>,
    /// Number of valid records in the whole ledger
    pub total: usize,
    /// Zero-based page index
    pub page: usize,
    pub page_size: usize,
}

impl InvitePage {
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            0
        } else {
            (self.total + self.page_size - 1) / self.page_size
        }
    }
}

/// Ledger stored as a CSV file
///
/// Rows are only ever appended. Rows that fail to parse are skipped on read.
#[derive(Debug, Clone)]
pub struct InviteLedger {
    path: PathBuf,
}

impl InviteLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, writing the header first if the file is empty
    pub async fn append(&self, record: &InviteRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let empty = file.metadata().await?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        if empty {
            writer.write_record(LEDGER_HEADERS).map_err(ledger_error)?;
        }
        writer.serialize(record).map_err(ledger_error)?;
        let bytes = writer.into_inner().map_err(ledger_error)?;

        file.write_all(&bytes).await?;
        file.flush().await?;

        debug!(
            "Recorded invite to {} for {} in {:?}",
            record.profile_name, record.user_email, self.path
        );
        Ok(())
    }

    /// Every valid record in file order
    pub async fn load_all(&self) -> Result<Vec<InviteRecord>> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_slice());
        let mut records = Vec::new();
        for row in reader.deserialize::<InviteRecord>() {
            match row {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!("Skipping malformed ledger row: {}", e);
                }
            }
        }
        Ok(records)
    }

    /// Records on zero-based `page`, plus the overall total
    pub async fn list(&self, page: usize, page_size: usize) -> Result<InvitePage> {
        let all = self.load_all().await?;
        let total = all.len();
        let records = all
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect();

        Ok(InvitePage {
            records,
            total,
            page,
            page_size,
        })
    }

    pub async fn total_count(&self) -> Result<usize> {
        Ok(self.load_all().await?.len())
    }

    /// Copy every valid record to a fresh CSV file at `dest`
    ///
    /// Returns the number of records written.
    pub async fn export_to(&self, dest: &Path) -> Result<usize> {
        let records = self.load_all().await?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(LEDGER_HEADERS).map_err(ledger_error)?;
        for record in &records {
            writer.serialize(record).map_err(ledger_error)?;
        }
        let bytes = writer.into_inner().map_err(ledger_error)?;

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(dest, bytes).await?;
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn record(name: &str, hour: u32) -> InviteRecord {
        InviteRecord {
            timestamp: Utc.with_ymd_and_hms(2026, 10, 20, hour, 0, 0).unwrap(),
            user_email: "user@example.com".to_string(),
            profile_name: name.to_string(),
            profile_title: "Sales Manager".to_string(),
            company: "Acme, Inc.".to_string(),
            location: "Recife, PE".to_string(),
            profile_url: format!("https://www.linkedin.com/in/{}", name.to_lowercase()),
            source_query: "sales manager".to_string(),
        }
    }

    #[tokio::test]
    async fn test_append_and_load() {
        let dir = tempdir().unwrap();
        let ledger = InviteLedger::new(dir.path().join("data/invites.csv"));

        ledger.append(&record("Ana", 9)).await.unwrap();
        ledger.append(&record("Bruno", 10)).await.unwrap();

        let all = ledger.load_all().await.unwrap();
        assert_eq!(all, vec![record("Ana", 9), record("Bruno", 10)]);

        let content = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(content.matches("timestamp,user_email").count(), 1);
        assert!(content.starts_with(
            "timestamp,user_email,profile_name,profile_title,company,location,profile_url,source_query\n"
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let ledger = InviteLedger::new(dir.path().join("none.csv"));

        assert!(ledger.load_all().await.unwrap().is_empty());
        assert_eq!(ledger.total_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invites.csv");
        let ledger = InviteLedger::new(&path);
        ledger.append(&record("Ana", 9)).await.unwrap();

        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("not-a-timestamp,x,y,z,a,b,c,d\n");
        content.push_str("too,short\n");
        std::fs::write(&path, content).unwrap();
        ledger.append(&record("Bruno", 10)).await.unwrap();

        let names: Vec<String> = ledger
            .load_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.profile_name)
            .collect();
        assert_eq!(names, vec!["Ana", "Bruno"]);
    }

    #[tokio::test]
    async fn test_legacy_column_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invites.csv");
        std::fs::write(
            &path,
            "timestamp,user_email,profile_name,profile_title,company,location,linkedin_url,query\n\
             2026-10-20T09:00:00-03:00,u@example.com,Ana,CTO,Acme,Recife,https://x.example/in/ana,cto\n",
        )
        .unwrap();

        let all = InviteLedger::new(&path).load_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].profile_url, "https://x.example/in/ana");
        assert_eq!(all[0].source_query, "cto");
        assert_eq!(
            all[0].timestamp,
            Utc.with_ymd_and_hms(2026, 10, 20, 12, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_pagination() {
        let dir = tempdir().unwrap();
        let ledger = InviteLedger::new(dir.path().join("invites.csv"));
        for (i, name) in ["A", "B", "C", "D", "E"].iter().enumerate() {
            ledger.append(&record(name, i as u32)).await.unwrap();
        }

        let first = ledger.list(0, 2).await.unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.total_pages(), 3);
        assert_eq!(first.records.len(), 2);
        assert_eq!(first.records[0].profile_name, "A");

        let last = ledger.list(2, 2).await.unwrap();
        assert_eq!(last.records.len(), 1);
        assert_eq!(last.records[0].profile_name, "E");

        let beyond = ledger.list(9, 2).await.unwrap();
        assert!(beyond.records.is_empty());
        assert_eq!(beyond.total, 5);
    }

    #[tokio::test]
    async fn test_export_to() {
        let dir = tempdir().unwrap();
        let ledger = InviteLedger::new(dir.path().join("invites.csv"));
        ledger.append(&record("Ana", 9)).await.unwrap();
        ledger.append(&record("Bruno", 10)).await.unwrap();

        let dest = dir.path().join("out/copy.csv");
        assert_eq!(ledger.export_to(&dest).await.unwrap(), 2);
        assert_eq!(
            InviteLedger::new(&dest).load_all().await.unwrap(),
            ledger.load_all().await.unwrap()
        );
    }
}
