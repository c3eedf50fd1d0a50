//! Payload delivery for the two restore transport shapes.
//!
//! One orchestration core consumes either variant through
//! [`RestoreSource::next_payload`]: the keyed variant fetches discrete blob
//! objects by table name, the archive variant walks a forward-only member
//! sequence whose order must match the metadata's load order exactly.

use std::collections::{HashSet, VecDeque};
use std::io::{Cursor, Read};
use std::sync::Arc;

use flate2::read::GzDecoder;
use serde_json::Value;
use tokio::task::JoinSet;

use crate::backup::{archive_key, metadata_key, table_key};
use crate::blob::BlobStore;
use crate::constants::{METADATA_OBJECT_NAME, TABLE_OBJECT_SUFFIX, TGZ_SUFFIX};
use crate::error::{AppError, Result};
use crate::models::BackupMetadata;

/// Placeholder name reported when the archive ends before the expected member
const END_OF_ARCHIVE: &str = "<end of archive>";

/// One member read from a backup archive, in stream order
#[derive(Debug)]
pub struct ArchiveMember {
    pub name: String,
    pub is_file: bool,
    pub data: Vec<u8>,
}

/// Decode an archive into its member list, preserving stream order.
///
/// Only file members carry data; other member kinds are kept so the
/// consumer can reject them by kind.
pub fn read_archive_members(bytes: Vec<u8>, gzipped: bool) -> Result<Vec<ArchiveMember>> {
    let cursor = Cursor::new(bytes);
    let reader: Box<dyn Read> = if gzipped {
        Box::new(GzDecoder::new(cursor))
    } else {
        Box::new(cursor)
    };

    let mut archive = tar::Archive::new(reader);
    let mut members = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().into_owned();
        let is_file = entry.header().entry_type().is_file();
        let mut data = Vec::new();
        if is_file {
            entry.read_to_end(&mut data)?;
        }
        members.push(ArchiveMember {
            name,
            is_file,
            data,
        });
    }

    Ok(members)
}

/// Table-payload delivery for one restore run
pub enum RestoreSource {
    /// Random-access: each table's object is fetched independently by key
    Keyed {
        blob: Arc<dyn BlobStore>,
        source_database: String,
        backup_name: String,
    },
    /// Sequential: members consumed strictly forward, never rewound
    Archive { members: VecDeque<ArchiveMember> },
}

impl RestoreSource {
    /// Open the random-access variant: fetch the metadata object, then
    /// pre-check existence of every table object before anything mutates.
    ///
    /// The existence checks are read-only and order-independent, so they run
    /// concurrently; their results are joined here.
    pub async fn open_keyed(
        blob: Arc<dyn BlobStore>,
        source_database: &str,
        backup_name: &str,
    ) -> Result<(BackupMetadata, RestoreSource)> {
        let bytes = blob
            .get(&metadata_key(source_database, backup_name))
            .await?
            .ok_or(AppError::MetadataNotFound)?;
        let metadata: BackupMetadata = serde_json::from_slice(&bytes)?;

        let mut checks = JoinSet::new();
        for table in &metadata.load_order {
            let blob = blob.clone();
            let key = table_key(source_database, backup_name, table);
            let table = table.clone();
            checks.spawn(async move { (table, blob.exists(&key).await) });
        }

        let mut missing = HashSet::new();
        while let Some(joined) = checks.join_next().await {
            let (table, exists) = joined?;
            if !exists? {
                missing.insert(table);
            }
        }
        if !missing.is_empty() {
            let names = metadata
                .load_order
                .iter()
                .filter(|t| missing.contains(*t))
                .cloned()
                .collect();
            return Err(AppError::MissingAssets(names));
        }

        let source = RestoreSource::Keyed {
            blob,
            source_database: source_database.to_string(),
            backup_name: backup_name.to_string(),
        };
        Ok((metadata, source))
    }

    /// Open the sequential variant: decode the archive object and require
    /// its first member to be the metadata document.
    pub async fn open_archive(
        blob: Arc<dyn BlobStore>,
        source_database: &str,
        backup_name: &str,
    ) -> Result<(BackupMetadata, RestoreSource)> {
        let bytes = blob
            .get(&archive_key(source_database, backup_name))
            .await?
            .ok_or(AppError::BackupNotFound)?;

        let gzipped = backup_name.ends_with(TGZ_SUFFIX);
        let members =
            tokio::task::spawn_blocking(move || read_archive_members(bytes, gzipped)).await??;
        let mut members = VecDeque::from(members);

        let first = members.pop_front().ok_or_else(|| AppError::UnexpectedMember {
            found: END_OF_ARCHIVE.to_string(),
            expected: METADATA_OBJECT_NAME.to_string(),
        })?;
        if !first.is_file || first.name != METADATA_OBJECT_NAME {
            return Err(AppError::UnexpectedMember {
                found: first.name,
                expected: METADATA_OBJECT_NAME.to_string(),
            });
        }

        let metadata: BackupMetadata = serde_json::from_slice(&first.data)?;
        Ok((metadata, RestoreSource::Archive { members }))
    }

    /// Deliver the decoded row set for the next table in load order.
    ///
    /// The keyed variant fetches `{table}.json`; the archive variant pops
    /// the next member and requires it to match the expected name and be a
    /// regular file.
    pub async fn next_payload(
        &mut self,
        table: &str,
        metadata: &BackupMetadata,
    ) -> Result<Vec<Vec<Value>>> {
        match self {
            RestoreSource::Keyed {
                blob,
                source_database,
                backup_name,
            } => {
                let key = table_key(source_database, backup_name, table);
                let bytes = blob
                    .get(&key)
                    .await?
                    .ok_or_else(|| AppError::MissingAssets(vec![table.to_string()]))?;
                Ok(serde_json::from_slice(&bytes)?)
            }
            RestoreSource::Archive { members } => {
                let expected = format!("{table}{TABLE_OBJECT_SUFFIX}");
                let member = members.pop_front().ok_or_else(|| AppError::UnexpectedMember {
                    found: END_OF_ARCHIVE.to_string(),
                    expected: expected.clone(),
                })?;

                if member.name != expected {
                    return Err(member_mismatch(member.name, expected, metadata));
                }
                if !member.is_file {
                    // Right name, wrong kind; say so rather than echoing
                    // the expected name back as what was found
                    return Err(AppError::UnexpectedMember {
                        found: format!("{} (not a regular file)", member.name),
                        expected,
                    });
                }

                Ok(serde_json::from_slice(&member.data)?)
            }
        }
    }

    /// Check that nothing is left over once every table has been delivered
    pub fn finish(self, metadata: &BackupMetadata) -> Result<()> {
        match self {
            RestoreSource::Keyed { .. } => Ok(()),
            RestoreSource::Archive { mut members } => match members.pop_front() {
                None => Ok(()),
                Some(member) => Err(member_mismatch(
                    member.name,
                    END_OF_ARCHIVE.to_string(),
                    metadata,
                )),
            },
        }
    }
}

/// Classify a member that does not match the expected sequence: a name whose
/// derived table is absent from the metadata is `UnknownTableMember`, any
/// other mismatch is `UnexpectedMember`.
fn member_mismatch(found: String, expected: String, metadata: &BackupMetadata) -> AppError {
    if found != METADATA_OBJECT_NAME {
        if let Some(derived) = found.strip_suffix(TABLE_OBJECT_SUFFIX) {
            if !metadata.tables.contains_key(derived) {
                return AppError::UnknownTableMember(found);
            }
        }
    }
    AppError::UnexpectedMember { found, expected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{build_metadata, TableDescriptor};
    use std::collections::BTreeMap;

    fn metadata_for(names: &[&str]) -> BackupMetadata {
        let tables: BTreeMap<String, TableDescriptor> = names
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    TableDescriptor {
                        name: name.to_string(),
                        sql: format!("CREATE TABLE {name} (id INTEGER PRIMARY KEY)"),
                        indexes: vec![],
                        columns: vec!["id".to_string()],
                        constraints: vec![],
                    },
                )
            })
            .collect();
        build_metadata(names.iter().map(|n| n.to_string()).collect(), tables)
    }

    fn tar_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn archive_source(members: Vec<ArchiveMember>) -> RestoreSource {
        RestoreSource::Archive {
            members: VecDeque::from(members),
        }
    }

    #[test]
    fn test_read_archive_members_preserves_order() {
        let bytes = tar_with(&[
            ("metadata.json", b"{}"),
            ("B.json", b"[]"),
            ("A.json", b"[]"),
        ]);
        let members = read_archive_members(bytes, false).unwrap();
        let names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["metadata.json", "B.json", "A.json"]);
        assert!(members.iter().all(|m| m.is_file));
    }

    #[tokio::test]
    async fn test_archive_payloads_in_order() {
        let metadata = metadata_for(&["Customers", "Orders"]);
        let bytes = tar_with(&[("Customers.json", b"[[1]]"), ("Orders.json", b"[]")]);
        let mut source = archive_source(read_archive_members(bytes, false).unwrap());

        let rows = source.next_payload("Customers", &metadata).await.unwrap();
        assert_eq!(rows, vec![vec![serde_json::json!(1)]]);
        let rows = source.next_payload("Orders", &metadata).await.unwrap();
        assert!(rows.is_empty());
        source.finish(&metadata).unwrap();
    }

    #[tokio::test]
    async fn test_archive_out_of_order_member_is_rejected() {
        let metadata = metadata_for(&["Customers", "Orders"]);
        let bytes = tar_with(&[("Orders.json", b"[]"), ("Customers.json", b"[]")]);
        let mut source = archive_source(read_archive_members(bytes, false).unwrap());

        let err = source.next_payload("Customers", &metadata).await.unwrap_err();
        match err {
            AppError::UnexpectedMember { found, expected } => {
                assert_eq!(found, "Orders.json");
                assert_eq!(expected, "Customers.json");
            }
            other => panic!("expected UnexpectedMember, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_archive_unknown_table_member_is_rejected() {
        let metadata = metadata_for(&["Customers"]);
        let bytes = tar_with(&[("Mystery.json", b"[]")]);
        let mut source = archive_source(read_archive_members(bytes, false).unwrap());

        let err = source.next_payload("Customers", &metadata).await.unwrap_err();
        assert!(matches!(err, AppError::UnknownTableMember(name) if name == "Mystery.json"));
    }

    #[tokio::test]
    async fn test_archive_truncation_is_reported() {
        let metadata = metadata_for(&["Customers", "Orders"]);
        let bytes = tar_with(&[("Customers.json", b"[]")]);
        let mut source = archive_source(read_archive_members(bytes, false).unwrap());

        source.next_payload("Customers", &metadata).await.unwrap();
        let err = source.next_payload("Orders", &metadata).await.unwrap_err();
        match err {
            AppError::UnexpectedMember { found, expected } => {
                assert_eq!(found, END_OF_ARCHIVE);
                assert_eq!(expected, "Orders.json");
            }
            other => panic!("expected UnexpectedMember, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_archive_trailing_member_is_rejected() {
        let metadata = metadata_for(&["Customers"]);
        let bytes = tar_with(&[("Customers.json", b"[]"), ("Customers.json", b"[]")]);
        let mut source = archive_source(read_archive_members(bytes, false).unwrap());

        source.next_payload("Customers", &metadata).await.unwrap();
        let err = source.finish(&metadata).unwrap_err();
        assert!(matches!(err, AppError::UnexpectedMember { .. }));
    }

    #[tokio::test]
    async fn test_non_file_member_is_rejected() {
        let metadata = metadata_for(&["Customers"]);
        let mut source = archive_source(vec![ArchiveMember {
            name: "Customers.json".to_string(),
            is_file: false,
            data: vec![],
        }]);

        let err = source.next_payload("Customers", &metadata).await.unwrap_err();
        match err {
            AppError::UnexpectedMember { found, expected } => {
                assert_eq!(expected, "Customers.json");
                // The kind mismatch must be visible in the diagnostic
                assert_ne!(found, expected);
                assert!(found.contains("not a regular file"), "got {found:?}");
            }
            other => panic!("expected UnexpectedMember, got {other:?}"),
        }
    }

    #[test]
    fn test_gzipped_archive_round_trip() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let plain = tar_with(&[("metadata.json", b"{}")]);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&plain).unwrap();
        let gzipped = encoder.finish().unwrap();

        let members = read_archive_members(gzipped, true).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "metadata.json");
    }
}
