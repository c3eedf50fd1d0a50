pub mod record;
pub mod table;

pub use record::BackupRecord;
pub use table::{
    build_metadata, BackupMetadata, ForeignKeyEdge, IndexDescriptor, TableDescriptor,
};
