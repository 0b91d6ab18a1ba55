mod checkpoint;
mod log_record;
mod metadata_event;

pub use checkpoint::{SyncCheckpoint, SYS_LAST_BLOCK_KEY};
pub use log_record::{ApiResponse, LogRecord, NO_RECORDS_FOUND};
pub use metadata_event::MetadataEvent;
