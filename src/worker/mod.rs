pub mod backfill;
pub mod listener;
pub mod parser;
pub mod stream;
pub mod supervisor;

pub use backfill::{BackfillFetcher, BackfillStats};
pub use listener::{Listener, ListenerExit, ListenerHandle};
pub use parser::{parse_log, parse_record, parse_records, RawLog};
pub use stream::{LogStream, StreamConnection, StreamConnector, WsConnector};
pub use supervisor::{ConnectionState, ConnectionSupervisor, SupervisorStats};
