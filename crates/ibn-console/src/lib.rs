//! IBN Console: command batches over interactive device consoles
//!
//! ```text
//! connect ─► "\r\n" ─► discard banner ─► [command ─► poll until idle]* ─► close
//! ```

pub mod connector;
pub mod session;
pub mod target;

pub use connector::{ConsoleConnector, TcpConsoleConnector};
pub use session::{decode_lossy, ConsoleOptions, ConsoleSession};
pub use target::{ConsoleTarget, TargetError};
