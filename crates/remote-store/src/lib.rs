//! # remote-store
//! A uniform store on top of FTP and SFTP servers: listings, navigation, recursive
//! removal, uploads with retries and disk usage.
//!

mod entry;
pub mod permissions;
pub mod remote_path;
mod retry;
mod store;
#[cfg(feature = "test")]
pub mod test;
pub mod transport;

pub use entry::{EntryKind, ListingParseError, RemoteDirEntry, RemoteStat, is_navigation_name};
pub use permissions::{Permissions, PermissionsError};
pub use retry::{Attempted, RetryPolicy};
pub use store::{Listing, RemoteStore, StoreError, StoreOptions};
pub use transport::{
    ConnectionParameters, Credentials, FtpOptions, FtpTransport, RawEntry, SftpTransport,
    Transport, TransportError,
};
