use std::{
    io::{self, Read},
    net::{TcpStream, ToSocketAddrs},
    path::{Path, PathBuf},
};

use chrono::DateTime;
use ssh2::{ErrorCode, FileStat, Session, Sftp};
use tracing::debug;

use crate::{
    EntryKind, Permissions, RemoteStat,
    transport::{ConnectionParameters, Credentials, RawEntry, Transport, TransportError},
};

// libssh2 error codes.
const SESSION_TIMEOUT: i32 = -9;
const SESSION_EAGAIN: i32 = -37;
const FX_NO_SUCH_FILE: i32 = 2;
const FX_PERMISSION_DENIED: i32 = 3;
const FX_FAILURE: i32 = 4;

const DIRECTORY_MODE: i32 = 0o755;

struct Connection {
    session: Session,
    sftp: Sftp,
    current_directory: PathBuf,
}

/// A transport over SFTP.
///
/// SFTP has no server side working directory, the transport keeps its own and asks the
/// server to resolve every change.
pub struct SftpTransport {
    parameters: ConnectionParameters,
    connection: Option<Connection>,
}

impl SftpTransport {
    /// The default SSH port.
    pub const DEFAULT_PORT: u16 = 22;

    /// Create a new, unconnected transport.
    pub fn new(parameters: ConnectionParameters) -> Self {
        Self {
            parameters,
            connection: None,
        }
    }

    fn connection(&mut self) -> Result<&mut Connection, TransportError> {
        self.connection
            .as_mut()
            .ok_or_else(|| TransportError::Permanent("SFTP session is not established".into()))
    }

    fn open_session(&self) -> Result<Session, TransportError> {
        let timeout = self.parameters.timeout();
        let host = self.parameters.host.as_str();

        let address = (host, self.parameters.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::Connect(format!("could not resolve '{host}': {e}")))?
            .next()
            .ok_or_else(|| TransportError::Connect(format!("'{host}' has no address")))?;

        let socket = TcpStream::connect_timeout(&address, timeout).map_err(|e| {
            if e.kind() == io::ErrorKind::TimedOut {
                TransportError::Timeout(format!("connecting to '{host}': {e}"))
            } else {
                TransportError::Connect(format!("connecting to '{host}': {e}"))
            }
        })?;

        let mut session = Session::new().map_err(connect_error)?;
        session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        session.set_tcp_stream(socket);
        session.handshake().map_err(connect_error)?;

        let user = self.parameters.user.as_str();
        match &self.parameters.credentials {
            Credentials::Password(password) => session.userauth_password(user, password),
            Credentials::KeyFile { path, passphrase } => {
                session.userauth_pubkey_file(user, None, path, passphrase.as_deref())
            }
        }
        .map_err(connect_error)?;

        if !session.authenticated() {
            return Err(TransportError::Connect(format!(
                "authentication as '{user}' was rejected"
            )));
        }

        Ok(session)
    }
}

impl Transport for SftpTransport {
    fn describe(&self) -> String {
        format!(
            "sftp://{}@{}:{}",
            self.parameters.user, self.parameters.host, self.parameters.port
        )
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        let session = self.open_session()?;
        let sftp = session.sftp().map_err(connect_error)?;
        let current_directory = sftp.realpath(Path::new(".")).map_err(connect_error)?;

        debug!("SFTP session starts in {current_directory:?}");

        self.connection = Some(Connection {
            session,
            sftp,
            current_directory,
        });

        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        match self.connection.take() {
            Some(connection) => {
                drop(connection.sftp);
                connection
                    .session
                    .disconnect(None, "Backup finished", None)
                    .map_err(map_error)
            }
            None => Ok(()),
        }
    }

    fn pwd(&mut self) -> Result<String, TransportError> {
        let connection = self.connection()?;
        Ok(connection.current_directory.to_string_lossy().into_owned())
    }

    fn cwd(&mut self, path: &str) -> Result<(), TransportError> {
        let connection = self.connection()?;

        let target = connection.current_directory.join(path);
        let resolved = connection.sftp.realpath(&target).map_err(map_error)?;
        let stat = connection.sftp.stat(&resolved).map_err(map_error)?;
        if !stat.is_dir() {
            return Err(TransportError::Denied(format!(
                "{resolved:?} is not a directory"
            )));
        }

        // Opening the directory proves it can be entered.
        drop(connection.sftp.opendir(&resolved).map_err(map_error)?);

        connection.current_directory = resolved;
        Ok(())
    }

    fn list(&mut self, path: &str) -> Result<Vec<RawEntry>, TransportError> {
        let connection = self.connection()?;

        let entries = connection
            .sftp
            .readdir(Path::new(path))
            .map_err(map_error)?;

        Ok(entries
            .into_iter()
            .filter_map(|(path, stat)| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                Some(RawEntry::Stat {
                    name,
                    stat: remote_stat(&stat),
                })
            })
            .collect())
    }

    fn mkdir(&mut self, path: &str) -> Result<(), TransportError> {
        self.connection()?
            .sftp
            .mkdir(Path::new(path), DIRECTORY_MODE)
            .map_err(map_error)
    }

    fn rmdir(&mut self, path: &str) -> Result<(), TransportError> {
        self.connection()?
            .sftp
            .rmdir(Path::new(path))
            .map_err(map_error)
    }

    fn delete(&mut self, path: &str) -> Result<(), TransportError> {
        self.connection()?
            .sftp
            .unlink(Path::new(path))
            .map_err(map_error)
    }

    fn stat(&mut self, path: &str) -> Result<RemoteStat, TransportError> {
        let stat = self
            .connection()?
            .sftp
            .lstat(Path::new(path))
            .map_err(map_error)?;

        Ok(remote_stat(&stat))
    }

    fn store_file(&mut self, path: &str, reader: &mut dyn Read) -> Result<u64, TransportError> {
        let mut file = self
            .connection()?
            .sftp
            .create(Path::new(path))
            .map_err(map_error)?;

        io::copy(reader, &mut file).map_err(map_io_error)
    }
}

impl Drop for SftpTransport {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

fn remote_stat(stat: &FileStat) -> RemoteStat {
    let kind = if stat.is_dir() {
        EntryKind::Directory
    } else if stat.is_file() {
        EntryKind::File
    } else {
        EntryKind::Unknown
    };

    RemoteStat {
        kind,
        size: stat.size.unwrap_or(0),
        permissions: stat.perm.map(Permissions::from_mode),
        owner: stat.uid.map(|uid| uid.to_string()),
        group: stat.gid.map(|gid| gid.to_string()),
        modified: stat
            .mtime
            .and_then(|mtime| i64::try_from(mtime).ok())
            .and_then(|mtime| DateTime::from_timestamp(mtime, 0))
            .map(|mtime| mtime.naive_utc()),
    }
}

fn connect_error(error: ssh2::Error) -> TransportError {
    match map_error(error) {
        TransportError::Timeout(message) => TransportError::Timeout(message),
        error => TransportError::Connect(error.to_string()),
    }
}

fn map_error(error: ssh2::Error) -> TransportError {
    let message = error.to_string();

    match error.code() {
        ErrorCode::Session(SESSION_TIMEOUT) => TransportError::Timeout(message),
        ErrorCode::Session(SESSION_EAGAIN) => TransportError::Transient(message),
        ErrorCode::SFTP(FX_FAILURE) => TransportError::Transient(message),
        ErrorCode::SFTP(FX_NO_SUCH_FILE | FX_PERMISSION_DENIED) => TransportError::Denied(message),
        _ => TransportError::Permanent(message),
    }
}

// Writes through an SFTP handle surface libssh2 errors as `io::Error`.
fn map_io_error(error: io::Error) -> TransportError {
    match error.kind() {
        io::ErrorKind::TimedOut => TransportError::Timeout(error.to_string()),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => {
            TransportError::Transient(error.to_string())
        }
        _ => match error.get_ref().and_then(|inner| inner.downcast_ref::<ssh2::Error>()) {
            Some(_) => TransportError::Transient(error.to_string()),
            None => TransportError::LocalIo(error),
        },
    }
}
