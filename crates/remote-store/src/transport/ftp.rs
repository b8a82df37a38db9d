use std::{
    io::{self, Read},
    net::ToSocketAddrs,
    path::PathBuf,
    sync::Arc,
};

use rustls::ClientConfig;
use suppaftp::{FtpError, Mode, RustlsConnector, RustlsFtpStream, types::FileType};
use tracing::debug;

use crate::{
    EntryKind, RemoteStat,
    transport::{ConnectionParameters, Credentials, RawEntry, Transport, TransportError},
};

/// FTP specific options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FtpOptions {
    /// Use passive mode for data connections.
    pub passive: bool,

    /// Upgrade the control connection with explicit TLS.
    pub tls: bool,

    /// PEM file with the root certificates to trust for TLS.
    pub tls_root_certificate_file: Option<PathBuf>,
}

/// A transport over FTP, optionally secured with explicit TLS.
pub struct FtpTransport {
    parameters: ConnectionParameters,
    options: FtpOptions,
    stream: Option<RustlsFtpStream>,
}

impl FtpTransport {
    /// The default FTP port.
    pub const DEFAULT_PORT: u16 = 21;

    /// Create a new, unconnected transport.
    pub fn new(parameters: ConnectionParameters, options: FtpOptions) -> Self {
        Self {
            parameters,
            options,
            stream: None,
        }
    }

    fn stream(&mut self) -> Result<&mut RustlsFtpStream, TransportError> {
        self.stream
            .as_mut()
            .ok_or_else(|| TransportError::Permanent("FTP session is not established".into()))
    }

    fn tls_connector(&self) -> Result<RustlsConnector, TransportError> {
        let root_certificate_file = self
            .options
            .tls_root_certificate_file
            .as_ref()
            .ok_or_else(|| {
                TransportError::Connect("TLS requires a root certificate file".into())
            })?;

        let trust_store = shared::load_trust_store(root_certificate_file)
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Connect(e.to_string()))?
        .with_root_certificates(trust_store)
        .with_no_client_auth();

        Ok(RustlsConnector::from(Arc::new(config)))
    }
}

impl Transport for FtpTransport {
    fn describe(&self) -> String {
        let scheme = if self.options.tls { "ftps" } else { "ftp" };
        format!(
            "{scheme}://{}@{}:{}",
            self.parameters.user, self.parameters.host, self.parameters.port
        )
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        let timeout = self.parameters.timeout();
        let host = self.parameters.host.clone();

        let address = (host.as_str(), self.parameters.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::Connect(format!("could not resolve '{host}': {e}")))?
            .next()
            .ok_or_else(|| TransportError::Connect(format!("'{host}' has no address")))?;

        let mut stream =
            RustlsFtpStream::connect_timeout(address, timeout).map_err(connect_error)?;
        stream
            .get_ref()
            .set_read_timeout(Some(timeout))
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        if self.options.tls {
            let connector = self.tls_connector()?;
            stream = stream.into_secure(connector, &host).map_err(connect_error)?;
            debug!("Secured control connection to '{host}'");
        }

        let password = match &self.parameters.credentials {
            Credentials::Password(password) => password.as_str(),
            Credentials::KeyFile { .. } => {
                return Err(TransportError::Connect(
                    "FTP requires password credentials".into(),
                ));
            }
        };
        stream
            .login(self.parameters.user.as_str(), password)
            .map_err(connect_error)?;

        let mode = if self.options.passive {
            Mode::Passive
        } else {
            Mode::Active
        };
        stream.set_mode(mode);
        stream
            .transfer_type(FileType::Binary)
            .map_err(connect_error)?;

        self.stream = Some(stream);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        match self.stream.take() {
            Some(mut stream) => stream.quit().map_err(map_error),
            None => Ok(()),
        }
    }

    fn pwd(&mut self) -> Result<String, TransportError> {
        self.stream()?.pwd().map_err(map_error)
    }

    fn cwd(&mut self, path: &str) -> Result<(), TransportError> {
        self.stream()?.cwd(path).map_err(map_error)
    }

    fn list(&mut self, path: &str) -> Result<Vec<RawEntry>, TransportError> {
        let lines = self.stream()?.list(Some(path)).map_err(map_error)?;
        Ok(lines.into_iter().map(RawEntry::Line).collect())
    }

    fn mkdir(&mut self, path: &str) -> Result<(), TransportError> {
        self.stream()?.mkdir(path).map_err(map_error)
    }

    fn rmdir(&mut self, path: &str) -> Result<(), TransportError> {
        self.stream()?.rmdir(path).map_err(map_error)
    }

    fn delete(&mut self, path: &str) -> Result<(), TransportError> {
        self.stream()?.rm(path).map_err(map_error)
    }

    fn stat(&mut self, path: &str) -> Result<RemoteStat, TransportError> {
        let stream = self.stream()?;

        // FTP has no portable stat, probe by changing into the path. A link to a
        // directory passes this check and is walked like one.
        let previous = stream.pwd().map_err(map_error)?;
        if stream.cwd(path).is_ok() {
            stream.cwd(&previous).map_err(map_error)?;
            return Ok(RemoteStat::new(EntryKind::Directory, 0));
        }

        match stream.size(path) {
            Ok(size) => Ok(RemoteStat::new(
                EntryKind::File,
                u64::try_from(size).unwrap_or(u64::MAX),
            )),
            Err(error) => match map_error(error) {
                TransportError::Denied(_) => Ok(RemoteStat::new(EntryKind::Unknown, 0)),
                error => Err(error),
            },
        }
    }

    fn store_file(&mut self, path: &str, mut reader: &mut dyn Read) -> Result<u64, TransportError> {
        self.stream()?
            .put_file(path, &mut reader)
            .map_err(map_error)
    }
}

impl Drop for FtpTransport {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.quit();
        }
    }
}

fn connect_error(error: FtpError) -> TransportError {
    match map_error(error) {
        TransportError::Timeout(message) => TransportError::Timeout(message),
        error => TransportError::Connect(error.to_string()),
    }
}

fn map_error(error: FtpError) -> TransportError {
    match error {
        FtpError::ConnectionError(error)
            if matches!(
                error.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ) =>
        {
            TransportError::Timeout(error.to_string())
        }

        FtpError::UnexpectedResponse(response) => {
            let code = response.status.code();
            let message = format!("{code} {}", String::from_utf8_lossy(&response.body).trim());

            match code {
                400..=499 => TransportError::Transient(message),
                550 => TransportError::Denied(message),
                _ => TransportError::Permanent(message),
            }
        }

        error => TransportError::Permanent(error.to_string()),
    }
}
