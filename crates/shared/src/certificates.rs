use std::{
    fs::File,
    io::{self, BufReader},
    path::Path,
};

use rustls::RootCertStore;
use rustls_pemfile::certs;
use rustls_pki_types::CertificateDer;
use thiserror::Error;

/// Tries to load a trust store from a PEM file of root certificates.
pub fn load_trust_store(root_certificate_file: &Path) -> Result<RootCertStore, CertificateError> {
    // Load the root certificates.
    let root_certificates: Vec<CertificateDer<'static>> = {
        let file = File::open(root_certificate_file).map_err(CertificateError::LoadRootCertificate)?;

        certs(&mut BufReader::new(file))
            .collect::<io::Result<_>>()
            .map_err(CertificateError::LoadRootCertificate)?
    };

    if root_certificates.is_empty() {
        return Err(CertificateError::NoRootCertificate);
    }

    // Create the trust store
    let mut trust_store = RootCertStore::empty();
    for certificate in root_certificates {
        trust_store.add(certificate)?;
    }

    Ok(trust_store)
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("Failed to load the root certificate file\n{0}")]
    LoadRootCertificate(#[source] io::Error),

    #[error("The root certificate file contained no certificates.")]
    NoRootCertificate,

    #[error("Failed to create the trust store\n{0}")]
    CreateTrustStore(#[from] rustls::Error),
}
