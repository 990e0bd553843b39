//! mTLS configuration for the Temporal gRPC channel
//!
//! The client presents its certificate and verifies the frontend against the
//! configured CA bundle. Material is parsed up front so that a bad PEM blob is
//! reported as a configuration problem instead of a handshake failure.

use tonic::transport::{Certificate, ClientTlsConfig, Identity};
use x509_parser::prelude::*;

use temporal_provider_common::config::TlsMaterial;
use temporal_provider_common::{Error, Result};

/// Client-side mTLS configuration
pub struct ClientMtlsConfig {
    material: TlsMaterial,
    server_domain: String,
}

impl ClientMtlsConfig {
    /// Create a new client mTLS config
    pub fn new(material: TlsMaterial, server_domain: impl Into<String>) -> Self {
        Self {
            material,
            server_domain: server_domain.into(),
        }
    }

    /// Check that every piece of material parses
    pub fn validate(&self) -> Result<()> {
        let ca_count = parse_certificates("caCert", &self.material.ca_cert_pem)?;
        let chain_count = parse_certificates("certFile", &self.material.cert_pem)?;
        if ca_count == 0 || chain_count == 0 {
            return Err(Error::tls("certificate bundle contains no certificates"));
        }
        parse_private_key(&self.material.key_pem)
    }

    /// Build a tonic ClientTlsConfig
    pub fn to_tonic_config(&self) -> Result<ClientTlsConfig> {
        self.validate()?;

        let identity = Identity::from_pem(&self.material.cert_pem, &self.material.key_pem);
        let ca_cert = Certificate::from_pem(&self.material.ca_cert_pem);

        Ok(ClientTlsConfig::new()
            .identity(identity)
            .ca_certificate(ca_cert)
            .domain_name(&self.server_domain))
    }
}

/// Parse every CERTIFICATE block, returning how many were found
fn parse_certificates(field: &str, pem_data: &str) -> Result<usize> {
    let blocks = ::pem::parse_many(pem_data.as_bytes())
        .map_err(|e| Error::tls(format!("{field}: failed to parse PEM: {e}")))?;

    let mut count = 0;
    for block in blocks.iter().filter(|b| b.tag() == "CERTIFICATE") {
        X509Certificate::from_der(block.contents())
            .map_err(|e| Error::tls(format!("{field}: failed to parse certificate: {e}")))?;
        count += 1;
    }
    Ok(count)
}

fn parse_private_key(pem_data: &str) -> Result<()> {
    let blocks = ::pem::parse_many(pem_data.as_bytes())
        .map_err(|e| Error::tls(format!("keyFile: failed to parse PEM: {e}")))?;

    if blocks.iter().any(|b| b.tag().ends_with("PRIVATE KEY")) {
        Ok(())
    } else {
        Err(Error::tls("keyFile: no private key found"))
    }
}
