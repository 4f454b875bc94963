//! Optional custom CA for talking to a backend behind a self-signed certificate.
//! The same PEM feeds both the HTTP client and the streaming channel.

use anyhow::Context;
use rustls::{pki_types::CertificateDer, ClientConfig, RootCertStore};
use std::{fs, io::BufReader, path::Path, sync::Arc};

#[derive(Clone)]
pub struct TlsSetup {
    pub http_root: reqwest::Certificate,
    pub ws_config: Arc<ClientConfig>,
}

pub fn load_ca(path: &Path) -> anyhow::Result<TlsSetup> {
    let pem = fs::read(path).with_context(|| format!("reading CA file {}", path.display()))?;

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut BufReader::new(&pem[..]))
        .collect::<Result<_, _>>()
        .context("parsing CA PEM")?;
    if certs.is_empty() {
        anyhow::bail!("no certificates found in {}", path.display());
    }

    let mut roots = RootCertStore::empty();
    for c in certs {
        roots.add(c).context("adding CA certificate")?;
    }
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let ws_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .context("building TLS config")?
        .with_root_certificates(roots)
        .with_no_client_auth();

    let http_root = reqwest::Certificate::from_pem(&pem).context("loading CA for http client")?;
    Ok(TlsSetup {
        http_root,
        ws_config: Arc::new(ws_config),
    })
}
