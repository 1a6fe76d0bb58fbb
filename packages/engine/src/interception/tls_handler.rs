// packages/engine/src/interception/tls_handler.rs
//! Trust override for TLS certificate checks
//!
//! Rewritten endpoints rarely present a certificate the target application
//! would accept, so the module replaces two checks with stubs that always
//! pass:
//!
//! - **Hostname verification** always reports a match
//! - **Certificate pinning** never reports a violation
//!
//! A trust-all `rustls` verifier is installed as well, covering TLS stacks
//! that are not hooked individually. The override is permanent once
//! installed and does not depend on whether URL rewriting is active.

use crate::interception::hook_host::{HookHost, ParamKind, TargetSignature};
use crate::utils::errors::Result;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Certificate checks the override replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsCheck {
    HostnameVerification,
    CertificatePinning,
}

impl TlsCheck {
    pub const ALL: [TlsCheck; 2] = [TlsCheck::HostnameVerification, TlsCheck::CertificatePinning];

    /// Member the host must hook for this check
    pub fn target(&self) -> TargetSignature {
        match self {
            TlsCheck::HostnameVerification => TargetSignature {
                owner: "com.combosdk.lib.third.okhttp3.internal.tls.OkHostnameVerifier",
                member: "verify",
                params: &[],
            },
            TlsCheck::CertificatePinning => TargetSignature {
                owner: "com.combosdk.lib.third.okhttp3.CertificatePinner",
                member: "check",
                params: &[ParamKind::String, ParamKind::List],
            },
        }
    }
}

impl fmt::Display for TlsCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsCheck::HostnameVerification => f.write_str("hostname_verification"),
            TlsCheck::CertificatePinning => f.write_str("certificate_pinning"),
        }
    }
}

/// Pin mismatch reported by a pinning check
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("certificate pinning failure for {hostname}")]
pub struct PinningViolation {
    pub hostname: String,
}

/// Decides whether a peer certificate chain is valid for a hostname
pub trait HostnameVerifier: Send + Sync {
    fn verify(&self, hostname: &str, peer_chain: &[CertificateDer<'_>]) -> bool;
}

/// Checks a peer certificate chain against configured pins
pub trait CertificatePinner: Send + Sync {
    fn check(
        &self,
        hostname: &str,
        peer_chain: &[CertificateDer<'_>],
    ) -> std::result::Result<(), PinningViolation>;
}

/// Hostname verifier that accepts every hostname
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllHostnames;

impl HostnameVerifier for AcceptAllHostnames {
    fn verify(&self, hostname: &str, _peer_chain: &[CertificateDer<'_>]) -> bool {
        debug!("Hostname verification bypassed for {}", hostname);
        true
    }
}

/// Pinner with no pins
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPinning;

impl CertificatePinner for NoPinning {
    fn check(
        &self,
        hostname: &str,
        _peer_chain: &[CertificateDer<'_>],
    ) -> std::result::Result<(), PinningViolation> {
        debug!("Certificate pinning bypassed for {}", hostname);
        Ok(())
    }
}

/// `rustls` verifier that trusts every certificate and signature
#[derive(Debug)]
pub struct TrustAllCertificates {
    provider: Arc<CryptoProvider>,
}

impl TrustAllCertificates {
    pub fn new() -> Self {
        Self::with_provider(Arc::new(rustls::crypto::ring::default_provider()))
    }

    pub fn with_provider(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> Arc<CryptoProvider> {
        Arc::clone(&self.provider)
    }
}

impl Default for TrustAllCertificates {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerCertVerifier for TrustAllCertificates {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        debug!("Trusting certificate for {:?}", server_name);
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Installed trust override
pub struct TrustOverride {
    hostname_verifier: Arc<dyn HostnameVerifier>,
    pinner: Arc<dyn CertificatePinner>,
    fallback: Arc<TrustAllCertificates>,
    hooked: Vec<TlsCheck>,
    missing: Vec<TlsCheck>,
}

impl TrustOverride {
    /// Hook both certificate checks the host can locate and install the
    /// trust-all fallback
    ///
    /// A check the host cannot find is logged and skipped; the fallback is
    /// installed regardless.
    pub fn install(host: &dyn HookHost) -> Self {
        let mut hooked = Vec::new();
        let mut missing = Vec::new();

        for check in TlsCheck::ALL {
            let target = check.target();
            if host.locate(&target) {
                debug!("Hooked {} at {}", check, target);
                hooked.push(check);
            } else {
                warn!("Target {} not found, {} stays enforced there", target, check);
                missing.push(check);
            }
        }

        info!(
            hooked = hooked.len(),
            missing = missing.len(),
            "Trust override installed with trust-all fallback"
        );

        Self {
            hostname_verifier: Arc::new(AcceptAllHostnames),
            pinner: Arc::new(NoPinning),
            fallback: Arc::new(TrustAllCertificates::new()),
            hooked,
            missing,
        }
    }

    /// Checks whose targets were hooked
    pub fn hooked(&self) -> &[TlsCheck] {
        &self.hooked
    }

    /// Checks whose targets were not found
    pub fn missing(&self) -> &[TlsCheck] {
        &self.missing
    }

    pub fn verify_hostname(&self, hostname: &str, peer_chain: &[CertificateDer<'_>]) -> bool {
        self.hostname_verifier.verify(hostname, peer_chain)
    }

    pub fn check_pins(
        &self,
        hostname: &str,
        peer_chain: &[CertificateDer<'_>],
    ) -> std::result::Result<(), PinningViolation> {
        self.pinner.check(hostname, peer_chain)
    }

    /// Verdict for a hooked check; `true` means the call reports success
    pub fn decide(&self, check: TlsCheck, hostname: &str) -> bool {
        match check {
            TlsCheck::HostnameVerification => self.verify_hostname(hostname, &[]),
            TlsCheck::CertificatePinning => self.check_pins(hostname, &[]).is_ok(),
        }
    }

    /// The trust-all fallback verifier
    pub fn fallback_verifier(&self) -> Arc<TrustAllCertificates> {
        Arc::clone(&self.fallback)
    }

    /// Client configuration that trusts any server certificate
    pub fn client_config(&self) -> Result<ClientConfig> {
        let config = ClientConfig::builder_with_provider(self.fallback.provider())
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(self.fallback_verifier())
            .with_no_client_auth();

        Ok(config)
    }
}

impl fmt::Debug for TrustOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustOverride")
            .field("hooked", &self.hooked)
            .field("missing", &self.missing)
            .finish_non_exhaustive()
    }
}
