// packages/engine/src/module.rs
//! Module lifecycle
//!
//! Attaching to a target process runs, in order:
//!
//! 1. Package filter: anything but the configured package is ignored
//! 2. Trust override: certificate checks bypassed (unless disabled)
//! 3. Interception points located and installed
//! 4. Persisted settings loaded into the override state
//!
//! After that every intercepted call goes through [`ProxyModule::intercept`].

use crate::interception::call_sites::{CallArg, Intercepted, InterceptionPoint, InterceptionRegistry};
use crate::interception::hook_host::HookHost;
use crate::interception::override_state::{OverrideSnapshot, OverrideState};
use crate::interception::rewrite::RewriteEngine;
use crate::interception::tls_handler::{TlsCheck, TrustOverride};
use crate::settings::{apply_action, OperatorAction, SettingsStore};
use crate::utils::config::EngineConfig;
use crate::utils::errors::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Attached interception module
#[derive(Debug)]
pub struct ProxyModule {
    config: EngineConfig,
    state: Arc<OverrideState>,
    engine: RewriteEngine,
    registry: InterceptionRegistry,
    trust: Option<TrustOverride>,
    settings: SettingsStore,
}

impl ProxyModule {
    /// Attach to `package`, or return `None` when it is not the target
    pub fn attach(config: EngineConfig, package: &str, host: &dyn HookHost) -> Result<Option<Self>> {
        if !config.module.should_attach(package) {
            info!("Ignoring package {}", package);
            return Ok(None);
        }

        info!("Attaching to {}", package);

        // Installed before any request can be made, independent of rewriting
        let trust = if config.trust.install {
            Some(TrustOverride::install(host))
        } else {
            warn!("Trust override disabled by configuration; certificate checks stay enforced");
            None
        };

        let registry = InterceptionRegistry::install(host);
        let settings = SettingsStore::open(&config.settings.path)?;
        let state = Arc::new(OverrideState::new());
        apply_action(&OperatorAction::Load, &settings, &state)?;

        Ok(Some(Self {
            config,
            state,
            engine: RewriteEngine::new(),
            registry,
            trust,
            settings,
        }))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &InterceptionRegistry {
        &self.registry
    }

    pub fn trust(&self) -> Option<&TrustOverride> {
        self.trust.as_ref()
    }

    /// Shared handle to the override state
    pub fn state(&self) -> Arc<OverrideState> {
        Arc::clone(&self.state)
    }

    pub fn snapshot(&self) -> Arc<OverrideSnapshot> {
        self.state.snapshot()
    }

    /// Adapt the arguments of an intercepted call
    ///
    /// Reads one snapshot of the override state for the whole decision.
    pub fn intercept(&self, point: InterceptionPoint, args: Vec<CallArg>) -> Intercepted {
        let snapshot = self.state.snapshot();
        self.registry.intercept(point, args, &self.engine, &snapshot)
    }

    /// Apply an operator action
    pub fn apply(&self, action: &OperatorAction) -> Result<Arc<OverrideSnapshot>> {
        apply_action(action, &self.settings, &self.state)
    }

    /// Verdict for a hooked certificate check
    ///
    /// Without the trust override nothing is hooked, so the application's
    /// own decision stands; this reports `false` to say "not bypassed".
    pub fn trust_check(&self, check: TlsCheck, hostname: &str) -> bool {
        match &self.trust {
            Some(trust) => trust.decide(check, hostname),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interception::hook_host::AvailableTargets;
    use crate::utils::config::SettingsConfig;
    use tempfile::TempDir;

    fn everything() -> AvailableTargets {
        AvailableTargets::new(
            InterceptionPoint::ALL
                .iter()
                .map(|p| p.target().id())
                .chain(TlsCheck::ALL.iter().map(|c| c.target().id())),
        )
    }

    fn config_in(dir: &TempDir) -> EngineConfig {
        EngineConfig {
            settings: SettingsConfig {
                path: dir.path().join("serverConfig.json"),
            },
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_foreign_package_ignored() {
        let dir = TempDir::new().unwrap();
        let module = ProxyModule::attach(config_in(&dir), "com.example.other", &everything()).unwrap();
        assert!(module.is_none());
    }

    #[test]
    fn test_attach_loads_settings() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("serverConfig.json"),
            r#"{"forceUrl":true,"serverip":"http://127.0.0.1:21000"}"#,
        )
        .unwrap();

        let module = ProxyModule::attach(config_in(&dir), "com.miHoYo.hkrpgcb", &everything())
            .unwrap()
            .unwrap();

        assert!(module.snapshot().is_active());
        assert_eq!(module.registry().installed().len(), InterceptionPoint::ALL.len());
        assert_eq!(module.trust().unwrap().hooked(), &TlsCheck::ALL);

        let out = module.intercept(
            InterceptionPoint::OkHttpRequestBuilderUrl,
            vec![CallArg::str("https://sdk.hoyoverse.com/combo/granter/login")],
        );
        assert_eq!(out.args, vec![CallArg::str("http://127.0.0.1:21000/combo/granter/login")]);
    }

    #[test]
    fn test_operator_flow() {
        let dir = TempDir::new().unwrap();
        let module = ProxyModule::attach(config_in(&dir), "com.miHoYo.hkrpgcb", &everything())
            .unwrap()
            .unwrap();

        let url = vec![CallArg::str("https://api.mihoyo.com/x")];
        assert!(!module.intercept(InterceptionPoint::UrlConstructor, url.clone()).rewritten);

        module
            .apply(&OperatorAction::EditEndpoint {
                endpoint: "https://ps.example".to_string(),
            })
            .unwrap();
        module.apply(&OperatorAction::UseCustomServer).unwrap();

        let out = module.intercept(InterceptionPoint::UrlConstructor, url.clone());
        assert_eq!(out.args, vec![CallArg::str("https://ps.example/x")]);

        module.apply(&OperatorAction::UseOfficialServer).unwrap();
        let out = module.intercept(InterceptionPoint::UrlConstructor, url.clone());
        assert_eq!(out.args, url);
    }

    #[test]
    fn test_trust_independent_of_override() {
        let dir = TempDir::new().unwrap();
        let module = ProxyModule::attach(config_in(&dir), "com.miHoYo.hkrpgcb", &everything())
            .unwrap()
            .unwrap();

        assert!(!module.snapshot().is_active());
        assert!(module.trust_check(TlsCheck::HostnameVerification, "api.mihoyo.com"));
        assert!(module.trust_check(TlsCheck::CertificatePinning, "api.mihoyo.com"));
    }

    #[test]
    fn test_trust_disabled_by_config() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.trust.install = false;

        let module = ProxyModule::attach(config, "com.miHoYo.hkrpgcb", &everything())
            .unwrap()
            .unwrap();
        assert!(module.trust().is_none());
        assert!(!module.trust_check(TlsCheck::HostnameVerification, "api.mihoyo.com"));
    }
}
