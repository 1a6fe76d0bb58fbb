// packages/engine/src/bridge.rs
//! Line-delimited JSON bridge to a host instrumentation agent
//!
//! The agent runs inside the target process and forwards events, one JSON
//! object per line:
//!
//! ```text
//! → {"type":"attach","package":"com.miHoYo.hkrpgcb","targets":["okhttp3.HttpUrl#parse(String)"]}
//! ← {"type":"attached","points":["okhttp_url_parse"],"missing":[...],"trust":[...]}
//! → {"type":"intercept","point":"okhttp_url_parse","args":[{"kind":"str","value":"https://api.mihoyo.com/x"}]}
//! ← {"type":"args","args":[{"kind":"str","value":"https://custom.example/x"}],"rewritten":true}
//! ```
//!
//! Every request gets exactly one response line.

use crate::interception::call_sites::{CallArg, InterceptionPoint};
use crate::interception::hook_host::AvailableTargets;
use crate::interception::override_state::OverrideSnapshot;
use crate::interception::tls_handler::TlsCheck;
use crate::module::ProxyModule;
use crate::settings::OperatorAction;
use crate::utils::config::EngineConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// Event from the host agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeRequest {
    /// Target process loaded; `targets` lists the member ids the agent can hook
    Attach {
        package: String,
        #[serde(default)]
        targets: Vec<String>,
    },
    /// A hooked call is about to run
    Intercept {
        point: InterceptionPoint,
        args: Vec<CallArg>,
    },
    /// Operator changed a setting
    Operator { action: OperatorAction },
    /// Current override state
    Status,
    /// A hooked certificate check is about to run
    TrustCheck {
        check: TlsCheck,
        #[serde(default)]
        hostname: String,
    },
}

/// Reply to the host agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeResponse {
    Attached {
        points: Vec<InterceptionPoint>,
        missing: Vec<InterceptionPoint>,
        trust: Vec<TlsCheck>,
    },
    Ignored {
        package: String,
    },
    Args {
        args: Vec<CallArg>,
        rewritten: bool,
    },
    State {
        enabled: bool,
        endpoint: String,
        active: bool,
    },
    Verdict {
        check: TlsCheck,
        pass: bool,
    },
    Error {
        message: String,
    },
}

impl BridgeResponse {
    fn error(message: impl Into<String>) -> Self {
        BridgeResponse::Error {
            message: message.into(),
        }
    }

    fn state(snapshot: &OverrideSnapshot) -> Self {
        BridgeResponse::State {
            enabled: snapshot.enabled,
            endpoint: snapshot.endpoint.clone(),
            active: snapshot.is_active(),
        }
    }
}

/// Bridge session; holds the module once attached
#[derive(Debug)]
pub struct Bridge {
    config: EngineConfig,
    module: Option<ProxyModule>,
}

impl Bridge {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            module: None,
        }
    }

    pub fn module(&self) -> Option<&ProxyModule> {
        self.module.as_ref()
    }

    /// Handle one raw line and produce the serialized reply
    pub fn handle_line(&mut self, line: &str) -> String {
        let response = match serde_json::from_str::<BridgeRequest>(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!("Malformed bridge request: {}", e);
                BridgeResponse::error(format!("malformed request: {}", e))
            }
        };

        serde_json::to_string(&response).unwrap_or_else(|e| {
            error!("Failed to encode bridge response: {}", e);
            r#"{"type":"error","message":"failed to encode response"}"#.to_string()
        })
    }

    pub fn handle(&mut self, request: BridgeRequest) -> BridgeResponse {
        match request {
            BridgeRequest::Attach { package, targets } => self.attach(package, targets),
            BridgeRequest::Intercept { point, args } => match &self.module {
                Some(module) => {
                    let out = module.intercept(point, args);
                    BridgeResponse::Args {
                        args: out.args,
                        rewritten: out.rewritten,
                    }
                }
                // Unattached: let the call proceed untouched
                None => BridgeResponse::Args {
                    args,
                    rewritten: false,
                },
            },
            BridgeRequest::Operator { action } => match &self.module {
                Some(module) => match module.apply(&action) {
                    Ok(snapshot) => BridgeResponse::state(&snapshot),
                    Err(e) => BridgeResponse::error(e.to_string()),
                },
                None => BridgeResponse::error("not attached"),
            },
            BridgeRequest::Status => match &self.module {
                Some(module) => BridgeResponse::state(&module.snapshot()),
                None => BridgeResponse::state(&OverrideSnapshot::default()),
            },
            BridgeRequest::TrustCheck { check, hostname } => match &self.module {
                Some(module) => BridgeResponse::Verdict {
                    check,
                    pass: module.trust_check(check, &hostname),
                },
                None => BridgeResponse::error("not attached"),
            },
        }
    }

    fn attach(&mut self, package: String, targets: Vec<String>) -> BridgeResponse {
        if self.module.is_some() {
            return BridgeResponse::error("already attached");
        }

        let host = AvailableTargets::new(targets);
        debug!("Host reports {} hookable targets", host.len());

        match ProxyModule::attach(self.config.clone(), &package, &host) {
            Ok(Some(module)) => {
                let response = BridgeResponse::Attached {
                    points: module.registry().installed(),
                    missing: module.registry().missing().to_vec(),
                    trust: module
                        .trust()
                        .map(|t| t.hooked().to_vec())
                        .unwrap_or_default(),
                };
                self.module = Some(module);
                response
            }
            Ok(None) => BridgeResponse::Ignored { package },
            Err(e) => {
                error!("Attach failed: {}", e);
                BridgeResponse::error(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::SettingsConfig;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn bridge_in(dir: &TempDir) -> Bridge {
        Bridge::new(EngineConfig {
            settings: SettingsConfig {
                path: dir.path().join("serverConfig.json"),
            },
            ..EngineConfig::default()
        })
    }

    fn send(bridge: &mut Bridge, request: Value) -> Value {
        serde_json::from_str(&bridge.handle_line(&request.to_string())).unwrap()
    }

    #[test]
    fn test_full_session() {
        let dir = TempDir::new().unwrap();
        let mut bridge = bridge_in(&dir);

        let reply = send(
            &mut bridge,
            json!({
                "type": "attach",
                "package": "com.miHoYo.hkrpgcb",
                "targets": [
                    "okhttp3.HttpUrl#parse(String)",
                    "com.google.gson.Gson#fromJson(String, Type)",
                    "com.combosdk.lib.third.okhttp3.CertificatePinner#check(String, List)"
                ]
            }),
        );
        assert_eq!(reply["type"], "attached");
        assert_eq!(reply["points"], json!(["okhttp_url_parse", "gson_from_json"]));
        assert_eq!(reply["missing"].as_array().unwrap().len(), 5);
        assert_eq!(reply["trust"], json!(["certificate_pinning"]));

        let reply = send(
            &mut bridge,
            json!({"type": "operator", "action": {"action": "edit_endpoint", "endpoint": "https://custom.example:9000"}}),
        );
        assert_eq!(reply, json!({"type": "state", "enabled": false, "endpoint": "", "active": false}));

        let reply = send(&mut bridge, json!({"type": "operator", "action": {"action": "use_custom_server"}}));
        assert_eq!(reply["active"], true);

        let reply = send(
            &mut bridge,
            json!({
                "type": "intercept",
                "point": "okhttp_url_parse",
                "args": [{"kind": "str", "value": "https://api.mihoyo.com/path?x=1"}]
            }),
        );
        assert_eq!(
            reply,
            json!({
                "type": "args",
                "args": [{"kind": "str", "value": "https://custom.example:9000/path?x=1"}],
                "rewritten": true
            })
        );

        let reply = send(
            &mut bridge,
            json!({"type": "trust_check", "check": "hostname_verification", "hostname": "custom.example"}),
        );
        assert_eq!(reply, json!({"type": "verdict", "check": "hostname_verification", "pass": true}));
    }

    #[test]
    fn test_foreign_package() {
        let dir = TempDir::new().unwrap();
        let mut bridge = bridge_in(&dir);

        let reply = send(&mut bridge, json!({"type": "attach", "package": "org.example"}));
        assert_eq!(reply, json!({"type": "ignored", "package": "org.example"}));
        assert!(bridge.module().is_none());
    }

    #[test]
    fn test_unattached_intercept_passes_through() {
        let dir = TempDir::new().unwrap();
        let mut bridge = bridge_in(&dir);

        let args = json!([{"kind": "str", "value": "https://api.mihoyo.com"}]);
        let reply = send(
            &mut bridge,
            json!({"type": "intercept", "point": "url_constructor", "args": args}),
        );
        assert_eq!(reply["args"], args);
        assert_eq!(reply["rewritten"], false);
    }

    #[test]
    fn test_custom_server_error_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut bridge = bridge_in(&dir);
        send(&mut bridge, json!({"type": "attach", "package": "com.miHoYo.hkrpgcb"}));

        let reply = send(&mut bridge, json!({"type": "operator", "action": {"action": "use_custom_server"}}));
        assert_eq!(reply, json!({"type": "error", "message": "server address is empty"}));
    }

    #[test]
    fn test_double_attach_rejected() {
        let dir = TempDir::new().unwrap();
        let mut bridge = bridge_in(&dir);
        send(&mut bridge, json!({"type": "attach", "package": "com.miHoYo.hkrpgcb"}));

        let reply = send(&mut bridge, json!({"type": "attach", "package": "com.miHoYo.hkrpgcb"}));
        assert_eq!(reply["type"], "error");
    }

    #[test]
    fn test_malformed_line() {
        let dir = TempDir::new().unwrap();
        let mut bridge = bridge_in(&dir);

        let reply: Value = serde_json::from_str(&bridge.handle_line("not json")).unwrap();
        assert_eq!(reply["type"], "error");

        let reply = send(&mut bridge, json!({"type": "intercept", "point": "bogus", "args": []}));
        assert_eq!(reply["type"], "error");
    }

    #[test]
    fn test_status_before_attach() {
        let dir = TempDir::new().unwrap();
        let mut bridge = bridge_in(&dir);

        let reply = send(&mut bridge, json!({"type": "status"}));
        assert_eq!(reply, json!({"type": "state", "enabled": false, "endpoint": "", "active": false}));
    }
}
