// packages/engine/src/interception/call_sites.rs
//! Interception point registry
//!
//! One adapter per intercepted call shape. An adapter checks the in-flight
//! arguments against its shape, pulls out the URL-bearing string, runs it
//! through the rewrite engine and writes the result back into the same slot.
//! The original call then proceeds with the adapted arguments; adapters
//! never perform or cancel the call themselves.
//!
//! | Point | Shape | URL arg |
//! |---|---|---|
//! | `web_view_load` | web content loader `(String, String)` | 1 |
//! | `okhttp_url_parse` | HTTP URL parser `(String)` | 0 |
//! | `combo_sdk_url_parse` | HTTP URL parser `(String)` | 0 |
//! | `gson_from_json` | JSON deserialization `(String, Type)` | 0 |
//! | `url_constructor` | URL constructor `(String)` | 0 |
//! | `combo_sdk_request_builder_url` | request-builder URL setter `(String)` | 0 |
//! | `okhttp_request_builder_url` | request-builder URL setter `(String)` | 0 |

use crate::interception::hook_host::{HookHost, ParamKind, TargetSignature};
use crate::interception::override_state::OverrideSnapshot;
use crate::interception::rewrite::RewriteEngine;
use crate::utils::errors::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Distinct API shapes that carry a URL-like argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallShape {
    /// Web content loader taking (context, url)
    WebContentLoad,
    /// HTTP client URL parser taking a single string
    HttpUrlParse,
    /// JSON deserialization taking (json, type); the URL may be anywhere in the payload
    JsonDeserialize,
    /// Generic URL object constructor
    UrlConstructor,
    /// Request builder URL setter
    RequestBuilderUrl,
}

impl CallShape {
    /// Parameter kinds the shape expects, in order
    pub fn params(&self) -> &'static [ParamKind] {
        match self {
            CallShape::WebContentLoad => &[ParamKind::String, ParamKind::String],
            CallShape::JsonDeserialize => &[ParamKind::String, ParamKind::Type],
            CallShape::HttpUrlParse | CallShape::UrlConstructor | CallShape::RequestBuilderUrl => {
                &[ParamKind::String]
            }
        }
    }

    /// Position of the URL-bearing argument
    pub fn url_position(&self) -> usize {
        match self {
            CallShape::WebContentLoad => 1,
            _ => 0,
        }
    }
}

/// Every call site the engine knows how to adapt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InterceptionPoint {
    #[serde(rename = "web_view_load")]
    WebViewLoad,
    #[serde(rename = "okhttp_url_parse")]
    OkHttpUrlParse,
    #[serde(rename = "combo_sdk_url_parse")]
    ComboSdkUrlParse,
    #[serde(rename = "gson_from_json")]
    GsonFromJson,
    #[serde(rename = "url_constructor")]
    UrlConstructor,
    #[serde(rename = "combo_sdk_request_builder_url")]
    ComboSdkRequestBuilderUrl,
    #[serde(rename = "okhttp_request_builder_url")]
    OkHttpRequestBuilderUrl,
}

impl InterceptionPoint {
    pub const ALL: [InterceptionPoint; 7] = [
        InterceptionPoint::WebViewLoad,
        InterceptionPoint::OkHttpUrlParse,
        InterceptionPoint::ComboSdkUrlParse,
        InterceptionPoint::GsonFromJson,
        InterceptionPoint::UrlConstructor,
        InterceptionPoint::ComboSdkRequestBuilderUrl,
        InterceptionPoint::OkHttpRequestBuilderUrl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InterceptionPoint::WebViewLoad => "web_view_load",
            InterceptionPoint::OkHttpUrlParse => "okhttp_url_parse",
            InterceptionPoint::ComboSdkUrlParse => "combo_sdk_url_parse",
            InterceptionPoint::GsonFromJson => "gson_from_json",
            InterceptionPoint::UrlConstructor => "url_constructor",
            InterceptionPoint::ComboSdkRequestBuilderUrl => "combo_sdk_request_builder_url",
            InterceptionPoint::OkHttpRequestBuilderUrl => "okhttp_request_builder_url",
        }
    }

    pub fn shape(&self) -> CallShape {
        match self {
            InterceptionPoint::WebViewLoad => CallShape::WebContentLoad,
            InterceptionPoint::OkHttpUrlParse | InterceptionPoint::ComboSdkUrlParse => {
                CallShape::HttpUrlParse
            }
            InterceptionPoint::GsonFromJson => CallShape::JsonDeserialize,
            InterceptionPoint::UrlConstructor => CallShape::UrlConstructor,
            InterceptionPoint::ComboSdkRequestBuilderUrl
            | InterceptionPoint::OkHttpRequestBuilderUrl => CallShape::RequestBuilderUrl,
        }
    }

    /// Member the host must hook for this point
    pub fn target(&self) -> TargetSignature {
        let (owner, member) = match self {
            InterceptionPoint::WebViewLoad => ("com.miHoYo.sdk.webview.MiHoYoWebview", "load"),
            InterceptionPoint::OkHttpUrlParse => ("okhttp3.HttpUrl", "parse"),
            InterceptionPoint::ComboSdkUrlParse => ("com.combosdk.lib.third.okhttp3.HttpUrl", "parse"),
            InterceptionPoint::GsonFromJson => ("com.google.gson.Gson", "fromJson"),
            InterceptionPoint::UrlConstructor => ("java.net.URL", "<init>"),
            InterceptionPoint::ComboSdkRequestBuilderUrl => {
                ("com.combosdk.lib.third.okhttp3.Request$Builder", "url")
            }
            InterceptionPoint::OkHttpRequestBuilderUrl => ("okhttp3.Request$Builder", "url"),
        };

        TargetSignature {
            owner,
            member,
            params: self.shape().params(),
        }
    }
}

impl fmt::Display for InterceptionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InterceptionPoint {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        InterceptionPoint::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| EngineError::UnknownInterceptionPoint(s.to_string()))
    }
}

/// One argument of an intercepted call, as delivered by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CallArg {
    Str(String),
    Null,
    /// Runtime type descriptor, by name
    Type(String),
    /// Any other object, by its string form; never rewritten
    Opaque(String),
}

impl CallArg {
    pub fn str(value: impl Into<String>) -> Self {
        CallArg::Str(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CallArg::Str(s) => Some(s),
            _ => None,
        }
    }

    fn fits(&self, kind: ParamKind) -> bool {
        matches!(
            (kind, self),
            (_, CallArg::Null)
                | (ParamKind::String, CallArg::Str(_))
                | (ParamKind::Type, CallArg::Type(_) | CallArg::Opaque(_))
                | (ParamKind::List, CallArg::Opaque(_))
        )
    }
}

/// Arguments after adaptation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intercepted {
    pub args: Vec<CallArg>,
    /// Whether the URL-bearing slot was replaced
    pub rewritten: bool,
}

impl Intercepted {
    fn unchanged(args: Vec<CallArg>) -> Self {
        Self {
            args,
            rewritten: false,
        }
    }
}

/// Adapter between one interception point and the rewrite engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSiteAdapter {
    point: InterceptionPoint,
}

impl CallSiteAdapter {
    pub fn new(point: InterceptionPoint) -> Self {
        Self { point }
    }

    pub fn point(&self) -> InterceptionPoint {
        self.point
    }

    /// Check the arguments against the call shape
    pub fn recognize(&self, args: &[CallArg]) -> Result<()> {
        let params = self.point.shape().params();

        if args.len() != params.len() {
            return Err(EngineError::shape_mismatch(
                self.point.name(),
                format!("expected {} argument(s), got {}", params.len(), args.len()),
            ));
        }

        for (index, (arg, kind)) in args.iter().zip(params).enumerate() {
            if !arg.fits(*kind) {
                return Err(EngineError::shape_mismatch(
                    self.point.name(),
                    format!("argument {} is {:?}, expected {:?}", index, arg, kind),
                ));
            }
        }

        Ok(())
    }

    /// The URL-bearing string, or `None` when the slot holds null
    pub fn extract<'a>(&self, args: &'a [CallArg]) -> Result<Option<&'a str>> {
        self.recognize(args)?;
        Ok(args[self.point.shape().url_position()].as_str())
    }

    /// Rewrite the URL-bearing argument in place and hand the arguments back
    pub fn adapt(
        &self,
        args: Vec<CallArg>,
        engine: &RewriteEngine,
        state: &OverrideSnapshot,
    ) -> Result<Intercepted> {
        self.recognize(&args)?;
        Ok(self.write_back(args, engine, state))
    }

    /// Rewrite step for arguments that already fit the shape
    fn write_back(
        &self,
        mut args: Vec<CallArg>,
        engine: &RewriteEngine,
        state: &OverrideSnapshot,
    ) -> Intercepted {
        let position = self.point.shape().url_position();

        // Null and non-string slots are never touched
        let replacement = match &args[position] {
            CallArg::Str(value) => match engine.rewrite(value, state) {
                Cow::Owned(new) => Some(new),
                Cow::Borrowed(_) => None,
            },
            _ => None,
        };

        match replacement {
            Some(new) => {
                args[position] = CallArg::Str(new);
                Intercepted {
                    args,
                    rewritten: true,
                }
            }
            None => Intercepted::unchanged(args),
        }
    }
}

/// Interception points installed for the attached process
#[derive(Debug, Clone, Default)]
pub struct InterceptionRegistry {
    adapters: BTreeMap<InterceptionPoint, CallSiteAdapter>,
    missing: Vec<InterceptionPoint>,
}

impl InterceptionRegistry {
    /// Install every known point the host can locate
    pub fn install(host: &dyn HookHost) -> Self {
        Self::install_points(host, InterceptionPoint::ALL)
    }

    /// Install the given points; those the host cannot locate are recorded
    /// as missing and left alone
    pub fn install_points<I>(host: &dyn HookHost, points: I) -> Self
    where
        I: IntoIterator<Item = InterceptionPoint>,
    {
        let mut registry = Self::default();

        for point in points {
            let target = point.target();
            if host.locate(&target) {
                debug!("Hooked {} at {}", point, target);
                registry.register(point);
            } else {
                warn!("Target {} not found, {} will not be rewritten", target, point);
                if !registry.missing.contains(&point) {
                    registry.missing.push(point);
                }
            }
        }

        info!(
            installed = registry.adapters.len(),
            missing = registry.missing.len(),
            "Interception points installed"
        );

        registry
    }

    /// Registry with every known point, without consulting a host
    pub fn with_all() -> Self {
        let mut registry = Self::default();
        for point in InterceptionPoint::ALL {
            registry.register(point);
        }
        registry
    }

    pub fn register(&mut self, point: InterceptionPoint) {
        self.missing.retain(|p| *p != point);
        self.adapters.insert(point, CallSiteAdapter::new(point));
    }

    pub fn adapter(&self, point: InterceptionPoint) -> Option<&CallSiteAdapter> {
        self.adapters.get(&point)
    }

    pub fn is_installed(&self, point: InterceptionPoint) -> bool {
        self.adapters.contains_key(&point)
    }

    pub fn installed(&self) -> Vec<InterceptionPoint> {
        self.adapters.keys().copied().collect()
    }

    pub fn missing(&self) -> &[InterceptionPoint] {
        &self.missing
    }

    /// Adapt a call at `point`
    ///
    /// Never blocks the original call: an uninstalled point or arguments
    /// that do not fit the shape come back unchanged.
    pub fn intercept(
        &self,
        point: InterceptionPoint,
        args: Vec<CallArg>,
        engine: &RewriteEngine,
        state: &OverrideSnapshot,
    ) -> Intercepted {
        let Some(adapter) = self.adapters.get(&point) else {
            warn!("Call at {} ignored: point not installed", point);
            return Intercepted::unchanged(args);
        };

        if let Err(e) = adapter.recognize(&args) {
            warn!("Call at {} passed through: {}", point, e);
            return Intercepted::unchanged(args);
        }

        adapter.write_back(args, engine, state)
    }
}
