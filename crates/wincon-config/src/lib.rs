//! Environment knobs read once at `Init` time and folded against whatever
//! the handle manager's own VT-activation probe discovered, producing the
//! capability set the rest of the driver negotiates its behavior against.

use std::env;

/// Indirection over environment lookup so tests can supply a fake
/// environment instead of mutating the process-wide one.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the real process environment via [`std::env::var`].
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

fn parse_enable_disable(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "enable" => Some(true),
        "disable" => Some(false),
        _ => None,
    }
}

/// The raw recognized environment variables, parsed but not yet reconciled
/// with what VT activation actually achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvKnobs {
    /// `ConEmuPID` present and non-empty: disables truecolor and the VT
    /// attempt outright.
    pub conemu_present: bool,
    /// `TCELL_TRUECOLOR=enable|disable`.
    pub force_truecolor: Option<bool>,
    /// `TCELL_VTMODE=enable|disable`.
    pub force_vtmode: Option<bool>,
    /// `TCELL_ALTSCREEN=enable|disable`.
    pub force_altscreen: Option<bool>,
}

impl EnvKnobs {
    pub fn read(source: &impl EnvSource) -> Self {
        EnvKnobs {
            conemu_present: source.var("ConEmuPID").is_some_and(|v| !v.is_empty()),
            force_truecolor: source.var("TCELL_TRUECOLOR").and_then(|v| parse_enable_disable(&v)),
            force_vtmode: source.var("TCELL_VTMODE").and_then(|v| parse_enable_disable(&v)),
            force_altscreen: source.var("TCELL_ALTSCREEN").and_then(|v| parse_enable_disable(&v)),
        }
    }

    pub fn from_process_env() -> Self {
        Self::read(&ProcessEnv)
    }
}

/// The negotiated capability set a `Screen` engages with, after folding
/// [`EnvKnobs`] against the handle manager's VT-activation probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedCapabilities {
    pub vt_capable: bool,
    pub truecolor: bool,
    pub altscreen_enabled: bool,
}

/// Fold environment knobs against whether the output handle actually
/// accepted the VT processing mode bit. Every override is logged so a
/// misbehaving host's forced-legacy session is traceable from the log
/// alone.
pub fn negotiate(knobs: EnvKnobs, vt_mode_stuck: bool) -> NegotiatedCapabilities {
    let mut vt_capable = vt_mode_stuck;
    let mut truecolor = vt_mode_stuck;

    if knobs.conemu_present {
        tracing::info!(target: "wincon.config", "ConEmuPID detected, disabling truecolor and VT");
        vt_capable = false;
        truecolor = false;
    }

    if let Some(forced) = knobs.force_vtmode {
        tracing::info!(target: "wincon.config", forced, "TCELL_VTMODE override");
        vt_capable = forced;
        if !forced {
            truecolor = false;
        }
    }

    if let Some(forced) = knobs.force_truecolor {
        tracing::info!(target: "wincon.config", forced, "TCELL_TRUECOLOR override");
        truecolor = forced;
        if forced {
            vt_capable = true;
        }
    }

    let altscreen_enabled = knobs.force_altscreen.unwrap_or(true);
    if knobs.force_altscreen == Some(false) {
        tracing::info!(target: "wincon.config", "TCELL_ALTSCREEN=disable, alternate screen opt-out");
    }

    NegotiatedCapabilities {
        vt_capable,
        truecolor,
        altscreen_enabled,
    }
}
