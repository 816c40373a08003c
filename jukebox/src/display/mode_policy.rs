use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::device::{ModeInfo, Resolution};

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    CrtNative,
    ModernTv,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::CrtNative => DisplayMode::ModernTv,
            DisplayMode::ModernTv => DisplayMode::CrtNative,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayMode::CrtNative => "CRT",
            DisplayMode::ModernTv => "Modern TV",
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ResolutionPolicy {
    /// Native CRT modes taller than this are replaced by
    /// `crt_safe_resolution`.
    pub crt_max_height: u32,
    pub crt_safe_resolution: Resolution,
    pub modern_preferred: Resolution,
    pub modern_fallbacks: [Resolution; 2],
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            crt_max_height: 1080,
            crt_safe_resolution: Resolution::new(1920, 1080),
            modern_preferred: Resolution::new(1920, 1080),
            modern_fallbacks: [
                Resolution::new(1280, 720),
                Resolution::new(720, 576),
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ModeRequest {
    /// Whatever the display reports as preferred.
    Auto,
    Exact(Resolution),
}

pub trait ModeProber {
    fn probe(&self, request: ModeRequest) -> Option<ModeInfo>;
}

impl ModeProber for [ModeInfo] {
    fn probe(&self, request: ModeRequest) -> Option<ModeInfo> {
        match request {
            ModeRequest::Auto => self
                .iter()
                .find(|mode| mode.preferred)
                .or_else(|| self.first())
                .cloned(),
            ModeRequest::Exact(resolution) => self
                .iter()
                .filter(|mode| mode.resolution == resolution)
                .max_by_key(|mode| mode.refresh_hz)
                .cloned(),
        }
    }
}

pub fn select_mode<P: ModeProber + ?Sized>(
    display_mode: DisplayMode,
    policy: &ResolutionPolicy,
    prober: &P,
) -> Option<ModeInfo> {
    match display_mode {
        DisplayMode::CrtNative => select_crt_mode(policy, prober),
        DisplayMode::ModernTv => select_modern_mode(policy, prober),
    }
}

fn select_crt_mode<P: ModeProber + ?Sized>(
    policy: &ResolutionPolicy,
    prober: &P,
) -> Option<ModeInfo> {
    let native = prober.probe(ModeRequest::Auto)?;

    if native.resolution.height <= policy.crt_max_height {
        info!("CRT mode: using native {}", native.resolution);
        return Some(native);
    }

    match prober.probe(ModeRequest::Exact(policy.crt_safe_resolution)) {
        Some(safe) => {
            info!(
                "CRT mode: native {} exceeds {}px, clamping to {}",
                native.resolution,
                policy.crt_max_height,
                safe.resolution
            );
            Some(safe)
        }
        None => {
            warn!(
                "CRT mode: native {} exceeds {}px but {} is unavailable; \
                 keeping native",
                native.resolution,
                policy.crt_max_height,
                policy.crt_safe_resolution
            );
            Some(native)
        }
    }
}

fn select_modern_mode<P: ModeProber + ?Sized>(
    policy: &ResolutionPolicy,
    prober: &P,
) -> Option<ModeInfo> {
    let chain = [
        ModeRequest::Exact(policy.modern_preferred),
        ModeRequest::Exact(policy.modern_fallbacks[0]),
        ModeRequest::Exact(policy.modern_fallbacks[1]),
        ModeRequest::Auto,
    ];

    for request in chain {
        if let Some(mode) = prober.probe(request) {
            info!("Modern TV mode: {:?} -> {}", request, mode.resolution);
            return Some(mode);
        }
        debug!("Modern TV mode: {:?} unavailable", request);
    }

    None
}
