//! Device presets for deterministic page runs.
//!
//! The two presets mirror the viewports the site is verified against: a
//! desktop browser window and a small phone.

use crate::Viewport;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceMetrics {
    pub width: u32,
    pub height: u32,
    pub dpr: f32,
    pub touch: bool,
}

impl DeviceMetrics {
    pub fn desktop() -> Self {
        Self {
            width: 1280,
            height: 720,
            dpr: 1.0,
            touch: false,
        }
    }

    pub fn mobile() -> Self {
        Self {
            width: 375,
            height: 667,
            dpr: 2.75,
            touch: true,
        }
    }

    /// Look up a preset by name (`desktop` or `mobile`)
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "desktop" => Some(Self::desktop()),
            "mobile" => Some(Self::mobile()),
            _ => None,
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.width,
            height: self.height,
        }
    }
}

impl Default for DeviceMetrics {
    fn default() -> Self {
        Self::desktop()
    }
}
