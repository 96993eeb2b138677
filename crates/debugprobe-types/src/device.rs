//! Host device identification, carried on registration and in every
//! [`crate::event::Event`]'s originating context.

use serde::{Deserialize, Serialize};

/// Immutable description of the host device, captured once at agent
/// startup and handed to every plugin via `PluginContext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable per-install identifier (not a hardware serial).
    pub device_id: String,
    /// Human-readable device model, e.g. "iPhone 15 Pro" or "Pixel 8".
    pub model: String,
    /// Host OS name, e.g. "iOS", "Android", "macOS".
    pub os_name: String,
    /// Host OS version string.
    pub os_version: String,
    /// Host application bundle/package identifier.
    pub app_id: String,
    /// Host application version string.
    pub app_version: String,
    /// SDK version of the embedded agent.
    pub sdk_version: String,
}

impl DeviceInfo {
    /// Construct a [`DeviceInfo`] with the agent's own crate version as
    /// `sdk_version`.
    pub fn new(
        device_id: impl Into<String>,
        model: impl Into<String>,
        os_name: impl Into<String>,
        os_version: impl Into<String>,
        app_id: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            model: model.into(),
            os_name: os_name.into(),
            os_version: os_version.into(),
            app_id: app_id.into(),
            app_version: app_version.into(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let info = DeviceInfo::new("dev-1", "Pixel 8", "Android", "14", "com.app", "1.2.3");
        let json = serde_json::to_string(&info).expect("serialize");
        let back: DeviceInfo = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(info, back);
    }
}
