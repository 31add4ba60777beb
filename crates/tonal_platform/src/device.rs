//! Output Device Model
//!
//! An output device doubles as a configuration scope: its `id` is the key
//! under which per-device effect settings are stored.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Physical kind of an audio output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Speaker,
    Headset,
    Bluetooth,
    Usb,
    Wireless,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 5] = [
        DeviceKind::Speaker,
        DeviceKind::Headset,
        DeviceKind::Bluetooth,
        DeviceKind::Usb,
        DeviceKind::Wireless,
    ];

    /// Stable configuration-scope key
    pub fn key(self) -> &'static str {
        match self {
            DeviceKind::Speaker => "speaker",
            DeviceKind::Headset => "headset",
            DeviceKind::Bluetooth => "bluetooth",
            DeviceKind::Usb => "usb",
            DeviceKind::Wireless => "wireless",
        }
    }

    /// Parse a scope key back into a kind
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }

    /// Kinds where each physical device gets its own settings scope
    fn is_addressable(self) -> bool {
        matches!(self, DeviceKind::Bluetooth | DeviceKind::Usb)
    }

    fn bit(self) -> u8 {
        match self {
            DeviceKind::Speaker => 1 << 0,
            DeviceKind::Headset => 1 << 1,
            DeviceKind::Bluetooth => 1 << 2,
            DeviceKind::Usb => 1 << 3,
            DeviceKind::Wireless => 1 << 4,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Set of device kinds the music stream is currently routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceMask(u8);

impl DeviceMask {
    pub const NONE: DeviceMask = DeviceMask(0);
    pub const ALL: DeviceMask = DeviceMask(0b1_1111);

    pub fn from_kinds(kinds: &[DeviceKind]) -> Self {
        kinds.iter().fold(Self::NONE, |mask, kind| mask.with(*kind))
    }

    pub fn with(self, kind: DeviceKind) -> Self {
        DeviceMask(self.0 | kind.bit())
    }

    pub fn contains(self, kind: DeviceKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// A connected audio output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDevice {
    /// Configuration scope key (e.g. "speaker", "bluetooth:00:11:22:33:44:55")
    pub id: String,

    /// Physical kind
    pub kind: DeviceKind,

    /// Human-readable name
    pub name: String,

    /// Physical connection id (MAC, USB path), if any
    pub address: Option<String>,
}

impl OutputDevice {
    pub fn new(kind: DeviceKind, name: impl Into<String>, address: Option<String>) -> Self {
        let address = address.filter(|a| !a.is_empty());
        let id = match (&address, kind.is_addressable()) {
            (Some(addr), true) => format!("{}:{}", kind.key(), addr),
            _ => kind.key().to_string(),
        };
        Self {
            id,
            kind,
            name: name.into(),
            address,
        }
    }

    /// The built-in speaker, used when nothing else is routable
    pub fn speaker() -> Self {
        Self::new(DeviceKind::Speaker, "Speaker", None)
    }

    /// Whether two records describe the same physical output
    pub fn same_identity(&self, other: &OutputDevice) -> bool {
        self.kind == other.kind && self.address == other.address
    }
}

impl fmt::Display for OutputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_keys_roundtrip() {
        for kind in DeviceKind::ALL {
            assert_eq!(DeviceKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(DeviceKind::from_key("hdmi"), None);
    }

    #[test]
    fn test_device_ids() {
        assert_eq!(OutputDevice::speaker().id, "speaker");

        let bt = OutputDevice::new(
            DeviceKind::Bluetooth,
            "Buds",
            Some("00:11:22:33:44:55".into()),
        );
        assert_eq!(bt.id, "bluetooth:00:11:22:33:44:55");

        // Wired outputs share one scope regardless of connection id
        let wired = OutputDevice::new(DeviceKind::Headset, "Jack", Some("3.5mm".into()));
        assert_eq!(wired.id, "headset");

        let no_addr = OutputDevice::new(DeviceKind::Usb, "DAC", Some(String::new()));
        assert_eq!(no_addr.id, "usb");
        assert_eq!(no_addr.address, None);
    }

    #[test]
    fn test_identity_ignores_name() {
        let a = OutputDevice::new(DeviceKind::Bluetooth, "Buds", Some("AA".into()));
        let b = OutputDevice::new(DeviceKind::Bluetooth, "Renamed", Some("AA".into()));
        let c = OutputDevice::new(DeviceKind::Bluetooth, "Buds", Some("BB".into()));
        assert!(a.same_identity(&b));
        assert!(!a.same_identity(&c));
    }

    #[test]
    fn test_device_mask() {
        let mask = DeviceMask::from_kinds(&[DeviceKind::Headset, DeviceKind::Usb]);
        assert!(mask.contains(DeviceKind::Headset));
        assert!(mask.contains(DeviceKind::Usb));
        assert!(!mask.contains(DeviceKind::Speaker));
        assert!(DeviceMask::NONE.is_empty());
        for kind in DeviceKind::ALL {
            assert!(DeviceMask::ALL.contains(kind));
        }
    }

    #[test]
    fn test_device_serialization() {
        let device = OutputDevice::new(DeviceKind::Usb, "DAC", Some("1-2".into()));
        let json = serde_json::to_string(&device).unwrap();
        assert!(json.contains("\"usb\""));
        let back: OutputDevice = serde_json::from_str(&json).unwrap();
        assert_eq!(back, device);
    }
}
