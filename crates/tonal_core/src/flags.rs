//! Change Flags
//!
//! Bitmask of configuration categories that need re-pushing to backends.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::device_config::keys;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChangeFlags(u32);

impl ChangeFlags {
    pub const NONE: ChangeFlags = ChangeFlags(0);
    pub const EQUALIZER: ChangeFlags = ChangeFlags(0x01);
    pub const BASS: ChangeFlags = ChangeFlags(0x02);
    pub const VIRTUALIZER: ChangeFlags = ChangeFlags(0x04);
    pub const TREBLE: ChangeFlags = ChangeFlags(0x08);
    pub const REVERB: ChangeFlags = ChangeFlags(0x10);
    pub const VOLUME_BOOST: ChangeFlags = ChangeFlags(0x20);
    /// Every category plus the global enable switch
    pub const ALL: ChangeFlags = ChangeFlags(0xFF);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        ChangeFlags(bits)
    }

    /// True if every bit of `other` is set
    pub const fn contains(self, other: ChangeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: ChangeFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Narrowest flag covering a write to configuration `key`
    ///
    /// The global switch and unknown keys map to [`ChangeFlags::ALL`].
    pub fn for_key(key: &str) -> Self {
        match key {
            keys::EQ_ENABLE | keys::EQ_PRESET | keys::EQ_LEVELS => Self::EQUALIZER,
            keys::BASS_ENABLE | keys::BASS_STRENGTH => Self::BASS,
            keys::VIRTUALIZER_ENABLE | keys::VIRTUALIZER_STRENGTH => Self::VIRTUALIZER,
            keys::TREBLE_ENABLE | keys::TREBLE_STRENGTH => Self::TREBLE,
            keys::REVERB_ENABLE | keys::REVERB_PRESET => Self::REVERB,
            keys::VOLUME_BOOST_ENABLE => Self::VOLUME_BOOST,
            _ => Self::ALL,
        }
    }
}

impl BitOr for ChangeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        ChangeFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ChangeFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ChangeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ALL {
            return f.write_str("ChangeFlags(ALL)");
        }
        let names: Vec<&str> = [
            (Self::EQUALIZER, "EQUALIZER"),
            (Self::BASS, "BASS"),
            (Self::VIRTUALIZER, "VIRTUALIZER"),
            (Self::TREBLE, "TREBLE"),
            (Self::REVERB, "REVERB"),
            (Self::VOLUME_BOOST, "VOLUME_BOOST"),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| *name)
        .collect();
        write!(f, "ChangeFlags({})", names.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_contains_every_category() {
        for flag in [
            ChangeFlags::EQUALIZER,
            ChangeFlags::BASS,
            ChangeFlags::VIRTUALIZER,
            ChangeFlags::TREBLE,
            ChangeFlags::REVERB,
            ChangeFlags::VOLUME_BOOST,
        ] {
            assert!(ChangeFlags::ALL.contains(flag));
            assert!(!flag.contains(ChangeFlags::ALL));
        }
    }

    #[test]
    fn test_combination() {
        let mut flags = ChangeFlags::BASS | ChangeFlags::TREBLE;
        assert!(flags.contains(ChangeFlags::BASS));
        assert!(!flags.contains(ChangeFlags::EQUALIZER));
        flags |= ChangeFlags::EQUALIZER;
        assert!(flags.intersects(ChangeFlags::EQUALIZER));
        assert_eq!(flags.bits(), 0x0B);
        assert!(ChangeFlags::NONE.is_empty());
    }

    #[test]
    fn test_for_key() {
        assert_eq!(ChangeFlags::for_key(keys::BASS_STRENGTH), ChangeFlags::BASS);
        assert_eq!(ChangeFlags::for_key(keys::EQ_LEVELS), ChangeFlags::EQUALIZER);
        assert_eq!(
            ChangeFlags::for_key(keys::VOLUME_BOOST_ENABLE),
            ChangeFlags::VOLUME_BOOST
        );
        assert_eq!(ChangeFlags::for_key(keys::GLOBAL_ENABLE), ChangeFlags::ALL);
        assert_eq!(ChangeFlags::for_key("mystery"), ChangeFlags::ALL);
    }

    #[test]
    fn test_debug_names() {
        assert_eq!(format!("{:?}", ChangeFlags::ALL), "ChangeFlags(ALL)");
        assert_eq!(
            format!("{:?}", ChangeFlags::BASS | ChangeFlags::REVERB),
            "ChangeFlags(BASS | REVERB)"
        );
    }
}
