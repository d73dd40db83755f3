//! Platform tags carried by release artifacts and formula blocks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An operating-system/architecture combination a formula can ship.
///
/// The set is closed: labels naming any other platform are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKey {
    /// macOS on Intel
    DarwinAmd64,
    /// macOS on Apple Silicon
    DarwinArm64,
    /// 32-bit x86 Linux
    #[serde(rename = "linux_386")]
    Linux386,
    /// 64-bit x86 Linux
    LinuxAmd64,
    /// 64-bit ARM Linux
    LinuxArm64,
    /// ARMv7 hard-float Linux
    LinuxArmv7l,
}

/// Ordered `(substring, key)` pairs used for label matching.
///
/// More specific tags must come before any looser tag they contain.
const MATCH_ORDER: &[(&str, PlatformKey)] = &[
    ("darwin_amd64", PlatformKey::DarwinAmd64),
    ("darwin_arm64", PlatformKey::DarwinArm64),
    ("linux_armv7l", PlatformKey::LinuxArmv7l),
    ("linux_arm64", PlatformKey::LinuxArm64),
    ("linux_amd64", PlatformKey::LinuxAmd64),
    ("linux_386", PlatformKey::Linux386),
];

impl PlatformKey {
    /// All platforms, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::DarwinAmd64,
        Self::DarwinArm64,
        Self::Linux386,
        Self::LinuxAmd64,
        Self::LinuxArm64,
        Self::LinuxArmv7l,
    ];

    /// The tag as it appears in artifact file names.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::DarwinAmd64 => "darwin_amd64",
            Self::DarwinArm64 => "darwin_arm64",
            Self::Linux386 => "linux_386",
            Self::LinuxAmd64 => "linux_amd64",
            Self::LinuxArm64 => "linux_arm64",
            Self::LinuxArmv7l => "linux_armv7l",
        }
    }

    /// Human-readable description, e.g. "macOS ARM".
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::DarwinAmd64 => "macOS Intel",
            Self::DarwinArm64 => "macOS ARM",
            Self::Linux386 => "Linux 32-bit",
            Self::LinuxAmd64 => "Linux 64-bit",
            Self::LinuxArm64 => "Linux ARM 64-bit",
            Self::LinuxArmv7l => "Linux ARMv7",
        }
    }

    /// Find the platform a label refers to.
    ///
    /// Matching is case-insensitive and walks [`MATCH_ORDER`]; the first
    /// substring hit wins.
    #[must_use]
    pub fn find_in(label: &str) -> Option<Self> {
        let lower = label.to_ascii_lowercase();
        MATCH_ORDER
            .iter()
            .find(|(needle, _)| lower.contains(needle))
            .map(|(_, key)| *key)
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for PlatformKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown platform: {s}"))
    }
}
