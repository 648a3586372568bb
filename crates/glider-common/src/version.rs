use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A revision of the wire format, ordered by its protocol number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(i32);

macro_rules! known_versions {
    ($($constant:ident = $protocol:literal, $name:literal;)*) => {
        impl ProtocolVersion {
            $(pub const $constant: ProtocolVersion = ProtocolVersion($protocol);)*

            /// Every revision with a named constant, oldest first.
            pub const KNOWN: &'static [(ProtocolVersion, &'static str, &'static str)] = &[
                $((ProtocolVersion($protocol), $name, stringify!($constant)),)*
            ];
        }
    };
}

known_versions! {
    V_1_7_10 = 5, "1.7.10";
    V_1_8 = 47, "1.8";
    V_1_9 = 107, "1.9";
    V_1_11 = 315, "1.11";
    V_1_12 = 335, "1.12";
    V_1_12_1 = 338, "1.12.1";
    V_1_12_2 = 340, "1.12.2";
    V_1_13 = 393, "1.13";
    V_1_14 = 477, "1.14";
    V_1_15 = 573, "1.15";
    V_1_16 = 735, "1.16";
    V_1_16_2 = 751, "1.16.2";
    V_1_17 = 755, "1.17";
    V_1_18 = 757, "1.18";
    V_1_19 = 759, "1.19";
    V_1_19_1 = 760, "1.19.1";
    V_1_19_3 = 761, "1.19.3";
    V_1_19_4 = 762, "1.19.4";
    V_1_20 = 763, "1.20";
    V_1_20_2 = 764, "1.20.2";
    V_1_20_3 = 765, "1.20.3";
    V_1_20_5 = 766, "1.20.5";
    V_1_21 = 767, "1.21";
    V_1_21_2 = 768, "1.21.2";
    V_1_21_4 = 769, "1.21.4";
    V_1_21_5 = 770, "1.21.5";
    V_1_21_6 = 771, "1.21.6";
}

impl ProtocolVersion {
    pub const OLDEST: ProtocolVersion = ProtocolVersion::V_1_7_10;
    pub const LATEST: ProtocolVersion = ProtocolVersion::V_1_21_6;

    pub const fn from_protocol(protocol: i32) -> Self {
        ProtocolVersion(protocol)
    }

    pub const fn protocol(self) -> i32 {
        self.0
    }

    /// Release name for known revisions, e.g. `1.21.5`.
    pub fn name(self) -> Option<&'static str> {
        Self::KNOWN
            .iter()
            .find(|(version, _, _)| *version == self)
            .map(|(_, name, _)| *name)
    }

    pub fn is_older_than(self, other: ProtocolVersion) -> bool {
        self < other
    }

    pub fn is_older_than_or_equals(self, other: ProtocolVersion) -> bool {
        self <= other
    }

    pub fn is_newer_than(self, other: ProtocolVersion) -> bool {
        self > other
    }

    pub fn is_newer_than_or_equals(self, other: ProtocolVersion) -> bool {
        self >= other
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "protocol {}", self.0),
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = String;

    /// Accepts `1.21.5`, `V_1_21_5` or a bare protocol number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((version, _, _)) = Self::KNOWN
            .iter()
            .find(|(_, name, constant)| *name == s || *constant == s)
        {
            return Ok(*version);
        }
        s.parse::<i32>()
            .map(ProtocolVersion)
            .map_err(|_| format!("unknown protocol version '{}'", s))
    }
}
