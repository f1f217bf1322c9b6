use std::fmt;
use std::str::FromStr;

/// Register window length (in words) used by the known boards.
pub const DEFAULT_LENGTH_WORDS: usize = 0x10000;

/// Built-in boards and the physical base address of their register window.
pub const KNOWN_DEVICES: &[(&str, u64)] = &[("zcu102", 0x8000_0000), ("wib", 0xA002_0000)];

/// Where a board's register window lives in physical memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    pub name: String,
    pub base_address: u64,
    pub length_words: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("unknown device {name:?}, expected one of: {known}")]
    Unknown { name: String, known: String },

    #[error("no device selected: pass a device name or an explicit base address")]
    Unspecified,
}

impl DeviceProfile {
    pub fn new(name: impl Into<String>, base_address: u64, length_words: usize) -> Self {
        Self {
            name: name.into(),
            base_address,
            length_words,
        }
    }

    /// Looks up a built-in board by name (case-sensitive).
    pub fn lookup(name: &str) -> Option<Self> {
        KNOWN_DEVICES
            .iter()
            .find(|(known, _)| *known == name)
            .map(|&(known, base)| Self::new(known, base, DEFAULT_LENGTH_WORDS))
    }

    pub fn known_names() -> impl Iterator<Item = &'static str> {
        KNOWN_DEVICES.iter().map(|(name, _)| *name)
    }

    /// Builds the profile a binary should map from its command-line selection.
    ///
    /// An explicit `base_address` wins over the built-in table; `length_words` overrides the
    /// table length in either case.
    pub fn resolve(
        name: Option<&str>,
        base_address: Option<u64>,
        length_words: Option<usize>,
    ) -> Result<Self, DeviceError> {
        let mut profile = match (name, base_address) {
            (name, Some(base)) => Self::new(name.unwrap_or("custom"), base, DEFAULT_LENGTH_WORDS),
            (Some(name), None) => name.parse()?,
            (None, None) => return Err(DeviceError::Unspecified),
        };
        if let Some(len) = length_words {
            profile.length_words = len;
        }
        Ok(profile)
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (base=0x{:x} len_words=0x{:x})",
            self.name, self.base_address, self.length_words
        )
    }
}

impl FromStr for DeviceProfile {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| DeviceError::Unknown {
            name: s.to_string(),
            known: Self::known_names().collect::<Vec<_>>().join(", "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_boards_resolve() {
        let zcu = DeviceProfile::lookup("zcu102").unwrap();
        assert_eq!(zcu.base_address, 0x8000_0000);
        assert_eq!(zcu.length_words, DEFAULT_LENGTH_WORDS);

        let wib: DeviceProfile = "wib".parse().unwrap();
        assert_eq!(wib.base_address, 0xA002_0000);
    }

    #[test]
    fn unknown_board_lists_alternatives() {
        let err = "WIB".parse::<DeviceProfile>().unwrap_err();
        assert_eq!(
            err,
            DeviceError::Unknown {
                name: "WIB".to_string(),
                known: "zcu102, wib".to_string(),
            }
        );
    }

    #[test]
    fn explicit_base_address_overrides_table() {
        let p = DeviceProfile::resolve(Some("wib"), Some(0x4000_0000), Some(0x100)).unwrap();
        assert_eq!(p, DeviceProfile::new("wib", 0x4000_0000, 0x100));

        let p = DeviceProfile::resolve(None, Some(0x4000_0000), None).unwrap();
        assert_eq!(p.name, "custom");
        assert_eq!(p.length_words, DEFAULT_LENGTH_WORDS);
    }

    #[test]
    fn nothing_selected_is_an_error() {
        assert_eq!(
            DeviceProfile::resolve(None, None, Some(4)),
            Err(DeviceError::Unspecified)
        );
    }
}
