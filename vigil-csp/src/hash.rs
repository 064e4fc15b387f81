//! Hash algorithm selection for inline and subresource hashes.

use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Set of hash algorithms; iteration yields them in ascending strength.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HashAlgorithms: u8 {
        const SHA256 = 0b001;
        const SHA384 = 0b010;
        const SHA512 = 0b100;
    }
}

impl HashAlgorithms {
    /// Source-expression prefix for a single algorithm, `None` for empty or combined sets.
    pub fn prefix(&self) -> Option<&'static str> {
        self.name().map(|name| match name {
            "sha256" => "sha256-",
            "sha384" => "sha384-",
            _ => "sha512-",
        })
    }

    /// Lowercase algorithm name of a single flag.
    pub fn name(&self) -> Option<&'static str> {
        if *self == Self::SHA256 {
            Some("sha256")
        } else if *self == Self::SHA384 {
            Some("sha384")
        } else if *self == Self::SHA512 {
            Some("sha512")
        } else {
            None
        }
    }

    /// Parse a single algorithm name, e.g. `sha384` or `SHA-384`.
    pub fn parse_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "sha256" => Some(Self::SHA256),
            "sha384" => Some(Self::SHA384),
            "sha512" => Some(Self::SHA512),
            _ => None,
        }
    }

    /// Combine several names into a set.
    pub fn from_names<I, S>(names: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(Self::empty(), |acc, name| {
            Self::parse_name(name.as_ref())
                .map(|flag| acc | flag)
                .ok_or_else(|| name.as_ref().to_string())
        })
    }
}

impl Default for HashAlgorithms {
    fn default() -> Self {
        Self::SHA384
    }
}

impl fmt::Display for HashAlgorithms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().filter_map(|flag| flag.name()).collect();
        f.write_str(&names.join("|"))
    }
}

impl FromStr for HashAlgorithms {
    type Err = String;

    /// Parses `sha256|sha512` or `sha256,sha512`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_names(s.split(['|', ',']).filter(|part| !part.trim().is_empty()))
    }
}
