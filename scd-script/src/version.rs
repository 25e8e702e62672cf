use strum::{Display, EnumString};

use crate::error::{Result, ScdError};

/// Binary dialect of a script. Displays and parses as its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString)]
pub enum BioVersion {
    #[strum(to_string = "1")]
    Biohazard1,
    #[strum(to_string = "2")]
    Biohazard2,
    #[strum(to_string = "3")]
    Biohazard3,
}

impl BioVersion {
    pub fn number(self) -> u8 {
        match self {
            BioVersion::Biohazard1 => 1,
            BioVersion::Biohazard2 => 2,
            BioVersion::Biohazard3 => 3,
        }
    }

    /// Dialect 1 has no procedure table and a single implicit function.
    pub fn has_procedures(self) -> bool {
        self != BioVersion::Biohazard1
    }
}

impl TryFrom<u8> for BioVersion {
    type Error = ScdError;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            1 => Ok(BioVersion::Biohazard1),
            2 => Ok(BioVersion::Biohazard2),
            3 => Ok(BioVersion::Biohazard3),
            _ => Err(ScdError::UnsupportedVersion(v)),
        }
    }
}

/// Which of a room's scripts a buffer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ScriptKind {
    Init,
    Main,
    Event,
}

impl ScriptKind {
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
            .map_err(|_| ScdError::UnknownScriptKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn version_from_number() {
        assert_eq!(BioVersion::try_from(2).ok(), Some(BioVersion::Biohazard2));
        assert!(matches!(
            BioVersion::try_from(4),
            Err(ScdError::UnsupportedVersion(4))
        ));
        assert_eq!(BioVersion::Biohazard3.to_string(), "3");
        assert_eq!("1".parse::<BioVersion>().ok(), Some(BioVersion::Biohazard1));
    }

    #[test]
    fn kind_names() {
        assert_eq!(ScriptKind::Main.to_string(), "main");
        assert_eq!(ScriptKind::parse("event").ok(), Some(ScriptKind::Event));
        assert!(ScriptKind::parse("loop").is_err());
    }
}
