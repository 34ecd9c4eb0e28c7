use std::fmt;
use std::str::FromStr;

/// The X.690 encoding rules.
///
/// BER is the most flexible, allowing alternative encodings for some types
/// as well as indefinite length values. CER always uses indefinite length
/// for constructed values and the shortest form for primitive ones. DER
/// always uses definite, minimal lengths. Both CER and DER add further
/// restrictions on particular types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Ber,
    Cer,
    Der,
}

impl Mode {
    pub fn is_cer(self) -> bool {
        self == Mode::Cer
    }

    pub fn is_der(self) -> bool {
        self == Mode::Der
    }

    /// CER or DER: canonical forms are mandatory.
    pub fn is_restricted(self) -> bool {
        self != Mode::Ber
    }

    pub fn allows_definite_constructed(self) -> bool {
        self != Mode::Cer
    }

    pub fn allows_indefinite_constructed(self) -> bool {
        self != Mode::Der
    }
}

impl Default for Mode {
    fn default() -> Mode {
        Mode::Der
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Ber => "BER",
            Mode::Cer => "CER",
            Mode::Der => "DER",
        })
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Mode, String> {
        match s.to_ascii_uppercase().as_str() {
            "BER" => Ok(Mode::Ber),
            "CER" => Ok(Mode::Cer),
            "DER" => Ok(Mode::Der),
            _ => Err(format!("unknown encoding rules: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules() {
        assert!(!Mode::Ber.is_restricted());
        assert!(Mode::Cer.is_restricted() && Mode::Der.is_restricted());
        assert!(!Mode::Cer.allows_definite_constructed());
        assert!(!Mode::Der.allows_indefinite_constructed());
        assert_eq!("der".parse::<Mode>(), Ok(Mode::Der));
        assert!("xer".parse::<Mode>().is_err());
    }
}
