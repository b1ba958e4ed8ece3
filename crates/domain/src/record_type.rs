use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DNS record type. Named variants cover everything the resolver handles
/// specially (local records, block answers); anything else passes through
/// untouched as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    TXT,
    PTR,
    MX,
    NS,
    SOA,
    SRV,
    HTTPS,
    Other(u16),
}

impl RecordType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::A,
            2 => Self::NS,
            5 => Self::CNAME,
            6 => Self::SOA,
            12 => Self::PTR,
            15 => Self::MX,
            16 => Self::TXT,
            33 => Self::SRV,
            65 => Self::HTTPS,
            28 => Self::AAAA,
            other => Self::Other(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            Self::A => 1,
            Self::NS => 2,
            Self::CNAME => 5,
            Self::SOA => 6,
            Self::PTR => 12,
            Self::MX => 15,
            Self::TXT => 16,
            Self::SRV => 33,
            Self::HTTPS => 65,
            Self::AAAA => 28,
            Self::Other(v) => v,
        }
    }

    /// Record types that may appear in `local_records` entries.
    pub fn is_local_record_type(self) -> bool {
        matches!(
            self,
            Self::A | Self::AAAA | Self::CNAME | Self::TXT | Self::PTR
        )
    }

    /// Textual form used in shared-cache keys and analytics rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::CNAME => "CNAME",
            Self::TXT => "TXT",
            Self::PTR => "PTR",
            Self::MX => "MX",
            Self::NS => "NS",
            Self::SOA => "SOA",
            Self::SRV => "SRV",
            Self::HTTPS => "HTTPS",
            Self::Other(_) => "TYPE",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(v) => write!(f, "TYPE{}", v),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::AAAA),
            "CNAME" => Ok(Self::CNAME),
            "TXT" => Ok(Self::TXT),
            "PTR" => Ok(Self::PTR),
            "MX" => Ok(Self::MX),
            "NS" => Ok(Self::NS),
            "SOA" => Ok(Self::SOA),
            "SRV" => Ok(Self::SRV),
            "HTTPS" => Ok(Self::HTTPS),
            other => {
                if let Some(num) = other.strip_prefix("TYPE") {
                    num.parse::<u16>()
                        .map(Self::Other)
                        .map_err(|_| format!("Unknown record type: {}", s))
                } else {
                    Err(format!("Unknown record type: {}", s))
                }
            }
        }
    }
}

impl TryFrom<String> for RecordType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_types_round_trip_through_u16() {
        for rt in [
            RecordType::A,
            RecordType::AAAA,
            RecordType::CNAME,
            RecordType::TXT,
            RecordType::PTR,
        ] {
            assert_eq!(RecordType::from_u16(rt.to_u16()), rt);
        }
    }

    #[test]
    fn unknown_type_is_preserved() {
        let rt = RecordType::from_u16(257);
        assert_eq!(rt, RecordType::Other(257));
        assert_eq!(rt.to_string(), "TYPE257");
        assert_eq!("TYPE257".parse::<RecordType>().unwrap(), rt);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("aaaa".parse::<RecordType>().unwrap(), RecordType::AAAA);
    }
}
