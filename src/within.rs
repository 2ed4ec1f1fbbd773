//! restic relative durations for the `--keep-within*` flags.

use std::{fmt, str::FromStr};

use serde::Deserialize;

/// A duration such as `2y5m7d3h`: one or more `<number><unit>` pairs with
/// unit `y`, `m`, `d` or `h`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Within(String);

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration {0:?}: expected e.g. `1y6m`, `7d` or `2y5m7d3h`")]
pub struct InvalidWithin(String);

impl FromStr for Within {
    type Err = InvalidWithin;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut digits = 0usize;
        let mut pairs = 0usize;
        for c in s.chars() {
            match c {
                '0'..='9' => digits += 1,
                'y' | 'm' | 'd' | 'h' if digits > 0 => {
                    digits = 0;
                    pairs += 1;
                },
                _ => return Err(InvalidWithin(s.into())),
            }
        }
        if pairs == 0 || digits > 0 {
            return Err(InvalidWithin(s.into()));
        }
        Ok(Self(s.into()))
    }
}

impl TryFrom<String> for Within {
    type Error = InvalidWithin;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Within {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_restic_durations() {
        for s in ["1y", "6m", "7d", "12h", "2y5m7d3h", "1d1d"] {
            assert_eq!(s.parse::<Within>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn rejects_malformed_durations() {
        for s in ["", "d", "7", "7w", "1y2", "1 d", "-1d", "1.5d"] {
            assert!(s.parse::<Within>().is_err(), "{s:?} should be rejected");
        }
    }

    #[test]
    fn deserialises_with_validation() {
        #[derive(Deserialize)]
        struct Holder {
            #[allow(dead_code)]
            within: Within,
        }
        assert!(toml::from_str::<Holder>(r#"within = "3d""#).is_ok());
        assert!(toml::from_str::<Holder>(r#"within = "3 days""#).is_err());
    }
}
