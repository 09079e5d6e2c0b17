//! User fixture and the synthetic identities derived from it
//!
//! The test population is not stored anywhere. Each identity is a pure
//! function of the fixture record and a sequence index, so any iteration can
//! be recomputed in isolation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// First index used by the login flow
pub const LOGIN_FIRST_INDEX: u32 = 1;

/// First index the password-reset flow seeds. Users below this index are
/// left untouched by the reset flow.
pub const FIRST_RESET_ELIGIBLE_INDEX: u32 = 25;

/// Last index of the synthetic population (inclusive)
pub const LAST_INDEX: u32 = 100;

/// Width the index is zero-padded to in emails and display names
const INDEX_WIDTH: usize = 3;

/// The user fixture record (`fixtures/users.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    /// Local part prefix, e.g. `nomnom.test+user`
    pub email_name: String,

    /// Domain part, e.g. `example.org`
    pub email_domain: String,

    /// Display name prefix, e.g. `Test User`
    pub name: String,
}

impl Fixture {
    /// Parse a fixture from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let fixture: Self = serde_json::from_str(json)?;
        fixture.validate()?;
        Ok(fixture)
    }

    /// Load a fixture from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fixture = Self::from_json(&content)?;
        tracing::debug!("Loaded fixture from {}", path.display());
        Ok(fixture)
    }

    fn validate(&self) -> Result<()> {
        if self.email_name.trim().is_empty() {
            return Err(Error::InvalidFixture("email_name is empty".to_string()));
        }
        if self.email_domain.trim().is_empty() {
            return Err(Error::InvalidFixture("email_domain is empty".to_string()));
        }
        if self.email_domain.contains('@') || self.email_name.contains('@') {
            return Err(Error::InvalidFixture(
                "email_name and email_domain must not contain '@'".to_string(),
            ));
        }
        Ok(())
    }

    /// Derive the identity for a sequence index
    pub fn identity(&self, index: u32) -> SyntheticIdentity {
        SyntheticIdentity::new(self, index)
    }
}

/// A synthetic user derived from the fixture and a sequence index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticIdentity {
    pub index: u32,
    pub email: String,
    pub display_name: String,
}

impl SyntheticIdentity {
    pub fn new(fixture: &Fixture, index: u32) -> Self {
        let padded = pad_index(index);
        Self {
            index,
            email: format!("{}{}@{}", fixture.email_name, padded, fixture.email_domain),
            display_name: format!("{} {}", fixture.name, padded),
        }
    }

    /// The zero-padded index as it appears in the email and display name
    pub fn padded_index(&self) -> String {
        pad_index(self.index)
    }
}

/// Zero-pad an index to three digits (`1` -> `001`, `100` -> `100`)
pub fn pad_index(index: u32) -> String {
    format!("{:0width$}", index, width = INDEX_WIDTH)
}

/// A closed-closed range of sequence indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct IterationRange {
    first: u32,
    last: u32,
}

#[derive(Deserialize)]
struct RawRange {
    first: u32,
    last: u32,
}

impl TryFrom<RawRange> for IterationRange {
    type Error = Error;

    fn try_from(raw: RawRange) -> Result<Self> {
        Self::new(raw.first, raw.last)
    }
}

impl IterationRange {
    /// Create a range; `first` must not be after `last`
    pub fn new(first: u32, last: u32) -> Result<Self> {
        if first > last {
            return Err(Error::InvalidRange { first, last });
        }
        Ok(Self { first, last })
    }

    /// Range walked by the login flow: `[1, 100]`
    pub const fn login() -> Self {
        Self {
            first: LOGIN_FIRST_INDEX,
            last: LAST_INDEX,
        }
    }

    /// Range walked by the password-reset flow: `[25, 100]`
    pub const fn password_reset() -> Self {
        Self {
            first: FIRST_RESET_ELIGIBLE_INDEX,
            last: LAST_INDEX,
        }
    }

    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn last(&self) -> u32 {
        self.last
    }

    /// Number of iterations in the range
    pub fn len(&self) -> usize {
        (self.last - self.first) as usize + 1
    }

    /// A valid range always holds at least one index
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, index: u32) -> bool {
        (self.first..=self.last).contains(&index)
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<u32> {
        self.first..=self.last
    }

    /// Restrict the range to `[first, last]`, returning `None` when the two
    /// ranges do not overlap
    pub fn clamp(&self, first: Option<u32>, last: Option<u32>) -> Option<Self> {
        let first = first.map_or(self.first, |f| f.max(self.first));
        let last = last.map_or(self.last, |l| l.min(self.last));
        Self::new(first, last).ok()
    }
}

impl IntoIterator for IterationRange {
    type Item = u32;
    type IntoIter = std::ops::RangeInclusive<u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for IterationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.first, self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn fixture() -> Fixture {
        Fixture {
            email_name: "nomnom.test+".to_string(),
            email_domain: "example.org".to_string(),
            name: "Test User".to_string(),
        }
    }

    #[test_case(1, "001")]
    #[test_case(9, "009")]
    #[test_case(25, "025")]
    #[test_case(99, "099")]
    #[test_case(100, "100")]
    fn test_pad_index(index: u32, expected: &str) {
        assert_eq!(pad_index(index), expected);
    }

    #[test]
    fn test_identity_for_every_login_index() {
        let fixture = fixture();
        for index in IterationRange::login() {
            let identity = fixture.identity(index);
            let padded = pad_index(index);
            assert_eq!(padded.len(), 3);
            assert_eq!(
                identity.email,
                format!("{}{}@{}", fixture.email_name, padded, fixture.email_domain)
            );
            assert_eq!(identity.display_name, format!("{} {}", fixture.name, padded));
        }
    }

    #[test]
    fn test_identity_examples() {
        let identity = fixture().identity(7);
        assert_eq!(identity.email, "nomnom.test+007@example.org");
        assert_eq!(identity.display_name, "Test User 007");
        assert_eq!(identity.padded_index(), "007");
    }

    #[test]
    fn test_range_counts() {
        assert_eq!(IterationRange::login().len(), 100);
        assert_eq!(IterationRange::login().iter().count(), 100);
        assert_eq!(IterationRange::password_reset().len(), 76);
        assert_eq!(IterationRange::password_reset().iter().count(), 76);
        assert_eq!(IterationRange::password_reset().first(), 25);
        assert_eq!(IterationRange::password_reset().last(), 100);
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        assert!(matches!(
            IterationRange::new(10, 5),
            Err(Error::InvalidRange { first: 10, last: 5 })
        ));
        assert_eq!(IterationRange::new(5, 5).unwrap().len(), 1);
    }

    #[test]
    fn test_range_clamp() {
        let range = IterationRange::password_reset();
        let clamped = range.clamp(Some(1), Some(30)).unwrap();
        assert_eq!((clamped.first(), clamped.last()), (25, 30));
        assert!(range.clamp(Some(101), None).is_none());
    }

    #[test]
    fn test_range_from_yaml_style_json() {
        let range: IterationRange = serde_json::from_str(r#"{"first": 3, "last": 4}"#).unwrap();
        assert_eq!(range.len(), 2);
        assert!(serde_json::from_str::<IterationRange>(r#"{"first": 4, "last": 3}"#).is_err());
    }

    #[test]
    fn test_fixture_parse_and_validate() {
        let json = r#"{"email_name": "u", "email_domain": "d.org", "name": "N"}"#;
        let fixture = Fixture::from_json(json).unwrap();
        assert_eq!(fixture.identity(100).email, "u100@d.org");

        let bad = r#"{"email_name": "u", "email_domain": "", "name": "N"}"#;
        assert!(matches!(Fixture::from_json(bad), Err(Error::InvalidFixture(_))));

        let missing = r#"{"email_name": "u", "name": "N"}"#;
        assert!(matches!(Fixture::from_json(missing), Err(Error::Json(_))));
    }

    #[test]
    fn test_fixture_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(
            &path,
            r#"{"email_name": "seed", "email_domain": "example.com", "name": "Seed"}"#,
        )
        .unwrap();
        let fixture = Fixture::load(&path).unwrap();
        assert_eq!(fixture.name, "Seed");
    }
}
