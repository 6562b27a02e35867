//! SNOMED CT identifiers (SCTIDs) and namespaces.
//!
//! An SCTID is a decimal string of 6 to 18 digits laid out as
//!
//! ```text
//! <item id> [<7-digit namespace>] <partition: 2 digits> <Verhoeff check digit>
//! ```
//!
//! The first partition digit is `0` for the short (international) form and
//! `1` for the long form carrying a namespace; the second digit encodes the
//! component category.

use crate::component::ComponentCategory;
use crate::error::TermstoreError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

const MAX_SCTID_LENGTH: usize = 18;

static SCTID_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]{5,17}$").expect("static SCTID pattern compiles"));

static NAMESPACE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{7}$").expect("static namespace pattern compiles"));

const DIHEDRAL: [[u8; 10]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 2, 3, 4, 0, 6, 7, 8, 9, 5],
    [2, 3, 4, 0, 1, 7, 8, 9, 5, 6],
    [3, 4, 0, 1, 2, 8, 9, 5, 6, 7],
    [4, 0, 1, 2, 3, 9, 5, 6, 7, 8],
    [5, 9, 8, 7, 6, 0, 4, 3, 2, 1],
    [6, 5, 9, 8, 7, 1, 0, 4, 3, 2],
    [7, 6, 5, 9, 8, 2, 1, 0, 4, 3],
    [8, 7, 6, 5, 9, 3, 2, 1, 0, 4],
    [9, 8, 7, 6, 5, 4, 3, 2, 1, 0],
];

const PERMUTATION: [[u8; 10]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 5, 7, 6, 2, 8, 3, 0, 9, 4],
    [5, 8, 0, 3, 7, 9, 6, 1, 4, 2],
    [8, 9, 1, 6, 0, 4, 3, 5, 2, 7],
    [9, 4, 5, 3, 1, 2, 6, 8, 7, 0],
    [4, 2, 8, 6, 5, 7, 3, 9, 0, 1],
    [2, 7, 9, 3, 8, 0, 6, 4, 1, 5],
    [7, 0, 4, 6, 9, 1, 3, 2, 5, 8],
];

const INVERSE: [u8; 10] = [0, 4, 3, 2, 1, 5, 6, 7, 8, 9];

/// Compute the Verhoeff check digit for a string of decimal digits.
///
/// Returns `None` when `digits` contains anything but ASCII digits.
pub fn verhoeff_check_digit(digits: &str) -> Option<u8> {
    let mut checksum = 0u8;
    for (i, ch) in digits.chars().rev().enumerate() {
        let digit = ch.to_digit(10)? as usize;
        checksum = DIHEDRAL[checksum as usize][PERMUTATION[(i + 1) % 8][digit] as usize];
    }
    Some(INVERSE[checksum as usize])
}

fn verhoeff_valid(digits: &str) -> bool {
    let mut checksum = 0u8;
    for (i, ch) in digits.chars().rev().enumerate() {
        let Some(digit) = ch.to_digit(10) else {
            return false;
        };
        checksum = DIHEDRAL[checksum as usize][PERMUTATION[i % 8][digit as usize] as usize];
    }
    checksum == 0
}

/// A partition of the identifier space that new component ids are drawn from.
///
/// The empty namespace is the international (short-form) namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    pub fn international() -> Self {
        Self(String::new())
    }

    /// Parse a namespace identifier. `""` and `"0"` denote the international namespace.
    pub fn parse(raw: &str) -> Result<Self, TermstoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "0" {
            return Ok(Self::international());
        }
        if !NAMESPACE_SHAPE.is_match(trimmed) {
            return Err(TermstoreError::validation(format!(
                "namespace must be 7 digits, got '{trimmed}'"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn is_international(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_international() {
            write!(f, "INT")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl TryFrom<String> for Namespace {
    type Error = TermstoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Namespace> for String {
    fn from(value: Namespace) -> Self {
        value.0
    }
}

/// The two partition digits of an SCTID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Partition {
    pub category: ComponentCategory,
    pub long_form: bool,
}

impl Partition {
    pub fn code(&self) -> String {
        format!(
            "{}{}",
            if self.long_form { 1 } else { 0 },
            self.category.partition_digit()
        )
    }
}

/// A validated SNOMED CT identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sctid {
    value: String,
    item_id: u64,
    namespace: Namespace,
    partition: Partition,
}

impl Sctid {
    /// Parse and validate an SCTID string (shape, partition and check digit).
    pub fn parse(raw: &str) -> Result<Self, TermstoreError> {
        if !SCTID_SHAPE.is_match(raw) {
            return Err(TermstoreError::validation(format!(
                "'{raw}' is not a 6-18 digit SCTID"
            )));
        }
        if !verhoeff_valid(raw) {
            return Err(TermstoreError::validation(format!(
                "'{raw}' has an invalid check digit"
            )));
        }

        let body = &raw[..raw.len() - 1];
        let (head, partition_code) = body.split_at(body.len() - 2);
        let mut partition_digits = partition_code.chars().filter_map(|ch| ch.to_digit(10));
        let form = partition_digits.next();
        let category = partition_digits
            .next()
            .and_then(ComponentCategory::from_partition_digit);

        let (long_form, category) = match (form, category) {
            (Some(0), Some(category)) => (false, category),
            (Some(1), Some(category)) => (true, category),
            _ => {
                return Err(TermstoreError::validation(format!(
                    "'{raw}' has unknown partition '{partition_code}'"
                )));
            }
        };

        let (item, namespace) = if long_form {
            if head.len() < 8 {
                return Err(TermstoreError::validation(format!(
                    "'{raw}' is too short for a long-form SCTID"
                )));
            }
            let (item, namespace) = head.split_at(head.len() - 7);
            (item, Namespace(namespace.to_string()))
        } else {
            (head, Namespace::international())
        };

        let item_id = item
            .parse::<u64>()
            .map_err(|e| TermstoreError::validation(format!("'{raw}': item id: {e}")))?;

        Ok(Self {
            value: raw.to_string(),
            item_id,
            namespace,
            partition: Partition {
                category,
                long_form,
            },
        })
    }

    /// Build the SCTID for `item_id` in `namespace` for `category`.
    pub fn generate(
        item_id: u64,
        namespace: &Namespace,
        category: ComponentCategory,
    ) -> Result<Self, TermstoreError> {
        if item_id == 0 {
            return Err(TermstoreError::validation("item id must be positive"));
        }
        let partition = Partition {
            category,
            long_form: !namespace.is_international(),
        };
        let body = format!("{item_id}{}{}", namespace.as_str(), partition.code());
        let check = verhoeff_check_digit(&body)
            .ok_or_else(|| TermstoreError::validation(format!("'{body}' is not numeric")))?;
        let value = format!("{body}{check}");
        if value.len() > MAX_SCTID_LENGTH {
            return Err(TermstoreError::validation(format!(
                "item id {item_id} does not fit namespace {namespace}"
            )));
        }
        Ok(Self {
            value,
            item_id,
            namespace: namespace.clone(),
            partition,
        })
    }

    /// Largest item id that still fits an identifier in `namespace`.
    pub fn max_item_id(namespace: &Namespace) -> u64 {
        // Partition code and check digit take three digits.
        let digits = MAX_SCTID_LENGTH - namespace.as_str().len() - 3;
        10u64.pow(digits as u32) - 1
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn item_id(&self) -> u64 {
        self.item_id
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn category(&self) -> ComponentCategory {
        self.partition.category
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl fmt::Display for Sctid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
