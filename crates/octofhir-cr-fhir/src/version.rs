//! FHIR release enumeration

use serde::{Deserialize, Serialize};
use std::fmt;

/// FHIR releases in chronological order.
///
/// The derived ordering is the release order, which is what the half-open
/// range tests of the version dispatch rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FhirVersion {
    Dstu2,
    Dstu2Hl7Org,
    Dstu2_1,
    Dstu3,
    R4,
    R4B,
    R5,
}

impl FhirVersion {
    /// Every known release, oldest first
    pub const ALL: [FhirVersion; 7] = [
        FhirVersion::Dstu2,
        FhirVersion::Dstu2Hl7Org,
        FhirVersion::Dstu2_1,
        FhirVersion::Dstu3,
        FhirVersion::R4,
        FhirVersion::R4B,
        FhirVersion::R5,
    ];

    pub fn is_equal_or_newer_than(self, other: FhirVersion) -> bool {
        self >= other
    }

    pub fn is_older_than(self, other: FhirVersion) -> bool {
        self < other
    }

    /// Published release number
    pub fn release(self) -> &'static str {
        match self {
            FhirVersion::Dstu2 | FhirVersion::Dstu2Hl7Org => "1.0.2",
            FhirVersion::Dstu2_1 => "1.4.0",
            FhirVersion::Dstu3 => "3.0.2",
            FhirVersion::R4 => "4.0.1",
            FhirVersion::R4B => "4.3.0",
            FhirVersion::R5 => "5.0.0",
        }
    }

    /// Parse a release number (`4.0.1`) or a short name (`R4`, `dstu3`)
    pub fn parse(value: &str) -> Option<FhirVersion> {
        let lower = value.trim().to_ascii_lowercase();
        let version = match lower.as_str() {
            "dstu2" | "1.0.2" | "1.0.0" => FhirVersion::Dstu2,
            "dstu2_hl7org" => FhirVersion::Dstu2Hl7Org,
            "dstu2_1" | "dstu2.1" | "1.4.0" => FhirVersion::Dstu2_1,
            "dstu3" | "stu3" | "3.0.0" | "3.0.1" | "3.0.2" => FhirVersion::Dstu3,
            "r4" | "4.0.0" | "4.0.1" => FhirVersion::R4,
            "r4b" | "4.3.0" => FhirVersion::R4B,
            "r5" | "5.0.0" => FhirVersion::R5,
            _ => return None,
        };
        Some(version)
    }
}

impl fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FhirVersion::Dstu2 => "DSTU2",
            FhirVersion::Dstu2Hl7Org => "DSTU2_HL7ORG",
            FhirVersion::Dstu2_1 => "DSTU2_1",
            FhirVersion::Dstu3 => "DSTU3",
            FhirVersion::R4 => "R4",
            FhirVersion::R4B => "R4B",
            FhirVersion::R5 => "R5",
        };
        f.write_str(name)
    }
}
