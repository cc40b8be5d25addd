use crate::store::StoreError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(TestType {
    SymbolCoding => "BACS Symbol Coding",
    AnimalNaming => "Animal Naming",
    TrailMaking => "Trail Making",
    CptIp => "CPT-IP",
    SpatialSpan => "WMS-III Spatial Span",
    LetterNumberSpan => "Letter-Number Span",
    HvltR => "HVLT-R",
    BvmtR => "BVMT-R",
    NabMazes => "NAB Mazes",
    Other => "Other",
});

/// Display-name substrings checked in order, first match wins. The order is
/// a business rule: "CPT" is the broadest pattern and must stay last so that
/// more specific instrument names are never shadowed.
const NAME_PATTERNS: &[(&str, TestType)] = &[
    ("HVLT-R", TestType::HvltR),
    ("BVMT-R", TestType::BvmtR),
    ("NAB Mazes", TestType::NabMazes),
    ("Letter-Number", TestType::LetterNumberSpan),
    ("WMS-III", TestType::SpatialSpan),
    ("BACS Symbol Coding", TestType::SymbolCoding),
    ("Animal Naming", TestType::AnimalNaming),
    ("Trail Making", TestType::TrailMaking),
    ("CPT", TestType::CptIp),
];

impl TestType {
    /// The 9 canonical MCCB instruments counted toward session completeness.
    pub fn canonical() -> &'static [TestType] {
        &[
            TestType::SymbolCoding,
            TestType::AnimalNaming,
            TestType::TrailMaking,
            TestType::CptIp,
            TestType::SpatialSpan,
            TestType::LetterNumberSpan,
            TestType::HvltR,
            TestType::BvmtR,
            TestType::NabMazes,
        ]
    }

    pub fn is_canonical(&self) -> bool {
        !matches!(self, TestType::Other)
    }

    /// Derive the canonical type from a free-text display name.
    /// Unrecognized names fall back to `Other`; never fails.
    pub fn infer(test_name: &str) -> TestType {
        for (pattern, test_type) in NAME_PATTERNS {
            if test_name.contains(pattern) {
                return *test_type;
            }
        }
        TestType::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_type_round_trip() {
        for (variant, s) in [
            (TestType::SymbolCoding, "BACS Symbol Coding"),
            (TestType::AnimalNaming, "Animal Naming"),
            (TestType::TrailMaking, "Trail Making"),
            (TestType::CptIp, "CPT-IP"),
            (TestType::SpatialSpan, "WMS-III Spatial Span"),
            (TestType::LetterNumberSpan, "Letter-Number Span"),
            (TestType::HvltR, "HVLT-R"),
            (TestType::BvmtR, "BVMT-R"),
            (TestType::NabMazes, "NAB Mazes"),
            (TestType::Other, "Other"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(TestType::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn serde_uses_display_names() {
        let json = serde_json::to_string(&TestType::SymbolCoding).unwrap();
        assert_eq!(json, "\"BACS Symbol Coding\"");
        let back: TestType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TestType::SymbolCoding);
    }

    #[test]
    fn infer_from_display_names() {
        assert_eq!(TestType::infer("HVLT-R Memory Test"), TestType::HvltR);
        assert_eq!(TestType::infer("BVMT-R"), TestType::BvmtR);
        assert_eq!(TestType::infer("NAB Mazes Test"), TestType::NabMazes);
        assert_eq!(
            TestType::infer("Letter-Number Span Test"),
            TestType::LetterNumberSpan
        );
        assert_eq!(
            TestType::infer("WMS-III Spatial Span"),
            TestType::SpatialSpan
        );
        assert_eq!(
            TestType::infer("BACS Symbol Coding Test"),
            TestType::SymbolCoding
        );
        assert_eq!(
            TestType::infer("Animal Naming (Fluency)"),
            TestType::AnimalNaming
        );
        assert_eq!(TestType::infer("Trail Making Test: Part A"), TestType::TrailMaking);
        assert_eq!(TestType::infer("CPT-IP"), TestType::CptIp);
        assert_eq!(TestType::infer("Stroop Test"), TestType::Other);
        assert_eq!(TestType::infer(""), TestType::Other);
    }

    #[test]
    fn cpt_pattern_does_not_shadow_specific_names() {
        // A name containing both a specific instrument and "CPT" must match
        // the specific instrument first.
        assert_eq!(
            TestType::infer("HVLT-R administered after CPT"),
            TestType::HvltR
        );
    }

    #[test]
    fn canonical_excludes_other() {
        assert_eq!(TestType::canonical().len(), 9);
        assert!(!TestType::canonical().contains(&TestType::Other));
        assert!(!TestType::Other.is_canonical());
        assert!(TestType::HvltR.is_canonical());
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(TestType::from_str("Stroop").is_err());
        assert!(TestType::from_str("").is_err());
    }
}
