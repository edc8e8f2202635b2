use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
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

str_enum!(OrderType {
    Genetic => "genetic",
    Microbiome => "microbiome",
    IntoleranceCytotoxic => "intolerance_cytotoxic",
    IntoleranceImmunoassay => "intolerance_immunoassay",
});

str_enum!(OrderStatus {
    Requested => "requested",
    InProgress => "in_progress",
    Executed => "executed",
    Reported => "reported",
    Signed => "signed",
});

str_enum!(PriceCategory {
    Assay => "assay",
    Panel => "panel",
    MicrobiomeAssayType => "microbiome_assay_type",
    IntoleranceCytotoxic => "intolerance_cytotoxic",
    IntoleranceImmunoassay => "intolerance_immunoassay",
});

str_enum!(LineItemKind {
    Assay => "assay",
    Panel => "panel",
    AddOn => "add_on",
    Single => "single",
});

str_enum!(IntoleranceMethod {
    Cytotoxic => "cytotoxic",
    Immunoassay => "immunoassay",
});

str_enum!(Classification {
    Negative => "negative",
    Heterozygous => "heterozygous",
    Homozygous => "homozygous",
    Inconclusive => "inconclusive",
    Tolerated => "grade_0",
    Mild => "grade_1",
    Moderate => "grade_2",
    Severe => "grade_3",
});

impl OrderType {
    pub const ALL: [OrderType; 4] = [
        OrderType::Genetic,
        OrderType::Microbiome,
        OrderType::IntoleranceCytotoxic,
        OrderType::IntoleranceImmunoassay,
    ];

    /// Prefix of the human-readable order code.
    pub fn code_prefix(&self) -> &'static str {
        match self {
            Self::Genetic => "GEN",
            Self::Microbiome => "MIC",
            Self::IntoleranceCytotoxic => "ICT",
            Self::IntoleranceImmunoassay => "IEL",
        }
    }

    /// Category used to price the single element of a non-genetic order.
    /// Genetic orders price each line by its own category.
    pub fn single_element_category(&self) -> Option<PriceCategory> {
        match self {
            Self::Genetic => None,
            Self::Microbiome => Some(PriceCategory::MicrobiomeAssayType),
            Self::IntoleranceCytotoxic => Some(PriceCategory::IntoleranceCytotoxic),
            Self::IntoleranceImmunoassay => Some(PriceCategory::IntoleranceImmunoassay),
        }
    }

    pub fn intolerance_method(&self) -> Option<IntoleranceMethod> {
        match self {
            Self::IntoleranceCytotoxic => Some(IntoleranceMethod::Cytotoxic),
            Self::IntoleranceImmunoassay => Some(IntoleranceMethod::Immunoassay),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Genetic => "Genetic test",
            Self::Microbiome => "Microbiome analysis",
            Self::IntoleranceCytotoxic => "Food intolerance test (cytotoxic)",
            Self::IntoleranceImmunoassay => "Food intolerance test (immunoassay)",
        }
    }
}

impl OrderStatus {
    /// The single legal successor, `None` for the terminal status.
    pub fn successor(&self) -> Option<OrderStatus> {
        match self {
            Self::Requested => Some(Self::InProgress),
            Self::InProgress => Some(Self::Executed),
            Self::Executed => Some(Self::Reported),
            Self::Reported => Some(Self::Signed),
            Self::Signed => None,
        }
    }

    pub fn can_advance_to(&self, target: OrderStatus) -> bool {
        self.successor() == Some(target)
    }
}

impl IntoleranceMethod {
    pub fn order_type(&self) -> OrderType {
        match self {
            Self::Cytotoxic => OrderType::IntoleranceCytotoxic,
            Self::Immunoassay => OrderType::IntoleranceImmunoassay,
        }
    }
}

/// Severity of a food-item reaction, 0 = tolerated through 3 = severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntoleranceGrade {
    Tolerated = 0,
    Mild = 1,
    Moderate = 2,
    Severe = 3,
}

impl IntoleranceGrade {
    /// Report order: most severe first.
    pub const DESCENDING: [IntoleranceGrade; 4] = [
        IntoleranceGrade::Severe,
        IntoleranceGrade::Moderate,
        IntoleranceGrade::Mild,
        IntoleranceGrade::Tolerated,
    ];

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Tolerated),
            1 => Some(Self::Mild),
            2 => Some(Self::Moderate),
            3 => Some(Self::Severe),
            _ => None,
        }
    }

    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Severe => "Severe intolerance",
            Self::Moderate => "Moderate intolerance",
            Self::Mild => "Mild intolerance",
            Self::Tolerated => "Tolerated",
        }
    }

    pub fn classification(&self) -> Classification {
        match self {
            Self::Tolerated => Classification::Tolerated,
            Self::Mild => Classification::Mild,
            Self::Moderate => Classification::Moderate,
            Self::Severe => Classification::Severe,
        }
    }
}

impl Classification {
    pub fn grade(&self) -> Option<IntoleranceGrade> {
        match self {
            Self::Tolerated => Some(IntoleranceGrade::Tolerated),
            Self::Mild => Some(IntoleranceGrade::Mild),
            Self::Moderate => Some(IntoleranceGrade::Moderate),
            Self::Severe => Some(IntoleranceGrade::Severe),
            _ => None,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.grade().is_some()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Negative => "Negative",
            Self::Heterozygous => "Positive (heterozygous)",
            Self::Homozygous => "Positive (homozygous)",
            Self::Inconclusive => "Inconclusive",
            Self::Tolerated | Self::Mild | Self::Moderate | Self::Severe => self
                .grade()
                .map(|g| g.label())
                .unwrap_or("Graded"),
        }
    }
}
