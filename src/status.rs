//! Lifecycle states stored as upper-case strings in the tenant databases.

use serde::{Deserialize, Serialize};

/// `as_str`, `ALL`, `FromStr` and `Display` for an enum stored as fixed text.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("unknown {} `{}`", stringify!($name), other)),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use string_enum;

/// Soft-delete lifecycle shared by every registry record. Rows are never
/// physically removed so the audit trail stays resolvable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordState {
    Active,
    Inactive,
    Deleted,
}

string_enum!(RecordState {
    Active => "ACTIVE",
    Inactive => "INACTIVE",
    Deleted => "DELETED",
});

impl RecordState {
    pub fn can_transition_to(self, next: RecordState) -> bool {
        use RecordState::*;
        matches!(
            (self, next),
            (Active, Inactive) | (Inactive, Active) | (Active, Deleted) | (Inactive, Deleted)
        )
    }

    pub fn is_visible(self) -> bool {
        self != RecordState::Deleted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Draft,
    Active,
    Submitted,
    UnderReview,
    Approved,
    Issued,
    Valid,
    Suspended,
    Cancelled,
    Rejected,
    Expired,
}

string_enum!(ApplicationStatus {
    Draft => "DRAFT",
    Active => "ACTIVE",
    Submitted => "SUBMITTED",
    UnderReview => "UNDER_REVIEW",
    Approved => "APPROVED",
    Issued => "ISSUED",
    Valid => "VALID",
    Suspended => "SUSPENDED",
    Cancelled => "CANCELLED",
    Rejected => "REJECTED",
    Expired => "EXPIRED",
});

impl ApplicationStatus {
    /// Legal moves of the application lifecycle. Business rules (V00489,
    /// V00490, V00491) run before this table and report their own codes.
    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Draft, Active | Submitted | Cancelled)
                | (Active, Submitted | Cancelled)
                | (Submitted, UnderReview | Rejected | Cancelled)
                | (UnderReview, Approved | Rejected | Cancelled)
                | (Approved, Issued | Cancelled)
                | (Issued, Valid)
                | (Valid, Suspended | Expired | Cancelled)
                | (Suspended, Valid | Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Cancelled | ApplicationStatus::Rejected | ApplicationStatus::Expired
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "01")]
    Male,
    #[serde(rename = "02")]
    Female,
}

string_enum!(Gender {
    Male => "01",
    Female => "02",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Pending,
    Validated,
    Rejected,
    UnderReview,
    Expired,
}

string_enum!(ValidationStatus {
    Pending => "PENDING",
    Validated => "VALIDATED",
    Rejected => "REJECTED",
    UnderReview => "UNDER_REVIEW",
    Expired => "EXPIRED",
});

/// Kind of authority a region represents, stored as its two-digit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionType {
    #[serde(rename = "10")]
    FixedTestingCentre,
    #[serde(rename = "11")]
    MobileTestingUnit,
    #[serde(rename = "12")]
    PrintingCentre,
    #[serde(rename = "20")]
    RegisteringAuthority,
    #[serde(rename = "30")]
    ProvincialHelpDesk,
    #[serde(rename = "31")]
    NationalHelpDesk,
    #[serde(rename = "40")]
    VehicleTestingStation,
    #[serde(rename = "50")]
    AdminOffice,
}

string_enum!(RegionType {
    FixedTestingCentre => "10",
    MobileTestingUnit => "11",
    PrintingCentre => "12",
    RegisteringAuthority => "20",
    ProvincialHelpDesk => "30",
    NationalHelpDesk => "31",
    VehicleTestingStation => "40",
    AdminOffice => "50",
});

impl RegionType {
    pub fn is_testing_centre(self) -> bool {
        matches!(self, RegionType::FixedTestingCentre | RegionType::MobileTestingUnit)
    }
}

/// Registration of a region as an operating authority, stored as a
/// one-digit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationStatus {
    #[serde(rename = "1")]
    PendingRegistration,
    #[serde(rename = "2")]
    Registered,
    #[serde(rename = "3")]
    Suspended,
    #[serde(rename = "4")]
    PendingRenewal,
    #[serde(rename = "5")]
    Cancelled,
    #[serde(rename = "6")]
    PendingInspection,
    #[serde(rename = "7")]
    InspectionFailed,
    #[serde(rename = "8")]
    Deregistered,
}

string_enum!(RegistrationStatus {
    PendingRegistration => "1",
    Registered => "2",
    Suspended => "3",
    PendingRenewal => "4",
    Cancelled => "5",
    PendingInspection => "6",
    InspectionFailed => "7",
    Deregistered => "8",
});

impl RegistrationStatus {
    pub fn can_transition_to(self, next: RegistrationStatus) -> bool {
        use RegistrationStatus::*;
        matches!(
            (self, next),
            (PendingRegistration, PendingInspection | Registered | Cancelled)
                | (PendingInspection, Registered | InspectionFailed | Cancelled)
                | (InspectionFailed, PendingInspection | Deregistered | Cancelled)
                | (Registered, Suspended | PendingRenewal | Cancelled | Deregistered)
                | (Suspended, Registered | Cancelled | Deregistered)
                | (PendingRenewal, Registered | Suspended | Cancelled | Deregistered)
        )
    }

    /// Statuses in which the region has not (yet, or any longer) been
    /// registered to operate.
    pub fn is_unregistered(self) -> bool {
        use RegistrationStatus::*;
        matches!(
            self,
            PendingRegistration | PendingInspection | InspectionFailed | Deregistered
        )
    }
}
