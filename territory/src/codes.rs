//! Closed value sets persisted as short text codes.
//!
//! Every enum here has a stable on-disk code (`as_str`) and parses it back
//! with `FromStr`. Codes are what the SQL CHECK constraints and legacy rows
//! use, so they must never change.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stored code that matched none of the known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} code: {value:?}")]
pub struct ParseCodeError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! stored_code {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $( $variant:ident => $code:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( #[serde(rename = $code)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $code ),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseCodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $code $(| $alias)* => Ok($name::$variant), )+
                    other => Err(ParseCodeError {
                        kind: $label,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

stored_code! {
    /// What a property is. Buildings and village-blocks own units.
    PropertyKind, "property kind" {
        Residential => "residencial",
        Commercial => "comercial",
        Building => "predio",
        VillageBlock => "vila",
    }
}

impl PropertyKind {
    pub fn is_multi_unit(self) -> bool {
        matches!(self, PropertyKind::Building | PropertyKind::VillageBlock)
    }
}

stored_code! {
    /// Lifecycle of an assignment. Only `Active -> Completed` is allowed.
    AssignmentStatus, "assignment status" {
        Active => "ativo",
        Completed => "concluido",
    }
}

stored_code! {
    /// Result of a visit. Older rows stored visited-only as `visitado`.
    Outcome, "service outcome" {
        Positive => "positivo",
        OccupantAbsent => "ocupante-ausente",
        Declined => "recusou-atendimento",
        VisitedOnly => "apenas-visitado" | "visitado",
    }
}

stored_code! {
    GateType, "gate type" {
        AroundTheClock => "24-horas",
        Electronic => "eletronica",
        Daytime => "diurna",
        NoGate => "sem-portaria",
        Other => "outro",
    }
}

stored_code! {
    AccessType, "access type" {
        Easy => "facil",
        Restricted => "restrito",
        Intercom => "interfone",
        Difficult => "dificil",
    }
}

stored_code! {
    ActivityKind, "activity kind" {
        Login => "login",
        Logout => "logout",
        Create => "criar",
        Edit => "editar",
        Delete => "excluir",
        View => "visualizar",
    }
}

stored_code! {
    NotificationKind, "notification kind" {
        Info => "info",
        Alert => "alerta",
        Error => "erro",
    }
}

stored_code! {
    /// Read lifecycle of a notification.
    NotificationStatus, "notification status" {
        Unread => "nao_lida",
        Read => "lida",
        Archived => "arquivada",
    }
}

stored_code! {
    /// The four report families a user can build or save.
    ReportKind, "report kind" {
        ServiceRecords => "atendimentos",
        Territories => "territorios",
        Assignments => "designacoes",
        Buildings => "predios_vilas",
    }
}

/// Access level of a user. Stored as the integer 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum PermissionLevel {
    Basic,
    Manager,
    Admin,
}

impl PermissionLevel {
    pub fn as_i64(self) -> i64 {
        match self {
            PermissionLevel::Basic => 1,
            PermissionLevel::Manager => 2,
            PermissionLevel::Admin => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PermissionLevel::Basic => "Basic",
            PermissionLevel::Manager => "Manager",
            PermissionLevel::Admin => "Administrator",
        }
    }
}

impl TryFrom<i64> for PermissionLevel {
    type Error = ParseCodeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PermissionLevel::Basic),
            2 => Ok(PermissionLevel::Manager),
            3 => Ok(PermissionLevel::Admin),
            other => Err(ParseCodeError {
                kind: "permission level",
                value: other.to_string(),
            }),
        }
    }
}

impl From<PermissionLevel> for i64 {
    fn from(level: PermissionLevel) -> Self {
        level.as_i64()
    }
}

/// Weekday names accepted on a field trip, Sunday first.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Domingo",
    "Segunda-feira",
    "Terça-feira",
    "Quarta-feira",
    "Quinta-feira",
    "Sexta-feira",
    "Sábado",
];

/// Weekday name for `date` as stored on a field trip.
pub fn weekday_name(date: chrono::NaiveDate) -> &'static str {
    use chrono::Datelike;
    WEEKDAY_NAMES[date.weekday().num_days_from_sunday() as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_parse_back() {
        for kind in PropertyKind::ALL {
            assert_eq!(kind.as_str().parse::<PropertyKind>().unwrap(), *kind);
        }
        for outcome in Outcome::ALL {
            assert_eq!(outcome.as_str().parse::<Outcome>().unwrap(), *outcome);
        }
    }

    #[test]
    fn legacy_visited_code_is_accepted() {
        assert_eq!("visitado".parse::<Outcome>().unwrap(), Outcome::VisitedOnly);
        assert_eq!(Outcome::VisitedOnly.as_str(), "apenas-visitado");
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = "casa".parse::<PropertyKind>().unwrap_err();
        assert_eq!(err.kind, "property kind");
        assert_eq!(err.value, "casa");
    }

    #[test]
    fn multi_unit_kinds() {
        assert!(PropertyKind::Building.is_multi_unit());
        assert!(PropertyKind::VillageBlock.is_multi_unit());
        assert!(!PropertyKind::Residential.is_multi_unit());
        assert!(!PropertyKind::Commercial.is_multi_unit());
    }

    #[test]
    fn permission_levels_are_ordered() {
        assert!(PermissionLevel::Admin > PermissionLevel::Manager);
        assert_eq!(PermissionLevel::try_from(2).unwrap(), PermissionLevel::Manager);
        assert!(PermissionLevel::try_from(4).is_err());
    }

    #[test]
    fn serde_uses_stored_codes() {
        let json = serde_json::to_string(&NotificationStatus::Unread).unwrap();
        assert_eq!(json, "\"nao_lida\"");
        let level: PermissionLevel = serde_json::from_str("3").unwrap();
        assert_eq!(level, PermissionLevel::Admin);
    }

    #[test]
    fn weekday_names_follow_the_calendar() {
        let tuesday = chrono::NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        assert_eq!(weekday_name(tuesday), "Terça-feira");
        let sunday = chrono::NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert_eq!(weekday_name(sunday), "Domingo");
    }
}
