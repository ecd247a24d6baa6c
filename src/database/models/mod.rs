// Domain records shared by the store implementations and the HTTP layer.
//
// Every record serializes with camelCase field names; enum values travel as
// SCREAMING_SNAKE_CASE strings and are stored the same way in Postgres.

/// Declares a closed set of string-valued states with serde, `Display` and `FromStr`
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::database::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err($crate::database::models::UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod audit_log;
pub mod evidence;
pub mod fee;
pub mod inspection;
pub mod organization;
pub mod permit;
pub mod ticket;
pub mod traffic_plan;
pub mod user;

pub use audit_log::{AuditAction, AuditLog, EntityType};
pub use evidence::{Evidence, EvidenceType};
pub use fee::{Fee, FeeStatus};
pub use inspection::{Inspection, InspectionStatus};
pub use organization::Organization;
pub use permit::{Permit, PermitStatus};
pub use ticket::{Ticket, TicketStatus, UtilityType};
pub use traffic_plan::TrafficPlan;
pub use user::{User, UserRole};

/// A stored or submitted string did not match any known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
