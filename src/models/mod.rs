//! Data models for the Takween dashboard.
//!
//! Field names serialize as camelCase to match the dashboard's JSON records.

/// Declares a fieldless enum stored as its upper-case wire name.
///
/// Generates `ALL`, `as_str` and `parse` so the database layer can store the
/// same string the JSON API exposes.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
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

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($wire => Some($name::$variant),)+
                    _ => None,
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

mod activity;
mod datastore;
mod department;
mod employee;
mod hr;
mod kpi_rule;
mod project;
mod sprint;
mod task;

pub use activity::*;
pub use datastore::*;
pub use department::*;
pub use employee::*;
pub use hr::*;
pub use kpi_rule::*;
pub use project::*;
pub use sprint::*;
pub use task::*;
