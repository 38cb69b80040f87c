//! Closed status vocabularies.
//!
//! Every status has two spellings: a stable token used on the REST wire (`IN_PROGRESS`) and a
//! localized label shown to users and kept in local snapshots and document stores
//! ("В процессе"). Translation in either direction is strict: anything outside the set is
//! reported as [`Error::UnknownStatus`] instead of being passed through.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident {
            $($variant:ident => ($token:literal, $label:literal $(| $alias:literal)*)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn token(self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn from_token(token: &str) -> Result<Self> {
                match token {
                    $($token => Ok($name::$variant),)+
                    other => Err(Error::UnknownStatus {
                        status: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }

            /// Accepts the canonical label and any older spelling of it.
            pub fn from_label(label: &str) -> Result<Self> {
                match label {
                    $($label $(| $alias)* => Ok($name::$variant),)+
                    other => Err(Error::UnknownStatus {
                        status: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let label = String::deserialize(deserializer)?;
                $name::from_label(&label).map_err(serde::de::Error::custom)
            }
        }
    };
}

status_enum! {
    /// Progress of a task.
    TaskStatus, default = NotStarted {
        NotStarted => ("NOT_STARTED", "Не начата"),
        InProgress => ("IN_PROGRESS", "В процессе"),
        Completed => ("COMPLETED", "Завершена"),
        Postponed => ("POSTPONED", "Отложена"),
    }
}

status_enum! {
    /// Whether a member currently takes part in anything.
    MemberStatus, default = Inactive {
        Active => ("ACTIVE", "Активен"),
        // Older versions saved this label with a Latin "H".
        Inactive => ("INACTIVE", "Не активен" | "He активен"),
    }
}

status_enum! {
    ProjectStatus, default = Scheduled {
        Scheduled => ("SCHEDULED", "Запланирован"),
        InProgress => ("IN_PROGRESS", "В процессе"),
        Completed => ("COMPLETED", "Завершен"),
        Postponed => ("POSTPONED", "Отложен"),
        Canceled => ("CANCELED", "Отменен"),
    }
}

status_enum! {
    ActivityStatus, default = Canceled {
        Scheduled => ("SCHEDULED", "Запланирован"),
        InProgress => ("IN_PROGRESS", "В процессе"),
        Completed => ("COMPLETED", "Завершено"),
        Postponed => ("POSTPONED", "Отложено"),
        Canceled => ("CANCELED", "Отменено"),
    }
}
