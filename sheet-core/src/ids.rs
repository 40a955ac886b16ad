//! Identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for characters.
    CharacterId
);
uuid_id!(
    /// Unique identifier for an ability on a character's roster.
    AbilityId
);
uuid_id!(
    /// Unique identifier for a live active effect.
    EffectId
);
uuid_id!(
    /// Unique identifier for items.
    ItemId
);
uuid_id!(
    /// Unique identifier for combat log entries.
    LogEntryId
);
