// Opaque 128-bit identifiers for every entity in the data model.
//
// Each ID is a distinct newtype around a `Uuid` rather than a bare `Uuid`
// field, so a `RunId` can never be passed where a `BaselineId` is expected —
// the compiler catches the mixup instead of a query silently returning the
// wrong row.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

id_newtype!(RunId);
id_newtype!(StepId);
id_newtype!(FailureId);
id_newtype!(DecisionId);
id_newtype!(SignalId);
id_newtype!(ProfileId);
id_newtype!(BaselineId);
id_newtype!(DriftId);
