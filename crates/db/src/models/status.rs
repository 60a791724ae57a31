//! Status helper enums mapping to SMALLINT status columns.
//!
//! Each enum variant's discriminant is the value stored in the database.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up the variant for a database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Playback status of a bid row. Only ever advances
    /// `Queued -> Playing -> Finalized`.
    SongStatus {
        Queued = 0,
        Playing = 1,
        Finalized = 2,
    }
}

impl SongStatus {
    /// The status a row must currently hold to be moved into `self`.
    ///
    /// `Queued` has no predecessor: rows are only created in that state.
    pub fn predecessor(self) -> Option<SongStatus> {
        match self {
            SongStatus::Queued => None,
            SongStatus::Playing => Some(SongStatus::Queued),
            SongStatus::Finalized => Some(SongStatus::Playing),
        }
    }
}
