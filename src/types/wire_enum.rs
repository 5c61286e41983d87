//! Declarative helper for one-byte protocol enumerations.

/// Declares a `#[repr(u8)]` enum whose variants map to fixed wire codes.
///
/// Generates `code()`, `From<Enum> for u8` and a checked `TryFrom<u8>` that
/// reports unknown codes as [`ProtocolError`](crate::ProtocolError). The
/// default error is `InvalidEnum` naming the type; pass `invalid = ...` to
/// map unknown codes differently.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident invalid = $invalid:expr; {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $code),+
        }

        impl $name {
            /// Every variant in wire-code order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire code of this variant.
            pub const fn code(self) -> u8 {
                self as u8
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = $crate::error::ProtocolError;

            fn try_from(value: u8) -> Result<Self, $crate::error::ProtocolError> {
                match value {
                    $($code => Ok($name::$variant),)+
                    other => Err(($invalid)(other)),
                }
            }
        }
    };
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)?
        }
    ) => {
        wire_enum! {
            $(#[$meta])*
            pub enum $name invalid = |value| $crate::error::ProtocolError::InvalidEnum {
                field: stringify!($name),
                value,
            }; {
                $($(#[$vmeta])* $variant = $code),+
            }
        }
    };
}
