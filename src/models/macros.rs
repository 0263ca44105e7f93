/// Defines a newtype ID wrapper around a `uuid::Uuid` and generates:
/// - derives (Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)
/// - `Display`
/// - `From<Uuid> for $name` and `From<$name> for Uuid`
/// - `new()` (random v4) and `value()` accessors
///
/// Usage:
///   define_id_type!(JobId);
#[macro_export]
macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Debug,
            Copy,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                $name(uuid::Uuid::new_v4())
            }

            pub fn value(&self) -> uuid::Uuid {
                self.0
            }
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{}", self.0)
            }
        }

        impl ::std::convert::From<uuid::Uuid> for $name {
            fn from(v: uuid::Uuid) -> Self {
                $name(v)
            }
        }

        impl ::std::convert::From<$name> for uuid::Uuid {
            fn from(v: $name) -> Self {
                v.0
            }
        }
    };
}
