//! Tagged errors and closed error unions.
//!
//! Every failure an effect can produce is a *variant*: a plain struct
//! carrying its payload, with a stable tag naming it. A *union* is an enum
//! whose members are variants. Composition keeps unions closed: errors
//! only grow through explicit `From` conversions (`widen`,
//! `and_then_widen`) and only shrink through explicit handling
//! (`catch_tag`, `catch_all`).
//!
//! Three macros remove the boilerplate:
//!
//! - [`tagged!`](crate::tagged!) implements [`Tagged`] for variant structs.
//! - [`error_union!`](crate::error_union!) declares a union enum, with
//!   `From<Variant>` for each member and a delegating [`Tagged`] impl.
//! - [`narrow!`](crate::narrow!) implements [`Narrow`] for one member of a
//!   union, naming the union of the remaining members.
//!
//! ```rust
//! use wellspring::{error_union, narrow, tagged, Narrow, Tagged};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! pub struct NotFound { pub id: String }
//! #[derive(Debug, Clone, PartialEq)]
//! pub struct StorageFailure { pub reason: String }
//! #[derive(Debug, Clone, PartialEq)]
//! pub struct ValidationFailure { pub field: &'static str }
//!
//! tagged!(NotFound, StorageFailure, ValidationFailure);
//!
//! error_union! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub enum UserError {
//!         NotFound(NotFound),
//!         Storage(StorageFailure),
//!         Validation(ValidationFailure),
//!     }
//! }
//!
//! error_union! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub enum WriteError {
//!         Storage(StorageFailure),
//!         Validation(ValidationFailure),
//!     }
//! }
//!
//! narrow!(UserError: NotFound(NotFound) => WriteError { Storage, Validation });
//!
//! let err = UserError::from(NotFound { id: "42".into() });
//! assert_eq!(err.tag(), "NotFound");
//!
//! let rest = UserError::from(StorageFailure { reason: "disk".into() });
//! let narrowed: Result<NotFound, WriteError> = rest.narrow();
//! assert_eq!(narrowed.unwrap_err().tag(), "StorageFailure");
//! ```

/// A failure variant with a stable discriminant.
pub trait Tagged {
    /// The variant's tag.
    fn tag(&self) -> &'static str;
}

impl Tagged for std::convert::Infallible {
    fn tag(&self) -> &'static str {
        match *self {}
    }
}

/// Split variant `V` out of an error union.
///
/// `Rest` is the union of every other member. Handlers that recover from
/// `V` produce errors that must absorb `Rest`, so nothing unhandled is
/// ever dropped.
pub trait Narrow<V>: Sized {
    /// The union without `V`.
    type Rest;

    /// `Ok` with the variant if `self` is a `V`, otherwise the remainder.
    fn narrow(self) -> Result<V, Self::Rest>;
}

/// Implement [`Tagged`] for variant structs, using the type name as tag.
///
/// ```rust
/// use wellspring::{tagged, Tagged};
///
/// struct CacheFailure;
/// tagged!(CacheFailure);
///
/// assert_eq!(CacheFailure.tag(), "CacheFailure");
/// ```
#[macro_export]
macro_rules! tagged {
    ($($variant:ident),+ $(,)?) => {
        $(
            impl $crate::Tagged for $variant {
                fn tag(&self) -> &'static str {
                    stringify!($variant)
                }
            }
        )+
    };
}

/// Declare a closed error union.
///
/// Each member wraps one variant type. Generates the enum, `From` for every
/// member type, `From<Infallible>`, and a [`Tagged`] impl that reports the
/// wrapped variant's tag.
///
/// Member types must be distinct, since each gets its own `From` impl.
#[macro_export]
macro_rules! error_union {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($member:ident($variant:ty)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $(
                #[allow(missing_docs)]
                $member($variant),
            )+
        }

        $(
            impl ::core::convert::From<$variant> for $name {
                fn from(error: $variant) -> Self {
                    $name::$member(error)
                }
            }
        )+

        impl ::core::convert::From<::core::convert::Infallible> for $name {
            fn from(never: ::core::convert::Infallible) -> Self {
                match never {}
            }
        }

        impl $crate::Tagged for $name {
            fn tag(&self) -> &'static str {
                match self {
                    $($name::$member(inner) => $crate::Tagged::tag(inner),)+
                }
            }
        }
    };
}

/// Implement [`Narrow`] for one member of a union declared with
/// [`error_union!`](crate::error_union!).
///
/// `narrow!(Union: Member(Variant) => Rest { Others... })` splits `Variant`
/// out of `Union`; every other member listed is converted into `Rest` with
/// `From`. `Rest` may be another union, a single variant type, or
/// `Infallible` when `Variant` is the only member (list no others).
#[macro_export]
macro_rules! narrow {
    ($union:ident : $member:ident($variant:ty) => $rest:ty { $($other:ident),* $(,)? }) => {
        impl $crate::Narrow<$variant> for $union {
            type Rest = $rest;

            fn narrow(self) -> ::core::result::Result<$variant, $rest> {
                match self {
                    $union::$member(inner) => ::core::result::Result::Ok(inner),
                    $(
                        $union::$other(inner) => {
                            ::core::result::Result::Err(<$rest as ::core::convert::From<_>>::from(inner))
                        }
                    )*
                }
            }
        }
    };
}

/// Implement `From<Narrower>` for a wider union declared with
/// [`error_union!`](crate::error_union!), member by member.
///
/// ```rust
/// use wellspring::{error_union, tagged, widen_union};
///
/// #[derive(Debug, PartialEq)]
/// struct NotFound;
/// #[derive(Debug, PartialEq)]
/// struct StorageFailure;
/// tagged!(NotFound, StorageFailure);
///
/// error_union! {
///     #[derive(Debug, PartialEq)]
///     enum ReadError { Storage(StorageFailure) }
/// }
/// error_union! {
///     #[derive(Debug, PartialEq)]
///     enum UserError { NotFound(NotFound), Storage(StorageFailure) }
/// }
/// widen_union!(ReadError => UserError { Storage });
///
/// let wide: UserError = ReadError::Storage(StorageFailure).into();
/// assert_eq!(wide, UserError::Storage(StorageFailure));
/// ```
#[macro_export]
macro_rules! widen_union {
    ($narrow:ident => $wide:ident { $($member:ident),+ $(,)? }) => {
        impl ::core::convert::From<$narrow> for $wide {
            fn from(error: $narrow) -> Self {
                match error {
                    $($narrow::$member(inner) => <$wide as ::core::convert::From<_>>::from(inner),)+
                }
            }
        }
    };
}
