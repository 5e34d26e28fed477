//! Action dispatch: discriminant resolution and required-parameter checks.
//!
//! Each provider declares its actions as a closed enum implementing
//! [`ActionKind`]. [`resolve`] validates the credentials and discriminant,
//! maps the discriminant to a variant and then checks that action's
//! required parameters, reporting every missing name at once.

use crate::{
    errors::{Error, Result},
    params::{Params, Presence},
};

/// Input key carrying the action discriminant.
pub const ACTION_KEY: &str = "action";

/// A parameter an action cannot run without.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequiredParam {
    pub name: &'static str,
    pub presence: Presence,
}

impl RequiredParam {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            presence: Presence::Value,
        }
    }

    pub const fn non_empty(name: &'static str) -> Self {
        Self {
            name,
            presence: Presence::NonEmptyArray,
        }
    }
}

/// Shorthand for a required value parameter.
pub const fn req(name: &'static str) -> RequiredParam {
    RequiredParam::new(name)
}

/// Closed set of actions exposed by one provider plugin.
pub trait ActionKind: Copy + Send + Sync + 'static {
    /// Every variant, in the order they are presented to users.
    const ALL: &'static [Self];

    /// Wire name of the action, e.g. `create_issue`.
    fn name(self) -> &'static str;

    /// Parameters this action needs beyond the plugin credentials.
    fn required(self) -> &'static [RequiredParam];

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.name() == name)
    }

    fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|a| a.name()).collect()
    }
}

/// Names of the listed parameters that are missing, in declaration order.
pub fn missing(params: &Params, required: &[RequiredParam]) -> Vec<&'static str> {
    required
        .iter()
        .filter(|p| !params.is_present(p.name, p.presence))
        .map(|p| p.name)
        .collect()
}

/// Fail with every missing name when any listed parameter is absent.
///
/// Single-action plugins validate with this directly; mega-plugins go
/// through [`resolve`].
pub fn require(params: &Params, required: &[RequiredParam]) -> Result<()> {
    let absent = missing(params, required);
    if absent.is_empty() {
        Ok(())
    } else {
        Err(Error::missing(absent))
    }
}

/// Resolve the discriminant and validate the invocation.
///
/// Order: discriminant and credentials, then the discriminant value, then the
/// action's own parameters. No adapter is touched when this fails.
pub fn resolve<A: ActionKind>(params: &Params, credentials: &[RequiredParam]) -> Result<A> {
    let mut base = Vec::with_capacity(credentials.len() + 1);
    base.push(RequiredParam::new(ACTION_KEY));
    base.extend_from_slice(credentials);
    require(params, &base)?;

    let name = params.str(ACTION_KEY)?;
    let action = A::from_name(&name).ok_or_else(|| Error::UnsupportedAction(name.clone()))?;

    let absent = missing(params, action.required());
    if !absent.is_empty() {
        #[cfg(feature = "tracing")]
        tracing::debug!(action = %name, missing = ?absent, "rejecting action input");
        return Err(Error::missing(absent));
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(action = %name, "action resolved");
    Ok(action)
}

/// Declare a provider action enum and its [`ActionKind`] impl in one place.
///
/// ```ignore
/// actions! {
///     pub enum DemoAction {
///         GetThing = "get_thing" => [req("thingId")],
///         ListThings = "list_things" => [],
///     }
/// }
/// ```
#[macro_export]
macro_rules! actions {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident = $wire:literal => [ $($param:expr),* $(,)? ] ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::dispatch::ActionKind for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            fn required(self) -> &'static [$crate::dispatch::RequiredParam] {
                match self {
                    $($name::$variant => {
                        const REQUIRED: &[$crate::dispatch::RequiredParam] = &[$($param),*];
                        REQUIRED
                    }),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::dispatch::ActionKind::name(*self))
            }
        }
    };
}
