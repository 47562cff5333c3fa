//! Macros for ergonomic schema construction.

/// Generate a state enum and its `State` implementation.
///
/// Each variant may carry an explicit display name; variants without one
/// use their identifier.
///
/// # Example
///
/// ```
/// use statekit::core::State;
/// use statekit::state_enum;
///
/// state_enum! {
///     pub enum CarouselState {
///         Idle => "idle",
///         Dragging => "dragging",
///         AutoPlay,
///     }
/// }
///
/// assert_eq!(CarouselState::Dragging.name(), "dragging");
/// assert_eq!(CarouselState::AutoPlay.name(), "AutoPlay");
/// ```
#[macro_export]
macro_rules! state_enum {
    (@label $variant:ident $label:literal) => {
        $label
    };
    (@label $variant:ident) => {
        stringify!($variant)
    };
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(=> $label:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            Debug,
            serde::Serialize,
            serde::Deserialize
        )]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $crate::state_enum!(@label $variant $($label)?)),*
                }
            }
        }
    };
}
