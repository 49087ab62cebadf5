//! Bundled probe adapters (spec §4.1), compiled in under `builtin-adapters`.

#[cfg(feature = "builtin-adapters")]
mod common;

#[cfg(feature = "builtin-adapters")]
pub mod garak;
#[cfg(feature = "builtin-adapters")]
pub mod langtest;
#[cfg(feature = "builtin-adapters")]
pub mod promptfoo;
#[cfg(feature = "builtin-adapters")]
pub mod pyrit;

#[cfg(feature = "builtin-adapters")]
pub use garak::GarakAdapter;
#[cfg(feature = "builtin-adapters")]
pub use langtest::LangtestAdapter;
#[cfg(feature = "builtin-adapters")]
pub use promptfoo::PromptfooAdapter;
#[cfg(feature = "builtin-adapters")]
pub use pyrit::PyritAdapter;
