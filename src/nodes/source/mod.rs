mod memory;
pub use memory::*;

#[cfg(feature = "std")]
mod tone;
#[cfg(feature = "std")]
pub use tone::*;

#[cfg(feature = "std")]
mod ring;
#[cfg(feature = "std")]
pub use ring::*;
