//! # Types
//!
//! Small value types shared by the DWARF reading layer and the resolver.
//!
//! None of these borrow from a loaded unit, so they can be handed back to the
//! caller after the unit that produced them has been dropped.

pub mod address;
pub mod arch;
pub mod range;
pub mod symbols;

// Re-export all public types
pub use address::Address;
pub use arch::Architecture;
pub use range::AddressRange;
pub use symbols::{SymbolLanguage, SymbolName};
