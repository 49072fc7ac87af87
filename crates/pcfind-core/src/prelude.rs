//! Common module for library exports

pub use crate::dwarf::{DebugContainer, DebugSource, UnitTree};
pub use crate::error::{PcfindError, PcfindResult};
pub use crate::resolve::{resolve_pc, PcMatch, PcResolver, Resolution, ResolveOptions, Subprogram, UnitIdentity, WalkStats};
pub use crate::types::{Address, AddressRange, Architecture, SymbolLanguage, SymbolName};
