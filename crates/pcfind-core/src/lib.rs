//! # pcfind-core
//!
//! Program-counter to subprogram resolution over DWARF debug info.
//!
//! Given a code address, this crate finds the compilation unit and the
//! subprogram DIE whose address range encloses it. It handles:
//! - `DW_AT_low_pc` / `DW_AT_high_pc` pairs, with `high_pc` as either an
//!   end address or a size
//! - `DW_AT_ranges` lists (DWARF 2-5, with the unit's ranges base applied)
//! - skipping whole units whose range excludes the address
//! - subprogram names through linkage names and declaration references,
//!   demangled where possible
//!
//! ## Layout
//!
//! - [`dwarf`]: the read interface the resolver is written against, its
//!   gimli/object implementation ([`DebugContainer`]) and, behind the
//!   `test-utils` feature, an in-memory one for tests
//! - [`resolve`]: the unit enumerator, tree walker and DIE classifier
//! - [`types`]: addresses, ranges and symbol names
//!
//! ## Features
//!
//! - `test-utils`: exposes `dwarf::memory`, an in-memory debug source that
//!   counts the reads a resolution performs
//!
//! ## Example
//!
//! ```rust,no_run
//! use pcfind_core::prelude::*;
//!
//! # fn main() -> PcfindResult<()> {
//! let container = DebugContainer::open("target/debug/app")?;
//! let resolver = PcResolver::new(&container, ResolveOptions::default());
//!
//! let resolution = resolver.resolve("0x401136".parse()?)?;
//! if let Some(found) = resolution.found {
//!     println!("{} in {:?}", found.subprogram.range, found.unit.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod dwarf;
pub mod error;
pub mod prelude;
pub mod resolve;
pub mod types;

pub use dwarf::DebugContainer;
pub use error::{PcfindError, PcfindResult};
pub use resolve::{resolve_pc, PcMatch, PcResolver, Resolution, ResolveOptions};
pub use types::{Address, AddressRange};
