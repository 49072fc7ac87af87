//! # PC Resolution
//!
//! Finds the compilation unit and subprogram enclosing a code address.
//!
//! [`PcResolver::resolve`] enumerates units in order. For each unit it walks
//! the DIE tree depth-first, classifying every DIE it visits:
//!
//! - a unit root whose known extent excludes the target rejects the whole
//!   unit before any child is read
//! - a subprogram whose extent contains the target ends the run
//! - anything else lets the walk continue
//!
//! Each unit value is dropped before the next one is requested. The answer
//! is copied out of the unit as it is found, so nothing in a [`PcMatch`]
//! borrows from the source.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pcfind_core::dwarf::DebugContainer;
//! use pcfind_core::resolve::{PcResolver, ResolveOptions};
//! use pcfind_core::types::Address;
//!
//! # fn main() -> pcfind_core::PcfindResult<()> {
//! let container = DebugContainer::open("target/debug/app")?;
//! let resolver = PcResolver::new(&container, ResolveOptions::default());
//! let resolution = resolver.resolve(Address::new(0x1050))?;
//! println!(
//!     "{} units examined, {} skipped, {} DIEs visited",
//!     resolution.stats.units_examined, resolution.stats.units_skipped, resolution.stats.dies_visited
//! );
//! # Ok(())
//! # }
//! ```

mod classify;
pub mod range;
mod state;
mod walker;

use tracing::{debug, info};

pub use range::DieExtent;

use self::state::TargetState;
use self::walker::{walk_unit, WalkOutcome};
use crate::dwarf::{CompilationUnit, DebugSource, UnitKind};
use crate::error::PcfindResult;
use crate::types::{Address, AddressRange, SymbolName};

/// Knobs for a resolution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions
{
    /// Read the matched unit's line-program file list into
    /// [`PcMatch::source_files`].
    pub collect_source_files: bool,
    /// Demangle linkage names with `rustc-demangle`.
    pub demangle: bool,
}

impl Default for ResolveOptions
{
    fn default() -> Self
    {
        Self {
            collect_source_files: false,
            demangle: true,
        }
    }
}

/// Which compilation unit a match came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitIdentity
{
    /// Position in enumeration order
    pub index: usize,
    /// Offset of the unit header in `.debug_info`
    pub offset: Option<u64>,
    pub version: u16,
    pub kind: UnitKind,
    /// `DW_AT_name` of the unit root
    pub name: Option<String>,
    /// `DW_AT_comp_dir` of the unit root
    pub comp_dir: Option<String>,
    /// The unit range containing the target, when the unit declares one
    pub range: Option<AddressRange>,
}

/// The matched subprogram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subprogram
{
    /// `None` when neither the DIE nor its origin chain carries a name
    pub name: Option<SymbolName>,
    /// The subprogram range (or ranges-list entry) containing the target
    pub range: AddressRange,
    /// `.debug_info` offset of the subprogram DIE, for re-querying it later
    pub die_offset: Option<u64>,
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcMatch
{
    pub target: Address,
    pub unit: UnitIdentity,
    pub subprogram: Subprogram,
    /// Empty unless [`ResolveOptions::collect_source_files`] was set
    pub source_files: Vec<String>,
}

/// Work done by one resolution run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats
{
    /// Units handed out by the source
    pub units_examined: usize,
    /// Units abandoned without a full walk (range excluded the target, or
    /// the unit was malformed)
    pub units_skipped: usize,
    /// DIEs classified, across all units
    pub dies_visited: usize,
}

/// Result of [`PcResolver::resolve`]. "Not found" is `found: None`, not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution
{
    pub found: Option<PcMatch>,
    pub stats: WalkStats,
}

/// Resolves addresses against one debug source.
///
/// Holds no per-run state; every [`resolve`](Self::resolve) call starts a
/// fresh unit enumeration, so the same resolver can be reused.
pub struct PcResolver<'s, S>
{
    source: &'s S,
    options: ResolveOptions,
}

impl<'s, S: DebugSource> PcResolver<'s, S>
{
    pub fn new(source: &'s S, options: ResolveOptions) -> Self
    {
        Self { source, options }
    }

    pub fn options(&self) -> ResolveOptions
    {
        self.options
    }

    /// Find the unit and subprogram enclosing `pc`.
    ///
    /// ## Errors
    ///
    /// Any fatal read error from the source (unit headers, tags, children,
    /// siblings, address attributes) aborts the run and is returned as is.
    /// Missing attributes are never errors.
    pub fn resolve(&self, pc: Address) -> PcfindResult<Resolution>
    {
        let mut state = TargetState::new(pc);
        let mut stats = WalkStats::default();

        for unit in self.source.units() {
            state.reset_unit();
            let CompilationUnit { header, tree } = unit?;
            stats.units_examined += 1;

            let index = header.index;
            state.begin_unit(header);

            match walk_unit(&tree, &mut state, &self.options, &mut stats)? {
                WalkOutcome::Found => {
                    if self.options.collect_source_files {
                        state.source_files(&tree);
                    }
                    let found = state.take_match();
                    info!(%pc, unit = index, dies = stats.dies_visited, "resolved");
                    return Ok(Resolution { found, stats });
                }
                WalkOutcome::NotThisUnit => {
                    stats.units_skipped += 1;
                    debug!(%pc, unit = index, "skipped unit");
                }
                WalkOutcome::Exhausted => {}
            }
        }

        state.reset_unit();
        info!(%pc, units = stats.units_examined, "no enclosing subprogram");
        Ok(Resolution { found: None, stats })
    }
}

/// Resolve `pc` with default options, discarding the statistics.
///
/// ## Example
///
/// ```rust,no_run
/// use pcfind_core::dwarf::DebugContainer;
/// use pcfind_core::resolve::resolve_pc;
/// use pcfind_core::types::Address;
///
/// # fn main() -> pcfind_core::PcfindResult<()> {
/// let container = DebugContainer::open("target/debug/app")?;
/// if let Some(found) = resolve_pc(&container, Address::new(0x3020))? {
///     println!("{:?} at {}", found.unit.name, found.subprogram.range);
/// }
/// # Ok(())
/// # }
/// ```
pub fn resolve_pc<S: DebugSource>(source: &S, pc: Address) -> PcfindResult<Option<PcMatch>>
{
    Ok(PcResolver::new(source, ResolveOptions::default()).resolve(pc)?.found)
}
