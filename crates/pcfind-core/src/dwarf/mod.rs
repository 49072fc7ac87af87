//! # DWARF Access
//!
//! The read-only operations the resolver needs from a debug-info library,
//! expressed as two traits:
//!
//! - [`DebugSource`]: an open debug container that can enumerate its
//!   compilation units, one at a time.
//! - [`UnitTree`]: one compilation unit's DIE tree: navigation (root, first
//!   child, next sibling), tag, and the handful of attributes the resolver
//!   reads.
//!
//! [`DebugContainer`] implements them on top of `gimli` and `object`. With
//! the `test-utils` feature, `memory::MemorySource` implements them over DIE
//! trees built in code.
//!
//! ## Absent vs. error
//!
//! Every read distinguishes "the attribute is not there" (`Ok(None)` /
//! `Ok(false)`) from "the library failed to read" (`Err`). Only the latter
//! aborts a resolution.
//!
//! ## Lifetimes
//!
//! DIE handles ([`UnitTree::Die`]) are only meaningful for the unit value that
//! produced them. All of them are released together when that unit value is
//! dropped, so the walker never frees individual DIEs. Anything that must
//! outlive the unit is copied out, and [`UnitTree::die_offset`] gives a
//! section offset that stays valid for the whole container.

pub mod container;
pub mod demangle;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod unit;

use std::fmt;

pub use container::DebugContainer;
pub use unit::GimliUnit;

use crate::error::PcfindResult;
use crate::types::AddressRange;

/// Kind discriminator of a DIE, reduced to what the resolver cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DieTag
{
    CompileUnit,
    PartialUnit,
    TypeUnit,
    Subprogram,
    /// Any other tag, with its raw `DW_TAG_*` value
    Other(u16),
}

impl DieTag
{
    /// Tags that may only appear as the root of a unit.
    pub fn is_unit_root(self) -> bool
    {
        matches!(self, DieTag::CompileUnit | DieTag::PartialUnit | DieTag::TypeUnit)
    }

    pub(crate) fn from_dw(tag: gimli::DwTag) -> Self
    {
        match tag {
            gimli::DW_TAG_compile_unit | gimli::DW_TAG_skeleton_unit => DieTag::CompileUnit,
            gimli::DW_TAG_partial_unit => DieTag::PartialUnit,
            gimli::DW_TAG_type_unit => DieTag::TypeUnit,
            gimli::DW_TAG_subprogram => DieTag::Subprogram,
            other => DieTag::Other(other.0),
        }
    }
}

/// Decoded `DW_AT_high_pc`
///
/// The attribute's form class decides its meaning: address-class forms give
/// the end address directly, constant-class forms give a size relative to
/// `DW_AT_low_pc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighPc
{
    /// Absolute end address (`DW_FORM_addr`, `DW_FORM_addrx*`)
    Address(u64),
    /// Size in bytes from `low_pc` (`DW_FORM_data*`, `DW_FORM_udata`)
    Offset(u64),
}

/// Unit type from the unit header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind
{
    Compile,
    Partial,
    Type,
    Skeleton,
    SplitCompile,
    SplitType,
}

impl fmt::Display for UnitKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            UnitKind::Compile => "compile",
            UnitKind::Partial => "partial",
            UnitKind::Type => "type",
            UnitKind::Skeleton => "skeleton",
            UnitKind::SplitCompile => "split_compile",
            UnitKind::SplitType => "split_type",
        };
        write!(f, "{label}")
    }
}

/// Header metadata of one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitHeaderInfo
{
    /// Zero-based position in enumeration order
    pub index: usize,
    /// Offset of the unit header in `.debug_info`, when the unit lives there
    pub offset: Option<u64>,
    pub version: u16,
    /// 4 for 32-bit DWARF, 8 for 64-bit DWARF
    pub offset_size: u8,
    pub address_size: u8,
    pub abbrev_offset: u64,
    pub kind: UnitKind,
}

/// One enumerated unit: header plus its DIE tree.
pub struct CompilationUnit<U>
{
    pub header: UnitHeaderInfo,
    pub tree: U,
}

/// An open debug container
///
/// [`DebugSource::units`] starts a fresh enumeration each time it is called,
/// so the same container can serve any number of resolutions.
pub trait DebugSource
{
    /// Per-unit DIE tree. Owns (or borrows from the container) everything
    /// needed to answer queries about that unit.
    type Unit<'a>: UnitTree
    where
        Self: 'a;

    /// Lazy, finite enumerator over the container's units.
    ///
    /// Yields `Err` for a fatal read error; callers stop at the first one.
    type Units<'a>: Iterator<Item = PcfindResult<CompilationUnit<Self::Unit<'a>>>>
    where
        Self: 'a;

    fn units(&self) -> Self::Units<'_>;
}

/// Read access to one compilation unit's DIE tree.
pub trait UnitTree
{
    /// Handle to a DIE within this unit.
    type Die: Copy + Eq + fmt::Debug;

    /// The unit's root DIE (the compile/partial/type unit DIE).
    fn root(&self) -> PcfindResult<Self::Die>;

    /// First child of `die`, or `None` when it has no children.
    fn first_child(&self, die: Self::Die) -> PcfindResult<Option<Self::Die>>;

    /// Next sibling of `die`, or `None` at the end of its sibling list.
    fn next_sibling(&self, die: Self::Die) -> PcfindResult<Option<Self::Die>>;

    fn tag(&self, die: Self::Die) -> PcfindResult<DieTag>;

    /// `DW_AT_low_pc` as an address.
    fn low_pc(&self, die: Self::Die) -> PcfindResult<Option<u64>>;

    /// `DW_AT_high_pc` with its form class.
    fn high_pc(&self, die: Self::Die) -> PcfindResult<Option<HighPc>>;

    /// Whether the DIE carries `DW_AT_ranges`.
    fn has_ranges(&self, die: Self::Die) -> PcfindResult<bool>;

    /// Entries of the DIE's `DW_AT_ranges` list, with any ranges base
    /// already applied. Empty when the DIE has no ranges attribute.
    fn ranges(&self, die: Self::Die) -> PcfindResult<Vec<AddressRange>>;

    /// `DW_AT_name` as a string.
    fn name(&self, die: Self::Die) -> PcfindResult<Option<String>>;

    /// `DW_AT_linkage_name` (or `DW_AT_MIPS_linkage_name`).
    fn linkage_name(&self, die: Self::Die) -> PcfindResult<Option<String>>;

    /// DIE referenced by `DW_AT_specification` or `DW_AT_abstract_origin`
    /// within this unit, used to find the name of out-of-line definitions.
    fn origin(&self, _die: Self::Die) -> PcfindResult<Option<Self::Die>>
    {
        Ok(None)
    }

    /// `DW_AT_comp_dir` of the unit root.
    fn comp_dir(&self) -> PcfindResult<Option<String>>;

    /// File names from the unit's line-program header, directory-joined.
    fn source_files(&self) -> PcfindResult<Vec<String>>;

    /// `.debug_info` offset of `die`, valid for the lifetime of the container.
    fn die_offset(&self, die: Self::Die) -> Option<u64>;
}
