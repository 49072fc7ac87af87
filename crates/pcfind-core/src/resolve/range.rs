//! Address-range extraction for a single DIE.

use crate::dwarf::{HighPc, UnitTree};
use crate::error::PcfindResult;
use crate::types::{Address, AddressRange};

/// What a DIE says about the code it covers.
///
/// Exactly one of these holds for a DIE at classification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DieExtent
{
    /// No `low_pc`/`high_pc` pair and no `DW_AT_ranges`
    Unknown,
    /// Contiguous `[low_pc, high_pc)`
    Direct(AddressRange),
    /// Entries of the DIE's ranges list
    List(Vec<AddressRange>),
}

impl DieExtent
{
    pub fn is_known(&self) -> bool
    {
        !matches!(self, DieExtent::Unknown)
    }

    /// The range that contains `address`, if any.
    ///
    /// Always `None` for [`DieExtent::Unknown`]: a DIE without address
    /// information never matches.
    pub fn covering(&self, address: Address) -> Option<AddressRange>
    {
        match self {
            DieExtent::Unknown => None,
            DieExtent::Direct(range) => range.contains(address).then_some(*range),
            DieExtent::List(ranges) => ranges.iter().copied().find(|range| range.contains(address)),
        }
    }
}

/// Work out a DIE's extent.
///
/// A `low_pc` with a usable `high_pc` wins. Otherwise the ranges list is
/// consulted, which also covers the common unit shape of `low_pc = 0` plus
/// `DW_AT_ranges`.
pub(crate) fn resolve_extent<U: UnitTree>(tree: &U, die: U::Die) -> PcfindResult<DieExtent>
{
    if let Some(low) = tree.low_pc(die)? {
        if let Some(high) = tree.high_pc(die)? {
            let low = Address::new(low);
            let high = match high {
                HighPc::Address(end) => Address::new(end),
                HighPc::Offset(size) => low.saturating_add(size),
            };
            return Ok(DieExtent::Direct(AddressRange { low, high }));
        }
    }

    if tree.has_ranges(die)? {
        return Ok(DieExtent::List(tree.ranges(die)?));
    }

    Ok(DieExtent::Unknown)
}
