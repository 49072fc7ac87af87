//! Half-open address ranges.

use std::fmt;

use super::address::Address;

/// A resolved `[low, high)` pair in the object's address space.
///
/// DWARF ranges are half-open: `low` is the first covered address and `high`
/// is the first address past the end. A range with `high <= low` covers
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange
{
    pub low: Address,
    pub high: Address,
}

impl AddressRange
{
    pub fn new(low: impl Into<Address>, high: impl Into<Address>) -> Self
    {
        Self {
            low: low.into(),
            high: high.into(),
        }
    }

    /// `true` when `address` lies in `[low, high)`.
    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.low && address < self.high
    }

    pub fn is_empty(&self) -> bool
    {
        self.high <= self.low
    }

    /// Number of bytes covered (zero for empty or inverted ranges).
    pub fn size(&self) -> u64
    {
        self.high.value().saturating_sub(self.low.value())
    }
}

impl fmt::Display for AddressRange
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "[{:#x}, {:#x})", self.low, self.high)
    }
}
