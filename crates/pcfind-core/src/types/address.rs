//! Target address type.

use std::fmt;
use std::str::FromStr;

use crate::error::PcfindError;

/// Strongly typed code address
///
/// This wrapper around `u64` provides type safety when working with program
/// counter values. It prevents accidentally mixing addresses with other `u64`
/// values (like DIE offsets, sizes, or unit indices), which are everywhere in
/// DWARF-reading code.
///
/// Addresses are in the object file's own address space (the values stored in
/// `DW_AT_low_pc`, range lists, etc.), not a relocated runtime address.
///
/// ## Example
///
/// ```rust
/// use pcfind_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// let end = addr.saturating_add(0x100);
/// assert_eq!(end.value(), 0x1100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// Create a new address from a `u64` value
    ///
    /// This is equivalent to `Address::from(value)` but can be used in const contexts.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    ///
    /// ## Example
    ///
    /// ```rust
    /// use pcfind_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.value(), 0x1000);
    /// ```
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Add an offset to this address, saturating at the maximum value
    ///
    /// Used when turning a `DW_AT_high_pc` size into an end address: a bogus
    /// size must not wrap around below `low_pc`.
    pub fn saturating_add(self, offset: u64) -> Self
    {
        Address(self.0.saturating_add(offset))
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Parse an address the way C's `strtoul(s, _, 0)` does
///
/// - `0x` / `0X` prefix: hexadecimal
/// - leading `0` followed by more digits: octal
/// - anything else: decimal
///
/// Surrounding whitespace is ignored; trailing garbage is rejected.
///
/// ## Example
///
/// ```rust
/// use pcfind_core::types::Address;
///
/// assert_eq!("0x1020".parse::<Address>().unwrap().value(), 0x1020);
/// assert_eq!("4128".parse::<Address>().unwrap().value(), 4128);
/// assert_eq!("010".parse::<Address>().unwrap().value(), 8);
/// ```
impl FromStr for Address
{
    type Err = PcfindError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let text = s.trim();
        let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            (hex, 16)
        } else if text.len() > 1 && text.starts_with('0') {
            (&text[1..], 8)
        } else {
            (text, 10)
        };

        if digits.is_empty() {
            return Err(PcfindError::InvalidAddress(format!("\"{s}\" has no digits")));
        }

        u64::from_str_radix(digits, radix)
            .map(Address)
            .map_err(|err| PcfindError::InvalidAddress(format!("\"{s}\": {err}")))
    }
}
