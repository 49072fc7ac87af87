//! Subprogram name demangling.
//!
//! `DW_AT_name` is normally already human-readable, but the linkage-name
//! fallback (`DW_AT_linkage_name`) carries the mangled symbol. This module
//! turns either into a [`SymbolName`]:
//!
//! - **Rust**: legacy (`_ZN...E`) and v0 (`_R...`) manglings via `rustc_demangle`
//! - **C++**: Itanium (`_Z...`), detected but left mangled
//! - **C**: everything else

use rustc_demangle::try_demangle;

use crate::types::{SymbolLanguage, SymbolName};

/// Create a `SymbolName` from a raw name, demangling when possible.
///
/// ## Example
///
/// ```rust
/// use pcfind_core::dwarf::demangle::make_symbol_name;
/// use pcfind_core::types::SymbolLanguage;
///
/// let name = make_symbol_name("_ZN4core3fmt5write17h0123456789abcdefE".to_string());
/// assert_eq!(name.language(), SymbolLanguage::Rust);
/// assert_eq!(name.display_name(), "core::fmt::write::h0123456789abcdef");
/// ```
pub fn make_symbol_name(raw: String) -> SymbolName
{
    let demangled = try_demangle(&raw).ok().map(|d| d.to_string());
    let language = detect_language(&raw, demangled.is_some());
    SymbolName::new(raw, demangled, language)
}

/// Create a `SymbolName` without attempting to demangle.
pub fn plain_symbol_name(raw: String) -> SymbolName
{
    let language = detect_language(&raw, false);
    SymbolName::new(raw, None, language)
}

fn detect_language(raw: &str, rust_demangled: bool) -> SymbolLanguage
{
    if rust_demangled || raw.starts_with("_R") || raw.contains("::") {
        SymbolLanguage::Rust
    } else if raw.starts_with("_Z") {
        SymbolLanguage::Cpp
    } else if raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$') {
        SymbolLanguage::C
    } else {
        SymbolLanguage::Unknown
    }
}
