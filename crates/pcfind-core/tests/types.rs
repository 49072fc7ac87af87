//! Tests for shared value types

use pcfind_core::types::{Address, AddressRange, Architecture, SymbolLanguage, SymbolName};

#[test]
fn test_address_from_u64()
{
    let addr = Address::from(0x1000);
    assert_eq!(addr.value(), 0x1000);
}

#[test]
fn test_address_to_u64()
{
    let addr = Address::new(0x2000);
    let value: u64 = addr.into();
    assert_eq!(value, 0x2000);
}

#[test]
fn test_address_display_is_zero_padded()
{
    assert_eq!(Address::new(0x1020).to_string(), "0x0000000000001020");
    assert_eq!(format!("{:#x}", Address::new(0x1020)), "0x1020");
}

#[test]
fn test_address_saturating_add()
{
    assert_eq!(Address::new(0x1000).saturating_add(0x10), Address::new(0x1010));
    assert_eq!(Address::new(u64::MAX - 1).saturating_add(10), Address::new(u64::MAX));
}

#[test]
fn test_address_parse_bases()
{
    assert_eq!("0x401136".parse::<Address>().unwrap(), Address::new(0x401136));
    assert_eq!("0X1F".parse::<Address>().unwrap(), Address::new(0x1f));
    assert_eq!("0755".parse::<Address>().unwrap(), Address::new(0o755));
    assert_eq!("0".parse::<Address>().unwrap(), Address::new(0));
    assert_eq!("4198710".parse::<Address>().unwrap(), Address::new(4198710));
    assert!("0x".parse::<Address>().is_err());
    assert!("08".parse::<Address>().is_err());
}

#[test]
fn test_address_ordering()
{
    assert!(Address::new(0x1000) < Address::new(0x1001));
    assert_eq!(Address::default(), Address::new(0));
}

#[test]
fn test_range_contains_is_half_open()
{
    let range = AddressRange::new(0x3010, 0x3030);
    assert!(range.contains(Address::new(0x3010)));
    assert!(range.contains(Address::new(0x302f)));
    assert!(!range.contains(Address::new(0x3030)));
    assert_eq!(range.size(), 0x20);
    assert!(!range.is_empty());
}

#[test]
fn test_symbol_name_display_prefers_demangled()
{
    let name = SymbolName::new(
        "_ZN3app4main17h0123456789abcdefE".to_string(),
        Some("app::main::h0123456789abcdef".to_string()),
        SymbolLanguage::Rust,
    );
    assert_eq!(name.to_string(), "app::main::h0123456789abcdef");
    assert_eq!(name.raw(), "_ZN3app4main17h0123456789abcdefE");
    assert_eq!(name.language(), SymbolLanguage::Rust);
}

#[test]
fn test_symbol_name_without_demangling()
{
    let name = SymbolName::new("main".to_string(), None, SymbolLanguage::C);
    assert_eq!(name.display_name(), "main");
    assert_eq!(name.demangled(), None);
    assert_eq!(SymbolLanguage::Cpp.to_string(), "c++");
}

#[test]
fn test_architecture_from_object()
{
    assert_eq!(Architecture::from(object::Architecture::X86_64), Architecture::X86_64);
    assert_eq!(Architecture::from(object::Architecture::Aarch64).to_string(), "arm64");
}

#[test]
fn test_other_architecture_keeps_its_name()
{
    let arch = Architecture::from(object::Architecture::Mips64);
    assert_eq!(arch, Architecture::Other(object::Architecture::Mips64));
    assert_eq!(arch.to_string(), "mips64");
    assert_eq!(Architecture::from(object::Architecture::Riscv32).to_string(), "riscv32");
}
