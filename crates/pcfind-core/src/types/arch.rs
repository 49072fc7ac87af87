//! Object file architecture.

use std::fmt;

/// CPU architecture recorded in the object file header
///
/// Only used for reporting; address resolution itself is architecture
/// independent because DWARF ranges are plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture
{
    /// 64-bit ARM
    Arm64,
    /// 32-bit ARM
    Arm,
    /// 64-bit x86 (Intel/AMD)
    X86_64,
    /// 32-bit x86
    X86,
    /// 64-bit RISC-V
    RiscV64,
    /// Any other architecture `object` recognises, or
    /// `object::Architecture::Unknown`
    Other(object::Architecture),
}

impl From<object::Architecture> for Architecture
{
    fn from(arch: object::Architecture) -> Self
    {
        match arch {
            object::Architecture::Aarch64 => Architecture::Arm64,
            object::Architecture::Arm => Architecture::Arm,
            object::Architecture::X86_64 => Architecture::X86_64,
            object::Architecture::I386 => Architecture::X86,
            object::Architecture::Riscv64 => Architecture::RiscV64,
            other => Architecture::Other(other),
        }
    }
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::Arm => write!(f, "arm"),
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::X86 => write!(f, "x86"),
            Architecture::RiscV64 => write!(f, "riscv64"),
            Architecture::Other(arch) => write!(f, "{}", format!("{arch:?}").to_lowercase()),
        }
    }
}
