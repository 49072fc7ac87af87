//! Per-run resolution state.
//!
//! One [`TargetState`] lives for a whole resolution. It holds the target
//! address for the run, a record for the unit currently being walked, and
//! the winning subprogram once one is found.
//!
//! Everything here is owned data copied out of the unit being walked, never
//! a handle into it. That is what lets the walker drop each unit (and all of
//! its DIEs) as soon as it moves on, while the answer survives.

use once_cell::unsync::OnceCell;
use tracing::warn;

use super::{PcMatch, Subprogram, UnitIdentity};
use crate::dwarf::{UnitHeaderInfo, UnitTree};
use crate::types::{Address, AddressRange};

/// What is known about the unit currently being walked.
#[derive(Debug)]
pub(crate) struct UnitRecord
{
    header: UnitHeaderInfo,
    name: Option<String>,
    comp_dir: Option<String>,
    range: Option<AddressRange>,
    source_files: OnceCell<Vec<String>>,
}

#[derive(Debug)]
pub(crate) struct TargetState
{
    target: Address,
    unit: Option<UnitRecord>,
    subprogram: Option<Subprogram>,
}

impl TargetState
{
    pub(crate) fn new(target: Address) -> Self
    {
        Self {
            target,
            unit: None,
            subprogram: None,
        }
    }

    pub(crate) fn target(&self) -> Address
    {
        self.target
    }

    /// Forget everything about the previous unit.
    ///
    /// Called before every unit and once more after the last one.
    pub(crate) fn reset_unit(&mut self)
    {
        self.unit = None;
        self.subprogram = None;
    }

    pub(crate) fn begin_unit(&mut self, header: UnitHeaderInfo)
    {
        self.reset_unit();
        self.unit = Some(UnitRecord {
            header,
            name: None,
            comp_dir: None,
            range: None,
            source_files: OnceCell::new(),
        });
    }

    /// Record what the unit root DIE says about the unit.
    pub(crate) fn record_unit_root(&mut self, name: Option<String>, comp_dir: Option<String>, range: Option<AddressRange>)
    {
        if let Some(unit) = self.unit.as_mut() {
            unit.name = name;
            unit.comp_dir = comp_dir;
            unit.range = range;
        }
    }

    pub(crate) fn record_subprogram(&mut self, subprogram: Subprogram)
    {
        self.subprogram = Some(subprogram);
    }

    pub(crate) fn subprogram(&self) -> Option<&Subprogram>
    {
        self.subprogram.as_ref()
    }

    /// Source files of the current unit, read from `tree` on first use.
    ///
    /// Best effort: a line-program read failure is logged and yields an
    /// empty list rather than discarding a match.
    pub(crate) fn source_files<U: UnitTree>(&self, tree: &U) -> &[String]
    {
        let Some(unit) = self.unit.as_ref() else {
            return &[];
        };
        unit.source_files.get_or_init(|| {
            tree.source_files().unwrap_or_else(|err| {
                warn!(unit = unit.header.index, %err, "failed to read source file list");
                Vec::new()
            })
        })
    }

    /// Move the answer out, leaving the state reset.
    ///
    /// `None` unless a subprogram was recorded for the current unit.
    pub(crate) fn take_match(&mut self) -> Option<PcMatch>
    {
        let subprogram = self.subprogram.take()?;
        let unit = self.unit.take()?;

        Some(PcMatch {
            target: self.target,
            unit: UnitIdentity {
                index: unit.header.index,
                offset: unit.header.offset,
                version: unit.header.version,
                kind: unit.header.kind,
                name: unit.name,
                comp_dir: unit.comp_dir,
                range: unit.range,
            },
            subprogram,
            source_files: unit.source_files.into_inner().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::dwarf::UnitKind;

    fn header(index: usize) -> UnitHeaderInfo
    {
        UnitHeaderInfo {
            index,
            offset: Some(index as u64 * 0x100),
            version: 5,
            offset_size: 4,
            address_size: 8,
            abbrev_offset: 0,
            kind: UnitKind::Compile,
        }
    }

    fn subprogram(name: &str) -> Subprogram
    {
        Subprogram {
            name: Some(crate::dwarf::demangle::plain_symbol_name(name.to_string())),
            range: AddressRange::new(0x10, 0x20),
            die_offset: Some(0x2a),
        }
    }

    #[test]
    fn test_reset_drops_unit_and_subprogram()
    {
        let mut state = TargetState::new(Address::new(0x18));
        state.begin_unit(header(0));
        state.record_subprogram(subprogram("f"));
        assert!(state.subprogram().is_some());

        state.reset_unit();
        assert!(state.subprogram().is_none());
        assert!(state.take_match().is_none());
        assert_eq!(state.target(), Address::new(0x18));
    }

    #[test]
    fn test_begin_unit_discards_previous_match()
    {
        let mut state = TargetState::new(Address::new(0x18));
        state.begin_unit(header(0));
        state.record_subprogram(subprogram("f"));
        state.begin_unit(header(1));
        assert!(state.take_match().is_none());
    }

    #[test]
    fn test_take_match_copies_unit_identity()
    {
        let mut state = TargetState::new(Address::new(0x18));
        state.begin_unit(header(3));
        state.record_unit_root(Some("a.c".to_string()), Some("/src".to_string()), None);
        state.record_subprogram(subprogram("f"));

        let found = state.take_match().unwrap();
        assert_eq!(found.target, Address::new(0x18));
        assert_eq!(found.unit.index, 3);
        assert_eq!(found.unit.offset, Some(0x300));
        assert_eq!(found.unit.name.as_deref(), Some("a.c"));
        assert_eq!(found.unit.comp_dir.as_deref(), Some("/src"));
        assert_eq!(found.subprogram.range, AddressRange::new(0x10, 0x20));
        assert!(found.source_files.is_empty());

        // Taking twice yields nothing.
        assert!(state.take_match().is_none());
    }
}
