//! gimli-backed [`UnitTree`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use gimli::{constants, Attribute, AttributeValue, EntriesRaw, Reader, Unit, UnitOffset};

use super::container::{OwnedDwarf, OwnedReader};
use super::{DieTag, HighPc, UnitTree};
use crate::error::{map_dwarf_error, PcfindError, PcfindResult};
use crate::types::AddressRange;

/// One DIE read in full: abbreviation plus every attribute value.
struct ParsedDie
{
    offset: UnitOffset,
    tag: gimli::DwTag,
    has_children: bool,
    attrs: Vec<Attribute<OwnedReader>>,
    /// Offset just past this entry's attributes; its first child when it
    /// has children.
    next: UnitOffset,
}

impl ParsedDie
{
    fn attr(&self, name: constants::DwAt) -> Option<&Attribute<OwnedReader>>
    {
        self.attrs.iter().find(|attr| attr.name() == name)
    }
}

/// One parsed compilation unit.
///
/// Owns the gimli `Unit` (abbreviations, line-program header, bases) and
/// borrows the container's `Dwarf` for string and range-list sections. DIE
/// handles are `UnitOffset`s into this unit; dropping the value is the only
/// release step.
///
/// The walker asks several questions about the same DIE in a row, so the
/// most recently parsed DIE is kept. Subtree end offsets are remembered once
/// known, which lets a sibling lookup hop over subtrees that were already
/// walked instead of parsing them again.
pub struct GimliUnit<'a>
{
    dwarf: &'a OwnedDwarf,
    unit: Unit<OwnedReader>,
    last: RefCell<Option<Rc<ParsedDie>>>,
    subtree_ends: RefCell<HashMap<UnitOffset, UnitOffset>>,
    #[cfg(test)]
    entries_read: std::cell::Cell<usize>,
}

impl<'a> GimliUnit<'a>
{
    pub(crate) fn new(dwarf: &'a OwnedDwarf, unit: Unit<OwnedReader>) -> Self
    {
        Self {
            dwarf,
            unit,
            last: RefCell::new(None),
            subtree_ends: RefCell::new(HashMap::new()),
            #[cfg(test)]
            entries_read: std::cell::Cell::new(0),
        }
    }

    fn raw_at(&self, offset: UnitOffset) -> PcfindResult<EntriesRaw<'_, '_, OwnedReader>>
    {
        self.unit
            .entries_raw(Some(offset))
            .map_err(|err| map_dwarf_error("positioning DIE reader", err))
    }

    fn parse(&self, offset: UnitOffset) -> PcfindResult<ParsedDie>
    {
        self.note_entry_read();

        let mut raw = self.raw_at(offset)?;
        let Some(abbrev) = raw
            .read_abbreviation()
            .map_err(|err| map_dwarf_error("reading DIE abbreviation", err))?
        else {
            return Err(PcfindError::MalformedUnit(format!("null entry at {offset:?} used as a DIE")));
        };

        let mut attrs = Vec::with_capacity(abbrev.attributes().len());
        for &spec in abbrev.attributes() {
            attrs.push(
                raw.read_attribute(spec)
                    .map_err(|err| map_dwarf_error("reading DIE attribute", err))?,
            );
        }

        Ok(ParsedDie {
            offset,
            tag: abbrev.tag(),
            has_children: abbrev.has_children(),
            attrs,
            next: raw.next_offset(),
        })
    }

    #[cfg(test)]
    fn note_entry_read(&self)
    {
        self.entries_read.set(self.entries_read.get() + 1);
    }

    #[cfg(not(test))]
    fn note_entry_read(&self) {}

    fn parsed(&self, die: UnitOffset) -> PcfindResult<Rc<ParsedDie>>
    {
        if let Some(hit) = self.last.borrow().as_ref().filter(|parsed| parsed.offset == die) {
            return Ok(Rc::clone(hit));
        }
        let parsed = Rc::new(self.parse(die)?);
        *self.last.borrow_mut() = Some(Rc::clone(&parsed));
        Ok(parsed)
    }

    fn attr_value(&self, die: UnitOffset, name: constants::DwAt) -> PcfindResult<Option<AttributeValue<OwnedReader>>>
    {
        Ok(self.parsed(die)?.attr(name).map(Attribute::value))
    }

    /// `offset` itself when a DIE starts there, `None` at a null entry or
    /// the end of the unit.
    fn die_starting_at(&self, offset: UnitOffset) -> PcfindResult<Option<UnitOffset>>
    {
        let mut raw = self.raw_at(offset)?;
        if raw.is_empty() {
            return Ok(None);
        }
        self.note_entry_read();
        let abbrev = raw
            .read_abbreviation()
            .map_err(|err| map_dwarf_error("reading DIE abbreviation", err))?;
        Ok(abbrev.map(|_| offset))
    }

    /// Offset just past `die` and all of its descendants.
    fn subtree_end(&self, die: UnitOffset) -> PcfindResult<UnitOffset>
    {
        if let Some(&end) = self.subtree_ends.borrow().get(&die) {
            return Ok(end);
        }
        let head = self.parsed(die)?;
        let end = if head.has_children {
            self.skip_child_list(head.next)?
        } else {
            head.next
        };
        self.subtree_ends.borrow_mut().insert(die, end);
        Ok(end)
    }

    /// Offset just past the null entry closing the child list at `start`.
    fn skip_child_list(&self, start: UnitOffset) -> PcfindResult<UnitOffset>
    {
        let mut raw = self.raw_at(start)?;
        let mut depth = 1usize;
        loop {
            // A truncated child list ends with the unit.
            if raw.is_empty() {
                return Ok(raw.next_offset());
            }
            let offset = raw.next_offset();
            let known_end = self.subtree_ends.borrow().get(&offset).copied();
            if let Some(end) = known_end {
                raw = self.raw_at(end)?;
                continue;
            }
            self.note_entry_read();
            match raw
                .read_abbreviation()
                .map_err(|err| map_dwarf_error("reading DIE abbreviation", err))?
            {
                None => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(raw.next_offset());
                    }
                }
                Some(abbrev) => {
                    raw.skip_attributes(abbrev.attributes())
                        .map_err(|err| map_dwarf_error("skipping DIE attributes", err))?;
                    if abbrev.has_children() {
                        depth += 1;
                    }
                }
            }
        }
    }

    fn string_attr(&self, offset: UnitOffset, name: constants::DwAt) -> PcfindResult<Option<String>>
    {
        self.attr_value(offset, name)?
            .map(|value| self.attr_to_string(value))
            .transpose()
    }

    fn attr_to_string(&self, value: AttributeValue<OwnedReader>) -> PcfindResult<String>
    {
        let reader = self
            .dwarf
            .attr_string(&self.unit, value)
            .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
        reader_to_string(&reader)
    }
}

fn reader_to_string(reader: &OwnedReader) -> PcfindResult<String>
{
    let owned = match reader.to_string() {
        Ok(cow) => cow.into_owned(),
        Err(_) => reader
            .to_string_lossy()
            .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
            .into_owned(),
    };
    Ok(owned)
}

fn join_path(base: Option<&str>, path: String) -> String
{
    match base {
        Some(base) if !base.is_empty() && !Path::new(&path).is_absolute() => {
            Path::new(base).join(&path).to_string_lossy().into_owned()
        }
        _ => path,
    }
}

impl UnitTree for GimliUnit<'_>
{
    type Die = UnitOffset;

    fn root(&self) -> PcfindResult<UnitOffset>
    {
        let mut raw = self
            .unit
            .entries_raw(None)
            .map_err(|err| map_dwarf_error("reading unit root", err))?;
        let offset = raw.next_offset();
        let missing = || {
            PcfindError::MalformedUnit(format!("unit at {:?} has no root DIE", self.unit.header.offset()))
        };
        if raw.is_empty() {
            return Err(missing());
        }
        match raw
            .read_abbreviation()
            .map_err(|err| map_dwarf_error("reading unit root", err))?
        {
            Some(_) => Ok(offset),
            None => Err(missing()),
        }
    }

    fn first_child(&self, die: UnitOffset) -> PcfindResult<Option<UnitOffset>>
    {
        let head = self.parsed(die)?;
        if !head.has_children {
            return Ok(None);
        }
        // A null entry right away means an empty child list.
        self.die_starting_at(head.next)
    }

    fn next_sibling(&self, die: UnitOffset) -> PcfindResult<Option<UnitOffset>>
    {
        let end = self.subtree_end(die)?;
        self.die_starting_at(end)
    }

    fn tag(&self, die: UnitOffset) -> PcfindResult<DieTag>
    {
        Ok(DieTag::from_dw(self.parsed(die)?.tag))
    }

    fn low_pc(&self, die: UnitOffset) -> PcfindResult<Option<u64>>
    {
        let Some(value) = self.attr_value(die, constants::DW_AT_low_pc)? else {
            return Ok(None);
        };
        self.dwarf
            .attr_address(&self.unit, value)
            .map_err(|err| map_dwarf_error("resolving DW_AT_low_pc", err))
    }

    fn high_pc(&self, die: UnitOffset) -> PcfindResult<Option<HighPc>>
    {
        let parsed = self.parsed(die)?;
        let Some(attr) = parsed.attr(constants::DW_AT_high_pc) else {
            return Ok(None);
        };

        match attr.value() {
            value @ (AttributeValue::Addr(_) | AttributeValue::DebugAddrIndex(_)) => Ok(self
                .dwarf
                .attr_address(&self.unit, value)
                .map_err(|err| map_dwarf_error("resolving DW_AT_high_pc", err))?
                .map(HighPc::Address)),
            _ => Ok(attr.udata_value().map(HighPc::Offset)),
        }
    }

    fn has_ranges(&self, die: UnitOffset) -> PcfindResult<bool>
    {
        Ok(self.parsed(die)?.attr(constants::DW_AT_ranges).is_some())
    }

    fn ranges(&self, die: UnitOffset) -> PcfindResult<Vec<AddressRange>>
    {
        let Some(value) = self.attr_value(die, constants::DW_AT_ranges)? else {
            return Ok(Vec::new());
        };

        // gimli applies DW_AT_rnglists_base / DW_AT_GNU_ranges_base from the unit.
        let Some(offset) = self
            .dwarf
            .attr_ranges_offset(&self.unit, value)
            .map_err(|err| map_dwarf_error("resolving DW_AT_ranges offset", err))?
        else {
            return Ok(Vec::new());
        };

        let mut iter = self
            .dwarf
            .ranges(&self.unit, offset)
            .map_err(|err| map_dwarf_error("opening range list", err))?;
        let mut ranges = Vec::new();
        while let Some(range) = iter
            .next()
            .map_err(|err| map_dwarf_error("reading range list entry", err))?
        {
            ranges.push(AddressRange::new(range.begin, range.end));
        }
        Ok(ranges)
    }

    fn name(&self, die: UnitOffset) -> PcfindResult<Option<String>>
    {
        self.string_attr(die, constants::DW_AT_name)
    }

    fn linkage_name(&self, die: UnitOffset) -> PcfindResult<Option<String>>
    {
        if let Some(name) = self.string_attr(die, constants::DW_AT_linkage_name)? {
            return Ok(Some(name));
        }
        self.string_attr(die, constants::DW_AT_MIPS_linkage_name)
    }

    fn origin(&self, die: UnitOffset) -> PcfindResult<Option<UnitOffset>>
    {
        let parsed = self.parsed(die)?;
        for name in [constants::DW_AT_specification, constants::DW_AT_abstract_origin] {
            match parsed.attr(name).map(Attribute::value) {
                Some(AttributeValue::UnitRef(offset)) => return Ok(Some(offset)),
                Some(AttributeValue::DebugInfoRef(offset)) => return Ok(offset.to_unit_offset(&self.unit.header)),
                _ => {}
            }
        }
        Ok(None)
    }

    fn comp_dir(&self) -> PcfindResult<Option<String>>
    {
        self.unit.comp_dir.as_ref().map(reader_to_string).transpose()
    }

    fn source_files(&self) -> PcfindResult<Vec<String>>
    {
        let Some(program) = self.unit.line_program.as_ref() else {
            return Ok(Vec::new());
        };
        let comp_dir = self.comp_dir()?;
        let header = program.header();

        let mut files = Vec::new();
        for file in header.file_names() {
            let name = self.attr_to_string(file.path_name())?;
            let directory = match file.directory(header) {
                Some(dir) => Some(join_path(comp_dir.as_deref(), self.attr_to_string(dir)?)),
                None => comp_dir.clone(),
            };
            files.push(join_path(directory.as_deref(), name));
        }
        Ok(files)
    }

    fn die_offset(&self, die: UnitOffset) -> Option<u64>
    {
        die.to_debug_info_offset(&self.unit.header)
            .map(|offset| offset.0 as u64)
    }
}
