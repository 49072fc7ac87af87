//! Object file loading and DWARF section access.

use std::borrow::Cow;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gimli::{DebugInfoOffset, Dwarf, EndianArcSlice, RunTimeEndian, SectionId, UnitHeader, UnitType};
use object::{Object, ObjectSection};
use once_cell::sync::OnceCell;
use tracing::debug;

use super::unit::GimliUnit;
use super::{CompilationUnit, DebugSource, UnitHeaderInfo, UnitKind, UnitTree};
use crate::error::{map_dwarf_error, PcfindError, PcfindResult};
use crate::types::Architecture;

pub(crate) type OwnedReader = EndianArcSlice<RunTimeEndian>;
pub(crate) type OwnedDwarf = Dwarf<OwnedReader>;

/// Sections the resolver reads, with their ELF and Mach-O spellings.
const DWARF_SECTIONS: &[(SectionId, &[&str])] = &[
    (SectionId::DebugAbbrev, &[".debug_abbrev", "__debug_abbrev"]),
    (SectionId::DebugAddr, &[".debug_addr", "__debug_addr"]),
    (SectionId::DebugInfo, &[".debug_info", "__debug_info"]),
    (SectionId::DebugLine, &[".debug_line", "__debug_line"]),
    (SectionId::DebugLineStr, &[".debug_line_str", "__debug_line_str"]),
    (SectionId::DebugRanges, &[".debug_ranges", "__debug_ranges"]),
    (SectionId::DebugRngLists, &[".debug_rnglists", "__debug_rnglists"]),
    (SectionId::DebugStr, &[".debug_str", "__debug_str"]),
    (SectionId::DebugStrOffsets, &[".debug_str_offsets", "__debug_str_offsets"]),
    (SectionId::DebugTypes, &[".debug_types", "__debug_types"]),
];

fn load_section_bytes<'data>(file: &object::File<'data>, names: &[&str]) -> PcfindResult<Option<Arc<[u8]>>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section.uncompressed_data().map_err(|err| PcfindError::Section {
                name: (*name).to_string(),
                message: err.to_string(),
            })?;
            return Ok(Some(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes),
                Cow::Owned(vec) => vec.into(),
            }));
        }
    }

    Ok(None)
}

/// An open debug container: object file plus its DWARF sections
///
/// Section data is copied into shared buffers at open time, so the container
/// does not keep the file open. The gimli `Dwarf` view is built on first use
/// and reused by every resolution.
///
/// Dropping the container releases everything.
pub struct DebugContainer
{
    path: Option<PathBuf>,
    architecture: Option<Architecture>,
    endian: RunTimeEndian,
    debug_sections: HashMap<SectionId, Arc<[u8]>>,
    dwarf_cache: OnceCell<OwnedDwarf>,
}

impl DebugContainer
{
    /// Open an object file and load its DWARF sections.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - `object` does not recognise the file format
    /// - A debug section cannot be decompressed
    /// - The file has no `.debug_info` data
    pub fn open(path: impl AsRef<Path>) -> PcfindResult<Self>
    {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let file = object::File::parse(&*bytes).map_err(|err| PcfindError::ObjectParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let mut sections = HashMap::new();
        for (id, aliases) in DWARF_SECTIONS {
            if let Some(data) = load_section_bytes(&file, aliases)? {
                sections.insert(*id, data);
            }
        }

        let container = Self {
            path: Some(path.to_path_buf()),
            architecture: Some(Architecture::from(file.architecture())),
            endian,
            debug_sections: sections,
            dwarf_cache: OnceCell::new(),
        };

        if !container.has_debug_info() {
            return Err(PcfindError::MissingDebugInfo(path.to_path_buf()));
        }

        debug!(
            path = %path.display(),
            sections = container.debug_sections.len(),
            "opened debug container"
        );
        Ok(container)
    }

    /// Build a container from in-memory section data.
    ///
    /// Sections not supplied read as empty.
    pub fn from_sections<I, D>(endian: RunTimeEndian, sections: I) -> Self
    where
        I: IntoIterator<Item = (SectionId, D)>,
        D: Into<Arc<[u8]>>,
    {
        Self {
            path: None,
            architecture: None,
            endian,
            debug_sections: sections.into_iter().map(|(id, data)| (id, data.into())).collect(),
            dwarf_cache: OnceCell::new(),
        }
    }

    pub fn path(&self) -> Option<&Path>
    {
        self.path.as_deref()
    }

    pub fn architecture(&self) -> Option<Architecture>
    {
        self.architecture
    }

    pub fn endian(&self) -> RunTimeEndian
    {
        self.endian
    }

    pub fn has_debug_info(&self) -> bool
    {
        self.debug_sections
            .get(&SectionId::DebugInfo)
            .is_some_and(|data| !data.is_empty())
    }

    /// Re-read the name of the DIE at `die_offset` in `.debug_info`.
    ///
    /// Falls back to the linkage name. Returns `Ok(None)` when no unit
    /// contains the offset or the DIE has no name.
    pub fn entry_name(&self, die_offset: u64) -> PcfindResult<Option<String>>
    {
        let Ok(target) = usize::try_from(die_offset).map(DebugInfoOffset) else {
            return Ok(None);
        };

        let dwarf = self.dwarf();
        let mut headers = dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|err| map_dwarf_error("reading unit header", err))?
        {
            let Some(unit_offset) = target.to_unit_offset(&header) else {
                continue;
            };
            let unit = dwarf
                .unit(header)
                .map_err(|err| map_dwarf_error("parsing compilation unit", err))?;
            let tree = GimliUnit::new(dwarf, unit);
            if let Some(name) = tree.name(unit_offset)? {
                return Ok(Some(name));
            }
            return tree.linkage_name(unit_offset);
        }
        Ok(None)
    }

    fn dwarf(&self) -> &OwnedDwarf
    {
        self.dwarf_cache.get_or_init(|| {
            Dwarf::load(|section| Ok::<_, Infallible>(self.section_reader(section)))
                .unwrap_or_else(|never| match never {})
        })
    }

    fn section_reader(&self, id: SectionId) -> OwnedReader
    {
        let data = self
            .debug_sections
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, self.endian)
    }
}

impl DebugSource for DebugContainer
{
    type Unit<'a>
        = GimliUnit<'a>
    where
        Self: 'a;
    type Units<'a>
        = GimliUnits<'a>
    where
        Self: 'a;

    fn units(&self) -> GimliUnits<'_>
    {
        let dwarf = self.dwarf();
        GimliUnits {
            dwarf,
            headers: Some(dwarf.units()),
            index: 0,
        }
    }
}

/// Enumerator over the `.debug_info` units of a [`DebugContainer`].
///
/// Fused: after the last unit, or after the first error, it yields `None`.
pub struct GimliUnits<'a>
{
    dwarf: &'a OwnedDwarf,
    headers: Option<gimli::DebugInfoUnitHeadersIter<OwnedReader>>,
    index: usize,
}

impl<'a> Iterator for GimliUnits<'a>
{
    type Item = PcfindResult<CompilationUnit<GimliUnit<'a>>>;

    fn next(&mut self) -> Option<Self::Item>
    {
        let headers = self.headers.as_mut()?;
        let header = match headers.next() {
            Ok(Some(header)) => header,
            Ok(None) => {
                self.headers = None;
                return None;
            }
            Err(err) => {
                self.headers = None;
                return Some(Err(map_dwarf_error("reading unit header", err)));
            }
        };

        let info = header_info(self.index, &header);
        self.index += 1;

        match self.dwarf.unit(header) {
            Ok(unit) => Some(Ok(CompilationUnit {
                header: info,
                tree: GimliUnit::new(self.dwarf, unit),
            })),
            Err(err) => {
                self.headers = None;
                Some(Err(map_dwarf_error("parsing compilation unit", err)))
            }
        }
    }
}

fn header_info(index: usize, header: &UnitHeader<OwnedReader>) -> UnitHeaderInfo
{
    let kind = match header.type_() {
        UnitType::Compilation => UnitKind::Compile,
        UnitType::Partial => UnitKind::Partial,
        UnitType::Type { .. } => UnitKind::Type,
        UnitType::Skeleton(_) => UnitKind::Skeleton,
        UnitType::SplitCompilation(_) => UnitKind::SplitCompile,
        UnitType::SplitType { .. } => UnitKind::SplitType,
    };

    UnitHeaderInfo {
        index,
        offset: header.offset().as_debug_info_offset().map(|offset| offset.0 as u64),
        version: header.version(),
        offset_size: header.format().word_size(),
        address_size: header.address_size(),
        abbrev_offset: header.debug_abbrev_offset().0 as u64,
        kind,
    }
}
