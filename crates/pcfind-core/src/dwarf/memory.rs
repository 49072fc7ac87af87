//! In-memory debug source.
//!
//! [`MemorySource`] implements [`DebugSource`] over DIE trees described in
//! code. It exists for tests and for callers that synthesise debug info, and
//! it counts what the resolver does with it:
//!
//! - how many units were enumerated and how many are still alive
//! - how many times each unit's DIE tags were read (one per DIE visit)
//! - how many times children were requested per unit
//!
//! ## Example
//!
//! ```rust
//! use pcfind_core::dwarf::memory::{MemoryDie, MemorySource};
//! use pcfind_core::resolve::resolve_pc;
//! use pcfind_core::types::Address;
//!
//! let mut source = MemorySource::new();
//! source.add_unit(
//!     MemoryDie::compile_unit("a.c")
//!         .with_pc_range(0x1000, 0x2000)
//!         .with_child(MemoryDie::subprogram("foo").with_pc_range(0x1010, 0x1050)),
//! );
//!
//! let found = resolve_pc(&source, Address::new(0x1020)).unwrap().unwrap();
//! assert_eq!(found.subprogram.name.unwrap().raw(), "foo");
//! assert_eq!(source.live_units(), 0);
//! ```

use std::cell::{Cell, RefCell};

use super::{CompilationUnit, DebugSource, DieTag, HighPc, UnitHeaderInfo, UnitKind, UnitTree};
use crate::error::{PcfindError, PcfindResult};
use crate::types::AddressRange;

/// Description of one DIE and its subtree.
#[derive(Debug, Clone)]
pub struct MemoryDie
{
    tag: DieTag,
    low_pc: Option<u64>,
    high_pc: Option<HighPc>,
    ranges: Option<Vec<AddressRange>>,
    name: Option<String>,
    linkage_name: Option<String>,
    origin: Option<usize>,
    corrupt: bool,
    children: Vec<MemoryDie>,
}

impl MemoryDie
{
    pub fn new(tag: DieTag) -> Self
    {
        Self {
            tag,
            low_pc: None,
            high_pc: None,
            ranges: None,
            name: None,
            linkage_name: None,
            origin: None,
            corrupt: false,
            children: Vec::new(),
        }
    }

    pub fn compile_unit(name: &str) -> Self
    {
        Self::new(DieTag::CompileUnit).with_name(name)
    }

    pub fn subprogram(name: &str) -> Self
    {
        Self::new(DieTag::Subprogram).with_name(name)
    }

    /// A subprogram without `DW_AT_name`.
    pub fn anonymous_subprogram() -> Self
    {
        Self::new(DieTag::Subprogram)
    }

    pub fn with_name(mut self, name: &str) -> Self
    {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_linkage_name(mut self, name: &str) -> Self
    {
        self.linkage_name = Some(name.to_string());
        self
    }

    pub fn with_low_pc(mut self, low: u64) -> Self
    {
        self.low_pc = Some(low);
        self
    }

    pub fn with_high_pc(mut self, high: HighPc) -> Self
    {
        self.high_pc = Some(high);
        self
    }

    /// `low_pc` plus an address-class `high_pc`.
    pub fn with_pc_range(self, low: u64, high: u64) -> Self
    {
        self.with_low_pc(low).with_high_pc(HighPc::Address(high))
    }

    pub fn with_ranges(mut self, ranges: &[(u64, u64)]) -> Self
    {
        self.ranges = Some(ranges.iter().map(|&(low, high)| AddressRange::new(low, high)).collect());
        self
    }

    /// Point `DW_AT_specification` at the DIE with pre-order index `index`
    /// within the same unit (the unit root is index 0).
    pub fn with_origin(mut self, index: usize) -> Self
    {
        self.origin = Some(index);
        self
    }

    /// Make every read of this DIE's tag fail.
    pub fn corrupt(mut self) -> Self
    {
        self.corrupt = true;
        self
    }

    pub fn with_child(mut self, child: MemoryDie) -> Self
    {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = MemoryDie>) -> Self
    {
        self.children.extend(children);
        self
    }

    fn without_children(&self) -> Self
    {
        Self {
            tag: self.tag,
            low_pc: self.low_pc,
            high_pc: self.high_pc,
            ranges: self.ranges.clone(),
            name: self.name.clone(),
            linkage_name: self.linkage_name.clone(),
            origin: self.origin,
            corrupt: self.corrupt,
            children: Vec::new(),
        }
    }
}

struct Node
{
    die: MemoryDie,
    first_child: Option<usize>,
    next_sibling: Option<usize>,
}

/// Flatten a tree into pre-order nodes with child/sibling links.
fn flatten(root: &MemoryDie) -> Vec<Node>
{
    fn push(nodes: &mut Vec<Node>, die: &MemoryDie) -> usize
    {
        let index = nodes.len();
        nodes.push(Node {
            die: die.without_children(),
            first_child: None,
            next_sibling: None,
        });

        let mut previous: Option<usize> = None;
        for child in &die.children {
            let child_index = push(nodes, child);
            match previous {
                Some(prev) => nodes[prev].next_sibling = Some(child_index),
                None => nodes[index].first_child = Some(child_index),
            }
            previous = Some(child_index);
        }
        index
    }

    let mut nodes = Vec::new();
    push(&mut nodes, root);
    nodes
}

/// A debug container held entirely in memory.
#[derive(Default)]
pub struct MemorySource
{
    units: Vec<MemoryDie>,
    fail_at_unit: Option<usize>,
    units_enumerated: Cell<usize>,
    live_units: Cell<usize>,
    tag_reads: RefCell<Vec<usize>>,
    child_reads: RefCell<Vec<usize>>,
}

impl MemorySource
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Append a unit whose root DIE is `root`. Returns the unit index.
    pub fn add_unit(&mut self, root: MemoryDie) -> usize
    {
        self.units.push(root);
        self.tag_reads.borrow_mut().push(0);
        self.child_reads.borrow_mut().push(0);
        self.units.len() - 1
    }

    /// Report a fatal read error instead of the unit at `index`.
    pub fn fail_at_unit(&mut self, index: usize)
    {
        self.fail_at_unit = Some(index);
    }

    /// Units handed out over the source's lifetime.
    pub fn units_enumerated(&self) -> usize
    {
        self.units_enumerated.get()
    }

    /// Units handed out and not yet dropped.
    pub fn live_units(&self) -> usize
    {
        self.live_units.get()
    }

    /// DIE tag reads for unit `index` (each DIE visit reads the tag once).
    pub fn tag_reads(&self, index: usize) -> usize
    {
        self.tag_reads.borrow().get(index).copied().unwrap_or(0)
    }

    /// `first_child` calls for unit `index`.
    pub fn child_reads(&self, index: usize) -> usize
    {
        self.child_reads.borrow().get(index).copied().unwrap_or(0)
    }

    pub fn reset_counters(&self)
    {
        self.units_enumerated.set(0);
        self.tag_reads.borrow_mut().iter_mut().for_each(|count| *count = 0);
        self.child_reads.borrow_mut().iter_mut().for_each(|count| *count = 0);
    }
}

impl DebugSource for MemorySource
{
    type Unit<'a>
        = MemoryUnit<'a>
    where
        Self: 'a;
    type Units<'a>
        = MemoryUnits<'a>
    where
        Self: 'a;

    fn units(&self) -> MemoryUnits<'_>
    {
        MemoryUnits {
            source: self,
            next: 0,
            failed: false,
        }
    }
}

/// Enumerator over a [`MemorySource`].
pub struct MemoryUnits<'a>
{
    source: &'a MemorySource,
    next: usize,
    failed: bool,
}

impl<'a> Iterator for MemoryUnits<'a>
{
    type Item = PcfindResult<CompilationUnit<MemoryUnit<'a>>>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.failed {
            return None;
        }
        let index = self.next;
        if self.source.fail_at_unit == Some(index) {
            self.failed = true;
            return Some(Err(PcfindError::MalformedUnit(format!("unit {index} header is unreadable"))));
        }
        let root = self.source.units.get(index)?;
        self.next += 1;

        self.source.units_enumerated.set(self.source.units_enumerated.get() + 1);
        self.source.live_units.set(self.source.live_units.get() + 1);

        Some(Ok(CompilationUnit {
            header: UnitHeaderInfo {
                index,
                offset: Some(MemoryUnit::base_offset(index)),
                version: 4,
                offset_size: 4,
                address_size: 8,
                abbrev_offset: 0,
                kind: UnitKind::Compile,
            },
            tree: MemoryUnit {
                source: self.source,
                index,
                nodes: flatten(root),
            },
        }))
    }
}

/// One unit of a [`MemorySource`]. DIE handles are pre-order indices.
pub struct MemoryUnit<'a>
{
    source: &'a MemorySource,
    index: usize,
    nodes: Vec<Node>,
}

impl MemoryUnit<'_>
{
    fn base_offset(index: usize) -> u64
    {
        (index as u64) << 32
    }

    fn node(&self, die: usize) -> PcfindResult<&Node>
    {
        self.nodes
            .get(die)
            .ok_or_else(|| PcfindError::MalformedUnit(format!("unit {} has no DIE {die}", self.index)))
    }

    fn bump(counters: &RefCell<Vec<usize>>, index: usize)
    {
        if let Some(count) = counters.borrow_mut().get_mut(index) {
            *count += 1;
        }
    }
}

impl Drop for MemoryUnit<'_>
{
    fn drop(&mut self)
    {
        self.source.live_units.set(self.source.live_units.get().saturating_sub(1));
    }
}

impl UnitTree for MemoryUnit<'_>
{
    type Die = usize;

    fn root(&self) -> PcfindResult<usize>
    {
        self.node(0).map(|_| 0)
    }

    fn first_child(&self, die: usize) -> PcfindResult<Option<usize>>
    {
        Self::bump(&self.source.child_reads, self.index);
        Ok(self.node(die)?.first_child)
    }

    fn next_sibling(&self, die: usize) -> PcfindResult<Option<usize>>
    {
        Ok(self.node(die)?.next_sibling)
    }

    fn tag(&self, die: usize) -> PcfindResult<DieTag>
    {
        Self::bump(&self.source.tag_reads, self.index);
        let node = self.node(die)?;
        if node.die.corrupt {
            return Err(PcfindError::MalformedUnit(format!("unit {} DIE {die} is unreadable", self.index)));
        }
        Ok(node.die.tag)
    }

    fn low_pc(&self, die: usize) -> PcfindResult<Option<u64>>
    {
        Ok(self.node(die)?.die.low_pc)
    }

    fn high_pc(&self, die: usize) -> PcfindResult<Option<HighPc>>
    {
        Ok(self.node(die)?.die.high_pc)
    }

    fn has_ranges(&self, die: usize) -> PcfindResult<bool>
    {
        Ok(self.node(die)?.die.ranges.is_some())
    }

    fn ranges(&self, die: usize) -> PcfindResult<Vec<AddressRange>>
    {
        Ok(self.node(die)?.die.ranges.clone().unwrap_or_default())
    }

    fn name(&self, die: usize) -> PcfindResult<Option<String>>
    {
        Ok(self.node(die)?.die.name.clone())
    }

    fn linkage_name(&self, die: usize) -> PcfindResult<Option<String>>
    {
        Ok(self.node(die)?.die.linkage_name.clone())
    }

    fn origin(&self, die: usize) -> PcfindResult<Option<usize>>
    {
        Ok(self.node(die)?.die.origin)
    }

    fn comp_dir(&self) -> PcfindResult<Option<String>>
    {
        Ok(None)
    }

    fn source_files(&self) -> PcfindResult<Vec<String>>
    {
        Ok(self.nodes.first().and_then(|root| root.die.name.clone()).into_iter().collect())
    }

    fn die_offset(&self, die: usize) -> Option<u64>
    {
        (die < self.nodes.len()).then(|| Self::base_offset(self.index) + die as u64)
    }
}
