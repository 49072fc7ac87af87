//! Per-DIE classification.
//!
//! Looks at one DIE's tag and, for unit roots and subprograms, its address
//! extent, and tells the walker what to do next.

use tracing::{trace, warn};

use super::range::{resolve_extent, DieExtent};
use super::state::TargetState;
use super::{ResolveOptions, Subprogram};
use crate::dwarf::demangle::{make_symbol_name, plain_symbol_name};
use crate::dwarf::{DieTag, UnitTree};
use crate::error::PcfindResult;
use crate::types::SymbolName;

/// How many `DW_AT_specification` / `DW_AT_abstract_origin` hops to follow
/// when looking for a subprogram's name.
const MAX_ORIGIN_DEPTH: usize = 8;

/// Outcome of classifying a single DIE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Classification
{
    /// Nothing decided here; visit children and siblings.
    Continue,
    /// The unit cannot contain the target, or is malformed. Skip it.
    NotThisUnit,
    /// The unit root covers the target (or says nothing); descend.
    InThisUnit,
    /// A subprogram containing the target was recorded in the state.
    FoundSubprogram,
}

pub(crate) fn classify<U: UnitTree>(
    tree: &U,
    die: U::Die,
    level: usize,
    state: &mut TargetState,
    options: &ResolveOptions,
) -> PcfindResult<Classification>
{
    let tag = tree.tag(die)?;
    match tag {
        DieTag::Subprogram => check_subprogram(tree, die, state, options),
        tag if tag.is_unit_root() => {
            if level != 0 {
                warn!(?tag, level, "unit DIE nested inside a unit, skipping unit");
                return Ok(Classification::NotThisUnit);
            }
            check_unit_root(tree, die, state)
        }
        _ => Ok(Classification::Continue),
    }
}

fn check_unit_root<U: UnitTree>(tree: &U, die: U::Die, state: &mut TargetState) -> PcfindResult<Classification>
{
    let target = state.target();
    let extent = resolve_extent(tree, die)?;
    let covering = extent.covering(target);

    if extent.is_known() && covering.is_none() {
        trace!(%target, ?extent, "unit does not cover target");
        return Ok(Classification::NotThisUnit);
    }

    let name = tree.name(die).unwrap_or_else(|err| {
        warn!(%err, "failed to read unit name");
        None
    });
    let comp_dir = tree.comp_dir().unwrap_or_else(|err| {
        warn!(%err, "failed to read unit comp_dir");
        None
    });
    let range = match extent {
        DieExtent::Direct(range) => Some(range),
        _ => covering,
    };
    trace!(name = name.as_deref().unwrap_or("<unnamed>"), ?range, "entering unit");
    state.record_unit_root(name, comp_dir, range);

    Ok(Classification::InThisUnit)
}

fn check_subprogram<U: UnitTree>(
    tree: &U,
    die: U::Die,
    state: &mut TargetState,
    options: &ResolveOptions,
) -> PcfindResult<Classification>
{
    let extent = resolve_extent(tree, die)?;
    let Some(range) = extent.covering(state.target()) else {
        return Ok(Classification::Continue);
    };

    let name = subprogram_name(tree, die, options).unwrap_or_else(|err| {
        warn!(%err, "failed to read subprogram name");
        None
    });
    trace!(name = name.as_ref().map_or("<unnamed>", SymbolName::raw), %range, "found subprogram");

    state.record_subprogram(Subprogram {
        name,
        range,
        die_offset: tree.die_offset(die),
    });
    Ok(Classification::FoundSubprogram)
}

/// Name of a subprogram DIE.
///
/// Each DIE on the origin chain is asked for `DW_AT_name` first and its
/// linkage name second. Out-of-line definitions usually carry neither and
/// point at their declaration instead.
fn subprogram_name<U: UnitTree>(tree: &U, die: U::Die, options: &ResolveOptions) -> PcfindResult<Option<SymbolName>>
{
    let mut current = die;
    for _ in 0..=MAX_ORIGIN_DEPTH {
        let raw = match tree.name(current)? {
            Some(name) => Some(name),
            None => tree.linkage_name(current)?,
        };
        if let Some(raw) = raw {
            let symbol = if options.demangle {
                make_symbol_name(raw)
            } else {
                plain_symbol_name(raw)
            };
            return Ok(Some(symbol));
        }

        match tree.origin(current)? {
            Some(next) if next != current => current = next,
            _ => break,
        }
    }
    Ok(None)
}
