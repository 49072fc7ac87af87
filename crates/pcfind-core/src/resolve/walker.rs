//! Depth-first walk over one unit's DIE tree.
//!
//! Pre-order, children before following siblings, in document order. The
//! ancestor chain lives in an explicit stack so tree depth never turns into
//! call-stack depth. Siblings of the unit root are never visited.

use smallvec::SmallVec;
use tracing::debug;

use super::classify::{classify, Classification};
use super::state::TargetState;
use super::{ResolveOptions, WalkStats};
use crate::dwarf::UnitTree;
use crate::error::PcfindResult;

/// How a unit walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WalkOutcome
{
    /// Every DIE was visited without a match.
    Exhausted,
    /// The unit was rejected by a classification.
    NotThisUnit,
    /// A subprogram was recorded in the state.
    Found,
}

pub(crate) fn walk_unit<U: UnitTree>(
    tree: &U,
    state: &mut TargetState,
    options: &ResolveOptions,
    stats: &mut WalkStats,
) -> PcfindResult<WalkOutcome>
{
    let mut ancestors: SmallVec<[U::Die; 32]> = SmallVec::new();
    let mut current = Some(tree.root()?);

    while let Some(die) = current {
        stats.dies_visited += 1;
        match classify(tree, die, ancestors.len(), state, options)? {
            Classification::FoundSubprogram => return Ok(WalkOutcome::Found),
            Classification::NotThisUnit => {
                debug!(level = ancestors.len(), "unit rejected");
                return Ok(WalkOutcome::NotThisUnit);
            }
            Classification::Continue | Classification::InThisUnit => {}
        }

        if let Some(child) = tree.first_child(die)? {
            ancestors.push(die);
            current = Some(child);
        } else {
            current = next_in_preorder(tree, die, &mut ancestors)?;
        }
    }

    Ok(WalkOutcome::Exhausted)
}

/// The DIE visited after `die` once its subtree is done: its next sibling,
/// or the next sibling of the nearest ancestor that has one.
fn next_in_preorder<U: UnitTree>(
    tree: &U,
    mut die: U::Die,
    ancestors: &mut SmallVec<[U::Die; 32]>,
) -> PcfindResult<Option<U::Die>>
{
    // An empty stack means `die` is the unit root.
    while !ancestors.is_empty() {
        if let Some(sibling) = tree.next_sibling(die)? {
            return Ok(Some(sibling));
        }
        match ancestors.pop() {
            Some(parent) => die = parent,
            None => break,
        }
    }
    Ok(None)
}
