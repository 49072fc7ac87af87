//! Tests for PC resolution against in-memory debug info

use pcfind_core::dwarf::memory::{MemoryDie, MemorySource};
use pcfind_core::dwarf::{DieTag, HighPc};
use pcfind_core::error::PcfindError;
use pcfind_core::resolve::{resolve_pc, PcResolver, ResolveOptions};
use pcfind_core::types::{Address, AddressRange};

/// CU0 `[0x1000, 0x2000)` with `foo` at `[0x1010, 0x1050)`,
/// CU1 `[0x3000, 0x4000)` with `bar` at `[0x3010, 0x3030)`.
fn two_units() -> MemorySource
{
    let mut source = MemorySource::new();
    source.add_unit(
        MemoryDie::compile_unit("a.c")
            .with_pc_range(0x1000, 0x2000)
            .with_children([
                MemoryDie::new(DieTag::Other(0x24)).with_name("int"),
                MemoryDie::subprogram("foo")
                    .with_pc_range(0x1010, 0x1050)
                    .with_child(MemoryDie::new(DieTag::Other(0x05)).with_name("argc")),
            ]),
    );
    source.add_unit(
        MemoryDie::compile_unit("b.c")
            .with_pc_range(0x3000, 0x4000)
            .with_child(MemoryDie::subprogram("bar").with_pc_range(0x3010, 0x3030)),
    );
    source
}

fn name_at(source: &MemorySource, pc: u64) -> Option<String>
{
    resolve_pc(source, Address::new(pc))
        .unwrap()
        .and_then(|found| found.subprogram.name)
        .map(|name| name.raw().to_string())
}

#[test]
fn test_two_unit_scenario()
{
    let source = two_units();

    assert_eq!(name_at(&source, 0x1020).as_deref(), Some("foo"));
    assert_eq!(name_at(&source, 0x3020).as_deref(), Some("bar"));
    assert_eq!(name_at(&source, 0x2500), None);
    assert_eq!(name_at(&source, 0x1050), None);
}

#[test]
fn test_match_reports_unit_and_range()
{
    let source = two_units();
    let found = resolve_pc(&source, Address::new(0x3020)).unwrap().unwrap();

    assert_eq!(found.target, Address::new(0x3020));
    assert_eq!(found.unit.index, 1);
    assert_eq!(found.unit.name.as_deref(), Some("b.c"));
    assert_eq!(found.unit.range, Some(AddressRange::new(0x3000, 0x4000)));
    assert_eq!(found.subprogram.range, AddressRange::new(0x3010, 0x3030));
    assert!(found.source_files.is_empty());
}

#[test]
fn test_half_open_boundaries()
{
    let source = two_units();

    assert_eq!(name_at(&source, 0x1010).as_deref(), Some("foo"));
    assert_eq!(name_at(&source, 0x104f).as_deref(), Some("foo"));
    assert_eq!(name_at(&source, 0x1050), None);
    assert_eq!(name_at(&source, 0x3030), None);
}

#[test]
fn test_ranges_list_subprogram()
{
    let mut source = MemorySource::new();
    source.add_unit(MemoryDie::compile_unit("r.c").with_child(MemoryDie::subprogram("split").with_ranges(&[(0x500, 0x600)])));

    let found = resolve_pc(&source, Address::new(0x550)).unwrap().unwrap();
    assert_eq!(found.subprogram.name.unwrap().raw(), "split");
    assert_eq!(found.subprogram.range, AddressRange::new(0x500, 0x600));
}

#[test]
fn test_ranges_list_picks_covering_entry()
{
    let mut source = MemorySource::new();
    source.add_unit(
        MemoryDie::compile_unit("r.c")
            .with_low_pc(0)
            .with_ranges(&[(0x100, 0x200), (0x800, 0x900)])
            .with_child(MemoryDie::subprogram("cold").with_ranges(&[(0x100, 0x140), (0x880, 0x8c0)])),
    );

    let found = resolve_pc(&source, Address::new(0x8a0)).unwrap().unwrap();
    assert_eq!(found.subprogram.range, AddressRange::new(0x880, 0x8c0));
    assert_eq!(found.unit.range, Some(AddressRange::new(0x800, 0x900)));
    assert!(resolve_pc(&source, Address::new(0x500)).unwrap().is_none());
}

#[test]
fn test_high_pc_offset_form()
{
    let mut source = MemorySource::new();
    source.add_unit(
        MemoryDie::compile_unit("o.c")
            .with_low_pc(0x1000)
            .with_high_pc(HighPc::Offset(0x1000))
            .with_child(
                MemoryDie::subprogram("sized")
                    .with_low_pc(0x1010)
                    .with_high_pc(HighPc::Offset(0x40)),
            ),
    );

    assert_eq!(name_at(&source, 0x104f).as_deref(), Some("sized"));
    assert_eq!(name_at(&source, 0x1050), None);
}

#[test]
fn test_excluded_unit_is_not_descended()
{
    let source = two_units();
    let resolver = PcResolver::new(&source, ResolveOptions::default());

    let resolution = resolver.resolve(Address::new(0x3020)).unwrap();
    assert!(resolution.found.is_some());

    // Only the root of CU0 was classified; its children were never asked for.
    assert_eq!(source.tag_reads(0), 1);
    assert_eq!(source.child_reads(0), 0);
    assert_eq!(resolution.stats.units_examined, 2);
    assert_eq!(resolution.stats.units_skipped, 1);
    // CU0 root, CU1 root, bar
    assert_eq!(resolution.stats.dies_visited, 3);
}

#[test]
fn test_not_found_enumerates_every_unit_once()
{
    let mut source = two_units();
    source.add_unit(MemoryDie::compile_unit("noranges.c").with_child(MemoryDie::subprogram("baz").with_pc_range(0x9000, 0x9010)));

    let resolver = PcResolver::new(&source, ResolveOptions::default());
    let resolution = resolver.resolve(Address::new(0x2500)).unwrap();

    assert!(resolution.found.is_none());
    assert_eq!(source.units_enumerated(), 3);
    assert_eq!(resolution.stats.units_examined, 3);
    assert_eq!(resolution.stats.units_skipped, 2);
    // The unit without a range is walked in full.
    assert_eq!(source.tag_reads(2), 2);
}

#[test]
fn test_found_stops_enumeration()
{
    let source = two_units();
    resolve_pc(&source, Address::new(0x1020)).unwrap();

    assert_eq!(source.units_enumerated(), 1);
    assert_eq!(source.tag_reads(1), 0);
}

#[test]
fn test_early_exit_skips_later_siblings()
{
    let source = two_units();
    resolve_pc(&source, Address::new(0x1020)).unwrap();

    // CU root, `int`, `foo`. The parameter below `foo` is never read.
    assert_eq!(source.tag_reads(0), 3);
}

#[test]
fn test_resolution_is_idempotent_and_releases_units()
{
    let source = two_units();
    let resolver = PcResolver::new(&source, ResolveOptions::default());

    let first = resolver.resolve(Address::new(0x1020)).unwrap();
    assert_eq!(source.live_units(), 0);
    let second = resolver.resolve(Address::new(0x1020)).unwrap();
    assert_eq!(source.live_units(), 0);
    assert_eq!(first, second);

    let missing = resolver.resolve(Address::new(0x2500)).unwrap();
    assert!(missing.found.is_none());
    assert_eq!(source.live_units(), 0);
}

#[test]
fn test_counters_reset_between_runs()
{
    let source = two_units();
    resolve_pc(&source, Address::new(0x2500)).unwrap();
    let first = (source.units_enumerated(), source.tag_reads(0), source.tag_reads(1));

    source.reset_counters();
    resolve_pc(&source, Address::new(0x2500)).unwrap();
    let second = (source.units_enumerated(), source.tag_reads(0), source.tag_reads(1));

    assert_eq!(first, second);
    assert_eq!(first, (2, 1, 1));
}

#[test]
fn test_match_outlives_units()
{
    let source = two_units();
    let found = resolve_pc(&source, Address::new(0x1020)).unwrap().unwrap();

    assert_eq!(source.live_units(), 0);
    // The identity copied out still points at the right DIE: unit 0, index 2.
    assert_eq!(found.subprogram.die_offset, Some(2));
    assert_eq!(found.subprogram.name.unwrap().raw(), "foo");
}

#[test]
fn test_fatal_error_aborts_resolution()
{
    let mut source = two_units();
    source.fail_at_unit(1);

    let result = resolve_pc(&source, Address::new(0x3020));
    assert!(matches!(result, Err(PcfindError::MalformedUnit(_))));
    assert_eq!(source.live_units(), 0);

    // A match before the failing unit is still returned.
    assert_eq!(name_at(&source, 0x1020).as_deref(), Some("foo"));
}

#[test]
fn test_unreadable_tag_is_fatal()
{
    let mut source = MemorySource::new();
    source.add_unit(
        MemoryDie::compile_unit("a.c")
            .with_child(MemoryDie::new(DieTag::Other(0x24)).corrupt())
            .with_child(MemoryDie::subprogram("f").with_pc_range(0x10, 0x20)),
    );

    assert!(resolve_pc(&source, Address::new(0x18)).is_err());
    assert_eq!(source.live_units(), 0);
}

#[test]
fn test_nested_unit_tag_skips_unit()
{
    let mut source = MemorySource::new();
    source.add_unit(
        MemoryDie::compile_unit("broken.c").with_children([
            MemoryDie::compile_unit("inner.c"),
            MemoryDie::subprogram("shadowed").with_pc_range(0x10, 0x20),
        ]),
    );
    source.add_unit(MemoryDie::compile_unit("good.c").with_child(MemoryDie::subprogram("real").with_pc_range(0x10, 0x20)));

    let resolver = PcResolver::new(&source, ResolveOptions::default());
    let resolution = resolver.resolve(Address::new(0x18)).unwrap();

    let found = resolution.found.unwrap();
    assert_eq!(found.unit.index, 1);
    assert_eq!(found.subprogram.name.unwrap().raw(), "real");
    assert_eq!(resolution.stats.units_skipped, 1);
}

#[test]
fn test_partial_and_type_units_are_unit_roots()
{
    let mut source = MemorySource::new();
    source.add_unit(
        MemoryDie::new(DieTag::PartialUnit)
            .with_pc_range(0x100, 0x200)
            .with_child(MemoryDie::subprogram("p").with_pc_range(0x100, 0x110)),
    );
    source.add_unit(MemoryDie::new(DieTag::TypeUnit).with_child(MemoryDie::new(DieTag::Other(0x13))));

    assert_eq!(name_at(&source, 0x105).as_deref(), Some("p"));
    assert_eq!(name_at(&source, 0x150), None);
}

#[test]
fn test_subprogram_without_address_info_is_descended()
{
    let mut source = MemorySource::new();
    source.add_unit(
        MemoryDie::compile_unit("a.c").with_child(
            MemoryDie::subprogram("outer").with_child(MemoryDie::subprogram("inner").with_pc_range(0x40, 0x80)),
        ),
    );

    assert_eq!(name_at(&source, 0x40).as_deref(), Some("inner"));
}

#[test]
fn test_first_match_in_document_order_wins()
{
    let mut source = MemorySource::new();
    source.add_unit(MemoryDie::compile_unit("a.c").with_children([
        MemoryDie::subprogram("first").with_pc_range(0x10, 0x30),
        MemoryDie::subprogram("overlapping").with_pc_range(0x20, 0x40),
    ]));

    assert_eq!(name_at(&source, 0x28).as_deref(), Some("first"));
}

#[test]
fn test_anonymous_subprogram_still_matches()
{
    let mut source = MemorySource::new();
    source.add_unit(MemoryDie::compile_unit("a.c").with_child(MemoryDie::anonymous_subprogram().with_pc_range(0x10, 0x20)));

    let found = resolve_pc(&source, Address::new(0x10)).unwrap().unwrap();
    assert!(found.subprogram.name.is_none());
    assert_eq!(found.subprogram.range, AddressRange::new(0x10, 0x20));
}

#[test]
fn test_out_of_line_definition_takes_declaration_name()
{
    let mut source = MemorySource::new();
    source.add_unit(MemoryDie::compile_unit("a.cpp").with_children([
        MemoryDie::new(DieTag::Other(0x02)).with_name("Widget"),
        MemoryDie::anonymous_subprogram().with_linkage_name("_ZN6Widget4drawEv"),
        MemoryDie::anonymous_subprogram()
            .with_origin(2)
            .with_pc_range(0x400, 0x480),
    ]));

    let found = resolve_pc(&source, Address::new(0x410)).unwrap().unwrap();
    let name = found.subprogram.name.unwrap();
    assert_eq!(name.raw(), "_ZN6Widget4drawEv");
}

#[test]
fn test_source_files_are_collected_on_request()
{
    let source = two_units();

    let plain = PcResolver::new(&source, ResolveOptions::default());
    let found = plain.resolve(Address::new(0x1020)).unwrap().found.unwrap();
    assert!(found.source_files.is_empty());

    let with_files = PcResolver::new(
        &source,
        ResolveOptions {
            collect_source_files: true,
            ..ResolveOptions::default()
        },
    );
    let found = with_files.resolve(Address::new(0x1020)).unwrap().found.unwrap();
    assert_eq!(found.source_files, vec!["a.c".to_string()]);
}

#[test]
fn test_empty_source()
{
    let source = MemorySource::new();
    let resolution = PcResolver::new(&source, ResolveOptions::default())
        .resolve(Address::new(0x1000))
        .unwrap();

    assert!(resolution.found.is_none());
    assert_eq!(resolution.stats.units_examined, 0);
}
