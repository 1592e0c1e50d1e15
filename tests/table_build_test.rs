//! Table construction from descriptor records.
//!
//! Covers selection, ordering and special links end to end through the
//! pipeline, plus randomized properties over a fixed pool of records.

use enctab::core::{BuildConfig, ParseError};
use enctab::encoding::{expand_operands, ImmediateMarker, OpcodeFold};
use enctab::isa::{OperandType, RawInstructionRecord};
use enctab::pipeline::{build_from_records, build_table_from_json};
use enctab::table::{code_length, first_misordered, LinkContext, SpecialLink, MAX_ROWS, NO_LINK};
use enctab::{Diagnostics, EncodingDescriptor};
use proptest::prelude::*;
use OperandType::*;

const DATABASE: &str = r#"{"instructions": [
    {"category": "move", "ext": "BASE", "data": [
        {"inst": "mov r64, i32", "op": "REX.W C7 /0 id"},
        {"inst": "mov r64, i32", "op": "REX.W B8+r id"},
        {"inst": "mov r32, i32", "op": "B8+r id"},
        {"inst": "mov r32/m32, r32", "op": "89 /r"},
        {"inst": "mov r32, r32/m32", "op": "8B /r"}
    ]},
    {"category": "shift", "ext": "BASE", "data": [
        {"inst": "shl r32/m32, i8", "op": "C1 /4 ib"},
        {"inst": "shl r32/m32, 1", "op": "D1 /4"},
        {"inst": "shl r32/m32, cl", "op": "D3 /4"},
        {"inst": "sar r64, i8", "op": "REX.W C1 /7 ib"}
    ]},
    {"category": "arith", "ext": "BASE", "data": [
        {"inst": "imul r32, r32/m32, i32", "op": "69 /r id"},
        {"inst": "imul r32, r32/m32, i8", "op": "6B /r ib"},
        {"inst": "imul r64, r64, i32", "op": "REX.W 69 /r id"}
    ]},
    {"category": "avx", "ext": "AVX512F", "data": [
        {"inst": "vaddps W:xmm {kz}, xmm, xmm/m128", "op": "EVEX.128.0F.W0 58 /r"},
        {"inst": "vaddps W:xmm, xmm, xmm/m128", "op": "VEX.128.0F.WIG 58 /r"}
    ]}
]}"#;

fn build() -> enctab::TableBuild {
    let _ = env_logger::builder().is_test(true).try_init();
    build_table_from_json(DATABASE, &BuildConfig::default()).unwrap()
}

#[test]
fn test_wide_immediate_move() {
    let build = build();
    let table = &build.table;
    assert!(build.diagnostics.is_clean());

    let row = table.find("mov", &[R64, I32]).unwrap();
    let variant = &table.row(row).unwrap().variant;
    let d = &variant.descriptor;
    assert_eq!(d.opcode, vec![0xB8]);
    assert!(d.rex_w);
    assert_eq!(d.fold, Some(OpcodeFold::Register));
    assert_eq!(d.immediates, vec![ImmediateMarker::Id]);

    let link = table.row(row).unwrap().link.unwrap();
    assert_eq!(link.context, LinkContext::WideImmediate);
    assert_eq!(Some(link.row), table.find("mov", &[R32, I32]));
}

#[test]
fn test_operand_alternatives_expand() {
    let mut diagnostics = Diagnostics::new();
    let tuples = expand_operands("r32/m32, i8", &mut diagnostics).unwrap();
    assert_eq!(tuples, vec![vec![R32, I8], vec![M32, I8]]);
    assert!(diagnostics.is_clean());
}

#[test]
fn test_record_with_bare_separator_is_skipped() {
    let records = vec![
        RawInstructionRecord::new("add", "r32 / m32, i8", "83 /0 ib"),
        RawInstructionRecord::new("push", "i8", "6A ib"),
    ];
    let build = build_from_records(records, &BuildConfig::default(), Diagnostics::new()).unwrap();
    assert_eq!(build.table.len(), 1);
    assert!(build.table.find("push", &[I8]).is_some());

    let skipped = build.diagnostics.skipped();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].encoding, "83 /0 ib");
    assert_eq!(skipped[0].error, ParseError::EmptyOperand { token: "/".to_string() });
}

#[test]
fn test_shift_links_to_count_one() {
    let table = build().table;
    let one = table.find("shl", &[R32, One]).unwrap();

    for count in [I8, Cl] {
        let row = table.find("shl", &[R32, count]).unwrap();
        assert_eq!(
            table.row(row).unwrap().link,
            Some(SpecialLink {
                context: LinkContext::ShiftByOne,
                row: one,
            })
        );
    }
    let mem_one = table.find("shl", &[M32, One]).unwrap();
    let mem_i8 = table.find("shl", &[M32, I8]).unwrap();
    assert_eq!(table.row(mem_i8).unwrap().link.map(|l| l.row), Some(mem_one));
    assert_eq!(table.row(one).unwrap().special_index(), NO_LINK);

    // no by-one form of sar r64 in the database
    let sar = table.find("sar", &[R64, I8]).unwrap();
    assert_eq!(table.row(sar).unwrap().link, None);
}

#[test]
fn test_imul_narrow_immediate_sibling() {
    let table = build().table;
    for src in [R32, M32] {
        let wide = table.find("imul", &[R32, src, I32]).unwrap();
        let narrow = table.find("imul", &[R32, src, I8]).unwrap();
        let link = table.row(wide).unwrap().link.unwrap();
        assert_eq!(link.context, LinkContext::NarrowImmediate);
        assert_eq!(link.row, narrow);
        assert_eq!(table.row(narrow).unwrap().link, None);
    }
    let lone = table.find("imul", &[R64, R64, I32]).unwrap();
    assert_eq!(table.row(lone).unwrap().link, None);
}

#[test]
fn test_evex_rows_follow_vex_rows() {
    let table = build().table;
    let vex = table.find("vaddps", &[Xmm, Xmm, Xmm]).unwrap();
    let evex = table.find("vaddps", &[XmmKz, Xmm, Xmm]).unwrap();
    assert!(!table.row(vex).unwrap().variant.descriptor.is_evex());
    assert!(table.row(evex).unwrap().variant.descriptor.is_evex());
    assert!(vex < evex);

    let names: Vec<&str> = table.variants().map(|v| v.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn test_both_mov_directions_collapse_to_one_row() {
    let table = build().table;
    let row = table.find("mov", &[R32, R32]).unwrap();
    // 89 /r was seen first and has the same length as 8B /r
    assert_eq!(table.row(row).unwrap().variant.descriptor.opcode, vec![0x89]);
    assert!(table.find("mov", &[M32, R32]).is_some());
    assert!(table.find("mov", &[R32, M32]).is_some());
}

/// (name, operands, encoding) pool the properties draw from. Several
/// entries share a key so selection has something to choose.
const POOL: &[(&str, &str, &str)] = &[
    ("add", "r32/m32, r32", "01 /r"),
    ("add", "r32, r32/m32", "03 /r"),
    ("add", "r32/m32, i8", "83 /0 ib"),
    ("add", "r32/m32, i32", "81 /0 id"),
    ("add", "eax, i32", "05 id"),
    ("mov", "r64, i32", "REX.W C7 /0 id"),
    ("mov", "r64, i32", "REX.W B8+r id"),
    ("mov", "r32, i32", "B8+r id"),
    ("mov", "r32, i32", "C7 /0 id"),
    ("rol", "r32/m32, 1", "D1 /0"),
    ("rol", "r32/m32, i8", "C1 /0 ib"),
    ("rol", "r32/m32, cl", "D3 /0"),
    ("imul", "r32, r32/m32, i8", "6B /r ib"),
    ("imul", "r32, r32/m32, i32", "69 /r id"),
    ("vpaddd", "xmm, xmm, xmm/m128", "VEX.128.66.0F.WIG FE /r"),
    ("vpaddd", "xmm {k}, xmm, xmm/m128/m32bcst", "EVEX.128.66.0F.W0 FE /r"),
    ("vpaddd", "xmm, xmm, xmm/m128", "66 0F FE /r"),
    ("pshufb", "xmm, xmm/m128", "66 0F 38 00 /r"),
    ("fadd", "st0, st(i)", "D8 C0+i"),
    ("nop", "", "90"),
];

fn records(indices: &[usize]) -> Vec<RawInstructionRecord> {
    indices
        .iter()
        .map(|&i| {
            let (name, ops, enc) = POOL[i];
            RawInstructionRecord::new(name, ops, enc)
        })
        .collect()
}

fn pool_indices() -> impl Strategy<Value = Vec<usize>> {
    prop::sample::subsequence((0..POOL.len()).collect::<Vec<_>>(), 0..=POOL.len())
        .prop_shuffle()
}

proptest! {
    #[test]
    fn prop_rows_are_ordered_and_linked_in_bounds(indices in pool_indices()) {
        let build = build_from_records(records(&indices), &BuildConfig::default(), Diagnostics::new())
            .unwrap();
        let table = build.table;
        let variants: Vec<_> = table.variants().cloned().collect();
        prop_assert_eq!(first_misordered(&variants).unwrap(), None);
        prop_assert!(table.len() <= MAX_ROWS);

        for (i, row) in table.rows().iter().enumerate() {
            let packed = row.special_index();
            match row.link {
                Some(link) => {
                    prop_assert!(link.row < table.len());
                    prop_assert!((link.context as u16) <= 2);
                    prop_assert_ne!(packed, NO_LINK);
                    prop_assert_eq!(SpecialLink::unpack(packed), Some(link));
                    prop_assert_ne!(link.row, i);
                }
                None => prop_assert_eq!(packed, NO_LINK),
            }
            prop_assert_eq!(table.find(&row.variant.name, &row.variant.operands), Some(i));
        }
    }

    #[test]
    fn prop_selected_encoding_is_shortest(indices in pool_indices()) {
        let recs = records(&indices);
        let build = build_from_records(recs.clone(), &BuildConfig::default(), Diagnostics::new())
            .unwrap();

        for rec in &recs {
            let descriptor = EncodingDescriptor::parse(&rec.encoding).unwrap();
            let tuples = expand_operands(&rec.operands, &mut Diagnostics::new()).unwrap();
            for operands in tuples {
                let row = build.table.find(&rec.name, &operands).unwrap();
                let selected = &build.table.row(row).unwrap().variant;
                prop_assert!(selected.code_length() <= code_length(&descriptor));
            }
        }
    }
}
