//! BED format property tests
//!
//! Coordinates shift between 0-based half-open on disk and 1-based closed
//! in memory.

use proptest::prelude::*;
use tidyranges::core::{IntervalStore, Strand, Value};
use tidyranges::formats::{bed, BedReader, BedRecordView, RecordSource};

fn arb_strand() -> impl Strategy<Value = Strand> {
    prop_oneof![
        Just(Strand::Plus),
        Just(Strand::Minus),
        Just(Strand::Unstranded),
    ]
}

proptest! {
    /// Arbitrary bytes never panic the parser
    #[test]
    fn test_parse_never_panics(line in prop::collection::vec(any::<u8>(), 0..200)) {
        let _ = BedRecordView::parse(&line);
    }

    #[test]
    fn test_bed_line_to_interval(
        chrom in "chr[0-9XY]{1,2}",
        start in 0u64..1_000_000,
        len in 1u64..10_000,
        strand in arb_strand(),
    ) {
        let strand_char = match strand {
            Strand::Unstranded => '.',
            s => s.to_char(),
        };
        let text = format!("{}\t{}\t{}\tfeat\t0\t{}\n", chrom, start, start + len, strand_char);
        let store = BedReader::new(text.as_bytes()).unwrap().collect_store(None).unwrap();

        prop_assert_eq!(store.len(), 1);
        let iv = store.get(0).unwrap();
        prop_assert_eq!(iv.start(), start + 1);
        prop_assert_eq!(iv.end(), start + len);
        prop_assert_eq!(iv.width(), len);
        prop_assert_eq!(iv.strand(), strand);
    }

    #[test]
    fn test_write_then_read(
        rows in prop::collection::vec((1u64..100_000, 1u64..1_000, arb_strand(), 0i64..1000), 1..30)
    ) {
        let store = rows
            .iter()
            .enumerate()
            .fold(IntervalStore::builder(&["name", "score"]), |b, (i, &(start, width, strand, score))| {
                b.add("chr1", start, start + width - 1, strand, vec![Value::from(format!("r{}", i)), Value::Int(score)])
            })
            .build()
            .unwrap();

        let mut buf = Vec::new();
        bed::write_bed(&store, &mut buf).unwrap();
        let back = BedReader::new(buf.as_slice()).unwrap().collect_store(None).unwrap();
        prop_assert_eq!(back, store);
    }
}

#[test]
fn test_region_filter_on_read() {
    let text = "chr1\t0\t100\ta\nchr1\t500\t600\tb\nchr2\t0\t100\tc\n";
    let region = IntervalStore::builder(&[])
        .add("chr1", 550, 560, Strand::Unstranded, vec![])
        .build()
        .unwrap();
    let store = BedReader::new(text.as_bytes())
        .unwrap()
        .collect_store(Some(&region))
        .unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.column("name").unwrap(), vec![Value::from("b")]);
}

#[test]
fn test_empty_input() {
    let mut reader = BedReader::new("# only comments\n\n".as_bytes()).unwrap();
    assert!(reader.schema().is_empty());
    assert!(reader.next_record().is_none());
}
