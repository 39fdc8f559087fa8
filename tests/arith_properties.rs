//! Property-based tests for anchored coordinate arithmetic
//!
//! Every operator either fails with `InvalidRange` or yields an interval
//! with `end = start + width - 1` and `start >= 1`.

use proptest::prelude::*;
use tidyranges::core::{flank, resize, shift, stretch, Anchor, Interval, RangesError, Strand};

fn arb_strand() -> impl Strategy<Value = Strand> {
    prop_oneof![
        Just(Strand::Plus),
        Just(Strand::Minus),
        Just(Strand::Unstranded),
    ]
}

fn arb_anchor() -> impl Strategy<Value = Anchor> {
    prop_oneof![
        Just(Anchor::Start),
        Just(Anchor::End),
        Just(Anchor::Center),
        Just(Anchor::FivePrime),
        Just(Anchor::ThreePrime),
    ]
}

fn arb_interval() -> impl Strategy<Value = Interval> {
    (1u64..100_000, 1u64..5_000, arb_strand())
        .prop_map(|(start, width, strand)| {
            Interval::new("chr1", start, start + width - 1, strand).unwrap()
        })
}

fn check_shape(result: Result<Interval, RangesError>) -> Result<(), TestCaseError> {
    match result {
        Ok(iv) => {
            prop_assert!(iv.start() >= 1);
            prop_assert!(iv.end() >= iv.start());
            prop_assert_eq!(iv.end(), iv.start() + iv.width() - 1);
        }
        Err(e) => prop_assert!(matches!(e, RangesError::InvalidRange(_))),
    }
    Ok(())
}

proptest! {
    #[test]
    fn test_resize_sets_width(iv in arb_interval(), width in 1i64..10_000, anchor in arb_anchor()) {
        match resize(&iv, width, anchor) {
            Ok(out) => {
                prop_assert_eq!(out.width(), width as u64);
                prop_assert_eq!(out.strand(), iv.strand());
                // the anchor coordinate does not move
                match anchor.resolve(iv.strand()) {
                    Anchor::Start => prop_assert_eq!(out.start(), iv.start()),
                    Anchor::End => prop_assert_eq!(out.end(), iv.end()),
                    _ => {}
                }
            }
            Err(e) => prop_assert!(matches!(e, RangesError::InvalidRange(_))),
        }
    }

    #[test]
    fn test_resize_rejects_nonpositive_width(iv in arb_interval(), width in -100i64..=0, anchor in arb_anchor()) {
        prop_assert!(matches!(resize(&iv, width, anchor), Err(RangesError::InvalidRange(_))));
    }

    #[test]
    fn test_stretch_changes_width_by_extend(iv in arb_interval(), extend in -6_000i64..6_000, anchor in arb_anchor()) {
        let result = stretch(&iv, extend, anchor);
        if let Ok(out) = &result {
            prop_assert_eq!(out.width() as i64, iv.width() as i64 + extend);
        }
        check_shape(result)?;
    }

    #[test]
    fn test_flank_is_adjacent(iv in arb_interval(), width in 1i64..1_000, downstream in any::<bool>(), directed in any::<bool>()) {
        let result = flank(&iv, width, downstream, directed);
        if let Ok(out) = &result {
            prop_assert_eq!(out.width(), width as u64);
            prop_assert!(!out.overlaps(&iv));
            prop_assert_eq!(out.distance(&iv), Some(0));
        }
        check_shape(result)?;
    }

    #[test]
    fn test_shift_preserves_width(iv in arb_interval(), offset in -200_000i64..200_000, directed in any::<bool>()) {
        let result = shift(&iv, offset, directed);
        if let Ok(out) = &result {
            prop_assert_eq!(out.width(), iv.width());
        }
        check_shape(result)?;
    }

    #[test]
    fn test_shift_inverse(iv in arb_interval(), offset in 0i64..10_000, directed in any::<bool>()) {
        // directed shifts of minus-strand intervals may run off the sequence start
        if let Ok(moved) = shift(&iv, offset, directed) {
            let back = shift(&moved, -offset, directed).unwrap();
            prop_assert_eq!(back, iv);
        }
    }
}

#[test]
fn test_flank_downstream_example() {
    let iv = Interval::new("chr1", 100, 200, Strand::Plus).unwrap();
    let out = flank(&iv, 8, true, false).unwrap();
    assert_eq!((out.seqname(), out.start(), out.end()), ("chr1", 201, 208));
    assert_eq!(out.strand(), Strand::Plus);
}

#[test]
fn test_directed_flank_on_minus_strand() {
    let iv = Interval::new("chr1", 100, 200, Strand::Minus).unwrap();
    // downstream of a minus-strand feature lies before its start
    let out = flank(&iv, 8, true, true).unwrap();
    assert_eq!((out.start(), out.end()), (92, 99));
}
