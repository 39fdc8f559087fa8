//! Anchored coordinate arithmetic
//!
//! Each operator picks an anchor from the current coordinates, then
//! recomputes the other coordinate(s) from the new width or offset.
//! Results with `width < 1` or `start < 1` are rejected with
//! [`RangesError::InvalidRange`](crate::core::RangesError).

use crate::core::error::{RangesError, Result};
use crate::core::{Interval, Strand};

/// The coordinate held fixed by a resize operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Anchor {
    #[default]
    Start,
    End,
    Center,
    /// `start` on `+`/unstranded, `end` on `-`
    FivePrime,
    /// `end` on `+`/unstranded, `start` on `-`
    ThreePrime,
}

impl Anchor {
    /// Reduce strand-relative anchors to a coordinate-axis anchor
    ///
    /// # Examples
    /// ```
    /// use tidyranges::core::{Anchor, Strand};
    /// assert_eq!(Anchor::FivePrime.resolve(Strand::Minus), Anchor::End);
    /// assert_eq!(Anchor::ThreePrime.resolve(Strand::Unstranded), Anchor::End);
    /// assert_eq!(Anchor::Center.resolve(Strand::Minus), Anchor::Center);
    /// ```
    pub fn resolve(&self, strand: Strand) -> Anchor {
        match (self, strand.is_reverse()) {
            (Anchor::FivePrime, false) | (Anchor::ThreePrime, true) => Anchor::Start,
            (Anchor::FivePrime, true) | (Anchor::ThreePrime, false) => Anchor::End,
            (other, _) => *other,
        }
    }
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Anchor::Start => "start",
            Anchor::End => "end",
            Anchor::Center => "center",
            Anchor::FivePrime => "5p",
            Anchor::ThreePrime => "3p",
        };
        write!(f, "{}", s)
    }
}

fn signed(iv: &Interval) -> (i64, i64) {
    (iv.start() as i64, iv.end() as i64)
}

/// Grow (or shrink, for negative `extend`) the width by `extend` bases,
/// keeping the anchor fixed. A center anchor puts the smaller half of an
/// odd extension on the left.
///
/// # Examples
/// ```
/// use tidyranges::core::{stretch, Anchor, Interval, Strand};
/// let iv = Interval::new("chr1", 100, 200, Strand::Plus).unwrap();
/// let out = stretch(&iv, 10, Anchor::Center).unwrap();
/// assert_eq!((out.start(), out.end()), (95, 205));
/// ```
pub fn stretch(iv: &Interval, extend: i64, anchor: Anchor) -> Result<Interval> {
    let (start, end) = signed(iv);
    let (start, end) = match anchor.resolve(iv.strand()) {
        Anchor::Start => (start, end + extend),
        Anchor::End => (start - extend, end),
        _ => {
            let left = extend.div_euclid(2);
            (start - left, end + (extend - left))
        }
    };
    iv.with_coords(start, end)
}

/// Set the width to `width`, keeping the anchor fixed
///
/// # Examples
/// ```
/// use tidyranges::core::{resize, Anchor, Interval, Strand};
/// let iv = Interval::new("chr1", 100, 200, Strand::Minus).unwrap();
/// let out = resize(&iv, 10, Anchor::FivePrime).unwrap();
/// assert_eq!((out.start(), out.end()), (191, 200));
/// ```
pub fn resize(iv: &Interval, width: i64, anchor: Anchor) -> Result<Interval> {
    if width < 1 {
        return Err(RangesError::InvalidRange(format!(
            "cannot resize {} to width {}",
            iv, width
        )));
    }
    let (start, end) = signed(iv);
    let (start, end) = match anchor.resolve(iv.strand()) {
        Anchor::Start => (start, start + width - 1),
        Anchor::End => (end - width + 1, end),
        _ => {
            let shift = (end - start + 1 - width).div_euclid(2);
            (start + shift, start + shift + width - 1)
        }
    };
    iv.with_coords(start, end)
}

/// Adjacent, non-overlapping interval of `width` bases after the end
/// (`downstream`) or before the start. With `directed`, a `-` strand
/// interval flips the sides.
///
/// # Examples
/// ```
/// use tidyranges::core::{flank, Interval, Strand};
/// let iv = Interval::new("chr1", 100, 200, Strand::Plus).unwrap();
/// let out = flank(&iv, 8, true, true).unwrap();
/// assert_eq!((out.start(), out.end()), (201, 208));
/// ```
pub fn flank(iv: &Interval, width: i64, downstream: bool, directed: bool) -> Result<Interval> {
    if width < 1 {
        return Err(RangesError::InvalidRange(format!(
            "flank width must be >= 1, got {}",
            width
        )));
    }
    let (start, end) = signed(iv);
    let after_end = downstream != (directed && iv.strand().is_reverse());
    if after_end {
        iv.with_coords(end + 1, end + width)
    } else {
        iv.with_coords(start - width, start - 1)
    }
}

/// Move both coordinates by `offset`. With `directed`, a `-` strand
/// interval moves the opposite way, so a positive offset is always
/// downstream.
pub fn shift(iv: &Interval, offset: i64, directed: bool) -> Result<Interval> {
    let delta = if directed && iv.strand().is_reverse() {
        -offset
    } else {
        offset
    };
    let (start, end) = signed(iv);
    iv.with_coords(start + delta, end + delta)
}
