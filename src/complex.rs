//! Canonical interning of edge-weight components.
//!
//! Every real number that appears as the real or imaginary part of an edge
//! weight lives in a [`ComplexTable`]. Two raw floating values map to the same
//! entry iff their absolute difference is below [`TOLERANCE`], so weights that
//! are mathematically equal (up to rounding) compare equal by entry id, and
//! edge equality never needs a floating-point comparison.
//!
//! The constants 0, 1, -1, 1/sqrt(2) and -1/sqrt(2) are interned first, in a
//! fixed order, and are never collected. Arithmetic on weights goes through
//! the table as well: a transient sum or product is interned immediately, so
//! there is no separate uncanonicalized numeric type anywhere in the graph.

use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt::{Display, Formatter};

use fxhash::FxHashMap;
use log::debug;

/// Maximum difference for two values to share one canonical entry.
///
/// Raising it merges more near-equal weights (smaller diagrams, more
/// rounding); lowering it does the opposite. Regression baselines depend on
/// this value, so it is a crate constant rather than a knob.
pub const TOLERANCE: f64 = 1e-13;

/// Stable reference to one interned value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ValueId(u32);

impl ValueId {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for ValueId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A complex scalar attached to an edge: a pair of interned components.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Weight {
    pub re: ValueId,
    pub im: ValueId,
}

impl Weight {
    /// The distinguished weight 0. Any edge carrying it is the canonical
    /// zero edge.
    pub const ZERO: Weight = Weight {
        re: ValueId::new(1),
        im: ValueId::new(1),
    };
    /// The weight 1.
    pub const ONE: Weight = Weight {
        re: ValueId::new(2),
        im: ValueId::new(1),
    };

    pub fn is_zero(self) -> bool {
        self == Weight::ZERO
    }
    pub fn is_one(self) -> bool {
        self == Weight::ONE
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: f64,
    refcount: u32,
    pinned: bool,
    occupied: bool,
}

/// Tolerance-based interning table for weight components.
pub struct ComplexTable {
    entries: Vec<Entry>,
    /// Quantized value -> entry indices. Lookup probes the key and both
    /// neighbors, so values within [`TOLERANCE`] of an existing entry always
    /// find it.
    index: FxHashMap<i64, Vec<u32>>,
    free: Vec<u32>,
    live: usize,
}

impl ComplexTable {
    pub fn new() -> Self {
        let mut table = Self {
            // Index 0 is a sentry and never used.
            entries: vec![Entry {
                value: f64::NAN,
                refcount: 0,
                pinned: false,
                occupied: false,
            }],
            index: FxHashMap::default(),
            free: Vec::new(),
            live: 0,
        };

        // Pinned constants, in the order the `Weight` constants rely on.
        for (i, value) in [0.0, 1.0, -1.0, FRAC_1_SQRT_2, -FRAC_1_SQRT_2]
            .into_iter()
            .enumerate()
        {
            let id = table.intern(value);
            assert_eq!(id.index(), i + 1);
            table.entries[id.index()].pinned = true;
        }

        table
    }

    fn quantize(value: f64) -> i64 {
        (value / TOLERANCE).round() as i64
    }

    /// Return the canonical entry for `value`, creating it if no existing
    /// entry lies within [`TOLERANCE`].
    pub fn intern(&mut self, value: f64) -> ValueId {
        assert!(value.is_finite(), "Weight component is not finite");

        let key = Self::quantize(value);
        for k in key - 1..=key + 1 {
            if let Some(bucket) = self.index.get(&k) {
                for &i in bucket {
                    if (self.entries[i as usize].value - value).abs() <= TOLERANCE {
                        return ValueId::new(i);
                    }
                }
            }
        }

        let i = match self.free.pop() {
            Some(i) => {
                self.entries[i as usize] = Entry {
                    value,
                    refcount: 0,
                    pinned: false,
                    occupied: true,
                };
                i
            }
            None => {
                self.entries.push(Entry {
                    value,
                    refcount: 0,
                    pinned: false,
                    occupied: true,
                });
                (self.entries.len() - 1) as u32
            }
        };
        self.index.entry(key).or_default().push(i);
        self.live += 1;
        debug!("interned {} as {}", value, ValueId::new(i));
        ValueId::new(i)
    }

    pub fn value(&self, id: ValueId) -> f64 {
        let entry = &self.entries[id.index()];
        assert!(entry.occupied, "Value entry {} is not occupied", id);
        entry.value
    }

    pub fn inc_ref(&mut self, id: ValueId) {
        self.entries[id.index()].refcount += 1;
    }

    pub fn dec_ref(&mut self, id: ValueId) {
        let entry = &mut self.entries[id.index()];
        assert!(entry.refcount > 0, "Refcount underflow on value entry {}", id);
        entry.refcount -= 1;
    }

    /// Number of live (occupied) entries, pinned constants included.
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Reclaim every unpinned entry whose refcount is zero.
    pub fn collect(&mut self) {
        let mut freed = 0;
        for i in 1..self.entries.len() {
            let entry = &self.entries[i];
            if entry.occupied && !entry.pinned && entry.refcount == 0 {
                let key = Self::quantize(entry.value);
                let bucket = self.index.get_mut(&key).expect("Entry missing from index");
                bucket.retain(|&j| j != i as u32);
                self.entries[i].occupied = false;
                self.free.push(i as u32);
                self.live -= 1;
                freed += 1;
            }
        }
        debug!("collected {} value entries, {} live", freed, self.live);
    }
}

impl Default for ComplexTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ComplexTable {
    /// Intern a raw complex scalar as a weight.
    pub fn weight(&mut self, re: f64, im: f64) -> Weight {
        Weight {
            re: self.intern(re),
            im: self.intern(im),
        }
    }

    pub fn weight_value(&self, w: Weight) -> (f64, f64) {
        (self.value(w.re), self.value(w.im))
    }

    /// Squared magnitude of a weight.
    pub fn mag2(&self, w: Weight) -> f64 {
        let (re, im) = self.weight_value(w);
        re * re + im * im
    }

    pub fn mul(&mut self, a: Weight, b: Weight) -> Weight {
        if a.is_zero() || b.is_zero() {
            return Weight::ZERO;
        }
        if a.is_one() {
            return b;
        }
        if b.is_one() {
            return a;
        }
        let (ar, ai) = self.weight_value(a);
        let (br, bi) = self.weight_value(b);
        self.weight(ar * br - ai * bi, ar * bi + ai * br)
    }

    pub fn add(&mut self, a: Weight, b: Weight) -> Weight {
        if a.is_zero() {
            return b;
        }
        if b.is_zero() {
            return a;
        }
        let (ar, ai) = self.weight_value(a);
        let (br, bi) = self.weight_value(b);
        self.weight(ar + br, ai + bi)
    }

    pub fn div(&mut self, a: Weight, b: Weight) -> Weight {
        assert!(!b.is_zero(), "Weight division by zero");
        if a.is_zero() {
            return Weight::ZERO;
        }
        if b.is_one() {
            return a;
        }
        if a == b {
            return Weight::ONE;
        }
        let (ar, ai) = self.weight_value(a);
        let (br, bi) = self.weight_value(b);
        let d = br * br + bi * bi;
        self.weight((ar * br + ai * bi) / d, (ai * br - ar * bi) / d)
    }
}
