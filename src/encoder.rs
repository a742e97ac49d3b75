//! Bijections between explicit items and cubes over variable pools.
//!
//! A pool of width `w` addresses `2^w` codes. Code bits are laid out
//! most-significant first along the pool's variables, so the
//! lexicographically smallest cube of a set (see [`Bdd::pick_cube`]) is also
//! its smallest code. Primed pools allocate current and next variables
//! interleaved (`x1 x1' x2 x2' ...`), which keeps the X ↔ X′ swap local.

use std::collections::HashMap;
use std::hash::Hash;

use log::debug;

use crate::bdd::Bdd;
use crate::error::{Error, Result};
use crate::reference::Ref;
use crate::types::Var;

/// Which copy of a primed pool.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Side {
    Current,
    Next,
}

/// Widest pool a `u32` code can address.
pub const MAX_WIDTH: usize = u32::BITS as usize;

/// Number of bits needed to address `n` items, at least 1.
pub fn width_for(n: usize) -> usize {
    match n {
        0..=2 => 1,
        _ => (usize::BITS - (n - 1).leading_zeros()) as usize,
    }
}

#[derive(Debug, Clone)]
pub struct VarPool {
    name: String,
    current: Vec<Var>,
    next: Vec<Var>,
}

impl VarPool {
    /// Allocates `width` fresh variables (twice that if `primed`).
    ///
    /// Fails with [`Error::EncodingOverflow`] when the codes would not fit a `u32`.
    pub fn new(bdd: &Bdd, name: impl Into<String>, width: usize, primed: bool) -> Result<Self> {
        let name = name.into();
        if width > MAX_WIDTH {
            return Err(Error::EncodingOverflow {
                pool: name,
                index: 1usize.checked_shl(width as u32).unwrap_or(usize::MAX),
                width: MAX_WIDTH,
            });
        }
        let mut current = Vec::with_capacity(width);
        let mut next = Vec::with_capacity(if primed { width } else { 0 });
        for _ in 0..width {
            current.push(bdd.allocate_variable());
            if primed {
                next.push(bdd.allocate_variable());
            }
        }
        Ok(Self { name, current, next })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.current.len()
    }

    /// Number of addressable codes.
    pub fn capacity(&self) -> usize {
        1usize.checked_shl(self.width() as u32).unwrap_or(usize::MAX)
    }

    pub fn vars(&self, side: Side) -> &[Var] {
        match side {
            Side::Current => &self.current,
            Side::Next => &self.next,
        }
    }

    /// (current, next) variable pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (Var, Var)> + '_ {
        self.current.iter().copied().zip(self.next.iter().copied())
    }

    pub fn var_set(&self, bdd: &Bdd, side: Side) -> Ref {
        bdd.var_set(self.vars(side).iter().copied())
    }

    fn bit(&self, code: u32, j: usize) -> bool {
        (code >> (self.width() - 1 - j)) & 1 == 1
    }

    pub fn cube(&self, bdd: &Bdd, code: u32, side: Side) -> Ref {
        let vars = self.vars(side);
        bdd.assignment_cube(vars, (0..vars.len()).map(|j| self.bit(code, j)))
    }

    /// Code of the smallest assignment in `f`, if any.
    pub fn decode(&self, bdd: &Bdd, f: Ref, side: Side) -> Option<u32> {
        let bits = bdd.pick_cube(f, self.vars(side))?;
        Some(Self::code_of(&bits))
    }

    pub fn code_of(bits: &[bool]) -> u32 {
        bits.iter().fold(0, |acc, &b| (acc << 1) | b as u32)
    }

    /// Codes strictly below `bound`.
    pub fn below(&self, bdd: &Bdd, bound: usize, side: Side) -> Ref {
        if bound >= self.capacity() {
            return bdd.one;
        }
        let vars = self.vars(side);
        let mut f = bdd.zero;
        for j in (0..vars.len()).rev() {
            let x = bdd.mk_var(vars[j].id());
            f = if self.bit(bound as u32, j) {
                bdd.apply_or(-x, f)
            } else {
                bdd.apply_and(-x, f)
            };
        }
        f
    }
}

/// Bijection between items and codes of a pool, in insertion order.
#[derive(Debug, Clone)]
pub struct Encoder<T> {
    pool: VarPool,
    items: Vec<T>,
    codes: HashMap<T, u32>,
}

impl<T: Clone + Eq + Hash> Encoder<T> {
    /// An empty encoder able to address `capacity` items.
    pub fn with_capacity(bdd: &Bdd, name: impl Into<String>, capacity: usize, primed: bool) -> Result<Self> {
        let name = name.into();
        let width = width_for(capacity);
        if width > MAX_WIDTH {
            return Err(Error::EncodingOverflow {
                pool: name,
                index: capacity,
                width: MAX_WIDTH,
            });
        }
        let pool = VarPool::new(bdd, name, width, primed)?;
        debug!("pool '{}': {} bit(s) for {} item(s)", pool.name(), pool.width(), capacity);
        Ok(Self {
            pool,
            items: Vec::new(),
            codes: HashMap::new(),
        })
    }

    /// Encodes a fixed candidate set; duplicates share a code.
    pub fn from_items(
        bdd: &Bdd,
        name: impl Into<String>,
        items: impl IntoIterator<Item = T>,
        primed: bool,
    ) -> Result<Self> {
        let mut unique: Vec<T> = Vec::new();
        let mut seen = HashMap::new();
        for item in items {
            if !seen.contains_key(&item) {
                seen.insert(item.clone(), unique.len() as u32);
                unique.push(item);
            }
        }
        let mut encoder = Self::with_capacity(bdd, name, unique.len(), primed)?;
        encoder.items = unique;
        encoder.codes = seen;
        Ok(encoder)
    }

    /// Registers `item`, returning its code and whether it is new.
    pub fn insert(&mut self, item: T) -> Result<(u32, bool)> {
        if let Some(&code) = self.codes.get(&item) {
            return Ok((code, false));
        }
        let index = self.items.len();
        if index >= self.pool.capacity() {
            return Err(Error::EncodingOverflow {
                pool: self.pool.name().to_string(),
                index,
                width: self.pool.width(),
            });
        }
        let code = index as u32;
        self.codes.insert(item.clone(), code);
        self.items.push(item);
        Ok((code, true))
    }

    pub fn pool(&self) -> &VarPool {
        &self.pool
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn code(&self, item: &T) -> Option<u32> {
        self.codes.get(item).copied()
    }

    pub fn item(&self, code: u32) -> Option<&T> {
        self.items.get(code as usize)
    }

    pub fn cube(&self, bdd: &Bdd, code: u32, side: Side) -> Ref {
        self.pool.cube(bdd, code, side)
    }

    pub fn encode(&self, bdd: &Bdd, item: &T, side: Side) -> Option<Ref> {
        self.code(item).map(|code| self.cube(bdd, code, side))
    }

    /// The item of the smallest cube in `f`.
    pub fn decode(&self, bdd: &Bdd, f: Ref, side: Side) -> Result<&T> {
        self.pool
            .decode(bdd, f, side)
            .and_then(|code| self.item(code))
            .ok_or_else(|| Error::UnknownCode {
                pool: self.pool.name().to_string(),
            })
    }

    /// Set of codes assigned so far.
    pub fn domain(&self, bdd: &Bdd, side: Side) -> Ref {
        self.pool.below(bdd, self.items.len(), side)
    }
}

/// One component of a world-configuration label, e.g. "where is b0".
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LabelSlot {
    pub name: String,
    pub values: Vec<String>,
}

impl LabelSlot {
    pub fn new<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Value index per slot, `None` when the slot is empty.
pub type Label = Vec<Option<usize>>;

/// Encodes labels slot by slot; code 0 of a slot means "no value".
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    slots: Vec<LabelSlot>,
    pools: Vec<VarPool>,
    atoms: HashMap<String, (usize, usize)>,
}

impl LabelEncoder {
    pub fn new(bdd: &Bdd, slots: Vec<LabelSlot>) -> Result<Self> {
        let pools = slots
            .iter()
            .map(|slot| VarPool::new(bdd, format!("label:{}", slot.name), width_for(slot.values.len() + 1), false))
            .collect::<Result<_>>()?;
        let mut atoms = HashMap::new();
        for (s, slot) in slots.iter().enumerate() {
            for (v, value) in slot.values.iter().enumerate() {
                atoms.entry(value.clone()).or_insert((s, v));
            }
        }
        Ok(Self { slots, pools, atoms })
    }

    pub fn slots(&self) -> &[LabelSlot] {
        &self.slots
    }

    pub fn vars(&self) -> Vec<Var> {
        self.pools
            .iter()
            .flat_map(|p| p.vars(Side::Current).iter().copied())
            .collect()
    }

    pub fn var_set(&self, bdd: &Bdd) -> Ref {
        bdd.var_set(self.vars())
    }

    pub fn cube(&self, bdd: &Bdd, label: &Label) -> Ref {
        bdd.apply_and_many(self.pools.iter().enumerate().map(|(s, pool)| {
            let code = label.get(s).copied().flatten().map_or(0, |v| v as u32 + 1);
            pool.cube(bdd, code, Side::Current)
        }))
    }

    /// Sub-cube of the slot holding the value named `atom`.
    pub fn atom(&self, bdd: &Bdd, atom: &str) -> Option<Ref> {
        let &(s, v) = self.atoms.get(atom)?;
        Some(self.pools[s].cube(bdd, v as u32 + 1, Side::Current))
    }

    pub fn decode(&self, bdd: &Bdd, f: Ref) -> Option<Label> {
        let bits = bdd.pick_cube(f, &self.vars())?;
        let mut label = Vec::with_capacity(self.slots.len());
        let mut offset = 0;
        for (slot, pool) in self.slots.iter().zip(&self.pools) {
            let code = VarPool::code_of(&bits[offset..offset + pool.width()]) as usize;
            offset += pool.width();
            label.push(if code == 0 || code > slot.values.len() {
                None
            } else {
                Some(code - 1)
            });
        }
        Some(label)
    }

    /// Atom names of a label, for display.
    pub fn describe(&self, label: &Label) -> Vec<&str> {
        self.slots
            .iter()
            .zip(label)
            .filter_map(|(slot, value)| value.map(|v| slot.values[v].as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use test_log::test;

    use super::*;

    #[test]
    fn test_width() {
        assert_eq!(width_for(0), 1);
        assert_eq!(width_for(1), 1);
        assert_eq!(width_for(2), 1);
        assert_eq!(width_for(3), 2);
        assert_eq!(width_for(4), 2);
        assert_eq!(width_for(5), 3);
        assert_eq!(width_for(1024), 10);
        assert_eq!(width_for(1025), 11);
        assert_eq!(width_for(1 << 32), 32);
        assert_eq!(width_for((1 << 32) + 1), 33);
        assert_eq!(width_for(usize::MAX), usize::BITS as usize);
    }

    #[test]
    fn test_capacity_beyond_codes_is_rejected() {
        let bdd = Bdd::default();
        let before = bdd.num_vars();
        let err = Encoder::<u32>::with_capacity(&bdd, "x", 16_628_357_005, true).unwrap_err();
        assert!(matches!(err, Error::EncodingOverflow { width: MAX_WIDTH, .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
        assert_eq!(bdd.num_vars(), before);

        let widest = Encoder::<u32>::with_capacity(&bdd, "y", 1 << 32, false).unwrap();
        assert_eq!(widest.pool().width(), MAX_WIDTH);
        let last = widest.pool().cube(&bdd, u32::MAX, Side::Current);
        assert_eq!(widest.pool().decode(&bdd, last, Side::Current), Some(u32::MAX));
        assert!(VarPool::new(&bdd, "z", MAX_WIDTH + 1, false).is_err());
    }

    #[test]
    fn test_round_trip() {
        let bdd = Bdd::default();
        let items = ["a", "b", "c", "d", "e"];
        let enc = Encoder::from_items(&bdd, "x", items, true).unwrap();
        assert_eq!(enc.pool().width(), 3);

        for item in items {
            for side in [Side::Current, Side::Next] {
                let cube = enc.encode(&bdd, &item, side).unwrap();
                assert_eq!(*enc.decode(&bdd, cube, side).unwrap(), item);
                let code = enc.code(&item).unwrap();
                assert_eq!(enc.cube(&bdd, code, side), cube);
            }
        }
    }

    #[test]
    fn test_next_pool_is_a_swap() {
        let bdd = Bdd::default();
        let enc = Encoder::from_items(&bdd, "x", 0..6, true).unwrap();
        let pairs: Vec<_> = enc.pool().pairs().collect();
        for item in 0..6 {
            let current = enc.encode(&bdd, &item, Side::Current).unwrap();
            let next = enc.encode(&bdd, &item, Side::Next).unwrap();
            assert_eq!(bdd.swap(current, &pairs), next);
        }
    }

    #[test]
    fn test_domain_counts_codes() {
        let bdd = Bdd::default();
        let enc = Encoder::from_items(&bdd, "x", 0..5, false).unwrap();
        let domain = enc.domain(&bdd, Side::Current);
        assert_eq!(bdd.sat_count(domain, enc.pool().vars(Side::Current)), BigUint::from(5u32));
        for item in 0..5 {
            assert!(bdd.is_implies(enc.encode(&bdd, &item, Side::Current).unwrap(), domain));
        }
    }

    #[test]
    fn test_overflow_is_configuration_error() {
        let bdd = Bdd::default();
        let mut enc = Encoder::<u32>::with_capacity(&bdd, "x", 3, true).unwrap();
        assert_eq!(enc.pool().capacity(), 4);
        for i in 0..4 {
            assert_eq!(enc.insert(i).unwrap(), (i, true));
        }
        assert_eq!(enc.insert(2).unwrap(), (2, false));
        let err = enc.insert(4).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_decode_unknown_code() {
        let bdd = Bdd::default();
        let enc = Encoder::from_items(&bdd, "x", ["a", "b", "c"], false).unwrap();
        let unused = enc.pool().cube(&bdd, 3, Side::Current);
        assert!(matches!(enc.decode(&bdd, unused, Side::Current), Err(Error::UnknownCode { .. })));
    }

    #[test]
    fn test_labels() {
        let bdd = Bdd::default();
        let labels = LabelEncoder::new(
            &bdd,
            vec![
                LabelSlot::new("b0", ["(on b0 l1)", "(on b0 l2)"]),
                LabelSlot::new("gripper", ["(gripper free)"]),
            ],
        )
        .unwrap();
        let label: Label = vec![Some(1), None];
        let cube = labels.cube(&bdd, &label);
        assert_eq!(labels.decode(&bdd, cube), Some(label.clone()));
        assert_eq!(labels.describe(&label), vec!["(on b0 l2)"]);

        let atom = labels.atom(&bdd, "(on b0 l2)").unwrap();
        assert!(bdd.is_implies(cube, atom));
        let free = labels.atom(&bdd, "(gripper free)").unwrap();
        assert!(bdd.is_zero(bdd.apply_and(cube, free)));
        assert!(labels.atom(&bdd, "(on b0 l3)").is_none());
    }
}
