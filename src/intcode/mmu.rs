// SPDX-FileCopyrightText: 2025 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};

const PAGE_SIZE: usize = 512;
const PAGE_MASK: i64 = 0x1ff;

macro_rules! page_index {
    ($i: expr) => {{
        #[allow(clippy::cast_sign_loss, reason = "masked down anyway")]
        {
            ($i & PAGE_MASK) as usize
        }
    }};
}

macro_rules! page_base {
    ($i: expr) => {{ $i & !PAGE_MASK }};
}

/// Sparse, paged memory.
///
/// Every address reads as `0` until written. Pages are allocated on first write, so programs that
/// write to far-off addresses (as relative-mode programs tend to) don't allocate everything in
/// between. Callers are responsible for rejecting negative addresses.
#[derive(Clone, Default)]
pub(super) struct IntcodeMem {
    pages: HashMap<i64, Box<[i64; PAGE_SIZE]>>,
}

static EMPTY: [i64; PAGE_SIZE] = [0; PAGE_SIZE];

impl IntcodeMem {
    fn page(&self, base: i64) -> &[i64; PAGE_SIZE] {
        self.pages.get(&base).map_or(&EMPTY, |p| p.as_ref())
    }

    /// Number of pages currently backed by an allocation
    #[cfg(test)]
    pub(super) fn allocated_pages(&self) -> usize {
        self.pages.len()
    }

    /// Drop every page that only holds zeroes
    pub(super) fn prune(&mut self) {
        self.pages.retain(|_, page| page[..] != EMPTY);
        self.pages.shrink_to_fit();
    }
}

impl PartialEq for IntcodeMem {
    fn eq(&self, other: &Self) -> bool {
        // a missing page and an all-zero page are the same thing
        self.pages
            .keys()
            .chain(other.pages.keys())
            .all(|&base| self.page(base) == other.page(base))
    }
}

impl Eq for IntcodeMem {}

impl FromIterator<i64> for IntcodeMem {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut pages = HashMap::with_capacity(iter.size_hint().0.div_ceil(PAGE_SIZE));

        for (n, chunk) in (&iter.chunks(PAGE_SIZE)).into_iter().enumerate() {
            let mut page = Box::new([0; PAGE_SIZE]);
            page.iter_mut().zip(chunk).for_each(|(slot, val)| *slot = val);
            #[allow(clippy::cast_possible_wrap, reason = "page count fits in an i64")]
            let base = (n * PAGE_SIZE) as i64;
            pages.insert(base, page);
        }

        Self { pages }
    }
}

impl Index<i64> for IntcodeMem {
    type Output = i64;
    fn index(&self, i: i64) -> &i64 {
        debug_assert!(i >= 0, "negative address {i} reached memory");
        &self.page(page_base!(i))[page_index!(i)]
    }
}

impl IndexMut<i64> for IntcodeMem {
    fn index_mut(&mut self, i: i64) -> &mut i64 {
        debug_assert!(i >= 0, "negative address {i} reached memory");
        &mut self
            .pages
            .entry(page_base!(i))
            .or_insert_with(|| Box::new([0; PAGE_SIZE]))[page_index!(i)]
    }
}

impl fmt::Debug for IntcodeMem {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = fmt.debug_map();
        for base in self.pages.keys().sorted_unstable() {
            if self.pages[base][..] != EMPTY {
                map.entry(
                    &format_args!("{{ page 0x{base:04x} }}"),
                    &format_args!("{:?}", self.pages[base]),
                );
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_reads_zero() {
        let mem: IntcodeMem = [1, 2, 3].into_iter().collect();
        assert_eq!(mem[2], 3);
        assert_eq!(mem[3], 0);
        assert_eq!(mem[1_000_000], 0);
        assert_eq!(mem.allocated_pages(), 1);
    }

    #[test]
    fn far_writes_allocate_one_page() {
        let mut mem = IntcodeMem::default();
        mem[2005] = 7;
        assert_eq!(mem.allocated_pages(), 1);
        assert_eq!(mem[2005], 7);
        assert_eq!(mem[2004], 0);
    }

    #[test]
    fn zeroed_pages_compare_equal() {
        let mut a: IntcodeMem = (0..600).collect();
        let b = a.clone();
        a[5000] = 1;
        assert_ne!(a, b);
        a[5000] = 0;
        assert_eq!(a, b);
        a.prune();
        assert_eq!(a.allocated_pages(), 2);
        assert_eq!(a, b);
    }
}
