//! Attribute filtering and the seeded quicksort that fixes wire order.
//!
//! Attributes sharing an offset keep whatever relative order this particular
//! quicksort leaves them in, and the data on disk was written in that order.
//! Any other sort (stable or not) can permute ties differently, so this has to
//! stay bit-for-bit identical.

use std::cmp::Ordering;

use super::SerialAttr;

const LCG_MUL: u32 = 0x19660D;
const LCG_ADD: u32 = 0x3C6EF35F;

/// Drop attributes with no wire presence: save-state-only and property-only.
pub fn filter_serializable_attrs(attrs: Vec<SerialAttr>) -> Vec<SerialAttr> {
    attrs
        .into_iter()
        .filter(|a| a.info.serializable && !a.info.is_save_state_only())
        .collect()
}

/// Order attributes by absolute offset using the seeded quicksort.
pub fn sort_serializable_attrs(attrs: &mut [SerialAttr]) {
    seeded_quicksort_by(attrs, |a, b| a.offset().cmp(&b.offset()));
}

/// Non-stable quicksort with LCG pivot selection and Hoare-style partitioning.
///
/// The generator state starts at zero and is threaded through the recursion
/// (left partition first), advancing once per partitioned range.
pub fn seeded_quicksort_by<T, F>(items: &mut [T], mut cmp: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() < 2 {
        return;
    }
    let mut state = 0u32;
    quicksort(items, &mut cmp, 0, items.len() as isize - 1, &mut state);
}

fn quicksort<T, F>(items: &mut [T], cmp: &mut F, left: isize, right: isize, state: &mut u32)
where
    F: FnMut(&T, &T) -> Ordering,
{
    if left >= right {
        return;
    }
    *state = state.wrapping_mul(LCG_MUL).wrapping_add(LCG_ADD);
    let pivot = (*state >> 8) as isize % (right - left);
    items.swap((left + pivot) as usize, right as usize);

    let mid = partition(items, cmp, left, right);
    quicksort(items, cmp, left, mid - 1, state);
    quicksort(items, cmp, mid + 1, right, state);
}

/// Partition around `items[right]`; returns the pivot's final index.
fn partition<T, F>(items: &mut [T], cmp: &mut F, left: isize, right: isize) -> isize
where
    F: FnMut(&T, &T) -> Ordering,
{
    let r = right as usize;
    let mut start = left - 1;
    let mut end = right;
    loop {
        loop {
            start += 1;
            if !(start < end && cmp(&items[start as usize], &items[r]) == Ordering::Less) {
                break;
            }
        }
        loop {
            end -= 1;
            if !(end > start && cmp(&items[r], &items[end as usize]) == Ordering::Less) {
                break;
            }
        }
        if start >= end {
            break;
        }
        items.swap(start as usize, end as usize);
    }
    items.swap(start as usize, r);
    start
}
