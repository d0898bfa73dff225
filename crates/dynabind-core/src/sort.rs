//! In-place sorting over dynamically tagged elements.
//!
//! Two algorithms, both ascending and both mutating their input:
//!
//! - [`heap_sort_any`] is comparison-based and handles mixed `Int` /
//!   `Float32` / `Float64` elements. Comparison promotes both sides to
//!   the wider kind for the comparison only; stored tags are never
//!   rewritten. Heap sort is not stable, which is accepted.
//! - [`radix_sort_byte_list`] is a counting radix over the low byte,
//!   restricted to integer keys in `0..=255`. Inputs outside that domain
//!   fail fast instead of wrapping or truncating.
//!
//! Both validate the whole input before moving anything, so a rejected
//! input is left exactly as it was.

use std::cmp::Ordering;

use crate::error::SortError;
use crate::traits::SequenceHost;
use crate::value::DynamicValue;

/// Largest key the byte radix accepts. One low-order-byte counting pass
/// covers the whole supported domain.
pub const RADIX_MAX_KEY: i64 = 0xFF;

/// Total order over numeric tags.
///
/// `Int`/`Int` compares exactly; mixed comparisons promote to `f64` and
/// use `total_cmp`, so every pair of numeric values is ordered.
fn numeric_cmp(a: &DynamicValue<'_>, b: &DynamicValue<'_>) -> Ordering {
    match (a, b) {
        (DynamicValue::Int(x), DynamicValue::Int(y)) => x.cmp(y),
        _ => {
            // Validation already established both sides are numeric.
            let x = a.as_f64().unwrap_or(f64::NAN);
            let y = b.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
    }
}

/// Sort mixed numeric elements ascending, in place, via heap sort.
///
/// Non-numeric elements are rejected with
/// [`SortError::UnsupportedElement`] before any reordering. Correct for
/// any length, including 0 and 1.
pub fn heap_sort_any(items: &mut [DynamicValue<'_>]) -> Result<(), SortError> {
    for (index, item) in items.iter().enumerate() {
        if item.as_f64().is_none() {
            return Err(SortError::UnsupportedElement {
                index,
                kind: item.kind(),
            });
        }
    }
    let n = items.len();
    if n < 2 {
        return Ok(());
    }
    for root in (0..n / 2).rev() {
        sift_down(items, root, n);
    }
    for end in (1..n).rev() {
        items.swap(0, end);
        sift_down(items, 0, end);
    }
    Ok(())
}

/// Restore the max-heap property for `items[root..end]`.
fn sift_down(items: &mut [DynamicValue<'_>], mut root: usize, end: usize) {
    loop {
        let left = 2 * root + 1;
        if left >= end {
            return;
        }
        let right = left + 1;
        let mut largest = root;
        if numeric_cmp(&items[left], &items[largest]) == Ordering::Greater {
            largest = left;
        }
        if right < end && numeric_cmp(&items[right], &items[largest]) == Ordering::Greater {
            largest = right;
        }
        if largest == root {
            return;
        }
        items.swap(root, largest);
        root = largest;
    }
}

/// Sort byte-sized non-negative integer keys ascending, in place.
///
/// Every element must be `Int` in `0..=`[`RADIX_MAX_KEY`]. Non-integer
/// elements fail with [`SortError::UnsupportedElement`]; out-of-range
/// integers fail with [`SortError::KeyOutOfRange`]. On the valid domain
/// the output is identical to [`heap_sort_any`].
pub fn radix_sort_byte_list(items: &mut [DynamicValue<'_>]) -> Result<(), SortError> {
    let mut counts = [0usize; 256];
    for (index, item) in items.iter().enumerate() {
        match item {
            DynamicValue::Int(v) if (0..=RADIX_MAX_KEY).contains(v) => {
                counts[*v as usize] += 1;
            }
            DynamicValue::Int(v) => {
                return Err(SortError::KeyOutOfRange { index, value: *v });
            }
            other => {
                return Err(SortError::UnsupportedElement {
                    index,
                    kind: other.kind(),
                });
            }
        }
    }
    let mut cursor = items.iter_mut();
    for (key, &count) in counts.iter().enumerate() {
        for _ in 0..count {
            // counts sum to items.len(), so the cursor cannot run dry.
            if let Some(slot) = cursor.next() {
                *slot = DynamicValue::Int(key as i64);
            }
        }
    }
    Ok(())
}

/// Host-facing form of [`heap_sort_any`]: snapshot, sort, store back.
///
/// After a successful return the sequence object the host passed in
/// reflects the sorted order. On a domain error nothing is written back.
pub fn heap_sort_sequence(seq: &dyn SequenceHost) -> Result<(), SortError> {
    let mut items = seq.snapshot()?;
    heap_sort_any(&mut items)?;
    seq.store(&items)
}

/// Host-facing form of [`radix_sort_byte_list`].
pub fn radix_sort_sequence(seq: &dyn SequenceHost) -> Result<(), SortError> {
    let mut items = seq.snapshot()?;
    radix_sort_byte_list(&mut items)?;
    seq.store(&items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;
    use proptest::prelude::*;

    fn ints(values: &[i64]) -> Vec<DynamicValue<'static>> {
        values.iter().map(|&v| DynamicValue::Int(v)).collect()
    }

    #[test]
    fn heap_sort_orders_mixed_tags() {
        let mut items = vec![
            DynamicValue::Int(6),
            DynamicValue::Int(4),
            DynamicValue::Int(1),
            DynamicValue::Int(10),
            DynamicValue::Float64(0.3),
            DynamicValue::Float64(0.2),
            DynamicValue::Float64(0.7),
            DynamicValue::Float64(-3.14),
            DynamicValue::Float64(3.1),
        ];
        heap_sort_any(&mut items).unwrap();
        let expected = vec![
            DynamicValue::Float64(-3.14),
            DynamicValue::Float64(0.2),
            DynamicValue::Float64(0.3),
            DynamicValue::Float64(0.7),
            DynamicValue::Int(1),
            DynamicValue::Float64(3.1),
            DynamicValue::Int(4),
            DynamicValue::Int(6),
            DynamicValue::Int(10),
        ];
        assert_eq!(items, expected);
    }

    #[test]
    fn heap_sort_keeps_tags_intact() {
        let mut items = vec![DynamicValue::Float32(2.0), DynamicValue::Int(1)];
        heap_sort_any(&mut items).unwrap();
        assert_eq!(items[0].kind(), ValueKind::Int);
        assert_eq!(items[1].kind(), ValueKind::Float32);
    }

    #[test]
    fn heap_sort_trivial_lengths() {
        let mut empty: Vec<DynamicValue<'_>> = vec![];
        heap_sort_any(&mut empty).unwrap();
        assert!(empty.is_empty());

        let mut single = ints(&[7]);
        heap_sort_any(&mut single).unwrap();
        assert_eq!(single, ints(&[7]));
    }

    #[test]
    fn heap_sort_rejects_non_numeric_before_reordering() {
        let mut items = vec![
            DynamicValue::Int(2),
            DynamicValue::Int(1),
            DynamicValue::Bytes(b"x"),
        ];
        let err = heap_sort_any(&mut items).unwrap_err();
        assert_eq!(
            err,
            SortError::UnsupportedElement {
                index: 2,
                kind: ValueKind::Bytes
            }
        );
        // Fail-fast: nothing moved.
        assert_eq!(items[0], DynamicValue::Int(2));
        assert_eq!(items[1], DynamicValue::Int(1));
    }

    #[test]
    fn radix_sorts_byte_keys() {
        let mut items = ints(&[6, 4, 1, 10]);
        radix_sort_byte_list(&mut items).unwrap();
        assert_eq!(items, ints(&[1, 4, 6, 10]));
    }

    #[test]
    fn radix_rejects_out_of_range_keys() {
        for bad in [-1, 256, 1000] {
            let mut items = ints(&[3, bad, 5]);
            let err = radix_sort_byte_list(&mut items).unwrap_err();
            assert_eq!(err, SortError::KeyOutOfRange { index: 1, value: bad });
            assert_eq!(items, ints(&[3, bad, 5]));
        }
    }

    #[test]
    fn radix_rejects_float_elements() {
        let mut items = vec![DynamicValue::Int(1), DynamicValue::Float64(2.0)];
        let err = radix_sort_byte_list(&mut items).unwrap_err();
        assert_eq!(
            err,
            SortError::UnsupportedElement {
                index: 1,
                kind: ValueKind::Float64
            }
        );
    }

    proptest! {
        #[test]
        fn heap_sort_matches_reference_order(
            keys in prop::collection::vec(
                prop_oneof![
                    (-1000i64..1000).prop_map(|v| (v as f64, true)),
                    (-1e6f64..1e6).prop_map(|v| (v, false)),
                ],
                0..64,
            )
        ) {
            let mut items: Vec<DynamicValue<'_>> = keys
                .iter()
                .map(|&(v, is_int)| {
                    if is_int {
                        DynamicValue::Int(v as i64)
                    } else {
                        DynamicValue::Float64(v)
                    }
                })
                .collect();
            heap_sort_any(&mut items).unwrap();

            let mut reference: Vec<f64> = keys.iter().map(|&(v, _)| v).collect();
            reference.sort_by(f64::total_cmp);
            let sorted: Vec<f64> = items.iter().map(|v| v.as_f64().unwrap()).collect();
            prop_assert_eq!(sorted, reference);
        }

        #[test]
        fn radix_agrees_with_heap_sort_on_valid_domain(
            keys in prop::collection::vec(0i64..=255, 0..64)
        ) {
            let mut by_radix = ints(&keys);
            let mut by_heap = ints(&keys);
            radix_sort_byte_list(&mut by_radix).unwrap();
            heap_sort_any(&mut by_heap).unwrap();
            prop_assert_eq!(by_radix, by_heap);
        }
    }
}
