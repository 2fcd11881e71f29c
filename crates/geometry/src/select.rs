//! Linear-time order statistics.

/// Groups of this size are used for the median-of-medians pivot.
const GROUP: usize = 5;

/// The `k`-th smallest value (zero-based) of `values`, or `None` when
/// `k >= values.len()`.
///
/// Runs in worst-case linear time using the median-of-medians pivot and a
/// three-way partition, so long runs of equal values do not degrade it.
/// Values must be totally ordered; the result for inputs holding NaN is
/// unspecified.
pub fn select_kth<T: PartialOrd + Copy>(values: &[T], k: usize) -> Option<T> {
    if k >= values.len() {
        return None;
    }
    Some(select(values.to_vec(), k))
}

/// The element at index `len / 2` of the sorted multiset, or `None` for an
/// empty slice. For even lengths that is the upper of the two middle
/// values.
pub fn median<T: PartialOrd + Copy>(values: &[T]) -> Option<T> {
    select_kth(values, values.len() / 2)
}

fn select<T: PartialOrd + Copy>(mut values: Vec<T>, mut k: usize) -> T {
    loop {
        if values.len() <= GROUP {
            insertion_sort(&mut values);
            return values[k];
        }
        let pivot = pivot(&values);
        let mut less = Vec::new();
        let mut greater = Vec::new();
        let mut equal = 0;
        for &v in &values {
            if v < pivot {
                less.push(v);
            } else if v > pivot {
                greater.push(v);
            } else {
                equal += 1;
            }
        }
        if k < less.len() {
            values = less;
        } else if k < less.len() + equal {
            return pivot;
        } else {
            k -= less.len() + equal;
            values = greater;
        }
    }
}

/// Median of the medians of consecutive groups of five.
fn pivot<T: PartialOrd + Copy>(values: &[T]) -> T {
    let medians: Vec<T> = values
        .chunks(GROUP)
        .map(|group| {
            let mut group = group.to_vec();
            insertion_sort(&mut group);
            group[group.len() / 2]
        })
        .collect();
    let mid = medians.len() / 2;
    select(medians, mid)
}

fn insertion_sort<T: PartialOrd + Copy>(values: &mut [T]) {
    for i in 1..values.len() {
        let mut j = i;
        while j > 0 && values[j] < values[j - 1] {
            values.swap(j, j - 1);
            j -= 1;
        }
    }
}
