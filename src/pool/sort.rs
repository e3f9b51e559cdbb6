//! Insertion sort for slices, that are expected to be (almost) sorted already.
//!
//! For such input every element is compared exactly once with its predecessor
//! and nothing is moved. Only out-of-order elements take the cold path, that
//! shifts them to their place. On adversarial input this degrades to the
//! quadratic worst case of insertion sort.

/// Sort `slice`, so that `precedes(a, b)` holds for each adjacent pair.
///
/// `precedes` has to be a strict order (e.g. `<` or `>`).
pub fn optimistic_sort_by<T, F>(slice: &mut [T], mut precedes: F)
where
    T: Copy,
    F: FnMut(&T, &T) -> bool,
{
    for end in 1..slice.len() {
        if !precedes(&slice[end - 1], &slice[end]) {
            insert_last(&mut slice[..=end], &mut precedes);
        }
    }
}

/// Move the last element of `slice` to the left until it is in place.
///
/// All elements but the last one have to be sorted already.
#[cold]
#[inline(never)]
fn insert_last<T, F>(slice: &mut [T], precedes: &mut F)
where
    T: Copy,
    F: FnMut(&T, &T) -> bool,
{
    let mut hole = slice.len() - 1;
    let key = slice[hole];
    while hole > 0 && !precedes(&slice[hole - 1], &key) {
        slice[hole] = slice[hole - 1];
        hole -= 1;
    }
    slice[hole] = key;
}

#[cfg(test)]
mod tests {
    use super::optimistic_sort_by;

    fn descending(slice: &mut [usize]) {
        optimistic_sort_by(slice, |a, b| a > b);
    }

    #[test]
    fn empty_and_single() {
        let mut empty: [usize; 0] = [];
        descending(&mut empty);

        let mut single = [7];
        descending(&mut single);
        assert_eq!(single, [7]);
    }

    #[test]
    fn already_sorted() {
        let mut slice = [9, 5, 4, 1, 0];
        descending(&mut slice);
        assert_eq!(slice, [9, 5, 4, 1, 0]);
    }

    #[test]
    fn nearly_sorted() {
        let mut slice = [9, 5, 6, 1, 0, 2];
        descending(&mut slice);
        assert_eq!(slice, [9, 6, 5, 2, 1, 0]);
    }

    #[test]
    fn reversed() {
        let mut slice = [0, 1, 2, 3, 4, 5, 6, 7];
        descending(&mut slice);
        assert_eq!(slice, [7, 6, 5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn ascending_order() {
        let mut slice = [3, 1, 2, 8, 5];
        optimistic_sort_by(&mut slice, |a, b| a < b);
        assert_eq!(slice, [1, 2, 3, 5, 8]);
    }
}
