/// A trait to replace all elements in a container with zeros.
pub trait ZeroOut {
    fn zero_out(&mut self);
}

impl ZeroOut for f64 {
    fn zero_out(&mut self) {
        *self = 0.0;
    }
}

impl<T> ZeroOut for [T]
where
    T: ZeroOut,
{
    fn zero_out(&mut self) {
        for elem in self {
            elem.zero_out();
        }
    }
}

impl<T> ZeroOut for Vec<T>
where
    T: ZeroOut,
{
    fn zero_out(&mut self) {
        self.as_mut_slice().zero_out();
    }
}

/// Borrows `items[low]` mutably and `items[high]` immutably at once.
///
/// Panics unless `low < high < items.len()`.
pub fn split_low_mut<T>(items: &mut [T], low: usize, high: usize) -> (&mut T, &T) {
    assert!(low < high, "split_low_mut: {} must be below {}", low, high);
    let (before, after) = items.split_at_mut(high);
    (&mut before[low], &after[0])
}
