use std::ops::Index;

/// Capacity used when an array is created with a capacity of 0.
pub const DEFAULT_CAPACITY: usize = 512;

/// Growable array with an explicit, caller-driven shrink policy.
///
/// Capacity is tracked separately from the backing `Vec` so growth follows a
/// fixed doubling schedule and never shrinks on its own: `remove` and `pop`
/// leave capacity alone until [`DArray::shrink`] is called. The initial
/// capacity is the floor shrink never goes below.
#[derive(Debug, Clone)]
pub struct DArray<T> {
    items: Vec<T>,
    capacity: usize,
    floor: usize,
}

impl<T> DArray<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an array with room for `capacity` elements; 0 selects
    /// [`DEFAULT_CAPACITY`].
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = if capacity == 0 { DEFAULT_CAPACITY } else { capacity };
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
            floor: capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, value: T) {
        self.grow_for_one();
        self.items.push(value);
    }

    /// Inserts at `index`, shifting the tail right. Out-of-range indices
    /// append.
    pub fn insert(&mut self, index: usize, value: T) {
        self.grow_for_one();
        let index = index.min(self.items.len());
        self.items.insert(index, value);
    }

    /// Removes and returns the element at `index`, shifting the tail left.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Element at `index % len`; `None` when empty.
    pub fn get_round(&self, index: usize) -> Option<&T> {
        if self.items.is_empty() {
            return None;
        }
        self.items.get(index % self.items.len())
    }

    pub fn reverse(&mut self) {
        self.items.reverse();
    }

    /// Drops every element. Capacity is kept.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Releases surplus capacity.
    ///
    /// An empty array returns to its floor. Otherwise the target is
    /// `len + capacity / 4`, applied only when it is smaller than the current
    /// capacity, and clamped to the floor.
    pub fn shrink(&mut self) {
        let target = if self.items.is_empty() {
            self.floor
        } else {
            (self.items.len() + self.capacity / 4).max(self.floor)
        };

        if target < self.capacity {
            self.capacity = target;
            self.items.shrink_to(target);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// First element matching `pred`, with its index.
    pub fn find(&self, mut pred: impl FnMut(&T) -> bool) -> Option<(usize, &T)> {
        self.items.iter().enumerate().find(|(_, v)| pred(v))
    }

    pub fn find_mut(&mut self, mut pred: impl FnMut(&T) -> bool) -> Option<(usize, &mut T)> {
        self.items.iter_mut().enumerate().find(|(_, v)| pred(v))
    }

    fn grow_for_one(&mut self) {
        if self.items.len() < self.capacity {
            return;
        }
        self.capacity = self
            .capacity
            .checked_mul(2)
            .unwrap_or(self.capacity + 1)
            .max(self.capacity + 1);
        self.items.reserve_exact(self.capacity - self.items.len());
    }
}

impl<T> Default for DArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for DArray<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a DArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> Extend<T> for DArray<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for v in iter {
            self.push(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── creation / growth ─────────────────────────────────────────────────

    #[test]
    fn zero_capacity_selects_default() {
        let a: DArray<u32> = DArray::with_capacity(0);
        assert_eq!(a.capacity(), DEFAULT_CAPACITY);
        assert!(a.is_empty());
    }

    #[test]
    fn push_doubles_capacity_when_full() {
        let mut a = DArray::with_capacity(2);
        a.push(1);
        a.push(2);
        assert_eq!(a.capacity(), 2);
        a.push(3);
        assert_eq!(a.capacity(), 4);
        a.extend([4, 5]);
        assert_eq!(a.capacity(), 8);
        assert_eq!(a.as_slice(), &[1, 2, 3, 4, 5]);
    }

    // ── insert / remove ───────────────────────────────────────────────────

    #[test]
    fn insert_shifts_tail_and_clamps_index() {
        let mut a = DArray::with_capacity(4);
        a.extend([1, 3]);
        a.insert(1, 2);
        a.insert(99, 4);
        assert_eq!(a.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn remove_returns_owned_value_without_shrinking() {
        let mut a = DArray::with_capacity(1);
        a.extend(["a".to_string(), "b".to_string(), "c".to_string()]);
        let cap = a.capacity();
        assert_eq!(a.remove(1).as_deref(), Some("b"));
        assert_eq!(a.pop().as_deref(), Some("c"));
        assert_eq!(a.remove(5), None);
        assert_eq!(a.len(), 1);
        assert_eq!(a.capacity(), cap);
    }

    #[test]
    fn len_tracks_successful_operations() {
        let mut a = DArray::with_capacity(3);
        let mut expected = 0usize;
        for i in 0..50usize {
            match i % 5 {
                0 | 1 => {
                    a.push(i);
                    expected += 1;
                }
                2 => {
                    a.insert(i, i);
                    expected += 1;
                }
                3 => {
                    if a.remove(i % 7).is_some() {
                        expected -= 1;
                    }
                }
                _ => {
                    if a.pop().is_some() {
                        expected -= 1;
                    }
                }
            }
            assert_eq!(a.len(), expected);
            assert!(a.len() <= a.capacity());
        }
    }

    // ── lookup ────────────────────────────────────────────────────────────

    #[test]
    fn get_past_len_is_none() {
        let mut a = DArray::with_capacity(8);
        a.extend([10, 20]);
        assert_eq!(a.get(1), Some(&20));
        assert_eq!(a.get(2), None);
        assert_eq!(a.get(7), None);
    }

    #[test]
    fn get_round_wraps_and_handles_empty() {
        let mut a = DArray::with_capacity(4);
        assert_eq!(a.get_round(3), None);
        a.extend([10, 20, 30]);
        for i in 0..20 {
            assert_eq!(a.get_round(i), a.get(i % 3));
        }
    }

    #[test]
    fn find_returns_first_match() {
        let mut a = DArray::with_capacity(4);
        a.extend([5, 6, 7, 6]);
        assert_eq!(a.find(|&v| v == 6), Some((1, &6)));
        if let Some((_, v)) = a.find_mut(|&v| v == 7) {
            *v = 70;
        }
        assert_eq!(a[2], 70);
        assert!(a.find(|&v| v == 100).is_none());
    }

    #[test]
    fn reverse_and_clear() {
        let mut a = DArray::with_capacity(4);
        a.extend([1, 2, 3]);
        a.reverse();
        assert_eq!(a.as_slice(), &[3, 2, 1]);
        a.clear();
        assert!(a.is_empty());
        assert_eq!(a.capacity(), 4);
    }

    // ── shrink ────────────────────────────────────────────────────────────

    #[test]
    fn shrink_empty_returns_to_floor() {
        let mut a = DArray::with_capacity(4);
        a.extend(0..40);
        assert_eq!(a.capacity(), 64);
        a.clear();
        a.shrink();
        assert_eq!(a.capacity(), 4);
    }

    #[test]
    fn shrink_targets_len_plus_quarter() {
        let mut a = DArray::with_capacity(4);
        a.extend(0..40);
        while a.len() > 10 {
            a.pop();
        }
        a.shrink();
        assert_eq!(a.capacity(), 10 + 64 / 4);
        assert_eq!(a.len(), 10);
    }

    #[test]
    fn shrink_never_grows_or_drops_below_floor() {
        let mut a = DArray::with_capacity(16);
        a.extend(0..15);
        a.shrink();
        assert_eq!(a.capacity(), 16);

        let mut b = DArray::with_capacity(16);
        b.extend(0..40);
        while b.len() > 1 {
            b.pop();
        }
        b.shrink();
        assert_eq!(b.capacity(), 1 + 64 / 4);
        b.pop();
        b.shrink();
        assert_eq!(b.capacity(), 16);
    }
}
