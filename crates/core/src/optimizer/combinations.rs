//! Lazy enumeration of fixed-size subsets.

/// Iterator over all `k`-element index subsets of `0..n`.
///
/// Subsets come out in lexicographic order of their (ascending) indices, so
/// for a catalog-ordered provider list the enumeration order is stable.
/// Yields nothing for `k == 0` or `k > n`.
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    indices: Vec<usize>,
    done: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            done: k == 0 || k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let current = self.indices.clone();

        // Advance: find the rightmost index that can still move right.
        let k = self.indices.len();
        let mut i = k;
        loop {
            if i == 0 {
                self.done = true;
                break;
            }
            i -= 1;
            if self.indices[i] < self.n - k + i {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                break;
            }
        }

        Some(current)
    }
}

/// All `size`-element subsets of `items`, in stable order.
pub fn combinations<T>(items: &[T], size: usize) -> impl Iterator<Item = Vec<&T>> + '_ {
    Combinations::new(items.len(), size)
        .map(move |indices| indices.into_iter().map(|i| &items[i]).collect())
}

/// Index subsets for every size in `1..=max_size`, smallest sizes first.
pub fn subsets_up_to(n: usize, max_size: usize) -> impl Iterator<Item = Vec<usize>> {
    (1..=max_size).flat_map(move |size| Combinations::new(n, size))
}

/// Binomial coefficient `C(n, k)`, saturating on overflow.
pub fn binomial(n: usize, k: usize) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k) as u64;
    let n = n as u64;
    let mut result: u64 = 1;
    for i in 0..k {
        result = match result.checked_mul(n - i) {
            Some(v) => v / (i + 1),
            None => return u64::MAX,
        };
    }
    result
}

/// Number of subsets of sizes `1..=max_size` drawn from `n` items.
pub fn subset_count(n: usize, max_size: usize) -> u64 {
    (1..=max_size).fold(0u64, |acc, k| acc.saturating_add(binomial(n, k)))
}
