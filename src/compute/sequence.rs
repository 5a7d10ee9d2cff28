//! Fibonacci arithmetic.
//!
//! Pure functions with no cache or I/O. The evaluator layers memoization on
//! top of [`advance`].

/// Largest index whose value fits in an `i64`.
///
/// `Fib(93)` is 12200160415121876738, which exceeds `i64::MAX`.
pub const MAX_FIB_INDEX: u32 = 92;

/// A pair of consecutive sequence values `(Fib(k-1), Fib(k))` anchored at `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed {
    pub index: u32,
    pub prev: i64,
    pub current: i64,
}

impl Seed {
    /// The `(Fib(0), Fib(1))` base case.
    pub const BASE: Seed = Seed {
        index: 1,
        prev: 0,
        current: 1,
    };
}

/// Walk forward from `seed` to `target`, handing every newly produced
/// `(index, value)` to `emit`. Returns `Fib(target)`.
///
/// Runs in O(target - seed.index) time and constant space. `target` must not
/// be below `seed.index - 1` and must not exceed [`MAX_FIB_INDEX`].
pub fn advance<F>(seed: Seed, target: u32, mut emit: F) -> i64
where
    F: FnMut(u32, i64),
{
    debug_assert!(target <= MAX_FIB_INDEX);

    if target + 1 == seed.index {
        return seed.prev;
    }

    let (mut a, mut b) = (seed.prev, seed.current);
    for i in (seed.index + 1)..=target {
        // Cannot overflow while target <= MAX_FIB_INDEX.
        let next = a + b;
        a = b;
        b = next;
        emit(i, b);
    }
    b
}

/// Iterative `Fib(n)` without a cache.
pub fn fib(n: u32) -> i64 {
    if n == 0 {
        return 0;
    }
    advance(Seed::BASE, n, |_, _| {})
}

/// Naive doubly-recursive `Fib(n)`.
///
/// Exponential time. Only useful as a reference value in tests and as a
/// slow baseline for timing comparisons; never on the serving path.
pub fn fib_slow(n: u32) -> i64 {
    match n {
        0 => 0,
        1 => 1,
        _ => fib_slow(n - 1) + fib_slow(n - 2),
    }
}
