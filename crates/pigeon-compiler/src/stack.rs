//! Stack growth for recursive tree walks.

/// Remaining stack below which [`ensure_sufficient_stack`] grows it.
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Runs `f`, first moving to a fresh stack segment if little space remains.
///
/// Called on each recursive step of the analyzer and evaluator.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(n: u32) -> u32 {
        ensure_sufficient_stack(|| if n == 0 { 0 } else { 1 + depth(n - 1) })
    }

    #[test]
    fn deep_recursion_does_not_overflow() {
        assert_eq!(depth(200_000), 200_000);
    }
}
