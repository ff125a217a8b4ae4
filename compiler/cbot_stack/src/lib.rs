//! Native stack growth for the recursive parts of the interpreter.
//!
//! Script execution itself never recurses on the native stack: the executor
//! keeps explicit frames. Two places still recurse:
//!
//! - the recursive-descent compiler, once per nested expression or block
//! - isolated executor runs (member initializers, destructors) started from
//!   inside an executor step, which can nest when an initializer constructs
//!   another object
//!
//! Both wrap their recursive entry points in [`ensure_sufficient_stack`] so a
//! deeply nested script grows the stack instead of aborting the host.

/// Grow when less than this much stack remains (100KB).
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the native stack if it is close to exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mimics the compiler descending into `((((...))))`.
    fn nested_parens(depth: u32) -> Result<u32, &'static str> {
        ensure_sufficient_stack(|| {
            if depth == 0 {
                Ok(0)
            } else {
                nested_parens(depth - 1).map(|d| d + 1)
            }
        })
    }

    #[test]
    fn shallow_nesting() {
        assert_eq!(nested_parens(16), Ok(16));
    }

    #[test]
    fn deep_nesting_grows_the_stack() {
        assert_eq!(nested_parens(100_000), Ok(100_000));
    }

    #[test]
    fn passes_through_the_closure_result() {
        assert_eq!(ensure_sufficient_stack(|| "done"), "done");
    }
}
