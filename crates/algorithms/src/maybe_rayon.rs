//! Parallel or sequential iteration, depending on the `parallel` feature.
//!
//! With the feature on this is rayon's prelude. Without it, `into_par_iter`
//! becomes `into_iter` so the rest of the chain (`map`, `flat_map`,
//! `collect`) resolves to the standard `Iterator` methods.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    pub trait IntoParallelIterator {
        type Iter: Iterator<Item = Self::Item>;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
