pub mod prelude {
    pub use rayon::iter::{IndexedParallelIterator, ParallelIterator};
    use rayon::prelude::*;

    pub trait MaybeIndexedParallelIterator: IndexedParallelIterator {}

    pub trait IntoMaybeParallelIterator: IntoParallelIterator {
        fn into_maybe_par_iter(self) -> Self::Iter;
    }

    pub trait MaybeParallelSliceMut<T: Send> {
        fn maybe_par_chunks_mut<'data>(
            &'data mut self,
            chunk_size: usize,
        ) -> impl MaybeIndexedParallelIterator<Item = &'data mut [T]>
        where
            T: 'data;
    }

    // Implementations

    impl<I: IndexedParallelIterator> MaybeIndexedParallelIterator for I {}

    impl<I: IntoParallelIterator> IntoMaybeParallelIterator for I {
        fn into_maybe_par_iter(self) -> Self::Iter {
            self.into_par_iter()
        }
    }

    impl<T: Send> MaybeParallelSliceMut<T> for [T] {
        fn maybe_par_chunks_mut<'data>(
            &'data mut self,
            chunk_size: usize,
        ) -> impl MaybeIndexedParallelIterator<Item = &'data mut [T]>
        where
            T: 'data,
        {
            self.par_chunks_mut(chunk_size)
        }
    }
}
