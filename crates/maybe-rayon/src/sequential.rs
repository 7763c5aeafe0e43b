pub mod prelude {
    pub trait MaybeIndexedParallelIterator: Iterator {}

    pub trait IntoMaybeParallelIterator: IntoIterator + Sized {
        fn into_maybe_par_iter(self) -> Self::IntoIter {
            self.into_iter()
        }
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

    impl<I: Iterator> MaybeIndexedParallelIterator for I {}

    impl<I: IntoIterator> IntoMaybeParallelIterator for I {}

    impl<T: Send> MaybeParallelSliceMut<T> for [T] {
        fn maybe_par_chunks_mut<'data>(
            &'data mut self,
            chunk_size: usize,
        ) -> impl MaybeIndexedParallelIterator<Item = &'data mut [T]>
        where
            T: 'data,
        {
            self.chunks_mut(chunk_size)
        }
    }
}
