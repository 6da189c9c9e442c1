//! Macros for the scalar and tuple impls.

/// Integer scalars that narrow into a single word, with the 32-bit type they
/// are widened through. Arguments passed to callback:
/// 1. Rust Type
/// 2. Intermediate 32-bit Type (`u32` zero-extends, `i32` sign-extends)
macro_rules! for_each_narrow_int {
    ($m:ident) => {
        $m!(u8, u32);
        $m!(u16, u32);
        $m!(i8, i32);
        $m!(i16, i32);
        $m!(i32, i32);
    };
}

/// Provides `encode_array` as one contiguous little-endian blob.
macro_rules! packed_encode_array {
    ($ty:ty) => {
        fn encode_array(items: &[Self], ser: &mut crate::Serializer<'_>) -> crate::Result<()> {
            let mut raw = Vec::with_capacity(items.len() * std::mem::size_of::<$ty>());
            for v in items {
                raw.extend_from_slice(&v.to_le_bytes());
            }
            ser.bytes(&raw)
        }
    };
}

/// Provides `decode_array` from one contiguous little-endian blob.
macro_rules! packed_decode_array {
    ($ty:ty) => {
        fn decode_array<const N: usize>(de: &mut crate::Deserializer<'_>) -> crate::Result<[Self; N]> {
            const WIDTH: usize = std::mem::size_of::<$ty>();
            let raw = de.bytes()?;
            if raw.len() != N * WIDTH {
                return Err(crate::Error::ArrayLength { expected: N * WIDTH, found: raw.len() });
            }
            let mut out = [<$ty>::default(); N];
            for (slot, chunk) in out.iter_mut().zip(raw.chunks_exact(WIDTH)) {
                let mut le = [0u8; WIDTH];
                le.copy_from_slice(chunk);
                *slot = <$ty>::from_le_bytes(le);
            }
            Ok(out)
        }
    };
}

/// Generates `Encode`/`Decode` for a narrow integer carried in one word.
macro_rules! impl_narrow_int {
    ($ty:ty, $wide:ty) => {
        impl crate::Encode for $ty {
            fn encode(&self, ser: &mut crate::Serializer<'_>) -> crate::Result<()> {
                ser.word(*self as $wide as u32)
            }

            packed_encode_array!($ty);
        }

        impl crate::Decode for $ty {
            fn decode(de: &mut crate::Deserializer<'_>) -> crate::Result<Self> {
                let word = de.word()?;
                <$ty>::try_from(word as $wide)
                    .map_err(|_| crate::Error::OutOfRange { value: word, target: stringify!($ty) })
            }

            packed_decode_array!($ty);
        }
    };
}

/// Generates `Encode`/`Decode` for a tuple, elements left to right.
macro_rules! impl_tuple {
    ($($name:ident),+) => {
        impl<$($name: crate::Encode),+> crate::Encode for ($($name,)+) {
            #[allow(non_snake_case)]
            fn encode(&self, ser: &mut crate::Serializer<'_>) -> crate::Result<()> {
                let ($($name,)+) = self;
                $(crate::Encode::encode($name, ser)?;)+
                Ok(())
            }
        }

        impl<$($name: crate::Decode),+> crate::Decode for ($($name,)+) {
            fn decode(de: &mut crate::Deserializer<'_>) -> crate::Result<Self> {
                Ok(($($name::decode(de)?,)+))
            }
        }
    };
}
