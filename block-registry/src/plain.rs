/// A marker for element types that can live in registry-managed memory.
///
/// Registries hand out memory that is zero-filled and never run destructors on it, so an element
/// type must be a plain, self-contained value.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - The all-zero bit pattern is a valid value of the type.
/// - The type owns no resources outside of its own bytes (no heap pointers, handles, or
///   references).
///
/// The `Copy + 'static` supertraits rule out drop glue and borrowed data. Structs can implement
/// this trait with `#[derive(Plain)]` from `block-registry-plain-derive`, which checks every field
/// at compile time.
pub unsafe trait Plain: Copy + 'static {}

macro_rules! impl_plain {
    ($($t:ty),* $(,)?) => {
        $(unsafe impl Plain for $t {})*
    };
}

impl_plain!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
);

unsafe impl<T, const N: usize> Plain for [T; N] where T: Plain {}

macro_rules! impl_plain_tuple {
    ($($name:ident),+) => {
        unsafe impl<$($name),+> Plain for ($($name,)+) where $($name: Plain),+ {}
    };
}

impl_plain_tuple!(A);
impl_plain_tuple!(A, B);
impl_plain_tuple!(A, B, C);
impl_plain_tuple!(A, B, C, D);
impl_plain_tuple!(A, B, C, D, E);
impl_plain_tuple!(A, B, C, D, E, F);
impl_plain_tuple!(A, B, C, D, E, F, G);
impl_plain_tuple!(A, B, C, D, E, F, G, H);
