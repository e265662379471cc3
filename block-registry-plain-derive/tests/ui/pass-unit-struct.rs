use block_registry::Plain;
use block_registry_plain_derive::Plain;

#[derive(Clone, Copy, Plain)]
struct Empty;

#[derive(Clone, Copy, Plain)]
struct Wrapper(Empty, u8);

fn assert_plain<T: Plain>() {}

fn main() {
    assert_plain::<Empty>();
    assert_plain::<Wrapper>();
}
