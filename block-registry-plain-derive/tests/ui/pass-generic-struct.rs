use block_registry::BlockRegistry;
use block_registry_plain_derive::Plain;

#[derive(Clone, Copy, Plain)]
struct Sample<T, const N: usize>
where
    T: Copy,
{
    channels: [T; N],
    timestamp: u64,
}

fn main() {
    let registry = BlockRegistry::<Sample<i16, 2>>::new();
    let block = registry.allocate(480).unwrap();
    assert_eq!(registry.get(block).unwrap()[479].channels, [0, 0]);
    assert_eq!(registry.get(block).unwrap()[0].timestamp, 0);
}
