/// Identity that placed bricks are attributed to, so they can be cleared as a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Owner {
    pub id: &'static str,
    pub name: &'static str,
}

pub const OWNERS: [Owner; 2] = [
    Owner {
        id: "c4f9159c-2a1a-3131-b10e-296e950fe7f6",
        name: "GBA EMU",
    },
    Owner {
        id: "c4f9159c-2a1a-3131-b10e-296e950fe7f7",
        name: "GBA EMU B",
    },
];

/// Index of the other owner
pub fn other(slot: usize) -> usize {
    1 - (slot & 1)
}
