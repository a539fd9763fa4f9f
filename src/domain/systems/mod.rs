// Per-turn simulation passes, applied in the fixed order `turn::advance` defines.

pub mod bullets;
pub mod collisions;
pub mod movement;
pub mod scanning;
