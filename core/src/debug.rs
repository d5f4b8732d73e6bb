//! Debug render mode selector.
//!
//! Non-normal modes bypass sprite composition entirely and render straight
//! from VRAM; they exist so a host-side debug dump can visualize nametable
//! or pattern-table contents without touching the compositor.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Normal,
    Nametable0,
    Nametable1,
    Nametable2,
    Nametable3,
    PatternTables,
}
