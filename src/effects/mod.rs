//! Pixel compositing and transition blends.

pub mod blend;
pub mod composite;
