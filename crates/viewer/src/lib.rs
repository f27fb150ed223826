//! Depth-sorted geometry viewer for scene JSON models.
//!
//! Correct alpha blending needs primitives drawn back to front. The core
//! of this crate is the CPU depth-sort path: quantized 16-bit eye-space
//! keys ([`depth`]), a radix sorter over them ([`sort`]), and a debounce
//! scheduler ([`scheduler`]) that decides when a camera move is worth a
//! re-sort. The [`renderer`] turns sorted primitive order into wgpu index
//! buffers each time the sort runs.

pub mod app;
pub mod camera;
pub mod colour;
pub mod commands;
pub mod depth;
pub mod renderer;
pub mod scheduler;
pub mod sort;
pub mod ui;
pub mod vertex;
