//! hueloop-export: Pure animation serializers (sans-IO)
//!
//! Converts a synthesized [`Animation`](hueloop_pipeline::Animation)
//! into output formats. Currently supports looping GIF.

pub mod gif;

pub use gif::{ExportError, delay_centiseconds, to_gif_bytes, validate, write_gif};
