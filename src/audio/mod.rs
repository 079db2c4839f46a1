//! Platform audio I/O via CPAL.

pub mod device;

pub use device::{AudioIo, list_input_devices, list_output_devices, suppress_audio_warnings};
