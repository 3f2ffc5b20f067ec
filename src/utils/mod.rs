//! # Utility Functions and Types
//!
//! Common helpers used throughout the tsio library:
//!
//! - Bit-level reading for headers whose fields cross byte boundaries
//! - MPEG-2 CRC32 calculation for PSI table sections
//!
//! ```rust
//! use tsio::utils::BitReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = vec![0b10110011u8];
//! let mut reader = BitReader::new(&data);
//!
//! let value = reader.read_bits(3)?; // Reads first 3 bits (101)
//! assert_eq!(value, 0b101);
//! # Ok(())
//! # }
//! ```

/// Bit manipulation and bitstream reading utilities
pub mod bits;

/// CRC calculation implementations
pub mod crc;

// Re-export commonly used types
pub use bits::*;
pub use crc::Crc32Mpeg2;
