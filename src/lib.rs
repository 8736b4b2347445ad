//! Oblivious key-value store built on a 3-hash two-core garbled cuckoo table.
//!
//! ```no_run
//! use h3gct::{H3TcGctOkvs, HashKeys, OkvsDecoder, OkvsEncoder, OkvsParams};
//!
//! let params = OkvsParams::new(1000, 128)?;
//! let okvs = H3TcGctOkvs::new(params, &HashKeys::from_entropy());
//! let map: Vec<(u64, Vec<u8>)> = (0..1000).map(|i| (i, vec![i as u8; 16])).collect();
//! let storage = okvs.encode(&map)?;
//! assert_eq!(okvs.decode(&storage, &42u64)?, vec![42u8; 16]);
//! # Ok::<(), h3gct::OkvsError>(())
//! ```

pub mod assembler;
pub mod bitstring;
pub mod error;
pub mod gct;
pub mod hash;
pub mod hypergraph;
pub mod okvs;
pub mod oracle;
pub mod params;
pub mod peeling;
pub mod solver;
pub mod utils;

pub use bitstring::BitString;
pub use error::{OkvsError, Result};
pub use gct::H3TcGctOkvs;
pub use okvs::{OkvsDecoder, OkvsEncoder};
pub use oracle::HashKeys;
pub use params::{FillMode, OkvsParams};
