//! Mapping between the object tree and the TLV wire format.
//!
//! Three faces of the same schema:
//!
//! - [`encode`] turns owned [`Circuit`](crate::Circuit)s and
//!   [`Module`](crate::Module)s into serialized buffers;
//! - [`decode`] materializes owned objects from buffers;
//! - [`read`] navigates a buffer in place, decoding individual fields on
//!   demand without materializing the tree.
//!
//! A serialized circuit is decodable on its own; a serialized module embeds
//! one complete circuit buffer per member circuit.

pub mod decode;
pub mod encode;
pub mod read;
