//! # rectpack CLI
//!
//! Text input and output for the `rectpack` binary: [`InstanceParser`]
//! reads an instance, [`ResultWriter`] prints the placement of the best
//! packing, and [`load_config`] reads a JSON run configuration.

mod parser;
mod writer;

pub use parser::{load_config, parse_config, InstanceParser, ParseError};
pub use writer::{ResultWriter, PLACEMENT_HEADER};
