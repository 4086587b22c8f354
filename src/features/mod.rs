pub mod aggregate;
pub mod pipeline;
pub mod record;


pub use pipeline::*;
pub use record::*;
