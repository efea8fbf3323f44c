pub mod assemble;
pub mod extrude;
pub mod mesh;
pub mod plate;

pub use assemble::*;
pub use extrude::*;
pub use mesh::*;
pub use plate::*;
