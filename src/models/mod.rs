pub mod pharmacy;
pub mod symptom;
pub mod user;

pub use pharmacy::*;
pub use symptom::*;
pub use user::*;
