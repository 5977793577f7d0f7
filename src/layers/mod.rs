pub mod dense;
pub mod initialization;

pub use dense::{Layer, LayerRole};
pub use initialization::WeightInit;
