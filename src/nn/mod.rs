/// The layers
pub mod layers;
