/// f32 tensors and kernels
pub mod f32;
