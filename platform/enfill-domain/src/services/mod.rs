pub mod canonical;
pub mod features;
pub mod forest;
pub mod frequency;
pub mod imputation;
pub mod normalize;
pub mod resample;
pub mod sufficiency;
