pub mod frequency;
pub mod point;
pub mod series;
