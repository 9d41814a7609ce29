// Presentation layer: guarded page routes returning JSON view models.

pub mod cards;
pub mod guards;
pub mod views;
