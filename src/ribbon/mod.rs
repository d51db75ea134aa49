//! Ribbon module
//!
//! A volume-preserving sub-chain between two joints: two rails, a row of
//! sample drivers interpolated between them, and one deformer joint per
//! sample whose cross-section thins as the ribbon stretches.

mod config;
mod deformer;
mod strip;

pub use config::{Falloff, RibbonConfig, TwistMode};
pub use deformer::{RibbonDeformer, RibbonRig, RibbonStage};
pub use strip::{sample_params, LinearStrip, StripProvider};
