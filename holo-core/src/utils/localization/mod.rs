//! Drive localization.
//!
//! [`DriveLocalizer`] turns raw wheel encoder counts and an absolute heading
//! into a per-cycle twist; the drive integrates it into a pose. Raw counters
//! pass through [`OverflowEncoder`] so hardware wrap-around never shows up as
//! a jump.

pub mod encoder;
pub mod localizer;

pub use encoder::OverflowEncoder;
pub use localizer::{DriveLocalizer, LocalizerInputs, TwistSample};
