//! # capsule-image
//!
//! Image handling for the capsule pipeline.
//!
//! This crate provides:
//! - Image reference parsing and validation
//! - Platform constraints for pull selection
//! - The [`ImageSource`] capability and the [`FromImage`] source

#![warn(missing_docs)]

pub mod platform;
pub mod reference;
pub mod source;

pub use platform::Platform;
pub use reference::ImageReference;
pub use source::{FromImage, FromImageOption, ImageSource, from_image, with_image_platform};
