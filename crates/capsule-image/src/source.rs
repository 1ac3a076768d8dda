//! Image sources.
//!
//! An [`ImageSource`] turns an abstract description of an image into a
//! reference the runtime can create a container from. Sources only resolve
//! names; they never create runtime-side resources.

use std::fmt;

use async_trait::async_trait;
use capsule_common::{CapsuleResult, ExecutionContext};

use crate::platform::Platform;
use crate::reference::ImageReference;

/// Resolves an image reference for the runtime create call.
#[async_trait]
pub trait ImageSource: Send + Sync + fmt::Debug {
    /// Resolve the reference to create the container from.
    ///
    /// Repeated calls with the same source and context return the same
    /// reference.
    async fn prepare(&self, ctx: &ExecutionContext) -> CapsuleResult<String>;

    /// Platform the runtime should select when pulling, if constrained.
    fn platform(&self) -> Option<&Platform> {
        None
    }
}

/// Option applied to a [`FromImage`] source.
pub type FromImageOption = Box<dyn FnOnce(&mut FromImage) + Send>;

/// Source backed by an existing image tag.
#[derive(Debug, Clone)]
pub struct FromImage {
    image: String,
    platform: Option<Platform>,
    /// Platform string that failed to parse, reported by `prepare`.
    invalid_platform: Option<String>,
}

impl FromImage {
    /// Create a source for `image`.
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            platform: None,
            invalid_platform: None,
        }
    }

    /// Constrain the platform selected at create time.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self.invalid_platform = None;
        self
    }

    /// The image reference as given.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }
}

#[async_trait]
impl ImageSource for FromImage {
    async fn prepare(&self, _ctx: &ExecutionContext) -> CapsuleResult<String> {
        if let Some(value) = &self.invalid_platform {
            return Err(capsule_common::CapsuleError::InvalidPlatform {
                value: value.clone(),
            });
        }

        ImageReference::parse(&self.image)?;
        tracing::trace!(image = %self.image, platform = ?self.platform, "Resolved image");
        Ok(self.image.clone())
    }

    fn platform(&self) -> Option<&Platform> {
        self.platform.as_ref()
    }
}

/// Build a [`FromImage`] source, applying `options` in order.
pub fn from_image(
    image: impl Into<String>,
    options: impl IntoIterator<Item = FromImageOption>,
) -> FromImage {
    let mut source = FromImage::new(image);
    for option in options {
        option(&mut source);
    }
    source
}

/// Constrain the image platform, e.g. `linux/amd64`.
///
/// An unparsable value makes [`ImageSource::prepare`] fail.
#[must_use]
pub fn with_image_platform(platform: &str) -> FromImageOption {
    let value = platform.to_string();
    Box::new(move |source: &mut FromImage| match Platform::parse(&value) {
        Ok(platform) => {
            source.platform = Some(platform);
            source.invalid_platform = None;
        }
        Err(_) => source.invalid_platform = Some(value),
    })
}
