//! Image reference parsing and validation.

use std::fmt;
use std::str::FromStr;

use capsule_common::{CapsuleError, CapsuleResult};

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry hostname, with optional port.
    pub registry: String,
    /// Repository path.
    pub repository: String,
    /// Tag, if one was given.
    pub tag: Option<String>,
    /// Content digest (e.g., "sha256:abc123..."), if one was given.
    pub digest: Option<String>,
}

impl ImageReference {
    /// Default registry.
    pub const DEFAULT_REGISTRY: &'static str = "docker.io";
    /// Default tag.
    pub const DEFAULT_TAG: &'static str = "latest";
    /// Longest accepted tag.
    const MAX_TAG_LENGTH: usize = 128;
    /// Longest accepted registry + repository name.
    const MAX_NAME_LENGTH: usize = 255;

    /// Parse an image reference string.
    ///
    /// Examples:
    /// - `nginx` -> docker.io/library/nginx:latest
    /// - `nginx:1.27` -> docker.io/library/nginx:1.27
    /// - `myuser/myapp` -> docker.io/myuser/myapp:latest
    /// - `localhost:5000/app@sha256:<hex>` -> localhost:5000/app@sha256:<hex>
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::InvalidImageReference`] when the reference is
    /// malformed.
    pub fn parse(reference: &str) -> CapsuleResult<Self> {
        let invalid = |reason: &str| CapsuleError::InvalidImageReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        if reference.is_empty() {
            return Err(invalid("reference is empty"));
        }
        if reference.chars().any(char::is_whitespace) {
            return Err(invalid("reference contains whitespace"));
        }

        let (remainder, digest) = match reference.split_once('@') {
            Some((name, digest)) => {
                validate_digest(digest).map_err(invalid)?;
                (name, Some(digest.to_string()))
            }
            None => (reference, None),
        };

        // A colon after the last slash starts the tag; earlier ones belong to a registry port.
        let (name, tag) = match remainder.rfind(':') {
            Some(idx) if !remainder[idx + 1..].contains('/') => {
                let tag = &remainder[idx + 1..];
                validate_tag(tag).map_err(invalid)?;
                (&remainder[..idx], Some(tag.to_string()))
            }
            _ => (remainder, None),
        };

        if name.is_empty() {
            return Err(invalid("repository name is empty"));
        }
        if name.len() > Self::MAX_NAME_LENGTH {
            return Err(invalid("repository name is too long"));
        }

        let (registry, repository) = match name.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                validate_registry(first).map_err(invalid)?;
                (first.to_string(), rest.to_string())
            }
            Some(_) => (Self::DEFAULT_REGISTRY.to_string(), name.to_string()),
            // Official image (e.g., "nginx" -> "library/nginx")
            None => (Self::DEFAULT_REGISTRY.to_string(), format!("library/{name}")),
        };

        for component in repository.split('/') {
            validate_path_component(component).map_err(invalid)?;
        }

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// The tag, falling back to `latest` when neither tag nor digest was given.
    #[must_use]
    pub fn tag_or_default(&self) -> Option<&str> {
        match (&self.tag, &self.digest) {
            (Some(tag), _) => Some(tag),
            (None, Some(_)) => None,
            (None, None) => Some(Self::DEFAULT_TAG),
        }
    }

    /// Get the fully qualified reference string.
    #[must_use]
    pub fn full_reference(&self) -> String {
        let mut full = format!("{}/{}", self.registry, self.repository);
        if let Some(tag) = self.tag_or_default() {
            full.push(':');
            full.push_str(tag);
        }
        if let Some(digest) = &self.digest {
            full.push('@');
            full.push_str(digest);
        }
        full
    }
}

fn validate_tag(tag: &str) -> Result<(), &'static str> {
    if tag.is_empty() || tag.len() > ImageReference::MAX_TAG_LENGTH {
        return Err("tag must be 1-128 characters");
    }
    if !tag.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
        return Err("tag must start with a letter, digit or underscore");
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err("tag contains invalid characters");
    }
    Ok(())
}

fn validate_digest(digest: &str) -> Result<(), &'static str> {
    let Some((algorithm, hex)) = digest.split_once(':') else {
        return Err("digest must be 'algorithm:hex'");
    };
    let algorithm_char = |c: char| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '.' | '_' | '-')
    };
    if algorithm.is_empty() || !algorithm.chars().all(algorithm_char) {
        return Err("digest algorithm is invalid");
    }
    if hex.len() < 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("digest must carry at least 32 hex characters");
    }
    Ok(())
}

fn validate_registry(registry: &str) -> Result<(), &'static str> {
    let (host, port) = match registry.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (registry, None),
    };
    if host.is_empty()
        || !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
    {
        return Err("registry host is invalid");
    }
    if let Some(port) = port {
        if port.parse::<u16>().is_err() {
            return Err("registry port is invalid");
        }
    }
    Ok(())
}

fn validate_path_component(component: &str) -> Result<(), &'static str> {
    let alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();

    if component.is_empty() {
        return Err("repository contains an empty path component");
    }
    if !component.starts_with(alnum) || !component.ends_with(alnum) {
        return Err("repository components must start and end with a lowercase letter or digit");
    }
    if !component
        .chars()
        .all(|c| alnum(c) || matches!(c, '.' | '_' | '-'))
    {
        return Err("repository must be lowercase letters, digits and separators");
    }
    if component.contains("..") {
        return Err("repository contains consecutive dots");
    }
    Ok(())
}

impl FromStr for ImageReference {
    type Err = CapsuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_reference())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn parse_simple() {
        let ref_ = ImageReference::parse("nginx").unwrap();
        assert_eq!(ref_.registry, "docker.io");
        assert_eq!(ref_.repository, "library/nginx");
        assert_eq!(ref_.tag, None);
        assert_eq!(ref_.full_reference(), "docker.io/library/nginx:latest");
    }

    #[test]
    fn parse_with_tag() {
        let ref_ = ImageReference::parse("nginx:1.27-alpine").unwrap();
        assert_eq!(ref_.repository, "library/nginx");
        assert_eq!(ref_.tag.as_deref(), Some("1.27-alpine"));
    }

    #[test]
    fn parse_user_repo() {
        let ref_ = ImageReference::parse("myuser/myapp").unwrap();
        assert_eq!(ref_.registry, "docker.io");
        assert_eq!(ref_.repository, "myuser/myapp");
    }

    #[test]
    fn parse_registry_with_port() {
        let ref_ = ImageReference::parse("localhost:5000/team/app").unwrap();
        assert_eq!(ref_.registry, "localhost:5000");
        assert_eq!(ref_.repository, "team/app");
        assert_eq!(ref_.tag, None);
    }

    #[test]
    fn parse_digest() {
        let reference = format!("ghcr.io/org/app:v1@{DIGEST}");
        let ref_ = ImageReference::parse(&reference).unwrap();
        assert_eq!(ref_.registry, "ghcr.io");
        assert_eq!(ref_.tag.as_deref(), Some("v1"));
        assert_eq!(ref_.digest.as_deref(), Some(DIGEST));
        assert_eq!(ref_.full_reference(), reference);

        let pinned = ImageReference::parse(&format!("alpine@{DIGEST}")).unwrap();
        assert_eq!(pinned.tag_or_default(), None);
    }

    #[test]
    fn rejects_malformed_references() {
        for reference in [
            "",
            "ngi nx",
            "Nginx",
            "nginx:",
            "nginx:-bad",
            "nginx@sha256:xyz",
            "nginx@md5",
            "org//app",
            "-nginx",
            ":latest",
            "registry.io:port/app",
        ] {
            let err = ImageReference::parse(reference).unwrap_err();
            assert!(
                matches!(err, CapsuleError::InvalidImageReference { .. }),
                "{reference} produced {err:?}"
            );
        }
    }
}
