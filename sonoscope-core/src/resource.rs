use crate::error::ResourceError;

/// Shown when the overlay surface could not be brought back.
pub const REFRESH_MESSAGE: &str =
    "The annotation layer stopped responding. Please refresh the page to keep drawing.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// The surface was missing or invalid and has been rebuilt.
    Recreated,
}

/// A drawing surface with an explicit lifecycle. Interaction entry points
/// call [`ensure_ready`](DrawingResource::ensure_ready) once before doing
/// anything else.
pub trait DrawingResource {
    /// Attached, sized and holding a usable 2D context.
    fn is_valid(&self) -> bool;

    /// Rebuild the surface and reattach it.
    fn recreate(&mut self) -> Result<(), ResourceError>;

    /// One synchronous recreate attempt when invalid.
    fn ensure_ready(&mut self) -> Result<Readiness, ResourceError> {
        if self.is_valid() {
            return Ok(Readiness::Ready);
        }
        log::warn!("Overlay surface invalid; recreating");
        if let Err(e) = self.recreate() {
            log::error!("Overlay surface recreate failed: {e}");
            return Err(e);
        }
        if self.is_valid() {
            Ok(Readiness::Recreated)
        } else {
            log::error!("Overlay surface still invalid after recreate");
            Err(ResourceError::RecreateFailed("surface still invalid".into()))
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;

    /// Test double: `valid` flips to `heals` on recreate.
    pub struct MockSurface {
        pub valid: bool,
        pub heals: bool,
        pub recreates: u32,
    }

    impl MockSurface {
        pub fn healthy() -> Self {
            Self { valid: true, heals: true, recreates: 0 }
        }
    }

    impl DrawingResource for MockSurface {
        fn is_valid(&self) -> bool {
            self.valid
        }

        fn recreate(&mut self) -> Result<(), ResourceError> {
            self.recreates += 1;
            self.valid = self.heals;
            Ok(())
        }
    }
}
