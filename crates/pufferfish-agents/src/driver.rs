//! Response selection.
//!
//! A [`Driver`] sees the freshly updated descriptor and the agent's pose
//! and returns one response. The agent owns one of each driver and
//! dispatches on its [`DriverKind`](pufferfish_types::DriverKind).

use pufferfish_morphognostic::{MetamorphStore, Morphognostic};
use pufferfish_types::{Orientation, Response};
use rand::RngCore;
use tracing::{debug, warn};

use crate::classifier::{Classifier, most_likely};

/// What a driver may look at when deciding.
pub struct DriverContext<'a> {
    /// Descriptor after this tick's update.
    pub descriptor: &'a Morphognostic,
    /// Metamorphs learned so far.
    pub metamorphs: &'a MetamorphStore,
    /// Wrapped offset of the agent from its home cell, `+y` north.
    pub offset: (i64, i64),
    /// Current heading.
    pub heading: Orientation,
    /// Source for tie-breaking.
    pub rng: &'a mut dyn RngCore,
}

/// Something that picks a response each tick.
pub trait Driver {
    /// Choose a response.
    fn decide(&mut self, ctx: &mut DriverContext<'_>) -> Response;
}

/// Answers with the response of the nearest stored metamorph.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetamorphDbDriver;

impl Driver for MetamorphDbDriver {
    fn decide(&mut self, ctx: &mut DriverContext<'_>) -> Response {
        ctx.metamorphs.nearest_response(ctx.descriptor, &mut *ctx.rng)
    }
}

/// Answers with the most probable response of a trained classifier.
///
/// Without a classifier, or when prediction fails, it answers
/// [`Response::Wait`]. The missing classifier is reported once, when the
/// agent switches to this driver, and only at debug level per tick.
#[derive(Debug, Default)]
pub struct ClassifierDriver {
    classifier: Option<Box<dyn Classifier>>,
}

impl ClassifierDriver {
    /// Driver with no classifier yet.
    pub const fn new() -> Self {
        Self { classifier: None }
    }

    /// Install a trained classifier.
    pub fn set_classifier(&mut self, classifier: Box<dyn Classifier>) {
        self.classifier = Some(classifier);
    }

    /// Whether a classifier is installed.
    pub const fn is_trained(&self) -> bool {
        self.classifier.is_some()
    }
}

impl Driver for ClassifierDriver {
    fn decide(&mut self, ctx: &mut DriverContext<'_>) -> Response {
        let Some(classifier) = &self.classifier else {
            debug!("no trained classifier, waiting");
            return Response::Wait;
        };
        match classifier.predict(&ctx.descriptor.flatten()) {
            Ok(distribution) => most_likely(&distribution),
            Err(e) => {
                warn!(error = %e, "classification failed, waiting");
                Response::Wait
            }
        }
    }
}

/// Replays whatever response was last injected from outside.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualDriver {
    response: Response,
}

impl ManualDriver {
    /// Set the response returned from now on.
    pub const fn set_response(&mut self, response: Response) {
        self.response = response;
    }

    /// The injected response.
    pub const fn response(&self) -> Response {
        self.response
    }
}

impl Driver for ManualDriver {
    fn decide(&mut self, _ctx: &mut DriverContext<'_>) -> Response {
        self.response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pufferfish_morphognostic::MorphognosticParams;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::classifier::ClassifierError;

    #[derive(Debug)]
    struct Fixed(Vec<f32>);

    impl Classifier for Fixed {
        fn predict(&self, _features: &[f32]) -> Result<Vec<f32>, ClassifierError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl Classifier for Broken {
        fn predict(&self, features: &[f32]) -> Result<Vec<f32>, ClassifierError> {
            Err(ClassifierError::FeatureLength {
                expected: 0,
                actual: features.len(),
            })
        }
    }

    fn decide_with(driver: &mut dyn Driver, store: &MetamorphStore) -> Response {
        let descriptor = Morphognostic::new(MorphognosticParams::default(), vec![2]).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut ctx = DriverContext {
            descriptor: &descriptor,
            metamorphs: store,
            offset: (0, 0),
            heading: Orientation::North,
            rng: &mut rng,
        };
        driver.decide(&mut ctx)
    }

    #[test]
    fn metamorph_db_uses_store() {
        let empty = MetamorphStore::new(0.0).unwrap();
        assert_eq!(decide_with(&mut MetamorphDbDriver, &empty), Response::Wait);

        let mut store = MetamorphStore::new(0.0).unwrap();
        let descriptor = Morphognostic::new(MorphognosticParams::default(), vec![2]).unwrap();
        store.insert_if_novel(&descriptor, Response::Plow);
        assert_eq!(decide_with(&mut MetamorphDbDriver, &store), Response::Plow);
    }

    #[test]
    fn classifier_driver_falls_back_to_wait() {
        let store = MetamorphStore::new(0.0).unwrap();
        let mut driver = ClassifierDriver::new();
        assert!(!driver.is_trained());
        assert_eq!(decide_with(&mut driver, &store), Response::Wait);

        driver.set_classifier(Box::new(Broken));
        assert_eq!(decide_with(&mut driver, &store), Response::Wait);

        driver.set_classifier(Box::new(Fixed(vec![0.0, 0.1, 0.0, 0.7, 0.2, 0.0, 0.0, 0.0])));
        assert_eq!(decide_with(&mut driver, &store), Response::TurnRight);
    }

    #[test]
    fn manual_driver_replays_injection() {
        let store = MetamorphStore::new(0.0).unwrap();
        let mut driver = ManualDriver::default();
        assert_eq!(decide_with(&mut driver, &store), Response::Wait);
        driver.set_response(Response::Raise);
        assert_eq!(decide_with(&mut driver, &store), Response::Raise);
        assert_eq!(driver.response(), Response::Raise);
    }
}
