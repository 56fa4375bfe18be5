//! Named steps of the two stage chains, and a hook around each of them.
//!
//! [`preprocess::clean_gray`](crate::preprocess::clean_gray) and
//! [`edge::edges_from_gray`](crate::edge::edges_from_gray) run every step
//! through a [`StageObserver`]. The plain entry points pass
//! [`Unobserved`]; diagnostics passes a timer. Both therefore execute the
//! same chain.

/// A step after grayscale conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Contrast enhancement.
    Contrast,
    /// Sharpening.
    Sharpen,
    /// Global threshold.
    Binarize,
    /// Gaussian smoothing before edge detection.
    Blur,
    /// Canny edge detection.
    EdgeDetection,
}

impl Stage {
    /// Stable lowercase name, as used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Contrast => "contrast",
            Self::Sharpen => "sharpen",
            Self::Binarize => "binarize",
            Self::Blur => "blur",
            Self::EdgeDetection => "edge_detection",
        }
    }
}

/// Wraps the execution of each [`Stage`].
pub trait StageObserver {
    /// Run `step`, which computes `stage`, and return its output.
    fn run<T>(&mut self, stage: Stage, step: impl FnOnce() -> T) -> T;
}

/// Runs every step directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unobserved;

impl StageObserver for Unobserved {
    fn run<T>(&mut self, _stage: Stage, step: impl FnOnce() -> T) -> T {
        step()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<Stage>);

    impl StageObserver for Recorder {
        fn run<T>(&mut self, stage: Stage, step: impl FnOnce() -> T) -> T {
            self.0.push(stage);
            step()
        }
    }

    #[test]
    fn unobserved_returns_step_output() {
        assert_eq!(Unobserved.run(Stage::Blur, || 7), 7);
    }

    #[test]
    fn chains_report_their_steps_in_order() {
        let page = image::DynamicImage::ImageLuma8(image::GrayImage::new(8, 8));
        let gray = crate::grayscale::luminance(&page);
        let config = crate::types::AnalysisConfig::default();

        let mut recorder = Recorder::default();
        let _ = crate::preprocess::clean_gray(&gray, &config, &mut recorder);
        let _ = crate::edge::edges_from_gray(&gray, &config, &mut recorder);
        assert_eq!(
            recorder.0,
            [
                Stage::Contrast,
                Stage::Sharpen,
                Stage::Binarize,
                Stage::Blur,
                Stage::EdgeDetection
            ]
        );
    }

    #[test]
    fn names_are_snake_case() {
        assert_eq!(Stage::EdgeDetection.name(), "edge_detection");
        assert_eq!(Stage::Contrast.name(), "contrast");
    }
}
