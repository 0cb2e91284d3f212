//! Batch annotation of still images.

use posecast_core::{Landmark, LandmarkProvider, LandmarkSet, PoseLandmark, Renderer};
use std::path::{Path, PathBuf};

/// `dir/name.ext` becomes `dir/name_annotated.ext`.
pub fn annotated_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_annotated.{}", ext.to_string_lossy()),
        None => format!("{stem}_annotated"),
    };
    path.with_file_name(name)
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotateOutcome {
    /// Annotated copy written; `nose` is set when a body was found.
    Written { output: PathBuf, nose: Option<Landmark> },
    /// Input could not be decoded; nothing was written.
    Unreadable { reason: String },
    /// Input was processed but the output could not be saved.
    WriteFailed { output: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotateReport {
    pub input: PathBuf,
    pub outcome: AnnotateOutcome,
}

pub fn annotate_file<P, R>(path: &Path, provider: &mut P, renderer: &R) -> AnnotateOutcome
where
    P: LandmarkProvider + ?Sized,
    R: Renderer + ?Sized,
{
    let image = match image::open(path) {
        Ok(img) => img.to_rgb8(),
        Err(e) => {
            return AnnotateOutcome::Unreadable {
                reason: e.to_string(),
            }
        }
    };

    let result = match provider.infer(&image) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "inference failed");
            None
        }
    };
    let nose = result
        .as_ref()
        .and_then(|set| set.get(PoseLandmark::Nose))
        .copied();

    let sets: Vec<LandmarkSet> = result.into_iter().collect();
    let annotated = renderer.draw(&image, &sets);

    let output = annotated_path(path);
    match annotated.save(&output) {
        Ok(()) => {
            tracing::debug!(input = %path.display(), output = %output.display(), "wrote annotated image");
            AnnotateOutcome::Written { output, nose }
        }
        Err(e) => AnnotateOutcome::WriteFailed {
            output,
            reason: e.to_string(),
        },
    }
}

/// Annotate each path in order. A failing file never stops the batch.
pub fn annotate_files<P, R>(paths: &[PathBuf], provider: &mut P, renderer: &R) -> Vec<AnnotateReport>
where
    P: LandmarkProvider + ?Sized,
    R: Renderer + ?Sized,
{
    paths
        .iter()
        .map(|path| AnnotateReport {
            input: path.clone(),
            outcome: annotate_file(path, provider, renderer),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use posecast_core::{OverlayRenderer, ProviderError};

    struct NoseAt(Option<(f32, f32, f32)>);

    impl LandmarkProvider for NoseAt {
        fn infer(&mut self, _frame: &RgbImage) -> Result<Option<LandmarkSet>, ProviderError> {
            Ok(self.0.map(|(x, y, z)| {
                let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.0); 33];
                landmarks[PoseLandmark::Nose.index()] = Landmark::new(x, y, z);
                LandmarkSet::new(landmarks)
            }))
        }
    }

    fn write_image(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(16, 12, Rgb([10, 20, 30])).save(&path).unwrap();
        path
    }

    #[test]
    fn test_annotated_path() {
        assert_eq!(
            annotated_path(Path::new("/data/shots/a.jpg")),
            PathBuf::from("/data/shots/a_annotated.jpg")
        );
        assert_eq!(
            annotated_path(Path::new("pose.v2.png")),
            PathBuf::from("pose.v2_annotated.png")
        );
        assert_eq!(annotated_path(Path::new("raw")), PathBuf::from("raw_annotated"));
    }

    #[test]
    fn test_writes_annotated_copy_and_reports_nose() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_image(dir.path(), "a.png");

        let outcome = annotate_file(&input, &mut NoseAt(Some((0.5, 0.4, 0.1))), &OverlayRenderer::default());

        let AnnotateOutcome::Written { output, nose } = outcome else {
            panic!("expected a written file, got {outcome:?}");
        };
        assert_eq!(output, dir.path().join("a_annotated.png"));
        assert!(output.exists());
        assert_eq!(nose, Some(Landmark::new(0.5, 0.4, 0.1)));

        let written = image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (16, 12));
    }

    #[test]
    fn test_no_body_writes_unannotated_copy() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_image(dir.path(), "empty.png");

        let outcome = annotate_file(&input, &mut NoseAt(None), &OverlayRenderer::default());

        let AnnotateOutcome::Written { output, nose } = outcome else {
            panic!("expected a written file");
        };
        assert!(nose.is_none());
        let written = image::open(&output).unwrap().to_rgb8();
        assert!(written.pixels().all(|p| *p == Rgb([10, 20, 30])));
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_image(dir.path(), "good.png");
        let bad = dir.path().join("bad.png");
        std::fs::write(&bad, b"not an image").unwrap();

        let reports = annotate_files(
            &[bad.clone(), good.clone()],
            &mut NoseAt(Some((0.5, 0.4, 0.1))),
            &OverlayRenderer::default(),
        );

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].input, bad);
        assert!(matches!(reports[0].outcome, AnnotateOutcome::Unreadable { .. }));
        assert!(!dir.path().join("bad_annotated.png").exists());
        assert!(matches!(reports[1].outcome, AnnotateOutcome::Written { .. }));
        assert!(dir.path().join("good_annotated.png").exists());
    }
}
