use image::{ Rgb, RgbImage };
use imageproc::{ drawing, rect::Rect };
use rusttype::{ Font, Scale };

use std::fs;
use std::path::{ Path, PathBuf };

use crate::error::LprError;
use crate::region::{ Detection, RegionOfInterest };
use crate::report::{ PlateEvent, Verdict };

const DETECTION_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const VALID_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const INVALID_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const LABEL_HEIGHT: f32 = 24.0;

/// Draws accepted detection boxes, plate regions and their text onto frames
/// and saves them. Text is only drawn when a font was given.
pub struct Annotator {
    out_dir: PathBuf,
    font: Option<Font<'static>>,
}

impl Annotator {

    pub fn new(out_dir: impl AsRef<Path>, font_path: Option<&Path>) -> Result<Self, LprError> {
        let out_dir = out_dir.as_ref().to_path_buf();
        fs::create_dir_all(&out_dir)?;
        let font = match font_path {
            Some(path) => {
                let data = fs::read(path)?;
                let font = Font::try_from_vec(data)
                    .ok_or_else(|| LprError::font(format!("cannot parse {}", path.display())))?;
                Some(font)
            }
            None => None,
        };
        Ok(Self { out_dir, font })
    }

    pub fn draw(&self, frame: &RgbImage, accepted: &[Detection], events: &[PlateEvent]) -> RgbImage {
        let mut canvas = frame.clone();
        let (width, height) = frame.dimensions();
        for detection in accepted {
            outline(&mut canvas, detection.bounds().clamp_to(width, height), DETECTION_COLOR);
        }
        for event in events {
            let roi = event.roi;
            let color = if event.verdict.is_valid() { VALID_COLOR } else { INVALID_COLOR };
            outline(&mut canvas, roi, color);

            if let Some(font) = &self.font {
                let text = match &event.verdict {
                    Verdict::Valid { .. } => event.verdict.plate_text().unwrap_or_default(),
                    Verdict::Invalid { raw, .. } => raw.clone(),
                };
                let y = (roi.y1 as f32 - LABEL_HEIGHT).max(0.0) as u32;
                let x = roi.x1.max(0) as u32;
                drawing::draw_text_mut(&mut canvas, color, x, y, Scale::uniform(LABEL_HEIGHT), font, &text);
            }
        }
        canvas
    }

    pub fn save(&self, frame_index: u64, frame: &RgbImage, accepted: &[Detection], events: &[PlateEvent]) -> Result<PathBuf, LprError> {
        let path = self.out_dir.join(format!("frame_{:06}.png", frame_index));
        self.draw(frame, accepted, events).save(&path)?;
        Ok(path)
    }
}

fn outline(canvas: &mut RgbImage, roi: RegionOfInterest, color: Rgb<u8>) {
    if roi.is_empty() {
        return;
    }
    let rect = Rect::at(roi.x1, roi.y1).of_size(roi.width() as u32, roi.height() as u32);
    drawing::draw_hollow_rect_mut(canvas, rect, color);
}


#[cfg(test)]
mod test {

    use image::{ Rgb, RgbImage };

    use crate::region::{ Detection, RegionOfInterest };
    use crate::report::{ PlateEvent, Verdict };
    use crate::validator::RejectReason;

    use super::{ Annotator, DETECTION_COLOR, INVALID_COLOR, VALID_COLOR };

    use std::error::Error;

    fn event(roi: RegionOfInterest, verdict: Verdict) -> PlateEvent {
        PlateEvent { frame: 0, roi, confidence: 0.9, verdict }
    }

    #[test]
    fn outlines_regions_by_verdict() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let annotator = Annotator::new(dir.path().join("out"), None)?;
        let frame = RgbImage::new(50, 40);
        let events = vec![
            event(RegionOfInterest { x1: 2, y1: 2, x2: 20, y2: 10 },
                Verdict::Valid { region: "B".into(), numeric: "1".into(), suffix: "A".into() }),
            event(RegionOfInterest { x1: 25, y1: 20, x2: 45, y2: 30 },
                Verdict::Invalid { reason: RejectReason::InvalidRegion, raw: "XX".into() }),
        ];
        let drawn = annotator.draw(&frame, &[], &events);
        assert_eq!(drawn.get_pixel(2, 2), &VALID_COLOR);
        assert_eq!(drawn.get_pixel(25, 20), &INVALID_COLOR);
        assert_eq!(drawn.get_pixel(10, 6), &Rgb([0, 0, 0]));
        assert_eq!(frame.get_pixel(2, 2), &Rgb([0, 0, 0]));

        let path = annotator.save(7, &frame, &[], &events)?;
        assert!(path.ends_with("frame_000007.png"));
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn outlines_every_accepted_detection() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let annotator = Annotator::new(dir.path(), None)?;
        let frame = RgbImage::new(50, 40);
        // the second box read no text, the third reaches past the frame
        let accepted = [
            Detection::new(1, 1, 30, 20, 0.9),
            Detection::new(5, 25, 20, 35, 0.9),
            Detection::new(40, 30, 80, 90, 0.9),
        ];
        let events = vec![event(RegionOfInterest { x1: 1, y1: 1, x2: 29, y2: 14 },
            Verdict::Valid { region: "B".into(), numeric: "1".into(), suffix: "A".into() })];
        let drawn = annotator.draw(&frame, &accepted, &events);
        assert_eq!(drawn.get_pixel(1, 1), &VALID_COLOR);
        assert_eq!(drawn.get_pixel(29, 19), &DETECTION_COLOR);
        assert_eq!(drawn.get_pixel(5, 25), &DETECTION_COLOR);
        assert_eq!(drawn.get_pixel(40, 30), &DETECTION_COLOR);
        assert_eq!(drawn.get_pixel(10, 30), &Rgb([0, 0, 0]));
        Ok(())
    }

    #[test]
    fn unreadable_font_is_an_error() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let font = dir.path().join("font.ttf");
        std::fs::write(&font, b"nope")?;
        assert!(Annotator::new(dir.path(), Some(&font)).is_err());
        Ok(())
    }
}
