use crate::config::NoiseConfig;

/// One line of recognizer output.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionLine {
    pub text: String,
    pub confidence: f32,
}

impl RecognitionLine {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self { text: text.into(), confidence }
    }
}

/// Lines of one detected text block, top to bottom.
pub type TextGroup = Vec<RecognitionLine>;

/// Joins recognizer lines into plate candidates, one per group.
#[derive(Debug, Clone)]
pub struct TextAggregator {
    leading_noise: Vec<char>,
}

impl Default for TextAggregator {
    fn default() -> Self {
        Self::new(&NoiseConfig::default())
    }
}

impl TextAggregator {

    pub fn new(noise: &NoiseConfig) -> Self {
        Self { leading_noise: noise.leading.clone() }
    }

    pub fn aggregate(&self, groups: &[TextGroup]) -> Vec<String> {
        groups.iter().filter_map(|group| self.candidate(group)).collect()
    }

    /// `None` when nothing is left to validate.
    pub fn candidate(&self, group: &[RecognitionLine]) -> Option<String> {
        let mut plate: String = group.iter()
            .flat_map(|line| line.text.chars())
            .filter(|c| *c != '\n' && *c != ' ')
            .collect();
        if let Some(first) = plate.chars().next() {
            if self.leading_noise.contains(&first) {
                plate.remove(0);
            }
        }
        if plate.is_empty() {
            None
        } else {
            Some(plate)
        }
    }
}


#[cfg(test)]
mod test {

    use crate::config::NoiseConfig;

    use super::{ RecognitionLine, TextAggregator };

    fn lines(texts: &[&str]) -> Vec<RecognitionLine> {
        texts.iter().map(|t| RecognitionLine::new(*t, 0.9)).collect()
    }

    #[test]
    fn joins_lines_in_order_and_strips_blanks() {
        let aggregator = TextAggregator::default();
        let candidate = aggregator.candidate(&lines(&["B 1234", "X Y\n"]));
        assert_eq!(candidate.as_deref(), Some("B1234XY"));
    }

    #[test]
    fn drops_one_leading_noise_glyph() {
        let aggregator = TextAggregator::default();
        assert_eq!(aggregator.candidate(&lines(&["IB1234XY"])).as_deref(), Some("B1234XY"));
        assert_eq!(aggregator.candidate(&lines(&["1", "1B12C"])).as_deref(), Some("1B12C"));
        assert_eq!(aggregator.candidate(&lines(&[" I AA12C"])).as_deref(), Some("AA12C"));
    }

    #[test]
    fn empty_groups_yield_nothing() {
        let aggregator = TextAggregator::default();
        assert_eq!(aggregator.candidate(&lines(&[])), None);
        assert_eq!(aggregator.candidate(&lines(&[" \n", " "])), None);
        assert_eq!(aggregator.candidate(&lines(&["I"])), None);
    }

    #[test]
    fn one_candidate_per_group() {
        let aggregator = TextAggregator::default();
        let groups = vec![lines(&["B1234XY"]), lines(&["  "]), lines(&["AD", "77", "KL"])];
        assert_eq!(aggregator.aggregate(&groups), vec!["B1234XY".to_string(), "AD77KL".to_string()]);
    }

    #[test]
    fn noise_glyphs_are_configurable() {
        let aggregator = TextAggregator::new(&NoiseConfig { leading: vec!['|'], trailing_suffix: vec![] });
        assert_eq!(aggregator.candidate(&lines(&["|B12C"])).as_deref(), Some("B12C"));
        assert_eq!(aggregator.candidate(&lines(&["IB12C"])).as_deref(), Some("IB12C"));
    }
}
