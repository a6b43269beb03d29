use crate::text::RecognitionLine;

// Output tensors are laid out row by row: one row of class scores per time step.
pub fn argmax_in_axis0(input: &[f32], shape: &[usize]) -> Vec<usize> {
    input.chunks(shape[1]).map(|v: &[f32]| {
        let mut max = v[0];
        let mut index = 0;
        v.iter().enumerate().for_each(|(i, v_in_v)| {
            if *v_in_v >= max {
                max = *v_in_v;
                index = i;
            }
        });
        index
    }).collect()
}

/// Greedy CTC decode: best class per step, repeats collapsed, blanks dropped.
/// Any class index past the charset is a blank.
/// Confidence is the mean score of the emitted characters.
pub fn fast_decode(scores: &[f32], shape: [usize; 2], charset: &[char]) -> RecognitionLine {
    if shape[1] == 0 || scores.len() < shape[0] * shape[1] {
        return RecognitionLine::new("", 0.0);
    }
    let scores = &scores[..shape[0] * shape[1]];
    let argmax = argmax_in_axis0(scores, &shape);
    let (text, total) = argmax.iter().enumerate().filter(|(i, v)| {
        **v < charset.len() && (*i == 0 || **v != argmax[i - 1])
    }).fold((String::new(), 0.0), |(mut text, total), (i, v)| {
        text.push(charset[*v]);
        (text, total + scores[i * shape[1] + v])
    });
    let count = text.chars().count();
    let confidence = if count == 0 { 0.0 } else { total / count as f32 };
    RecognitionLine::new(text, confidence)
}
